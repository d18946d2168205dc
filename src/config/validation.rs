//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the proxy URL is usable for forwarding and tunneling
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(proxy) = &config.proxy {
        match Url::parse(proxy) {
            Ok(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    errors.push(ValidationError::new(
                        "proxy",
                        format!("unsupported proxy scheme '{}'", url.scheme()),
                    ));
                }
                if url.host_str().is_none() {
                    errors.push(ValidationError::new("proxy", "proxy URL has no host"));
                }
            }
            Err(e) => {
                errors.push(ValidationError::new("proxy", format!("invalid URL '{}': {}", proxy, e)));
            }
        }
    }

    if config.tunnel == Some(true) && config.proxy.is_none() {
        errors.push(ValidationError::new("tunnel", "tunneling requested without a proxy"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
