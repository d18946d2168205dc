//! Public client entry point.
//!
//! # Responsibilities
//! - Hold immutable client-wide defaults, TLS settings and an optional connector
//! - Resolve each call's options once into a `RequestSpec`
//! - Hand the spec to the redirect loop and return its single outcome
//!
//! # Design Decisions
//! - `Client` is cheap to clone and safe to share across concurrent calls
//! - Calls share no mutable state; each owns its spec and connections

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::config::{validate_config, ClientConfig};
use crate::engine::redirect;
use crate::error::{Error, Result};
use crate::http::request::{redacted, IntoRequestOptions, RequestSpec};
use crate::http::response::Response;
use crate::net::connection::Connect;
use crate::net::tls::TlsSettings;

struct Inner {
    config: ClientConfig,
    proxy: Option<Url>,
    connector: Option<Arc<dyn Connect>>,
    tls: Arc<TlsSettings>,
}

/// Reusable request engine.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Build a client from validated defaults.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Execute a request, following redirects, and return the decoded response.
    pub async fn fetch(&self, request: impl IntoRequestOptions) -> Result<Response> {
        let mut options = request.into_options()?;
        if options.hooks.connector.is_none() {
            options.hooks.connector = self.inner.connector.clone();
        }

        let spec = RequestSpec::resolve(options, &self.inner.config, self.inner.proxy.as_ref())?;
        tracing::debug!(
            method = %spec.method,
            url = %redacted(&spec.url),
            max_redirects = spec.redirects_remaining,
            timeout_ms = spec
                .timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
            "Starting request"
        );

        redirect::run(spec, self.inner.tls.clone()).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                config: ClientConfig::default(),
                proxy: None,
                connector: None,
                tls: Arc::new(TlsSettings::default()),
            }),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("connector", &self.inner.connector.is_some())
            .field("tls", &self.inner.tls)
            .finish()
    }
}

/// Builder for a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    connector: Option<Arc<dyn Connect>>,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Connection handle used for every call that does not supply its own.
    pub fn connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the default webpki trust store configuration.
    pub fn tls_config(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn build(self) -> Result<Client> {
        validate_config(&self.config).map_err(|errors| {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Error::invalid(format!("invalid client config: {}", joined))
        })?;

        let proxy = match &self.config.proxy {
            Some(proxy) => Some(Url::parse(proxy).map_err(|e| Error::invalid(e.to_string()))?),
            None => None,
        };
        let tls = match self.tls {
            Some(config) => TlsSettings::with_config(config),
            None => TlsSettings::default(),
        };

        Ok(Client {
            inner: Arc::new(Inner {
                config: self.config,
                proxy,
                connector: self.connector,
                tls: Arc::new(tls),
            }),
        })
    }
}

/// Execute a request with a default client.
pub async fn fetch(request: impl IntoRequestOptions) -> Result<Response> {
    Client::default().fetch(request).await
}
