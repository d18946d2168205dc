//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → shared by the Client across every call
//!
//! Per call:
//!     RequestOptions (unset fields)
//!     → filled from ClientConfig once at the entry point
//!     → RequestSpec (owned by the redirect loop)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a Client is built
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use validation::{validate_config, ValidationError};
