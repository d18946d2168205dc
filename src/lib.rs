//! HTTP/HTTPS request engine.
//!
//! Sends a request directly or through a forward/tunneling proxy, follows
//! redirects, decodes gzip/deflate bodies, and settles exactly once with
//! either a buffered response or a typed error.
//!
//! ```no_run
//! # async fn run() -> request_engine::Result<()> {
//! let response = request_engine::fetch("http://example.com/").await?;
//! println!("{} {}", response.status(), response.body());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod net;
pub mod observability;

pub use config::ClientConfig;
pub use engine::{fetch, Client, ClientBuilder};
pub use error::{Error, Result};
pub use crate::http::{IntoRequestOptions, Payload, RequestOptions, Response};
pub use net::{Connect, SocketInfo, Target};
