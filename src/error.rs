//! Error taxonomy for request execution.
//!
//! Every top-level call settles with exactly one of these. None of them is
//! retried by the engine; redirect following is the only automatic re-issue.

use thiserror::Error;

/// Boxed transport-level cause (I/O, TLS, HTTP framing).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while executing a request.
#[derive(Debug, Error)]
pub enum Error {
    /// DNS, socket, TLS or HTTP framing failure.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// The proxy answered the CONNECT request with something other than 200.
    #[error("proxy tunnel failed with status {status}")]
    ProxyTunnel { status: u16 },

    /// The attempt did not settle within the configured timeout.
    #[error("timeout of {timeout_ms}ms exceeded for {method} {url}")]
    Timeout {
        timeout_ms: u64,
        method: String,
        url: String,
    },

    /// The socket closed before any response headers arrived.
    #[error("connection closed before a response was received for {method} {url}")]
    ConnectionClosed { method: String, url: String },

    /// The compressed response body could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] std::io::Error),

    /// The request description was rejected at the entry point.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    pub(crate) fn connection<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Connection(err.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// Returns true if the attempt was aborted by its timer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Status code returned by the proxy for a failed tunnel, if any.
    pub fn tunnel_status(&self) -> Option<u16> {
        match self {
            Error::ProxyTunnel { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for request operations.
pub type Result<T> = std::result::Result<T, Error>;
