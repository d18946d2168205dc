//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine, net, http subsystems
//!     → tracing events (attempt lifecycle, redirects, tunnels)
//!     → logging.rs subscriber (installed by binaries, never by the library)
//!     → stderr
//! ```
//!
//! # Design Decisions
//! - Structured key=value fields: connection_id, method, url, status
//! - Lifecycle transitions at debug, discarded late events at trace

pub mod logging;
