//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionConfig (one per attempt)
//!     → tunnel.rs (HTTPS through proxy: CONNECT, then TLS over the tunnel)
//!     → connection.rs (supplied connector, or direct TCP + optional TLS)
//!     → tls.rs (rustls handshake with webpki roots)
//!     → BoxedIo handed to the HTTP/1.1 exchange
//! ```
//!
//! # Design Decisions
//! - Every stream is boxed behind one `Io` trait so the exchange code is
//!   identical for direct, tunneled and caller-supplied connections
//! - Connections belong to one attempt and are dropped when it settles

pub mod connection;
pub mod tls;
pub mod tunnel;

pub use connection::{BoxedIo, Connect, Connection, ConnectionId, Io, Scheme, SocketInfo, Target};
pub use tls::TlsSettings;
