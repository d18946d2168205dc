//! Transport connections.
//!
//! # Responsibilities
//! - Describe where a connection goes (`Target`)
//! - Dial TCP, with TLS for https targets
//! - Use a caller-supplied connection handle instead when one is given
//! - Generate unique connection IDs for tracing

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use url::{Host, Url};

use crate::error::{Error, Result};
use crate::net::tls::TlsSettings;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is enough since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Byte stream an HTTP/1.1 exchange can run over.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedIo = Box<dyn Io>;

/// Transport protocol of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Resolved endpoint for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    /// Hostname or IP literal, without IPv6 brackets.
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn from_url(url: &Url) -> Result<Self> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(Error::invalid(format!("unsupported scheme '{}'", other))),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::invalid(format!("URL has no host: {}", url))),
        };
        Ok(Self {
            scheme,
            host,
            port: url.port().unwrap_or_else(|| scheme.default_port()),
        })
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.authority())
    }
}

/// Caller-supplied connection handle.
///
/// The returned stream must be ready to carry HTTP/1.1 for `target`
/// (TLS already applied for https targets). The engine uses it for one
/// attempt and never manages the connector's own lifecycle.
pub trait Connect: Send + Sync {
    fn connect<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, io::Result<BoxedIo>>;
}

/// What is known about a connection once it is available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketInfo {
    pub peer_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    pub secure: bool,
    pub tunneled: bool,
}

/// An established connection owned by one attempt.
pub struct Connection {
    pub id: ConnectionId,
    pub io: BoxedIo,
    pub info: SocketInfo,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish()
    }
}

/// Dial `target` directly.
pub async fn dial(target: &Target, tls: &TlsSettings) -> Result<Connection> {
    let id = ConnectionId::new();
    let tcp = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(Error::connection)?;
    let _ = tcp.set_nodelay(true);

    let info = SocketInfo {
        peer_addr: tcp.peer_addr().ok(),
        local_addr: tcp.local_addr().ok(),
        secure: target.is_secure(),
        tunneled: false,
    };

    tracing::trace!(connection_id = %id, target = %target, peer_addr = ?info.peer_addr, "TCP connected");

    let io = if target.is_secure() {
        tls.handshake(&target.host, tcp).await?
    } else {
        Box::new(tcp) as BoxedIo
    };

    Ok(Connection { id, io, info })
}

/// Obtain a connection from a caller-supplied connector.
pub async fn connect_with(connector: &dyn Connect, target: &Target) -> Result<Connection> {
    let id = ConnectionId::new();
    let io = connector.connect(target).await.map_err(Error::connection)?;
    tracing::trace!(connection_id = %id, target = %target, "Connected through supplied connector");
    Ok(Connection {
        id,
        io,
        info: SocketInfo {
            secure: target.is_secure(),
            ..SocketInfo::default()
        },
    })
}
