//! Shared mock servers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustls::pki_types::CertificateDer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

const CA_CERT: &str = include_str!("../fixtures/ca.pem");
const SERVER_CERT: &str = include_str!("../fixtures/server.pem");
const SERVER_KEY: &str = include_str!("../fixtures/server.key");

/// Hostname the fixture certificate is issued for.
pub const TLS_HOST: &str = "secure.test";

/// A request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct Captured {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type Log = Arc<Mutex<Vec<Captured>>>;

/// Build a raw HTTP/1.1 response with a content-length body.
pub fn response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

async fn read_request<S: AsyncRead + Unpin>(socket: &mut S) -> Option<Captured> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => head.push(byte[0]),
        }
    }

    let text = String::from_utf8_lossy(&head).into_owned();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    if length > 0 && socket.read_exact(&mut body).await.is_err() {
        return None;
    }

    Some(Captured {
        request_line,
        headers,
        body,
    })
}

/// Start a server answering every request with `respond(request)`.
pub async fn start_server<F>(respond: F) -> (SocketAddr, Log)
where
    F: Fn(&Captured) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let server_log = log.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let respond = respond.clone();
            let log = server_log.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    let reply = respond(&request);
                    log.lock().unwrap().push(request);
                    let _ = socket.write_all(&reply).await;
                    let _ = socket.shutdown().await;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            });
        }
    });

    (addr, log)
}

/// Start a server that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, Log) {
    start_server(move |_| response("200 OK", &[], body.as_bytes())).await
}

/// Accepts connections and reads the request but never answers.
pub async fn start_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// Reads the request head, then closes without answering.
pub async fn start_closing_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Server side acceptor and a client config trusting the fixture CA.
pub struct TlsFixture {
    pub acceptor: TlsAcceptor,
    pub client_config: Arc<rustls::ClientConfig>,
}

pub fn tls_fixture() -> TlsFixture {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut SERVER_CERT.as_bytes())
        .collect::<Result<_, _>>()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut SERVER_KEY.as_bytes())
        .unwrap()
        .unwrap();
    let server = rustls::ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();

    let mut roots = rustls::RootCertStore::empty();
    for ca in rustls_pemfile::certs(&mut CA_CERT.as_bytes()) {
        roots.add(ca.unwrap()).unwrap();
    }
    let client = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();

    TlsFixture {
        acceptor: TlsAcceptor::from(Arc::new(server)),
        client_config: Arc::new(client),
    }
}

/// A proxy that forwards plain requests to `forward` and, for CONNECT,
/// answers 200 then terminates TLS and answers the inner request with `inner`.
pub struct TunnelProxy {
    pub addr: SocketAddr,
    /// Requests seen by the proxy itself: forwarded requests and CONNECTs.
    pub proxy_log: Log,
    /// Requests received inside tunnels.
    pub tunneled_log: Log,
}

pub async fn start_tunnel_proxy<F, G>(acceptor: TlsAcceptor, forward: F, inner: G) -> TunnelProxy
where
    F: Fn(&Captured) -> Vec<u8> + Send + Sync + 'static,
    G: Fn(&Captured) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let proxy_log: Log = Arc::new(Mutex::new(Vec::new()));
    let tunneled_log: Log = Arc::new(Mutex::new(Vec::new()));
    let forward = Arc::new(forward);
    let inner = Arc::new(inner);

    let (outer_log, inner_log) = (proxy_log.clone(), tunneled_log.clone());
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let (acceptor, forward, inner) = (acceptor.clone(), forward.clone(), inner.clone());
            let (outer_log, inner_log) = (outer_log.clone(), inner_log.clone());
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let is_connect = request.request_line.starts_with("CONNECT ");
                let reply = (!is_connect).then(|| forward(&request));
                outer_log.lock().unwrap().push(request);

                if let Some(reply) = reply {
                    let _ = socket.write_all(&reply).await;
                    let _ = socket.shutdown().await;
                    return;
                }

                if socket
                    .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                    .await
                    .is_err()
                {
                    return;
                }
                let Ok(mut tls) = acceptor.accept(socket).await else {
                    return;
                };
                if let Some(request) = read_request(&mut tls).await {
                    let reply = inner(&request);
                    inner_log.lock().unwrap().push(request);
                    let _ = tls.write_all(&reply).await;
                    let _ = tls.shutdown().await;
                }
            });
        }
    });

    TunnelProxy {
        addr,
        proxy_log,
        tunneled_log,
    }
}
