//! Proxy CONNECT tunneling.
//!
//! # Responsibilities
//! - Open a connection to the proxy
//! - Send `CONNECT host:port` with proxy credentials from the proxy URL
//! - Hand back the raw tunnel once the proxy answers 200
//!
//! # Design Decisions
//! - hyper performs the CONNECT exchange; the upgraded I/O becomes the tunnel
//! - Any status other than 200 is a tunnel failure carrying that status
//! - TLS to the destination is layered on afterwards by the caller

use bytes::Bytes;
use http::header::{HOST, PROXY_AUTHORIZATION};
use http::{Method, Request, StatusCode};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::task::AbortHandle;
use tracing::Instrument;
use url::Url;

use crate::error::{Error, Result};
use crate::http::headers::basic_auth;
use crate::net::connection::{dial, BoxedIo, Connection, SocketInfo, Target};
use crate::net::tls::TlsSettings;

/// Stops the CONNECT connection task once negotiation returns, whatever the
/// outcome. After an upgrade the task no longer owns the socket.
struct DriverGuard(AbortHandle);

impl Drop for DriverGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Establish a CONNECT tunnel to `destination` through `proxy`.
pub async fn negotiate(proxy: &Url, destination: &Target, tls: &TlsSettings) -> Result<Connection> {
    let proxy_target = Target::from_url(proxy)?;
    let Connection { id, io, info } = dial(&proxy_target, tls).await?;

    let authority = destination.authority();
    let mut builder = Request::builder()
        .method(Method::CONNECT)
        .uri(authority.as_str())
        .header(HOST, authority.as_str());
    if let Some(credentials) = basic_auth(proxy) {
        builder = builder.header(PROXY_AUTHORIZATION, credentials);
    }
    let request = builder
        .body(Empty::<Bytes>::new())
        .map_err(|e| Error::invalid(format!("invalid CONNECT target '{}': {}", authority, e)))?;

    tracing::debug!(
        connection_id = %id,
        proxy = %proxy_target,
        destination = %authority,
        "Negotiating proxy tunnel"
    );

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .map_err(Error::connection)?;
    let driver = tokio::spawn(
        async move {
            if let Err(e) = connection.with_upgrades().await {
                tracing::trace!(error = %e, "CONNECT connection ended with an error");
            }
        }
        .in_current_span(),
    );
    let _driver = DriverGuard(driver.abort_handle());

    let response = sender.send_request(request).await.map_err(Error::connection)?;

    let status = response.status();
    if status != StatusCode::OK {
        tracing::debug!(connection_id = %id, status = status.as_u16(), "Proxy refused tunnel");
        return Err(Error::ProxyTunnel {
            status: status.as_u16(),
        });
    }

    let upgraded = hyper::upgrade::on(response).await.map_err(Error::connection)?;

    tracing::debug!(connection_id = %id, destination = %authority, "Proxy tunnel established");

    Ok(Connection {
        id,
        io: Box::new(TokioIo::new(upgraded)) as BoxedIo,
        info: SocketInfo { tunneled: true, ..info },
    })
}
