//! Request execution state machine.
//!
//! # States
//! ```text
//! Idle → Connecting → HeadersPending → Redirecting   (location + budget)
//!                                    → BodyStreaming → Completed
//! any state → Failed (transport error, closed before response, timeout, decode error)
//! ```
//!
//! # Event Sources
//! - exchange task: connect, send, await headers, stream the body
//! - connection driver task: hyper's HTTP/1.1 connection future
//! - timer task: armed when the attempt starts, bounds the whole attempt
//!
//! All three report through one `Settlement`. The first report is the
//! attempt's outcome; settling aborts the remaining tasks, which tears down
//! the socket. A panic in the exchange task (caller hooks run there) settles
//! the attempt with a connection error.
//!
//! Spawned tasks inherit the caller's span, so every event of an attempt
//! carries its `attempt_id`.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_LENGTH};
use http::{Method, Request, StatusCode};
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tracing::Instrument;
use url::{Position, Url};

use crate::engine::redirect::redirect_target;
use crate::engine::settle::{AbortOnDrop, Settlement};
use crate::error::{Error, Result};
use crate::http::decoder::{BodyDecoder, ContentCoding};
use crate::http::request::{redacted, Hooks, RequestSpec};
use crate::http::response::{RequestHead, Response};
use crate::net::connection::{connect_with, dial, BoxedIo, Connect, Connection, SocketInfo, Target};
use crate::net::tls::TlsSettings;
use crate::net::tunnel;

static ATTEMPT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for one attempt, logged as `attempt-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    pub fn new() -> Self {
        Self(ATTEMPT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// How an attempt reaches its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    /// Plain forwarding: absolute-form request sent to the proxy.
    Forward(Target),
    /// CONNECT through the proxy, then TLS to the destination.
    Tunnel(Url),
}

/// Everything one attempt needs, derived fresh from the spec.
#[derive(Debug)]
pub struct ConnectionConfig {
    pub destination: Target,
    pub route: Route,
    pub method: Method,
    /// Request target: absolute URL when forwarding, else path and query.
    pub path: String,
    pub url: Url,
    pub headers: HeaderMap,
    pub payload: Option<Bytes>,
    pub redirects_remaining: u32,
    pub timeout: Option<Duration>,
    /// Decode `content-encoding`; when off the body passes through untouched.
    pub compression: bool,
    pub hooks: Hooks,
}

impl ConnectionConfig {
    pub fn from_spec(spec: &RequestSpec) -> Result<Self> {
        let destination = Target::from_url(&spec.url)?;
        let route = match &spec.proxy {
            Some(proxy) if spec.uses_tunnel() => Route::Tunnel(proxy.clone()),
            Some(proxy) => Route::Forward(Target::from_url(proxy)?),
            None => Route::Direct,
        };

        let path = match route {
            Route::Forward(_) => {
                let mut absolute = spec.url.clone();
                absolute.set_fragment(None);
                let _ = absolute.set_username("");
                let _ = absolute.set_password(None);
                absolute.to_string()
            }
            _ => spec.url[Position::BeforePath..Position::AfterQuery].to_string(),
        };

        Ok(Self {
            destination,
            route,
            method: spec.method.clone(),
            path,
            url: spec.url.clone(),
            headers: spec.headers.clone(),
            payload: spec.payload.as_ref().map(|p| p.to_bytes()),
            redirects_remaining: spec.redirects_remaining,
            timeout: spec.timeout,
            compression: spec.compression,
            hooks: spec.hooks.clone(),
        })
    }
}

/// Result of a settled attempt.
#[derive(Debug)]
pub enum Step {
    Complete(Response),
    Redirect { status: StatusCode, location: Url },
}

type AttemptSettlement = Settlement<Result<Step>>;

/// Run one attempt to settlement.
pub async fn execute(config: ConnectionConfig, tls: Arc<TlsSettings>) -> Result<Step> {
    let (settlement, outcome) = Settlement::new();
    let _guard = AbortOnDrop(settlement.clone());
    let span = tracing::Span::current();

    if let Some(timeout) = config.timeout {
        let timer = tokio::spawn(
            expire(
                settlement.clone(),
                timeout,
                config.method.to_string(),
                redacted(&config.url).to_string(),
            )
            .instrument(span.clone()),
        );
        settlement.track(timer.abort_handle());
    }

    let exchange_task = tokio::spawn(run(config, tls, settlement.clone()).instrument(span));
    settlement.track(exchange_task.abort_handle());

    outcome.await.unwrap_or_else(|_| {
        Err(Error::connection(io::Error::new(
            io::ErrorKind::Other,
            "attempt ended without an outcome",
        )))
    })
}

async fn expire(settlement: Arc<AttemptSettlement>, timeout: Duration, method: String, url: String) {
    tokio::time::sleep(timeout).await;
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    tracing::debug!(timeout_ms, method = %method, url = %url, "Attempt timed out");
    let err = Error::Timeout {
        timeout_ms,
        method,
        url,
    };
    settlement.settle(Err(err));
}

async fn run(config: ConnectionConfig, tls: Arc<TlsSettings>, settlement: Arc<AttemptSettlement>) {
    let outcome = AssertUnwindSafe(exchange(config, &tls, &settlement))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic_message(&*panic);
            tracing::debug!(panic = message, "Exchange task panicked");
            Err(Error::connection(io::Error::other(format!(
                "request task panicked: {}",
                message
            ))))
        });
    if !settlement.settle(outcome) {
        tracing::trace!("Attempt already settled, discarding exchange outcome");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

async fn exchange(config: ConnectionConfig, tls: &TlsSettings, settlement: &Arc<AttemptSettlement>) -> Result<Step> {
    let ConnectionConfig {
        destination,
        route,
        method,
        path,
        url,
        mut headers,
        payload,
        redirects_remaining,
        compression,
        hooks,
        ..
    } = config;

    let connection = connect(&route, &destination, tls, hooks.connector.as_deref()).await?;
    let connection_id = connection.id;
    if let Some(hook) = &hooks.on_socket {
        hook(&connection.info);
    }
    tracing::debug!(
        connection_id = %connection_id,
        method = %method,
        url = %redacted(&url),
        tunneled = connection.info.tunneled,
        "Connection available"
    );

    let (mut sender, driver) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(connection.io))
        .await
        .map_err(Error::connection)?;
    let responded = Arc::new(AtomicBool::new(false));
    let driver_task = tokio::spawn(drive(
        driver,
        responded.clone(),
        settlement.clone(),
        method.clone(),
        url.clone(),
    ));
    settlement.track(driver_task.abort_handle());

    let body = payload.unwrap_or_default();
    if !body.is_empty() && !headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }
    let mut request = Request::builder()
        .method(method.clone())
        .uri(path.as_str())
        .body(Full::new(body))
        .map_err(|e| Error::invalid(format!("invalid request target '{}': {}", path, e)))?;
    *request.headers_mut() = headers;

    let (parts, body) = request.into_parts();
    if let Some(hook) = &hooks.on_request {
        hook(&parts);
    }
    let sent = RequestHead::from_parts(&parts);

    let response = sender
        .send_request(Request::from_parts(parts, body))
        .await
        .map_err(|e| before_response(e, &method, &url))?;
    responded.store(true, Ordering::Release);

    let status = response.status();
    tracing::debug!(connection_id = %connection_id, status = status.as_u16(), "Response headers received");

    if let Some(location) = redirect_target(&url, status, response.headers(), redirects_remaining) {
        return Ok(Step::Redirect { status, location });
    }

    let (head, mut incoming) = response.into_parts();
    let coding = if compression {
        ContentCoding::from_headers(&head.headers)
    } else {
        ContentCoding::Identity
    };
    let mut decoder = BodyDecoder::new(coding, hooks.on_chunk.clone());
    while let Some(frame) = incoming.frame().await {
        let frame = frame.map_err(Error::connection)?;
        if let Ok(data) = frame.into_data() {
            decoder.push(&data)?;
        }
    }
    let body = decoder.finish()?;

    tracing::debug!(connection_id = %connection_id, body_len = body.len(), "Response body complete");

    Ok(Step::Complete(Response {
        request: sent,
        head,
        body,
        url,
        redirections: Vec::new(),
    }))
}

async fn connect(
    route: &Route,
    destination: &Target,
    tls: &TlsSettings,
    connector: Option<&dyn Connect>,
) -> Result<Connection> {
    match route {
        Route::Tunnel(proxy) => {
            let tunnel = tunnel::negotiate(proxy, destination, tls).await?;
            let io = tls.handshake(&destination.host, tunnel.io).await?;
            Ok(Connection {
                id: tunnel.id,
                io,
                info: SocketInfo {
                    secure: true,
                    ..tunnel.info
                },
            })
        }
        Route::Forward(proxy) => match connector {
            Some(connector) => connect_with(connector, proxy).await,
            None => dial(proxy, tls).await,
        },
        Route::Direct => match connector {
            Some(connector) => connect_with(connector, destination).await,
            None => dial(destination, tls).await,
        },
    }
}

/// Drive the HTTP/1.1 connection; report failures seen before any response.
async fn drive(
    driver: http1::Connection<TokioIo<BoxedIo>, Full<Bytes>>,
    responded: Arc<AtomicBool>,
    settlement: Arc<AttemptSettlement>,
    method: Method,
    url: Url,
) {
    let Err(err) = driver.await else {
        return;
    };
    if responded.load(Ordering::Acquire) {
        tracing::trace!(error = %err, "Connection error after response headers");
        return;
    }
    if !settlement.settle(Err(before_response(err, &method, &url))) {
        tracing::trace!("Attempt already settled, discarding connection error");
    }
}

fn before_response(err: hyper::Error, method: &Method, url: &Url) -> Error {
    if err.is_incomplete_message() || err.is_canceled() || err.is_closed() {
        Error::ConnectionClosed {
            method: method.to_string(),
            url: redacted(url).to_string(),
        }
    } else {
        Error::connection(err)
    }
}
