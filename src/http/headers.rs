//! Header normalization.
//!
//! # Responsibilities
//! - Inject `authorization` from URL userinfo
//! - Inject `proxy-authorization` when forwarding through an authenticated proxy
//! - Inject `host`, `accept-encoding` and, for structured payloads, `content-type`
//! - Serialize structured payloads to JSON text
//!
//! # Design Decisions
//! - A header the caller already supplied is never overwritten
//! - Runs before every attempt, so a redirect only has to remove stale values
//! - Credentials never follow a redirect to another origin; derived proxy
//!   credentials are dropped on every hop and re-derived only when forwarding
//! - Never fails: values that cannot form a header are skipped

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{
    HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE, HOST, PROXY_AUTHORIZATION,
};
use url::Url;

use crate::http::request::{Payload, RequestSpec};

/// Encodings advertised when compression negotiation is enabled.
pub const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate";

/// Apply every injection rule to the spec's headers and payload.
pub fn normalize(spec: &mut RequestSpec) {
    if !spec.headers.contains_key(AUTHORIZATION) {
        if let Some(value) = basic_auth(&spec.url) {
            spec.headers.insert(AUTHORIZATION, value);
            spec.derived_authorization = true;
        }
    }

    if spec.uses_forward_proxy() && !spec.headers.contains_key(PROXY_AUTHORIZATION) {
        if let Some(value) = spec.proxy.as_ref().and_then(basic_auth) {
            spec.headers.insert(PROXY_AUTHORIZATION, value);
            spec.derived_proxy_authorization = true;
        }
    }

    if !spec.headers.contains_key(HOST) {
        if let Some(value) = host_value(&spec.url) {
            spec.headers.insert(HOST, value);
        }
    }

    if spec.compression && !spec.headers.contains_key(ACCEPT_ENCODING) {
        spec.headers
            .insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING_VALUE));
    }

    if let Some(Payload::Json(value)) = &spec.payload {
        if !spec.headers.contains_key(CONTENT_TYPE) {
            spec.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        spec.payload = Some(Payload::Text(value.to_string()));
    }
}

/// `Basic` credentials from the URL's percent-decoded userinfo, if any.
pub fn basic_auth(url: &Url) -> Option<HeaderValue> {
    if url.username().is_empty() && url.password().is_none() {
        return None;
    }
    let username = percent_decode(url.username());
    let password = url.password().map(percent_decode).unwrap_or_default();
    let encoded = STANDARD.encode(format!("{}:{}", username, password));
    HeaderValue::from_str(&format!("Basic {}", encoded)).ok()
}

/// `host` header value: hostname plus the port when it is not the scheme default.
pub fn host_value(url: &Url) -> Option<HeaderValue> {
    let host = url.host_str()?;
    let value = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).ok()
}

fn percent_decode(s: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned()
}

/// Remove headers that must not carry over to `next`.
///
/// `host` is always regenerated. `authorization` survives only a same-origin
/// hop, and only when the caller supplied it. Derived `proxy-authorization`
/// is always removed so it cannot reach a tunneled destination.
pub fn strip_for_redirect(spec: &mut RequestSpec, next: &Url) {
    spec.headers.remove(HOST);
    if spec.derived_authorization || spec.url.origin() != next.origin() {
        spec.headers.remove(AUTHORIZATION);
    }
    if spec.derived_proxy_authorization {
        spec.headers.remove(PROXY_AUTHORIZATION);
    }
    spec.derived_authorization = false;
    spec.derived_proxy_authorization = false;
}
