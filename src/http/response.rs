//! Final outcome of a call.

use http::header::HeaderMap;
use http::{Method, StatusCode, Uri, Version};
use url::Url;

/// What was actually put on the wire for the final attempt.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub(crate) fn from_parts(parts: &http::request::Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}

/// A settled, fully decoded response.
#[derive(Debug)]
pub struct Response {
    pub(crate) request: RequestHead,
    pub(crate) head: http::response::Parts,
    pub(crate) body: String,
    pub(crate) url: Url,
    pub(crate) redirections: Vec<Url>,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// The raw response head, for advanced introspection.
    pub fn head(&self) -> &http::response::Parts {
        &self.head
    }

    /// The request head sent for the final attempt.
    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    /// Decoded body. Empty when a chunk hook consumed the stream.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// URL of the final attempt.
    pub fn final_url(&self) -> &Url {
        &self.url
    }

    /// Every redirect target followed, in order.
    pub fn redirections(&self) -> &[Url] {
        &self.redirections
    }
}
