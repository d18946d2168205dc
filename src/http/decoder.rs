//! Response body decoding.
//!
//! # Responsibilities
//! - Pick identity, gzip or deflate decoding from `content-encoding`
//! - Deliver decoded chunks to a caller sink, or buffer them into one body
//! - Surface malformed compressed data as a decode failure
//!
//! # Design Decisions
//! - Decoders are flushed after every input chunk so output is never held back
//! - A stream that ends early (missing trailer) is accepted with whatever
//!   decoded cleanly; corrupt data mid-stream is an error
//! - The buffered body is decoded as UTF-8 once, at end of stream, so multi-byte
//!   characters split across chunks survive

use std::io::Write;

use flate2::write::{GzDecoder, ZlibDecoder};
use http::header::{HeaderMap, CONTENT_ENCODING};

use crate::error::{Error, Result};
use crate::http::request::ChunkHook;

/// Content coding applied by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Identity,
    Gzip,
    Deflate,
}

impl ContentCoding {
    /// Select a coding from the response headers; unknown codings pass through.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase());

        match value.as_deref() {
            Some("gzip") => ContentCoding::Gzip,
            Some("deflate") => ContentCoding::Deflate,
            _ => ContentCoding::Identity,
        }
    }
}

enum Inner {
    Identity,
    Gzip(GzDecoder<Vec<u8>>),
    Deflate(ZlibDecoder<Vec<u8>>),
}

/// Incremental body decoder for one response.
pub struct BodyDecoder {
    inner: Inner,
    sink: Option<ChunkHook>,
    buffer: Vec<u8>,
}

impl BodyDecoder {
    pub fn new(coding: ContentCoding, sink: Option<ChunkHook>) -> Self {
        let inner = match coding {
            ContentCoding::Identity => Inner::Identity,
            ContentCoding::Gzip => Inner::Gzip(GzDecoder::new(Vec::new())),
            ContentCoding::Deflate => Inner::Deflate(ZlibDecoder::new(Vec::new())),
        };
        Self {
            inner,
            sink,
            buffer: Vec::new(),
        }
    }

    /// Feed one raw chunk from the wire.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        let decoded = match &mut self.inner {
            Inner::Identity => {
                self.emit_slice(chunk);
                return Ok(());
            }
            Inner::Gzip(decoder) => {
                decoder.write_all(chunk).map_err(Error::Decode)?;
                decoder.flush().map_err(Error::Decode)?;
                std::mem::take(decoder.get_mut())
            }
            Inner::Deflate(decoder) => {
                decoder.write_all(chunk).map_err(Error::Decode)?;
                decoder.flush().map_err(Error::Decode)?;
                std::mem::take(decoder.get_mut())
            }
        };
        self.emit(decoded);
        Ok(())
    }

    /// End of stream. Returns the buffered body, empty when a sink consumed it.
    pub fn finish(mut self) -> Result<String> {
        let tail = match &mut self.inner {
            Inner::Identity => Vec::new(),
            Inner::Gzip(decoder) => {
                if let Err(e) = decoder.try_finish() {
                    tracing::debug!(error = %e, "gzip stream ended without a complete trailer");
                }
                std::mem::take(decoder.get_mut())
            }
            Inner::Deflate(decoder) => {
                if let Err(e) = decoder.try_finish() {
                    tracing::debug!(error = %e, "deflate stream ended without a complete trailer");
                }
                std::mem::take(decoder.get_mut())
            }
        };
        self.emit(tail);
        Ok(String::from_utf8_lossy(&self.buffer).into_owned())
    }

    fn emit(&mut self, decoded: Vec<u8>) {
        if decoded.is_empty() {
            return;
        }
        match &self.sink {
            Some(sink) => sink(&decoded),
            None if self.buffer.is_empty() => self.buffer = decoded,
            None => self.buffer.extend_from_slice(&decoded),
        }
    }

    fn emit_slice(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        match &self.sink {
            Some(sink) => sink(chunk),
            None => self.buffer.extend_from_slice(chunk),
        }
    }
}
