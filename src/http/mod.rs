//! HTTP request description and response handling.
//!
//! # Data Flow
//! ```text
//! caller (URL or RequestOptions)
//!     → request.rs (resolve against client defaults → RequestSpec)
//!     → headers.rs (inject host/auth/accept-encoding/content-type)
//!     → [engine sends the attempt]
//!     → decoder.rs (identity | gzip | deflate → body or chunk hook)
//!     → response.rs (Response with redirect chain)
//! ```

pub mod decoder;
pub mod headers;
pub mod request;
pub mod response;

pub use decoder::{BodyDecoder, ContentCoding};
pub use request::{
    parse_method, redacted, ChunkHook, Hooks, IntoRequestOptions, Payload, RequestHook, RequestOptions, RequestSpec,
    SocketHook,
};
pub use response::{RequestHead, Response};
