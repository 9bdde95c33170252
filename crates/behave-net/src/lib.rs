//! behave networking substrate
//!
//! Request/response types for the remote-dispatch protocol. The actual
//! transport is environment-provided through the [`Transport`] trait; this
//! crate never performs I/O itself.

mod request;
mod response;

pub use request::{
    Method, NullTransport, RecordingTransport, RemoteRequest, RequestId, Transport,
};
pub use response::RemoteResponse;

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("request target is empty")]
    EmptyTarget,

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}
