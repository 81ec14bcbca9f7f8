//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding requests or parsing envelopes.
///
/// The lenient response decoder never surfaces these to callers; it folds
/// them into an [`RpcResult`](crate::RpcResult) instead.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize or parse JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The response parsed as JSON but its top level is not an object.
    #[error("response envelope is not a JSON object (found {found})")]
    NotAnObject { found: &'static str },
}
