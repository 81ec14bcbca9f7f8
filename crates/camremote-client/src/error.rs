//! Error types for client operations.
//!
//! Transport failures during an RPC call never show up here: they are folded
//! into the returned [`RpcResult`](camremote_protocol::RpcResult). A
//! [`ClientError`] means the call could not even be attempted (bad
//! configuration, unsupported method) or that a non-RPC operation such as
//! fetching the device description failed.

use camremote_protocol::{ProtocolError, RpcError};
use thiserror::Error;

use crate::transport::TransportError;

/// A specialized Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to a camera.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing endpoint, invalid settings, or no runtime to run on.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The device did not advertise this method; no request was sent.
    #[error("API method '{method}' is not available/supported on the remote device")]
    UnsupportedMethod { method: String },

    /// The device description document could not be used.
    #[error("invalid device description: {message}")]
    Descriptor { message: String },

    /// A non-RPC request (descriptor fetch, stream open) failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device answered with an error where a value was required.
    #[error("device returned {0}")]
    Protocol(#[from] RpcError),

    /// A request body could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(#[from] ProtocolError),

    /// IO error (reading configuration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a capability error for a method the device does not offer.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Creates a descriptor error.
    pub fn descriptor(message: impl Into<String>) -> Self {
        Self::Descriptor {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised locally, before any request.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::UnsupportedMethod { .. }
        )
    }
}
