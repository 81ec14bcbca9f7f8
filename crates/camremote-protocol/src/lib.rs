//! Envelope codec and result types for the camera remote API.
//!
//! The camera speaks a JSON-RPC-like protocol over HTTP POST. This crate
//! holds the pieces that do not touch the network:
//!
//! - [`Value`]: a dynamically shaped JSON tree with ordered maps
//! - [`encode_request`]: renders a request body
//! - [`decode_response`]: turns raw response bytes into an [`RpcResult`]
//!   using a caller-chosen [`DecodeStrategy`]
//!
//! # Envelope Structure
//!
//! Requests carry `method`, `params`, `id` and `version`. Responses carry
//! `id`, an optional `error` and an optional `result` array.
//!
//! # Example
//!
//! ```rust
//! use camremote_protocol::{decode_response, encode_request, DecodeStrategy, Params};
//!
//! let body = encode_request("getVersions", &Params::none(), 1, "1.0").unwrap();
//! assert!(body.contains("\"getVersions\""));
//!
//! let result = decode_response(br#"{"result":[["1.0","1.1"]],"id":1}"#, DecodeStrategy::FlatArray);
//! assert_eq!(result.strings(), vec!["1.0", "1.1"]);
//! ```

mod envelope;
mod error;
mod result;
mod value;

pub use envelope::{Params, decode_response, encode_request, parse_envelope};
pub use error::{ProtocolError, ProtocolResult};
pub use result::{DecodeStrategy, Payload, RpcError, RpcResult};
pub use value::Value;

/// Protocol version used until the device reports the ones it supports.
pub const DEFAULT_VERSION: &str = "1.0";

/// Error code reserved for results synthesized from transport failures.
pub const TRANSPORT_ERROR_CODE: i32 = 999;
