//! Decoded RPC results.
//!
//! Every call returns an [`RpcResult`], whether the device answered with a
//! payload, answered with an error, or could not be reached at all. The shape
//! of the payload is chosen by the caller through a [`DecodeStrategy`].

use std::fmt;

use crate::TRANSPORT_ERROR_CODE;
use crate::value::Value;

/// How the `result` member of a response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStrategy {
    /// `[x]` yields `x`; empty or absent yields `Null`.
    Scalar,
    /// `[x0, x1, ...]` yields the sequence.
    FlatArray,
    /// `[{...}]` yields the first element, walked recursively.
    FirstElement,
    /// The payload is ignored; only `id` and `error` matter.
    NoValue,
}

impl DecodeStrategy {
    /// Returns a human-readable name for this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::FlatArray => "flat_array",
            Self::FirstElement => "first_element",
            Self::NoValue => "no_value",
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error reported by the device, or synthesized for a failed transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    /// Numeric code. Zero when the device sent only a message.
    pub code: i32,
    /// Error text.
    pub text: String,
}

impl RpcError {
    /// Creates a new error.
    pub fn new(code: i32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Returns true if this error was synthesized for a transport failure.
    pub fn is_transport(&self) -> bool {
        self.code == TRANSPORT_ERROR_CODE
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.text)
    }
}

impl std::error::Error for RpcError {}

/// The decoded payload of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Nothing decoded ([`DecodeStrategy::NoValue`] or a transport failure).
    None,
    /// A single value.
    Scalar(Value),
    /// A flat sequence of values.
    FlatArray(Vec<Value>),
    /// The first element of the result array, with its nesting intact.
    FirstElement(Value),
}

/// A decoded response. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResult {
    id: String,
    error: Option<RpcError>,
    payload: Payload,
}

static NULL: Value = Value::Null;

impl RpcResult {
    /// Creates a result from its parts.
    pub fn new(id: impl Into<String>, error: Option<RpcError>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            error,
            payload,
        }
    }

    /// Creates a result with no error and no payload.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, None, Payload::None)
    }

    /// Creates the result reported when the request never got a usable
    /// answer: connection refused, timeout, non-2xx status or unreadable
    /// body.
    pub fn transport_failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            Some(RpcError::new(TRANSPORT_ERROR_CODE, message)),
            Payload::None,
        )
    }

    /// Returns the call id, as sent back by the device.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true if the device (or the transport) reported an error.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the error, if any.
    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// Returns the error code, or zero when there is no error.
    pub fn error_code(&self) -> i32 {
        self.error.as_ref().map_or(0, |e| e.code)
    }

    /// Returns the error text, if any.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.text.as_str())
    }

    /// Returns true if this result stands for a transport failure.
    pub fn is_transport_failure(&self) -> bool {
        self.error.as_ref().is_some_and(RpcError::is_transport)
    }

    /// Returns the decoded payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the single value of a scalar or first-element payload.
    ///
    /// Other payload kinds yield `Null`.
    pub fn value(&self) -> &Value {
        match &self.payload {
            Payload::Scalar(v) | Payload::FirstElement(v) => v,
            _ => &NULL,
        }
    }

    /// Returns the elements of a flat-array payload; empty for other kinds.
    pub fn values(&self) -> &[Value] {
        match &self.payload {
            Payload::FlatArray(items) => items,
            _ => &[],
        }
    }

    /// Returns the scalar value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        self.value().as_str()
    }

    /// Returns the string elements of a flat-array payload.
    ///
    /// Non-string elements are skipped.
    pub fn strings(&self) -> Vec<&str> {
        self.values().iter().filter_map(Value::as_str).collect()
    }

    /// Returns the entries of a map-shaped value.
    pub fn map(&self) -> Option<&[(String, Value)]> {
        self.value().as_map()
    }

    /// Converts into a plain `Result`, keeping the whole value on success.
    pub fn into_result(self) -> Result<RpcResult, RpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

impl fmt::Display for RpcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.error {
            return write!(f, "{}", err);
        }
        match &self.payload {
            Payload::None => Ok(()),
            Payload::Scalar(v) | Payload::FirstElement(v) => write!(f, "{}", v),
            Payload::FlatArray(items) => write!(f, "{}", Value::List(items.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failure_carries_reserved_code() {
        let result = RpcResult::transport_failure("4", "connection refused");
        assert!(result.has_error());
        assert!(result.is_transport_failure());
        assert_eq!(result.error_code(), TRANSPORT_ERROR_CODE);
        assert_eq!(result.error_text(), Some("connection refused"));
        assert_eq!(result.id(), "4");
        assert!(result.value().is_null());
    }

    #[test]
    fn accessors_follow_payload_kind() {
        let flat = RpcResult::new(
            "1",
            None,
            Payload::FlatArray(vec![Value::from("a"), Value::from(2), Value::from("b")]),
        );
        assert_eq!(flat.strings(), vec!["a", "b"]);
        assert!(flat.value().is_null());

        let scalar = RpcResult::new("1", None, Payload::Scalar(Value::from("url")));
        assert_eq!(scalar.as_str(), Some("url"));
        assert!(scalar.values().is_empty());
        assert_eq!(scalar.error_code(), 0);
    }

    #[test]
    fn display_prefers_error() {
        let result = RpcResult::new("1", Some(RpcError::new(5, "Illegal Request")), Payload::None);
        assert_eq!(result.to_string(), "Error 5: Illegal Request");

        let ok = RpcResult::new(
            "1",
            None,
            Payload::FlatArray(vec![Value::from("1.0"), Value::from("1.1")]),
        );
        assert_eq!(ok.to_string(), r#"["1.0","1.1"]"#);
    }

    #[test]
    fn into_result_splits_on_error() {
        let err = RpcResult::new("1", Some(RpcError::new(1, "Any")), Payload::None)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, 1);
        assert!(!err.is_transport());

        assert!(RpcResult::empty("2").into_result().is_ok());
    }

    #[test]
    fn strategy_names() {
        assert_eq!(DecodeStrategy::FirstElement.as_str(), "first_element");
        assert_eq!(DecodeStrategy::NoValue.to_string(), "no_value");
    }
}
