//! Request encoding and response decoding for the JSON-RPC-like envelope.
//!
//! Requests look like:
//!
//! ```text
//! {"method":"actZoom","params":["in","start"],"id":7,"version":"1.0"}
//! ```
//!
//! Responses carry an `id`, an optional `error` (`[code, text]` or `[text]`)
//! and an optional `result` array whose meaning depends on the method.

use serde::Serialize;
use serde_json::Map;
use tracing::{trace, warn};

use crate::error::{ProtocolError, ProtocolResult};
use crate::result::{DecodeStrategy, Payload, RpcError, RpcResult};
use crate::value::Value;

/// Parameters of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// Rendered as an empty `params` list.
    #[default]
    None,
    /// Rendered in order as the elements of `params`.
    Positional(Vec<Value>),
    /// Rendered as a single object inside `params`.
    Named(Vec<(String, Value)>),
}

impl Params {
    /// No parameters: `"params": []`.
    pub fn none() -> Self {
        Self::None
    }

    /// A single positional parameter.
    pub fn single(value: impl Into<Value>) -> Self {
        Self::Positional(vec![value.into()])
    }

    /// Positional parameters, rendered in iteration order.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Named parameters, rendered as one object in iteration order.
    pub fn named<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn to_wire(&self) -> Vec<Value> {
        match self {
            Self::None => Vec::new(),
            Self::Positional(values) => values.clone(),
            Self::Named(entries) => vec![Value::Map(entries.clone())],
        }
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    method: &'a str,
    params: Vec<Value>,
    id: u64,
    version: &'a str,
}

/// Encodes a request body.
///
/// # Example
///
/// ```rust
/// use camremote_protocol::{encode_request, Params};
///
/// let body = encode_request("setShootMode", &Params::single("still"), 3, "1.0").unwrap();
/// assert_eq!(
///     body,
///     r#"{"method":"setShootMode","params":["still"],"id":3,"version":"1.0"}"#
/// );
/// ```
pub fn encode_request(
    method: &str,
    params: &Params,
    id: u64,
    version: &str,
) -> ProtocolResult<String> {
    let request = WireRequest {
        method,
        params: params.to_wire(),
        id,
        version,
    };
    Ok(serde_json::to_string(&request)?)
}

/// Parses raw response bytes into the top-level JSON object.
pub fn parse_envelope(bytes: &[u8]) -> ProtocolResult<Map<String, serde_json::Value>> {
    match serde_json::from_slice::<serde_json::Value>(bytes)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ProtocolError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

/// Decodes raw response bytes with the given strategy.
///
/// This never fails. Unexpected but well-formed shapes produce a best-effort
/// or empty payload; bytes that are not JSON at all produce a transport
/// failure result carrying the parse error.
///
/// # Example
///
/// ```rust
/// use camremote_protocol::{decode_response, DecodeStrategy};
///
/// let result = decode_response(br#"{"error":[5,"Illegal Request"],"id":1}"#, DecodeStrategy::Scalar);
/// assert_eq!(result.error_code(), 5);
/// assert_eq!(result.error_text(), Some("Illegal Request"));
/// assert_eq!(result.id(), "1");
/// ```
pub fn decode_response(bytes: &[u8], strategy: DecodeStrategy) -> RpcResult {
    let mut envelope = match parse_envelope(bytes) {
        Ok(map) => map,
        Err(ProtocolError::NotAnObject { found }) => {
            warn!(found, "response envelope is not an object");
            Map::new()
        }
        Err(e) => {
            warn!(error = %e, "unparseable response");
            return RpcResult::transport_failure("", e.to_string());
        }
    };

    let id = envelope.get("id").map(id_string).unwrap_or_default();
    let error = envelope.get("error").and_then(decode_error);
    let payload = decode_payload(envelope.remove("result"), strategy);

    trace!(id = %id, %strategy, has_error = error.is_some(), "decoded response");
    RpcResult::new(id, error, payload)
}

fn id_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn code_of(value: &serde_json::Value) -> i32 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

fn decode_error(error: &serde_json::Value) -> Option<RpcError> {
    match error {
        serde_json::Value::Null => None,
        serde_json::Value::Array(items) => match items.as_slice() {
            [] => None,
            // Text only: the code stays at zero, exactly as firmwares send it.
            [text] => Some(RpcError::new(0, text_of(text))),
            [code, text, ..] => Some(RpcError::new(code_of(code), text_of(text))),
        },
        other => Some(RpcError::new(0, text_of(other))),
    }
}

fn decode_payload(result: Option<serde_json::Value>, strategy: DecodeStrategy) -> Payload {
    match strategy {
        DecodeStrategy::NoValue => Payload::None,
        DecodeStrategy::Scalar => Payload::Scalar(first_or_self(result)),
        DecodeStrategy::FirstElement => Payload::FirstElement(first_or_self(result)),
        DecodeStrategy::FlatArray => Payload::FlatArray(flatten(result)),
    }
}

/// `[x, ...]` yields `x`, `[]` and absent yield `Null`, a bare non-array
/// value is taken as is.
fn first_or_self(result: Option<serde_json::Value>) -> Value {
    match result {
        None => Value::Null,
        Some(serde_json::Value::Array(items)) => {
            items.into_iter().next().map(Value::from).unwrap_or_default()
        }
        Some(other) => Value::from(other),
    }
}

/// Cameras wrap string lists in one extra array (`[["1.0","1.1"]]`); that
/// single wrapper is removed.
fn flatten(result: Option<serde_json::Value>) -> Vec<Value> {
    match result {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(mut items)) => {
            if items.len() == 1 && items[0].is_array() {
                match items.pop() {
                    Some(serde_json::Value::Array(inner)) => {
                        inner.into_iter().map(Value::from).collect()
                    }
                    _ => Vec::new(),
                }
            } else {
                items.into_iter().map(Value::from).collect()
            }
        }
        Some(other) => vec![Value::from(other)],
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TRANSPORT_ERROR_CODE;

    fn decode(raw: &str, strategy: DecodeStrategy) -> RpcResult {
        decode_response(raw.as_bytes(), strategy)
    }

    #[test]
    fn encode_positional_params() {
        let body = encode_request(
            "actZoom",
            &Params::positional(["in", "start"]),
            7,
            "1.0",
        )
        .unwrap();
        insta::assert_snapshot!(body, @r#"{"method":"actZoom","params":["in","start"],"id":7,"version":"1.0"}"#);
    }

    #[test]
    fn encode_named_params_wraps_single_object() {
        let body = encode_request(
            "setLiveviewFrameInfo",
            &Params::named([("frameInfo", true)]),
            12,
            "1.0",
        )
        .unwrap();
        insta::assert_snapshot!(body, @r#"{"method":"setLiveviewFrameInfo","params":[{"frameInfo":true}],"id":12,"version":"1.0"}"#);
    }

    #[test]
    fn encode_mixed_scalars() {
        let body = encode_request(
            "getEvent",
            &Params::positional([Value::Bool(false), Value::from(3), Value::from("a\"b")]),
            1,
            "1.2",
        )
        .unwrap();
        insta::assert_snapshot!(body, @r#"{"method":"getEvent","params":[false,3,"a\"b"],"id":1,"version":"1.2"}"#);
    }

    #[test]
    fn encode_without_params() {
        let body = encode_request("getVersions", &Params::none(), 1, "1.0").unwrap();
        assert_eq!(
            body,
            r#"{"method":"getVersions","params":[],"id":1,"version":"1.0"}"#
        );
    }

    #[test]
    fn scalar_bare_string() {
        let result = decode(
            r#"{"result":"Hello Camera Remote API","error":null,"id":1}"#,
            DecodeStrategy::Scalar,
        );
        assert_eq!(result.as_str(), Some("Hello Camera Remote API"));
        assert!(!result.has_error());
        assert_eq!(result.error_code(), 0);
        assert_eq!(result.id(), "1");
    }

    #[test]
    fn scalar_wrapped_in_array() {
        let result = decode(r#"{"result":[0],"id":3}"#, DecodeStrategy::Scalar);
        assert_eq!(result.value().as_i64(), Some(0));
        assert_eq!(result.id(), "3");
    }

    #[test]
    fn scalar_error_two_elements() {
        let result = decode(r#"{"error":[5,"Illegal Request"],"id":1}"#, DecodeStrategy::Scalar);
        assert!(result.has_error());
        assert!(result.value().is_null());
        assert_eq!(result.error_code(), 5);
        assert_eq!(result.error_text(), Some("Illegal Request"));
        assert_eq!(result.id(), "1");
    }

    #[test]
    fn error_text_only_keeps_zero_code() {
        let result = decode(r#"{"error":["Not Available Now"],"id":2}"#, DecodeStrategy::NoValue);
        assert!(result.has_error());
        assert_eq!(result.error_code(), 0);
        assert_eq!(result.error_text(), Some("Not Available Now"));
    }

    #[test]
    fn null_or_missing_error_is_no_error() {
        assert!(!decode(r#"{"result":[],"error":null,"id":1}"#, DecodeStrategy::NoValue).has_error());
        assert!(!decode(r#"{"result":[],"id":1}"#, DecodeStrategy::NoValue).has_error());
        assert!(!decode(r#"{"error":[],"id":1}"#, DecodeStrategy::NoValue).has_error());
    }

    #[test]
    fn flat_array_empty_is_not_an_error() {
        let result = decode(r#"{"result":[],"id":1}"#, DecodeStrategy::FlatArray);
        assert!(!result.has_error());
        assert_eq!(result.payload(), &Payload::FlatArray(Vec::new()));
    }

    #[test]
    fn flat_array_single_and_many() {
        let one = decode(
            r#"{"result":["Hello Camera Remote API"],"error":null,"id":1}"#,
            DecodeStrategy::FlatArray,
        );
        assert_eq!(one.strings(), vec!["Hello Camera Remote API"]);

        let two = decode(r#"{"result":["first","second"],"id":1}"#, DecodeStrategy::FlatArray);
        assert_eq!(two.strings(), vec!["first", "second"]);
    }

    #[test]
    fn flat_array_unwraps_nested_list() {
        let result = decode(
            r#"{"result":[["getVersions","getMethodTypes","startLiveview"]],"id":1}"#,
            DecodeStrategy::FlatArray,
        );
        assert_eq!(
            result.strings(),
            vec!["getVersions", "getMethodTypes", "startLiveview"]
        );
    }

    #[test]
    fn flat_array_keeps_mixed_elements_verbatim() {
        let result = decode(r#"{"result":["Smart Remote Control","2.1.4"],"id":9}"#, DecodeStrategy::FlatArray);
        assert_eq!(result.values().len(), 2);

        let result = decode(r#"{"result":[["a"],["b"]],"id":9}"#, DecodeStrategy::FlatArray);
        assert_eq!(result.values().len(), 2);
        assert!(result.values()[0].as_list().is_some());
    }

    #[test]
    fn first_element_single_entry_map() {
        let result = decode(r#"{"id":1,"result":[{"frameInfo":true}]}"#, DecodeStrategy::FirstElement);
        let map = result.map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].0, "frameInfo");
        assert_eq!(map[0].1, Value::Bool(true));
    }

    #[test]
    fn first_element_mixed_nesting() {
        let raw = r#"{"id":1,"result":[{"contShootingMode":"Spd Priority Cont.","candidate":["Single",{"key1":"val1","key2":false},"Spd Priority Cont."]}]}"#;
        let result = decode(raw, DecodeStrategy::FirstElement);

        let map = result.map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[0].0, "contShootingMode");
        assert_eq!(map[0].1.as_str(), Some("Spd Priority Cont."));
        assert_eq!(map[1].0, "candidate");

        let candidate = map[1].1.as_list().unwrap();
        assert_eq!(candidate.len(), 3);
        assert_eq!(
            candidate[1],
            Value::Map(vec![
                ("key1".to_string(), Value::from("val1")),
                ("key2".to_string(), Value::Bool(false)),
            ])
        );
        assert_eq!(result.id(), "1");
        assert!(!result.has_error());
    }

    #[test]
    fn first_element_reencodes_to_source_shape() {
        let raw = r#"{"id":1,"result":[{"a":[{"b":[1,[true,null]]},"c"],"d":{"e":{"f":"g"}}}]}"#;
        let result = decode(raw, DecodeStrategy::FirstElement);

        let source: serde_json::Value = serde_json::from_str(raw).unwrap();
        let reencoded = serde_json::to_value(result.value()).unwrap();
        assert_eq!(reencoded, source["result"][0]);

        // Decoding the re-encoded shape again gives the same tree.
        let again = Value::from(reencoded);
        assert_eq!(&again, result.value());
    }

    #[test]
    fn first_element_empty_is_null() {
        let result = decode(r#"{"result":[],"id":1}"#, DecodeStrategy::FirstElement);
        assert!(!result.has_error());
        assert_eq!(result.payload(), &Payload::FirstElement(Value::Null));
    }

    #[test]
    fn no_value_ignores_result() {
        let result = decode(r#"{"result":[0],"id":"abc"}"#, DecodeStrategy::NoValue);
        assert_eq!(result.payload(), &Payload::None);
        assert_eq!(result.id(), "abc");
    }

    #[test]
    fn non_object_envelope_degrades_to_empty() {
        let result = decode("[1,2,3]", DecodeStrategy::FlatArray);
        assert!(!result.has_error());
        assert_eq!(result.id(), "");
        assert!(result.values().is_empty());
    }

    #[test]
    fn malformed_bytes_become_transport_failure() {
        let result = decode("<html>502</html>", DecodeStrategy::Scalar);
        assert_eq!(result.error_code(), TRANSPORT_ERROR_CODE);
        assert!(result.is_transport_failure());
    }

    #[test]
    fn parse_envelope_reports_kind() {
        let err = parse_envelope(b"true").unwrap_err();
        assert!(matches!(err, ProtocolError::NotAnObject { found: "bool" }));
        assert!(matches!(
            parse_envelope(b"{").unwrap_err(),
            ProtocolError::Serialization(_)
        ));
    }
}
