//! CBOR-encoded request/response envelopes.
//!
//! The envelope is deliberately generic (a name plus a list of values) so the
//! privileged side can see and reject malformed requests instead of failing
//! to deserialize them. Typed validation lives in [`crate::Call`].
//!
//! # Invariants
//!
//! A response with `failed == true` always carries `error_detail`. Decoding a
//! response that violates this is a protocol error.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    DispatchError, Frame, Operation,
    errors::{ProtocolError, Result},
};

/// Argument or result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean (also the "negative" result, e.g. file absent)
    Bool(bool),
    /// Integer (process ids, OS error codes)
    Int(i64),
    /// UTF-8 text (paths, commands, tokens)
    Text(String),
    /// Ordered list or tuple
    List(Vec<Value>),
}

impl Value {
    /// Boolean content, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Text content, if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// List content, if this is a `List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Short kind name for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Request envelope sent by the unprivileged side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Operation wire name
    pub operation: String,
    /// Declared number of arguments
    pub argument_count: u32,
    /// Positional arguments
    pub arguments: Vec<Value>,
}

impl Request {
    /// Build a well-formed request for `operation`.
    #[must_use]
    pub fn new(operation: Operation, arguments: Vec<Value>) -> Self {
        Self {
            operation: operation.name().to_string(),
            argument_count: arguments.len() as u32,
            arguments,
        }
    }

    /// Whether the request carries nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operation.is_empty() && self.argument_count == 0 && self.arguments.is_empty()
    }

    /// Encode into a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn to_frame(&self) -> Result<Frame> {
        encode_cbor(self)
    }

    /// Decode from a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if the payload is not a request
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        decode_cbor(frame)
    }
}

/// Response envelope sent by the privileged side.
///
/// The `(failed, result, error_detail)` triple every operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the operation failed or was refused
    pub failed: bool,
    /// Success payload, or the OS error code on failure
    pub result: Value,
    /// Human-readable failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Response {
    /// Successful result.
    #[must_use]
    pub fn success(result: impl Into<Value>) -> Self {
        Self { failed: false, result: result.into(), error_detail: None }
    }

    /// Operation ran and failed with an OS-level error code.
    #[must_use]
    pub fn failure(code: i64, detail: impl Into<String>) -> Self {
        Self { failed: true, result: Value::Int(code), error_detail: Some(detail.into()) }
    }

    /// Request refused before anything was invoked.
    #[must_use]
    pub fn rejected(err: &DispatchError) -> Self {
        Self { failed: true, result: Value::Bool(false), error_detail: Some(err.to_string()) }
    }

    /// Whether this is a refusal rather than an operation failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.failed && self.result == Value::Bool(false)
    }

    /// Encode into a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn to_frame(&self) -> Result<Frame> {
        encode_cbor(self)
    }

    /// Decode from a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if the payload is not a response, or is a
    ///   failed response without `error_detail`
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let response: Self = decode_cbor(frame)?;
        if response.failed && response.error_detail.is_none() {
            return Err(ProtocolError::CborDecode(
                "failed response without error_detail".to_string(),
            ));
        }
        Ok(response)
    }
}

fn encode_cbor<T: Serialize>(value: &T) -> Result<Frame> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
    Ok(Frame::new(buf))
}

fn decode_cbor<T: DeserializeOwned>(frame: &Frame) -> Result<T> {
    ciborium::de::from_reader(&frame.payload[..])
        .map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let request = Request::new(
            Operation::MoveFile,
            vec![Value::from("/var/lib/tor/state"), Value::from("/var/lib/tor/state.old")],
        );
        assert_eq!(request.argument_count, 2);

        let frame = request.to_frame().expect("should encode");
        let decoded = Request::from_frame(&frame).expect("should decode");
        assert_eq!(request, decoded);
    }

    #[test]
    fn response_round_trip() {
        let networks = Value::List(vec![Value::List(vec![
            Value::from("686F6D65"),
            Value::from("aa:bb:cc:dd:ee:ff"),
        ])]);

        for response in [
            Response::success(true),
            Response::success(networks),
            Response::failure(2, "No such file or directory: '/nope'"),
            Response::rejected(&DispatchError::EmptyRequest),
        ] {
            let frame = response.to_frame().expect("should encode");
            let decoded = Response::from_frame(&frame).expect("should decode");
            assert_eq!(response, decoded);
        }
    }

    #[test]
    fn failed_response_requires_detail() {
        let bogus = Response { failed: true, result: Value::Int(1), error_detail: None };
        let frame = encode_cbor(&bogus).expect("should encode");

        assert!(matches!(Response::from_frame(&frame), Err(ProtocolError::CborDecode(_))));
    }

    #[test]
    fn request_payload_is_not_a_response() {
        let frame = Request::new(Operation::ReadFile, vec![Value::from("/etc/hostname")])
            .to_frame()
            .expect("should encode");

        assert!(Response::from_frame(&frame).is_err());
    }

    #[test]
    fn rejection_is_distinguishable_from_failure() {
        assert!(Response::rejected(&DispatchError::EmptyRequest).is_rejection());
        assert!(!Response::failure(13, "Permission denied: '/root'").is_rejection());
        assert!(!Response::success(false).is_rejection());
    }
}
