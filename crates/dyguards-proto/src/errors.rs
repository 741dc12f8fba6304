//! Protocol error types.
//!
//! Two families: framing errors ([`ProtocolError`]) are fatal to the channel,
//! while dispatch errors ([`DispatchError`]) describe a single bad request and
//! are answered with a failed response.

use std::io;

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Framing and payload encoding errors.
///
/// Any of these leaves the byte stream in an unknown position, so the channel
/// cannot be used afterwards.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Stream closed in the middle of the length field.
    #[error("length field truncated: got {actual} of {expected} bytes")]
    LengthTruncated {
        /// Bytes required for the length field
        expected: usize,
        /// Bytes actually read before end of stream
        actual: usize,
    },

    /// Length field contained something other than ASCII digits.
    #[error("invalid length field: {0:?}")]
    InvalidLength(String),

    /// Payload shorter than the length field announced.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Announced payload size
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Payload does not fit in the fixed-width length field.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Largest encodable size
        max: usize,
    },

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),

    /// Underlying stream I/O failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Reasons a request is refused before anything is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Request carried no operation name, no count and no arguments.
    #[error("unknown how to call method: empty request")]
    EmptyRequest,

    /// Payload is not a request envelope at all.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Operation name is not in the allow-list.
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    /// More arguments than any operation accepts.
    #[error("too many parameters specified: {0}")]
    TooManyArguments(usize),

    /// Declared argument count disagrees with the argument list.
    #[error("argument count {declared} does not match {actual} supplied arguments")]
    CountMismatch {
        /// `argument_count` field
        declared: usize,
        /// Length of the argument list
        actual: usize,
    },

    /// Argument count disagrees with the operation's arity.
    #[error("{operation} takes {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Operation name
        operation: &'static str,
        /// Arity from the operation table
        expected: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// Argument has the wrong type.
    #[error("{operation}: argument {index} must be {expected}")]
    InvalidArgument {
        /// Operation name
        operation: &'static str,
        /// Zero-based argument position
        index: usize,
        /// Expected value kind
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_display() {
        let err = DispatchError::ArityMismatch { operation: "move_file", expected: 2, actual: 1 };
        assert_eq!(err.to_string(), "move_file takes 2 argument(s), got 1");

        let err = DispatchError::UnknownOperation("rm_rf".to_string());
        assert_eq!(err.to_string(), "unknown operation \"rm_rf\"");
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::LengthTruncated { expected: 8, actual: 3 };
        assert_eq!(err.to_string(), "length field truncated: got 3 of 8 bytes");
    }
}
