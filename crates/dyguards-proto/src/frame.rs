//! Length-prefixed framing.
//!
//! A `Frame` is the transport-layer unit on the privilege-separation pipes:
//! - 8 ASCII decimal digits, zero-padded, giving the payload length
//! - exactly that many payload bytes (CBOR, opaque at this layer)
//!
//! The length field is text so a frame can be inspected with `strace` or a
//! hex dump without any tooling.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes};

use crate::errors::{ProtocolError, Result};

/// Complete frame (transport layer)
///
/// Layout on the wire:
/// `[length: 8 ASCII digits] + [payload: length bytes]`
///
/// # Invariants
///
/// - Size Limit: `payload.len()` MUST NOT exceed [`Frame::MAX_PAYLOAD_SIZE`],
///   the largest value 8 decimal digits can express. Violations are rejected
///   during encoding.
///
/// - Exact Consumption: decoding reads exactly `LENGTH_SIZE + length` bytes.
///   Trailing data belongs to the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw payload bytes (already CBOR-encoded)
    pub payload: Bytes,
}

impl Frame {
    /// Width of the length field in bytes.
    pub const LENGTH_SIZE: usize = 8;

    /// Largest payload the length field can describe.
    pub const MAX_PAYLOAD_SIZE: usize = 99_999_999;

    /// Wrap an encoded payload.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into() }
    }

    /// Number of bytes this frame occupies on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::LENGTH_SIZE + self.payload.len()
    }

    /// Encode frame into buffer
    ///
    /// Writes: `[length (8 digits)] + [payload (variable)]`
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`Frame::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let length = format!("{:0width$}", self.payload.len(), width = Self::LENGTH_SIZE);
        debug_assert_eq!(length.len(), Self::LENGTH_SIZE);

        dst.put_slice(length.as_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode a frame from a buffer holding at least one complete frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::LengthTruncated` if fewer than 8 bytes are present
    /// - `ProtocolError::InvalidLength` if the length field is not decimal
    /// - `ProtocolError::FrameTruncated` if the payload is short
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(field) = bytes.get(..Self::LENGTH_SIZE) else {
            return Err(ProtocolError::LengthTruncated {
                expected: Self::LENGTH_SIZE,
                actual: bytes.len(),
            });
        };

        let payload_size = parse_length(field)?;
        let total_size = Self::LENGTH_SIZE + payload_size;

        let Some(payload) = bytes.get(Self::LENGTH_SIZE..total_size) else {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(Self::LENGTH_SIZE),
            });
        };

        Ok(Self { payload: Bytes::copy_from_slice(payload) })
    }

    /// Read one frame from a blocking stream.
    ///
    /// Returns `Ok(None)` when the stream ends before the first length byte:
    /// the peer closed its write end, which is the normal shutdown path.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::LengthTruncated` if the stream ends inside the length
    ///   field
    /// - `ProtocolError::InvalidLength` if the length field is not decimal
    /// - `ProtocolError::FrameTruncated` if the stream ends inside the payload
    /// - `ProtocolError::Io` for any other read failure
    pub fn read_from(reader: &mut impl Read) -> Result<Option<Self>> {
        let mut field = [0u8; Self::LENGTH_SIZE];
        let got = read_full(reader, &mut field)?;

        if got == 0 {
            return Ok(None);
        }
        if got < Self::LENGTH_SIZE {
            return Err(ProtocolError::LengthTruncated {
                expected: Self::LENGTH_SIZE,
                actual: got,
            });
        }

        let payload_size = parse_length(&field)?;

        // Grow as data arrives instead of trusting the announced size up front.
        let mut payload = Vec::with_capacity(payload_size.min(64 * 1024));
        reader.by_ref().take(payload_size as u64).read_to_end(&mut payload)?;

        if payload.len() < payload_size {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: payload.len(),
            });
        }

        Ok(Some(Self::new(payload)))
    }

    /// Encode and write the frame, then flush.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` from [`Frame::encode`]
    /// - `ProtocolError::Io` if the write fails (e.g. `EPIPE` after the peer
    ///   exited)
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let mut wire = Vec::with_capacity(self.encoded_len());
        self.encode(&mut wire)?;
        writer.write_all(&wire)?;
        writer.flush()?;
        Ok(())
    }
}

/// Parse the fixed-width decimal length field.
fn parse_length(field: &[u8]) -> Result<usize> {
    debug_assert_eq!(field.len(), Frame::LENGTH_SIZE);

    if !field.iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::InvalidLength(String::from_utf8_lossy(field).into_owned()));
    }

    field.iter().try_fold(0usize, |acc, digit| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(usize::from(digit - b'0')))
            .ok_or_else(|| ProtocolError::InvalidLength(String::from_utf8_lossy(field).into_owned()))
    })
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn frame_round_trip(payload in prop::collection::vec(any::<u8>(), 0..4096)) {
            let frame = Frame::new(payload);
            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("should encode");

            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame.payload, parsed.payload);
        }
    }

    #[test]
    fn length_field_is_zero_padded_decimal() {
        let mut wire = Vec::new();
        Frame::new(vec![7u8; 42]).encode(&mut wire).expect("should encode");

        assert_eq!(&wire[..8], b"00000042");
        assert_eq!(wire.len(), 50);
    }

    #[test]
    fn empty_payload_encodes_as_zero_length() {
        let mut wire = Vec::new();
        Frame::new(Vec::new()).encode(&mut wire).expect("should encode");

        assert_eq!(wire, b"00000000");
        assert_eq!(Frame::decode(&wire).expect("should decode").payload.len(), 0);
    }

    #[test]
    fn reject_oversized_payload() {
        let frame = Frame::new(vec![0u8; Frame::MAX_PAYLOAD_SIZE + 1]);
        let mut wire = Vec::new();

        let result = frame.encode(&mut wire);
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { .. })));
        assert!(wire.is_empty());
    }

    #[test]
    fn reject_non_numeric_length() {
        let result = Frame::decode(b"0000x012abc");
        assert!(matches!(result, Err(ProtocolError::InvalidLength(_))));

        let result = Frame::decode(b"+0000001a");
        assert!(matches!(result, Err(ProtocolError::InvalidLength(_))));
    }

    #[test]
    fn reject_truncated_frame() {
        let result = Frame::decode(b"00000100abc");
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTruncated { expected: 100, actual: 3 })
        ));
    }

    #[test]
    fn read_from_closed_stream_is_end_of_stream() {
        let mut stream = Cursor::new(Vec::<u8>::new());
        assert!(Frame::read_from(&mut stream).expect("clean EOF").is_none());
    }

    #[test]
    fn read_from_partial_length_is_fatal() {
        let mut stream = Cursor::new(b"0000".to_vec());
        let result = Frame::read_from(&mut stream);
        assert!(matches!(
            result,
            Err(ProtocolError::LengthTruncated { expected: 8, actual: 4 })
        ));
    }

    #[test]
    fn read_from_consumes_exactly_one_frame() {
        let mut wire = Vec::new();
        Frame::new(&b"first"[..]).encode(&mut wire).expect("should encode");
        Frame::new(&b"second"[..]).encode(&mut wire).expect("should encode");

        let mut stream = Cursor::new(wire);
        let first = Frame::read_from(&mut stream).expect("read").expect("frame");
        let second = Frame::read_from(&mut stream).expect("read").expect("frame");

        assert_eq!(&first.payload[..], b"first");
        assert_eq!(&second.payload[..], b"second");
        assert!(Frame::read_from(&mut stream).expect("clean EOF").is_none());
    }
}
