//! Fuzz target for Frame::decode and Frame::read_from
//!
//! Arbitrary bytes as a frame, both from a slice and from a stream. Looks for:
//! - Panics in the length field parser
//! - Overflow when the announced length is added to the header size
//! - Disagreement between slice and stream decoding
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use std::io::Cursor;

use dyguards_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let from_slice = Frame::decode(data);
    let from_stream = Frame::read_from(&mut Cursor::new(data));

    match (from_slice, from_stream) {
        (Ok(a), Ok(Some(b))) => assert_eq!(a.payload, b.payload),
        (Ok(_), Ok(None)) => panic!("slice decoded a frame the stream saw as EOF"),
        _ => {},
    }
});
