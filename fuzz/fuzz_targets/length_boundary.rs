//! Fuzz target for the 8-digit length field
//!
//! # Strategy
//!
//! - Length field: valid digits, digits with a sign or space, non-ASCII
//! - Announced length: zero, exact, one short, one over, maximum
//!
//! # Invariants
//!
//! - A frame decodes iff the field is 8 ASCII digits and the payload is at
//!   least as long as announced
//! - Re-encoding a decoded frame gives back exactly the consumed bytes
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use dyguards_proto::Frame;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    field: [u8; 8],
    slack: Slack,
    payload: Vec<u8>,
}

#[derive(Debug, Arbitrary)]
enum Slack {
    Exact,
    Short,
    Long,
    Digits,
}

fuzz_target!(|input: Input| {
    let mut wire = Vec::new();
    let field = match input.slack {
        Slack::Digits => input.field,
        _ => {
            let len = match input.slack {
                Slack::Short => input.payload.len() + 1,
                Slack::Long => input.payload.len().saturating_sub(1),
                _ => input.payload.len(),
            };
            let mut digits = [b'0'; 8];
            digits.copy_from_slice(format!("{:08}", len % 100_000_000).as_bytes());
            digits
        },
    };
    wire.extend_from_slice(&field);
    wire.extend_from_slice(&input.payload);

    let well_formed = field.iter().all(u8::is_ascii_digit);
    match Frame::decode(&wire) {
        Ok(frame) => {
            assert!(well_formed);
            let mut again = Vec::new();
            frame.encode(&mut again).expect("re-encode");
            assert_eq!(&again[..], &wire[..again.len()]);
        },
        Err(_) => {
            if well_formed {
                let announced: usize = std::str::from_utf8(&field)
                    .expect("ascii digits")
                    .parse()
                    .expect("numeric");
                assert!(input.payload.len() < announced);
            }
        },
    }
});
