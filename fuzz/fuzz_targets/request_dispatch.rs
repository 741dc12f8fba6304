//! Fuzz target for request validation and dispatch
//!
//! Arbitrary envelopes are pushed through the operation table over the
//! in-memory recorder.
//!
//! # Invariants
//!
//! - A rejected request invokes nothing
//! - An accepted request invokes exactly its own operation, once
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use dyguards_core::{OperationTable, RecordingOps};
use dyguards_proto::{Operation, Request, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Arg {
    Bool(bool),
    Int(i64),
    Text(String),
}

#[derive(Debug, Arbitrary)]
struct Input {
    known_name: Option<u8>,
    raw_name: String,
    argument_count: u32,
    arguments: Vec<Arg>,
}

fuzz_target!(|input: Input| {
    let operation = match input.known_name {
        Some(i) => Operation::ALL[usize::from(i) % Operation::ALL.len()].name().to_string(),
        None => input.raw_name,
    };
    let arguments = input
        .arguments
        .into_iter()
        .map(|arg| match arg {
            Arg::Bool(b) => Value::Bool(b),
            Arg::Int(i) => Value::Int(i),
            Arg::Text(s) => Value::Text(s),
        })
        .collect();
    let request = Request { operation, argument_count: input.argument_count, arguments };

    let mut table = OperationTable::new(RecordingOps::new());
    let response = table.handle(&request);
    let calls = table.ops().calls();

    if response.is_rejection() {
        assert!(calls.is_empty());
    } else {
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation().name(), request.operation);
    }
});
