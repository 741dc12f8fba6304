//! Request dispatch through the operation table
//!
//! Malformed requests must come back as failed responses without anything
//! being invoked; well-formed ones must behave exactly like direct calls.

use std::{collections::BTreeMap, fs, path::Path};

use dyguards_core::{LocalOps, OperationTable, Privileged, RecordingOps, privileged::decode};
use dyguards_proto::{Call, Operation, Request, Value};
use proptest::prelude::*;
use tempfile::TempDir;

/// Every file under `root` with its content.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).expect("read dir") {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                files.insert(path.display().to_string(), Vec::new());
                pending.push(path);
            } else {
                files.insert(path.display().to_string(), fs::read(&path).expect("read file"));
            }
        }
    }
    files
}

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("state"), "guards").expect("write state");
    fs::create_dir(dir.path().join("store")).expect("mkdir store");
    fs::write(dir.path().join("store/last_ebssid"), "home.aa_bb").expect("write last");
    dir
}

fn text(dir: &TempDir, name: &str) -> Value {
    Value::Text(dir.path().join(name).display().to_string())
}

#[test]
fn prop_wrong_argument_count_never_invokes() {
    proptest!(|(
        operation in prop::sample::select(Operation::ALL.to_vec()),
        count in 0usize..=2,
    )| {
        prop_assume!(count != operation.arity());

        let arguments = vec![Value::Text("/tmp/x".to_string()); count];
        let request = Request {
            operation: operation.name().to_string(),
            argument_count: count as u32,
            arguments,
        };

        let mut table = OperationTable::new(RecordingOps::new());
        let response = table.handle(&request);

        prop_assert!(response.failed);
        prop_assert!(response.error_detail.is_some());
        prop_assert!(table.ops().calls().is_empty());
    });
}

#[test]
fn prop_declared_count_must_match_list() {
    proptest!(|(operation in prop::sample::select(Operation::ALL.to_vec()), declared in 0u32..=2)| {
        let arguments = vec![Value::Int(1); operation.arity()];
        prop_assume!(declared as usize != arguments.len());

        let request = Request { operation: operation.name().to_string(), argument_count: declared, arguments };
        let mut table = OperationTable::new(RecordingOps::new());

        prop_assert!(table.handle(&request).failed);
        prop_assert!(table.ops().calls().is_empty());
    });
}

#[test]
fn prop_unknown_operations_never_mutate() {
    proptest!(ProptestConfig::with_cases(64), |(name in "[a-z_]{1,24}")| {
        prop_assume!(Operation::from_name(&name).is_none());

        let dir = seeded_dir();
        let before = snapshot(dir.path());

        let request = Request {
            operation: name,
            argument_count: 2,
            arguments: vec![text(&dir, "state"), text(&dir, "stolen")],
        };
        let response = OperationTable::new(LocalOps::new()).handle(&request);

        prop_assert!(response.failed);
        prop_assert_eq!(snapshot(dir.path()), before);
    });
}

#[test]
fn too_many_arguments_is_rejected_before_lookup() {
    let request = Request {
        operation: "move_file".to_string(),
        argument_count: 3,
        arguments: vec![Value::Text("a".into()), Value::Text("b".into()), Value::Text("c".into())],
    };
    let mut table = OperationTable::new(RecordingOps::new());

    let response = table.handle(&request);
    assert!(response.failed);
    assert!(table.ops().calls().is_empty());
}

#[test]
fn wrong_argument_type_is_rejected() {
    let request = Request {
        operation: "suspend_process".to_string(),
        argument_count: 1,
        arguments: vec![Value::Text("1234".to_string())],
    };
    let mut table = OperationTable::new(RecordingOps::new());

    assert!(table.handle(&request).failed);
    assert!(table.ops().calls().is_empty());
}

#[test]
fn dispatched_results_match_direct_calls() {
    let dir = seeded_dir();
    let path = |name: &str| dir.path().join(name).display().to_string();
    let mut direct = LocalOps::new();
    let mut table = OperationTable::new(LocalOps::new());

    let state_exists = table.handle(&Call::FileExists { path: path("state") }.into_request());
    assert_eq!(
        decode::flag(Operation::FileExists, &state_exists.result),
        direct.file_exists(&path("state"))
    );

    let store = table.handle(&Call::DirExists { path: path("store") }.into_request());
    assert_eq!(decode::flag(Operation::DirExists, &store.result), direct.dir_exists(&path("store")));

    let last = table.handle(&Call::ReadFile { path: path("store/last_ebssid") }.into_request());
    assert_eq!(
        decode::optional_text(Operation::ReadFile, &last.result),
        direct.read_file(&path("store/last_ebssid"))
    );

    let missing = table.handle(&Call::ReadFile { path: path("nope") }.into_request());
    assert_eq!(decode::optional_text(Operation::ReadFile, &missing.result), Ok(None));

    let moved = table.handle(
        &Call::MoveFile { from: path("absent"), to: path("elsewhere") }.into_request(),
    );
    let direct_err = direct.move_file(&path("absent"), &path("elsewhere")).expect_err("no source");
    assert!(moved.failed);
    assert_eq!(moved.error_detail, Some(match direct_err {
        dyguards_core::PrivilegedError::Os { detail, .. } => detail,
        other => other.to_string(),
    }));
}

#[test]
fn known_networks_exclude_reserved_names() {
    let dir = seeded_dir();
    fs::write(dir.path().join("store/state.old"), "old").expect("write archive");
    fs::write(dir.path().join("store/home.aa_bb_cc_dd_ee_ff"), "home").expect("write home");
    let store = dir.path().join("store").display().to_string();

    let mut table = OperationTable::new(LocalOps::new());
    let response = table.handle(&Call::GetListOfKnownNetworks { path: store }.into_request());
    let networks = decode::networks(Operation::GetListOfKnownNetworks, &response.result)
        .expect("list of networks");

    let tokens: Vec<String> = networks.iter().map(|id| id.token()).collect();
    assert_eq!(tokens, vec!["home.aa_bb_cc_dd_ee_ff"]);
}
