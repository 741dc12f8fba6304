//! In-memory privileged operations for testing
//!
//! Keeps a flat map of file paths to contents, records every call in order,
//! and can be told to fail chosen operations. Used to check which privileged
//! calls the rotation engine makes without touching a real filesystem or
//! signalling real processes.

use std::collections::{BTreeMap, BTreeSet};

use dyguards_proto::{Call, Operation};

use crate::{
    NetworkIdentity, PrivilegedError, ProcessHandle,
    layout::RESERVED_NAMES,
    privileged::{PrivResult, Privileged},
};

/// Recording, fault-injecting in-memory implementation of [`Privileged`].
#[derive(Debug, Clone, Default)]
pub struct RecordingOps {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
    calls: Vec<Call>,
    failing: BTreeSet<Operation>,
}

impl RecordingOps {
    /// Empty filesystem, no faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn add_file(&mut self, path: &str, content: &str) {
        self.files.insert(path.to_string(), content.to_string());
    }

    /// Seed a directory.
    pub fn add_dir(&mut self, path: &str) {
        self.dirs.insert(path.to_string());
    }

    /// Make every later call of `operation` fail with `EIO`.
    pub fn fail_on(&mut self, operation: Operation) {
        self.failing.insert(operation);
    }

    /// Content of a file, if present.
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Calls that may change the filesystem or the controlled process.
    pub fn mutations(&self) -> Vec<&Call> {
        self.calls.iter().filter(|call| call.operation().is_mutating()).collect()
    }

    /// Calls of one operation.
    pub fn calls_of(&self, operation: Operation) -> Vec<&Call> {
        self.calls.iter().filter(|call| call.operation() == operation).collect()
    }

    fn record(&mut self, call: Call) -> PrivResult<()> {
        let operation = call.operation();
        self.calls.push(call);
        if self.failing.contains(&operation) {
            return Err(PrivilegedError::Os {
                code: 5,
                detail: format!("Input/output error: '{operation}'"),
            });
        }
        Ok(())
    }

    fn missing(path: &str) -> PrivilegedError {
        PrivilegedError::Os { code: 2, detail: format!("No such file or directory: '{path}'") }
    }
}

impl Privileged for RecordingOps {
    fn dir_exists(&mut self, path: &str) -> PrivResult<bool> {
        self.record(Call::DirExists { path: path.to_string() })?;
        Ok(self.dirs.contains(path))
    }

    fn file_exists(&mut self, path: &str) -> PrivResult<bool> {
        self.record(Call::FileExists { path: path.to_string() })?;
        Ok(self.files.contains_key(path))
    }

    fn create_state_store(&mut self, path: &str) -> PrivResult<bool> {
        self.record(Call::CreateStateStore { path: path.to_string() })?;
        if self.files.contains_key(path) {
            return Ok(false);
        }
        self.dirs.insert(path.to_string());
        Ok(true)
    }

    fn move_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        self.record(Call::MoveFile { from: from.to_string(), to: to.to_string() })?;
        let content = self.files.remove(from).ok_or_else(|| Self::missing(from))?;
        self.files.insert(to.to_string(), content);
        Ok(())
    }

    fn copy_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        self.record(Call::CopyFile { from: from.to_string(), to: to.to_string() })?;
        let content = self.files.get(from).cloned().ok_or_else(|| Self::missing(from))?;
        self.files.insert(to.to_string(), content);
        Ok(())
    }

    fn known_networks(&mut self, store: &str) -> PrivResult<Vec<NetworkIdentity>> {
        self.record(Call::GetListOfKnownNetworks { path: store.to_string() })?;
        let prefix = format!("{}/", store.trim_end_matches('/'));
        Ok(self
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|name| !name.contains('/') && !RESERVED_NAMES.contains(name))
            .filter_map(NetworkIdentity::from_token)
            .collect())
    }

    fn update_last_ebssid(&mut self, path: &str, token: &str) -> PrivResult<()> {
        self.record(Call::UpdateLastEbssidFile { path: path.to_string(), ebssid: token.to_string() })?;
        self.files.insert(path.to_string(), token.to_string());
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> PrivResult<Option<String>> {
        self.record(Call::ReadFile { path: path.to_string() })?;
        Ok(self.files.get(path).map(|content| content.trim().to_string()))
    }

    fn suspend_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        self.record(Call::SuspendProcess { pid: process.to_raw() })
    }

    fn resume_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        self.record(Call::ResumeProcess { pid: process.to_raw() })
    }

    fn start_process(&mut self, command: &str) -> PrivResult<()> {
        self.record(Call::StartProcess { command: command.to_string() })
    }

    fn stop_process(&mut self, command: &str) -> PrivResult<()> {
        self.record(Call::StopProcess { command: command.to_string() })
    }
}
