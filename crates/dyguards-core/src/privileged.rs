//! The privileged capability.
//!
//! Everything the rotation engine does to the filesystem or to the controlled
//! process goes through [`Privileged`]. Three implementations exist: in-process
//! ([`crate::LocalOps`]), across the privilege-separation channel, and an
//! in-memory recorder for tests ([`crate::RecordingOps`]).

use dyguards_proto::{Call, Operation, Response, Value};

use crate::{NetworkIdentity, PrivilegedError, ProcessHandle};

/// Result of a privileged operation.
pub type PrivResult<T> = Result<T, PrivilegedError>;

/// The fixed set of privileged operations.
///
/// Methods take `&mut self` because the channel implementation owns a pair of
/// streams and allows exactly one call in flight.
pub trait Privileged {
    /// Whether `path` is a directory.
    fn dir_exists(&mut self, path: &str) -> PrivResult<bool>;

    /// Whether `path` is a regular file.
    fn file_exists(&mut self, path: &str) -> PrivResult<bool>;

    /// Create the StateStore directory (mode 0700) if absent.
    ///
    /// Returns whether `path` is a directory afterwards.
    fn create_state_store(&mut self, path: &str) -> PrivResult<bool>;

    /// Rename `from` to `to`.
    fn move_file(&mut self, from: &str, to: &str) -> PrivResult<()>;

    /// Copy `from` onto `to`, keeping mode and timestamps.
    fn copy_file(&mut self, from: &str, to: &str) -> PrivResult<()>;

    /// Identities with a file in the StateStore, reserved names excluded.
    fn known_networks(&mut self, store: &str) -> PrivResult<Vec<NetworkIdentity>>;

    /// Overwrite the last-identity file with `token`.
    fn update_last_ebssid(&mut self, path: &str, token: &str) -> PrivResult<()>;

    /// Trimmed content of a text file, `None` if it does not exist.
    fn read_file(&mut self, path: &str) -> PrivResult<Option<String>>;

    /// SIGSTOP the process; no-op for [`ProcessHandle::NONE`].
    fn suspend_process(&mut self, process: ProcessHandle) -> PrivResult<()>;

    /// SIGCONT the process; no-op for [`ProcessHandle::NONE`].
    fn resume_process(&mut self, process: ProcessHandle) -> PrivResult<()>;

    /// Run the start command through `/bin/sh -c`.
    fn start_process(&mut self, command: &str) -> PrivResult<()>;

    /// Run the stop command through `/bin/sh -c`.
    fn stop_process(&mut self, command: &str) -> PrivResult<()>;
}

/// Run a validated call against `ops` and encode the outcome as a response.
///
/// This is the single place where typed results become wire values, so the
/// server loop and the in-process path agree on every encoding.
pub fn invoke(ops: &mut impl Privileged, call: &Call) -> Response {
    let outcome = match call {
        Call::DirExists { path } => ops.dir_exists(path).map(Value::Bool),
        Call::FileExists { path } => ops.file_exists(path).map(Value::Bool),
        Call::CreateStateStore { path } => ops.create_state_store(path).map(Value::Bool),
        Call::MoveFile { from, to } => ops.move_file(from, to).map(|()| Value::Bool(true)),
        Call::CopyFile { from, to } => ops.copy_file(from, to).map(|()| Value::Bool(true)),
        Call::GetListOfKnownNetworks { path } => ops.known_networks(path).map(encode_networks),
        Call::UpdateLastEbssidFile { path, ebssid } => {
            ops.update_last_ebssid(path, ebssid).map(|()| Value::Bool(true))
        },
        Call::ReadFile { path } => {
            ops.read_file(path).map(|content| content.map_or(Value::Bool(false), Value::Text))
        },
        Call::SuspendProcess { pid } => {
            ops.suspend_process(ProcessHandle::from_raw(*pid)).map(|()| Value::Bool(true))
        },
        Call::ResumeProcess { pid } => {
            ops.resume_process(ProcessHandle::from_raw(*pid)).map(|()| Value::Bool(true))
        },
        Call::StartProcess { command } => ops.start_process(command).map(|()| Value::Bool(true)),
        Call::StopProcess { command } => ops.stop_process(command).map(|()| Value::Bool(true)),
    };

    match outcome {
        Ok(result) => Response::success(result),
        Err(err) => err.to_response(),
    }
}

fn encode_networks(networks: Vec<NetworkIdentity>) -> Value {
    Value::List(
        networks
            .into_iter()
            .map(|id| Value::List(vec![id.essid().into(), id.bssid().into()]))
            .collect(),
    )
}

/// Decode a successful result into the type an operation promises.
///
/// Used by the channel client; failed responses are handled before this.
pub(crate) fn unexpected(operation: Operation, value: &Value) -> PrivilegedError {
    PrivilegedError::UnexpectedResult { operation, found: value.kind() }
}

/// Decoders for success payloads, shared by every remote implementation.
pub mod decode {
    use dyguards_proto::{Operation, Value};

    use super::{PrivResult, unexpected};
    use crate::NetworkIdentity;

    /// A boolean result.
    pub fn flag(operation: Operation, value: &Value) -> PrivResult<bool> {
        value.as_bool().ok_or_else(|| unexpected(operation, value))
    }

    /// A `true` acknowledgement.
    pub fn ack(operation: Operation, value: &Value) -> PrivResult<()> {
        match value.as_bool() {
            Some(true) => Ok(()),
            _ => Err(unexpected(operation, value)),
        }
    }

    /// Text, or `false` for "absent".
    pub fn optional_text(operation: Operation, value: &Value) -> PrivResult<Option<String>> {
        match value {
            Value::Text(text) => Ok(Some(text.clone())),
            Value::Bool(false) => Ok(None),
            other => Err(unexpected(operation, other)),
        }
    }

    /// List of `[essid, bssid]` pairs.
    pub fn networks(operation: Operation, value: &Value) -> PrivResult<Vec<NetworkIdentity>> {
        let items = value.as_list().ok_or_else(|| unexpected(operation, value))?;
        items
            .iter()
            .map(|item| match item.as_list() {
                Some([essid, bssid]) => match (essid.as_text(), bssid.as_text()) {
                    (Some(essid), Some(bssid)) => Ok(NetworkIdentity::new(essid, bssid)),
                    _ => Err(unexpected(operation, item)),
                },
                _ => Err(unexpected(operation, item)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingOps;

    #[test]
    fn read_file_absent_encodes_as_false() {
        let mut ops = RecordingOps::new();
        let response = invoke(&mut ops, &Call::ReadFile { path: "/nope".to_string() });

        assert!(!response.failed);
        assert_eq!(response.result, Value::Bool(false));
        assert_eq!(decode::optional_text(Operation::ReadFile, &response.result), Ok(None));
    }

    #[test]
    fn networks_encode_as_pairs() {
        let mut ops = RecordingOps::new();
        ops.add_file("/store/home.aa_bb", "");
        ops.add_file("/store/last_ebssid", "home.aa_bb");

        let response =
            invoke(&mut ops, &Call::GetListOfKnownNetworks { path: "/store".to_string() });
        let networks = decode::networks(Operation::GetListOfKnownNetworks, &response.result)
            .expect("list of pairs");

        assert_eq!(networks, vec![NetworkIdentity::new("home", "aa:bb")]);
    }

    #[test]
    fn failures_carry_detail() {
        let mut ops = RecordingOps::new();
        let response = invoke(
            &mut ops,
            &Call::MoveFile { from: "/missing".to_string(), to: "/elsewhere".to_string() },
        );

        assert!(response.failed);
        assert!(response.error_detail.is_some_and(|detail| detail.contains("/missing")));
    }

    #[test]
    fn ack_rejects_false() {
        assert!(decode::ack(Operation::MoveFile, &Value::Bool(false)).is_err());
        assert!(decode::flag(Operation::DirExists, &Value::Int(1)).is_err());
    }
}
