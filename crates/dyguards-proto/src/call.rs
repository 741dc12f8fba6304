//! Typed privileged calls.
//!
//! [`Call`] is the validated form of a [`Request`]: one variant per
//! [`Operation`], with the argument shapes fixed. The unprivileged side only
//! ever builds requests from a `Call`, and the privileged side only ever
//! invokes something after [`Call::from_request`] accepted the envelope.

use crate::{DispatchError, Operation, Request, Value};

/// A validated privileged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `dir_exists(path)`
    DirExists {
        /// Directory to check
        path: String,
    },
    /// `file_exists(path)`
    FileExists {
        /// File to check
        path: String,
    },
    /// `create_state_store(path)`
    CreateStateStore {
        /// StateStore directory
        path: String,
    },
    /// `move_file(from, to)`
    MoveFile {
        /// Source path
        from: String,
        /// Destination path
        to: String,
    },
    /// `copy_file(from, to)`
    CopyFile {
        /// Source path
        from: String,
        /// Destination path
        to: String,
    },
    /// `get_list_of_known_networks(path)`
    GetListOfKnownNetworks {
        /// StateStore directory
        path: String,
    },
    /// `update_last_ebssid_file(path, ebssid)`
    UpdateLastEbssidFile {
        /// Last-identity file
        path: String,
        /// Identity token to record
        ebssid: String,
    },
    /// `read_file(path)`
    ReadFile {
        /// File to read
        path: String,
    },
    /// `suspend_process(pid)`
    SuspendProcess {
        /// Target pid, non-positive for "no process"
        pid: i64,
    },
    /// `resume_process(pid)`
    ResumeProcess {
        /// Target pid, non-positive for "no process"
        pid: i64,
    },
    /// `start_process(command)`
    StartProcess {
        /// Shell command line
        command: String,
    },
    /// `stop_process(command)`
    StopProcess {
        /// Shell command line
        command: String,
    },
}

impl Call {
    /// Operation this call invokes.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::DirExists { .. } => Operation::DirExists,
            Self::FileExists { .. } => Operation::FileExists,
            Self::CreateStateStore { .. } => Operation::CreateStateStore,
            Self::MoveFile { .. } => Operation::MoveFile,
            Self::CopyFile { .. } => Operation::CopyFile,
            Self::GetListOfKnownNetworks { .. } => Operation::GetListOfKnownNetworks,
            Self::UpdateLastEbssidFile { .. } => Operation::UpdateLastEbssidFile,
            Self::ReadFile { .. } => Operation::ReadFile,
            Self::SuspendProcess { .. } => Operation::SuspendProcess,
            Self::ResumeProcess { .. } => Operation::ResumeProcess,
            Self::StartProcess { .. } => Operation::StartProcess,
            Self::StopProcess { .. } => Operation::StopProcess,
        }
    }

    /// Build the wire envelope.
    #[must_use]
    pub fn into_request(self) -> Request {
        let operation = self.operation();
        let arguments = match self {
            Self::DirExists { path }
            | Self::FileExists { path }
            | Self::CreateStateStore { path }
            | Self::GetListOfKnownNetworks { path }
            | Self::ReadFile { path } => vec![Value::Text(path)],
            Self::MoveFile { from, to } | Self::CopyFile { from, to } => {
                vec![Value::Text(from), Value::Text(to)]
            },
            Self::UpdateLastEbssidFile { path, ebssid } => {
                vec![Value::Text(path), Value::Text(ebssid)]
            },
            Self::SuspendProcess { pid } | Self::ResumeProcess { pid } => vec![Value::Int(pid)],
            Self::StartProcess { command } | Self::StopProcess { command } => {
                vec![Value::Text(command)]
            },
        };
        Request::new(operation, arguments)
    }

    /// Validate an envelope against the operation table.
    ///
    /// Checks run in a fixed order: empty request, argument count ceiling,
    /// operation name, declared count vs list length, arity, argument types.
    ///
    /// # Errors
    ///
    /// Returns the first [`DispatchError`] found. Nothing should be invoked
    /// for a rejected request.
    pub fn from_request(request: &Request) -> Result<Self, DispatchError> {
        if request.is_empty() {
            return Err(DispatchError::EmptyRequest);
        }

        let declared = request.argument_count as usize;
        if declared > Operation::MAX_ARITY || request.arguments.len() > Operation::MAX_ARITY {
            return Err(DispatchError::TooManyArguments(declared.max(request.arguments.len())));
        }

        let operation = Operation::from_name(&request.operation)
            .ok_or_else(|| DispatchError::UnknownOperation(request.operation.clone()))?;

        if declared != request.arguments.len() {
            return Err(DispatchError::CountMismatch {
                declared,
                actual: request.arguments.len(),
            });
        }

        if declared != operation.arity() {
            return Err(DispatchError::ArityMismatch {
                operation: operation.name(),
                expected: operation.arity(),
                actual: declared,
            });
        }

        let args = Arguments { operation, values: &request.arguments };

        let call = match operation {
            Operation::DirExists => Self::DirExists { path: args.text(0)? },
            Operation::FileExists => Self::FileExists { path: args.text(0)? },
            Operation::CreateStateStore => Self::CreateStateStore { path: args.text(0)? },
            Operation::MoveFile => Self::MoveFile { from: args.text(0)?, to: args.text(1)? },
            Operation::CopyFile => Self::CopyFile { from: args.text(0)?, to: args.text(1)? },
            Operation::GetListOfKnownNetworks => {
                Self::GetListOfKnownNetworks { path: args.text(0)? }
            },
            Operation::UpdateLastEbssidFile => {
                Self::UpdateLastEbssidFile { path: args.text(0)?, ebssid: args.text(1)? }
            },
            Operation::ReadFile => Self::ReadFile { path: args.text(0)? },
            Operation::SuspendProcess => Self::SuspendProcess { pid: args.int(0)? },
            Operation::ResumeProcess => Self::ResumeProcess { pid: args.int(0)? },
            Operation::StartProcess => Self::StartProcess { command: args.text(0)? },
            Operation::StopProcess => Self::StopProcess { command: args.text(0)? },
        };

        Ok(call)
    }
}

/// Positional argument accessor with typed errors.
struct Arguments<'a> {
    operation: Operation,
    values: &'a [Value],
}

impl Arguments<'_> {
    fn text(&self, index: usize) -> Result<String, DispatchError> {
        self.values
            .get(index)
            .and_then(Value::as_text)
            .map(str::to_string)
            .ok_or(DispatchError::InvalidArgument {
                operation: self.operation.name(),
                index,
                expected: "text",
            })
    }

    fn int(&self, index: usize) -> Result<i64, DispatchError> {
        self.values.get(index).and_then(Value::as_int).ok_or(DispatchError::InvalidArgument {
            operation: self.operation.name(),
            index,
            expected: "int",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(operation: &str, arguments: Vec<Value>) -> Request {
        Request { operation: operation.to_string(), argument_count: arguments.len() as u32, arguments }
    }

    #[test]
    fn call_round_trip() {
        let calls = [
            Call::MoveFile { from: "/a".to_string(), to: "/b".to_string() },
            Call::UpdateLastEbssidFile {
                path: "/store/last_ebssid".to_string(),
                ebssid: "home.aa_bb_cc_dd_ee_ff".to_string(),
            },
            Call::SuspendProcess { pid: 4242 },
            Call::StopProcess { command: "systemctl stop tor".to_string() },
        ];

        for call in calls {
            let request = call.clone().into_request();
            assert_eq!(request.operation, call.operation().name());
            assert_eq!(Call::from_request(&request), Ok(call));
        }
    }

    #[test]
    fn reject_empty_request() {
        let request = raw("", vec![]);
        assert_eq!(Call::from_request(&request), Err(DispatchError::EmptyRequest));
    }

    #[test]
    fn reject_unknown_operation() {
        let request = raw("unlink", vec![Value::from("/etc/passwd")]);
        assert_eq!(
            Call::from_request(&request),
            Err(DispatchError::UnknownOperation("unlink".to_string()))
        );
    }

    #[test]
    fn reject_wrong_arity() {
        let request = raw("move_file", vec![Value::from("/a")]);
        assert_eq!(
            Call::from_request(&request),
            Err(DispatchError::ArityMismatch { operation: "move_file", expected: 2, actual: 1 })
        );

        let request = raw("read_file", vec![]);
        assert!(matches!(Call::from_request(&request), Err(DispatchError::ArityMismatch { .. })));
    }

    #[test]
    fn reject_too_many_arguments() {
        let request = raw("copy_file", vec![Value::from("/a"), Value::from("/b"), Value::from("u")]);
        assert_eq!(Call::from_request(&request), Err(DispatchError::TooManyArguments(3)));
    }

    #[test]
    fn reject_count_that_disagrees_with_list() {
        let mut request = raw("read_file", vec![Value::from("/a")]);
        request.argument_count = 2;
        assert_eq!(
            Call::from_request(&request),
            Err(DispatchError::CountMismatch { declared: 2, actual: 1 })
        );
    }

    #[test]
    fn reject_wrong_argument_type() {
        let request = raw("suspend_process", vec![Value::from("1234")]);
        assert_eq!(
            Call::from_request(&request),
            Err(DispatchError::InvalidArgument {
                operation: "suspend_process",
                index: 0,
                expected: "int",
            })
        );
    }
}
