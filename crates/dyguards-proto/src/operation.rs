//! Allow-listed privileged operations.
//!
//! The set is closed: names outside [`Operation::ALL`] are rejected by the
//! privileged side without invoking anything.

use std::fmt;

/// A privileged operation the unprivileged side may request.
///
/// # Invariants
///
/// - Name Uniqueness: each variant has exactly one wire name and
///   [`Operation::from_name`] is the inverse of [`Operation::name`].
/// - Fixed Arity: every operation takes 0, 1 or 2 arguments, never more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Check whether a directory exists
    DirExists,
    /// Check whether a regular file exists
    FileExists,
    /// Create the StateStore directory if absent
    CreateStateStore,
    /// Rename a file
    MoveFile,
    /// Copy a file preserving mode and timestamps
    CopyFile,
    /// List the network identities stored in a StateStore
    GetListOfKnownNetworks,
    /// Overwrite the last-identity file
    UpdateLastEbssidFile,
    /// Read a text file, trimmed
    ReadFile,
    /// Send SIGSTOP to the controlled process
    SuspendProcess,
    /// Send SIGCONT to the controlled process
    ResumeProcess,
    /// Run the controlled process's start command
    StartProcess,
    /// Run the controlled process's stop command
    StopProcess,
}

impl Operation {
    /// Largest arity of any operation.
    pub const MAX_ARITY: usize = 2;

    /// Every operation, in table order.
    pub const ALL: [Self; 12] = [
        Self::DirExists,
        Self::FileExists,
        Self::CreateStateStore,
        Self::MoveFile,
        Self::CopyFile,
        Self::GetListOfKnownNetworks,
        Self::UpdateLastEbssidFile,
        Self::ReadFile,
        Self::SuspendProcess,
        Self::ResumeProcess,
        Self::StartProcess,
        Self::StopProcess,
    ];

    /// Wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DirExists => "dir_exists",
            Self::FileExists => "file_exists",
            Self::CreateStateStore => "create_state_store",
            Self::MoveFile => "move_file",
            Self::CopyFile => "copy_file",
            Self::GetListOfKnownNetworks => "get_list_of_known_networks",
            Self::UpdateLastEbssidFile => "update_last_ebssid_file",
            Self::ReadFile => "read_file",
            Self::SuspendProcess => "suspend_process",
            Self::ResumeProcess => "resume_process",
            Self::StartProcess => "start_process",
            Self::StopProcess => "stop_process",
        }
    }

    /// Number of arguments the operation takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::MoveFile | Self::CopyFile | Self::UpdateLastEbssidFile => 2,
            Self::DirExists
            | Self::FileExists
            | Self::CreateStateStore
            | Self::GetListOfKnownNetworks
            | Self::ReadFile
            | Self::SuspendProcess
            | Self::ResumeProcess
            | Self::StartProcess
            | Self::StopProcess => 1,
        }
    }

    /// Look up an operation by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Whether the operation can change filesystem or process state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(
            self,
            Self::DirExists | Self::FileExists | Self::GetListOfKnownNetworks | Self::ReadFile
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
    }

    #[test]
    fn unknown_names_are_not_found() {
        assert_eq!(Operation::from_name("rm_rf"), None);
        assert_eq!(Operation::from_name(""), None);
        assert_eq!(Operation::from_name("MOVE_FILE"), None);
    }

    #[test]
    fn arity_never_exceeds_max() {
        assert!(Operation::ALL.iter().all(|op| op.arity() <= Operation::MAX_ARITY));
        assert_eq!(Operation::MoveFile.arity(), 2);
        assert_eq!(Operation::ReadFile.arity(), 1);
    }
}
