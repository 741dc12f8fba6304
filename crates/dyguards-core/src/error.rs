//! Error types for privileged operations and rotation.
//!
//! Privileged failures are ordinary values: they come back across the channel
//! as a failed response and are rebuilt here, never raised as a fault on the
//! privileged side.

use std::{io, path::Path, process::ExitStatus};

use dyguards_proto::{Operation, Response};
use nix::errno::Errno;
use thiserror::Error;

/// Failure of a privileged operation, as seen by its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivilegedError {
    /// The operation ran and the OS refused it.
    ///
    /// `detail` reads `"<strerror>: '<path>'"` for filesystem errors.
    #[error("{detail} (code {code})")]
    Os {
        /// errno, exit status, or -1 when neither applies
        code: i64,
        /// Human-readable description
        detail: String,
    },

    /// The privileged side refused the request without running it.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The channel itself broke (framing error, peer gone).
    #[error("channel failure: {0}")]
    Channel(String),

    /// The response carried a result of the wrong shape.
    #[error("unexpected result for {operation}: got {found}")]
    UnexpectedResult {
        /// Operation that was called
        operation: Operation,
        /// Kind of value received
        found: &'static str,
    },
}

impl PrivilegedError {
    /// Map an I/O error on `path` to `"<strerror>: '<path>'"`.
    pub fn io(err: &io::Error, path: &Path) -> Self {
        match err.raw_os_error() {
            Some(code) => Self::Os {
                code: i64::from(code),
                detail: format!("{}: '{}'", Errno::from_raw(code).desc(), path.display()),
            },
            None => Self::Os { code: -1, detail: format!("{err}: '{}'", path.display()) },
        }
    }

    /// Map a failed signal delivery.
    pub fn signal(errno: Errno, pid: i64) -> Self {
        Self::Os { code: errno as i64, detail: format!("{}: 'pid {pid}'", errno.desc()) }
    }

    /// Map a command that exited unsuccessfully.
    pub fn command(command: &str, status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Os {
                code: i64::from(code),
                detail: format!("command exited with status {code}: '{command}'"),
            },
            None => Self::Os { code: -1, detail: format!("command killed by a signal: '{command}'") },
        }
    }

    /// Rebuild the error carried by a failed response.
    pub fn from_response(response: &Response) -> Self {
        let detail = response.error_detail.clone().unwrap_or_default();
        if response.is_rejection() {
            return Self::Rejected(detail);
        }
        Self::Os { code: response.result.as_int().unwrap_or(-1), detail }
    }

    /// Encode as a failed response.
    pub fn to_response(&self) -> Response {
        match self {
            Self::Os { code, detail } => Response::failure(*code, detail.clone()),
            other => Response::failure(-1, other.to_string()),
        }
    }
}

/// Rotation aborted before completing.
///
/// Whenever one of these is returned the controlled process has already been
/// resumed or restarted.
#[derive(Error, Debug)]
pub enum RotationError {
    /// The adapter produced neither an ESSID nor a BSSID.
    #[error("no network identity")]
    NoIdentity,

    /// StateStore could not be created or is not a directory.
    #[error("state store {path} unavailable: {reason}")]
    StateStore {
        /// StateStore directory
        path: String,
        /// Why it is unusable
        reason: String,
    },

    /// Stop command failed; no file was touched.
    #[error("stop command failed: {0}")]
    StopFailed(PrivilegedError),

    /// A privileged operation failed mid-rotation.
    #[error("{operation} failed: {source}")]
    Operation {
        /// Operation that failed
        operation: Operation,
        /// Underlying failure
        source: PrivilegedError,
    },
}
