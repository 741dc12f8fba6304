//! Handle on the controlled external process.

use std::fmt;

use nix::unistd::Pid;

/// Pid of the controlled process, or the "no process" sentinel.
///
/// Suspend and resume against [`ProcessHandle::NONE`] are no-ops, so callers
/// never special-case an unknown pid. On the wire the sentinel is `0`; any
/// non-positive value decodes to it, which also keeps `kill(0, ..)` and
/// `kill(-1, ..)` (process group / every process) unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessHandle(Option<Pid>);

impl ProcessHandle {
    /// No process is tracked.
    pub const NONE: Self = Self(None);

    /// Handle for a raw pid; non-positive values give [`ProcessHandle::NONE`].
    pub fn from_raw(raw: i64) -> Self {
        match i32::try_from(raw) {
            Ok(pid) if pid > 0 => Self(Some(Pid::from_raw(pid))),
            _ => Self::NONE,
        }
    }

    /// Parse the content of a pid file.
    pub fn parse(content: &str) -> Option<Self> {
        let raw: i64 = content.trim().parse().ok()?;
        let handle = Self::from_raw(raw);
        handle.pid().map(|_| handle)
    }

    /// Tracked pid, if any.
    pub fn pid(self) -> Option<Pid> {
        self.0
    }

    /// Wire representation.
    pub fn to_raw(self) -> i64 {
        self.0.map_or(0, |pid| i64::from(pid.as_raw()))
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pid) => write!(f, "pid {pid}"),
            None => f.write_str("no process"),
        }
    }
}
