//! State rotation engine.
//!
//! Decides, from three observable facts, what to do with the canonical state
//! file when the host attaches to a network:
//!
//! | case | state file | previous identity | same network | action |
//! |------|-----------|-------------------|--------------|--------|
//! | 1 | no  | no  | - | record current as last |
//! | 2 | no  | yes | no  | restore previous identity's file, record current |
//! | 3 | no  | yes | yes | nothing |
//! | 4 | yes | no  | - | archive to `state.old`, record current |
//! | 5 | yes | yes | no  | file state under previous identity, restore current's, record current |
//! | 6 | yes | yes | yes | copy state onto current identity's file |
//!
//! Every filesystem or process action goes through [`Privileged`], so the
//! engine runs unchanged on either side of the privilege-separation channel.
//!
//! # Invariants
//!
//! - The controlled process is running again whenever a run ends: resumed in
//!   cases 3 and 6 and on every early exit, restarted after cases 1, 2, 4, 5.
//! - No file is touched unless the stop command succeeded (cases 1, 2, 4, 5).

use dyguards_proto::Operation;
use tracing::{debug, error, info, warn};

use crate::{
    DeviceLists, NetworkIdentity, PrivilegedError, ProcessHandle, RotationError,
    config::Commands, layout::StateLayout, manager::NetworkManager, privileged::Privileged,
};

/// One of the six rotation cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationCase {
    /// No state file, no previous identity.
    FirstRun,
    /// No state file, previous identity differs.
    RestorePrevious,
    /// No state file, same identity as last time.
    Unchanged,
    /// State file of unknown origin.
    ArchiveOrphan,
    /// State file belongs to a different, previous identity.
    SwitchNetwork,
    /// State file belongs to the current identity.
    Snapshot,
}

impl RotationCase {
    /// Pick the case for the observed facts.
    pub fn classify(
        state_exists: bool,
        previous: Option<&NetworkIdentity>,
        current: &NetworkIdentity,
    ) -> Self {
        let same = previous.map(|previous| previous.token() == current.token());
        match (state_exists, same) {
            (false, None) => Self::FirstRun,
            (false, Some(false)) => Self::RestorePrevious,
            (false, Some(true)) => Self::Unchanged,
            (true, None) => Self::ArchiveOrphan,
            (true, Some(false)) => Self::SwitchNetwork,
            (true, Some(true)) => Self::Snapshot,
        }
    }

    /// Case number, 1 to 6.
    pub const fn number(self) -> u8 {
        match self {
            Self::FirstRun => 1,
            Self::RestorePrevious => 2,
            Self::Unchanged => 3,
            Self::ArchiveOrphan => 4,
            Self::SwitchNetwork => 5,
            Self::Snapshot => 6,
        }
    }

    /// Whether the process must be stopped around the file operations.
    pub const fn is_disruptive(self) -> bool {
        !matches!(self, Self::Unchanged | Self::Snapshot)
    }
}

/// Why a run ended without rotating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The network manager adapter declined the event.
    ManagerDeclined,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Nothing was attempted.
    Skipped(SkipReason),
    /// A case was applied for `identity`.
    Rotated {
        /// Applied case
        case: RotationCase,
        /// Identity the state now belongs to
        identity: NetworkIdentity,
    },
}

/// Read the controlled process's pid file.
///
/// A missing, unreadable or malformed pid file yields [`ProcessHandle::NONE`].
pub fn read_pid_file(ops: &mut impl Privileged, pid_file: Option<&str>) -> ProcessHandle {
    let Some(path) = pid_file else {
        return ProcessHandle::NONE;
    };

    match ops.read_file(path) {
        Ok(Some(content)) => ProcessHandle::parse(&content).unwrap_or_else(|| {
            warn!(path, %content, "malformed pid file");
            ProcessHandle::NONE
        }),
        Ok(None) => {
            info!(path, "pid file not found, not suspending");
            ProcessHandle::NONE
        },
        Err(err) => {
            warn!(path, %err, "cannot read pid file");
            ProcessHandle::NONE
        },
    }
}

/// Runs the rotation protocol against one [`Privileged`] implementation.
pub struct Rotator<'a, P> {
    ops: &'a mut P,
    layout: &'a StateLayout,
    commands: &'a Commands,
    process: ProcessHandle,
}

impl<'a, P: Privileged> Rotator<'a, P> {
    /// Rotator for `layout`, controlling the process through `commands`.
    pub fn new(ops: &'a mut P, layout: &'a StateLayout, commands: &'a Commands) -> Self {
        Self { ops, layout, commands, process: ProcessHandle::NONE }
    }

    /// Suspend and resume this process around the run.
    #[must_use]
    pub fn with_process(mut self, process: ProcessHandle) -> Self {
        self.process = process;
        self
    }

    /// Full protocol: suspend, consult the adapter, rotate.
    ///
    /// `devices` is only called when the adapter needs device lists.
    pub fn run(
        &mut self,
        manager: &mut dyn NetworkManager,
        devices: impl FnOnce() -> DeviceLists,
    ) -> Result<RotationOutcome, RotationError> {
        if let Err(err) = self.ops.suspend_process(self.process) {
            warn!(process = %self.process, %err, "cannot suspend process");
        }

        if manager.needs_device_enumeration() {
            manager.assign_device_lists(devices());
        }

        if !manager.should_continue() {
            info!("network manager declined, nothing to do");
            self.resume();
            return Ok(RotationOutcome::Skipped(SkipReason::ManagerDeclined));
        }

        let identity = manager.network_identity();
        self.rotate(identity)
    }

    /// Rotate for `identity`. The process is expected to be suspended already.
    pub fn rotate(&mut self, identity: NetworkIdentity) -> Result<RotationOutcome, RotationError> {
        if identity.is_unknown() {
            error!("no network identity, not rotating");
            self.resume();
            return Err(RotationError::NoIdentity);
        }

        self.ensure_state_store()?;
        let current = self.resolve_known(identity);
        info!(essid = current.essid(), bssid = current.bssid(), "current network");

        let previous = self.previous_identity().inspect_err(|_| self.resume())?;
        let state_path = self.layout.state_path();
        let state_exists = self
            .ops
            .file_exists(&state_path)
            .map_err(|source| RotationError::Operation { operation: Operation::FileExists, source })
            .inspect_err(|_| self.resume())?;

        let case = RotationCase::classify(state_exists, previous.as_ref(), &current);
        info!(
            case = case.number(),
            ?case,
            state_exists,
            previous = ?previous.as_ref().map(NetworkIdentity::token),
            "selected rotation case"
        );

        if case.is_disruptive() {
            self.disruptive(case, previous.as_ref(), &current)?;
        } else {
            self.resume();
            if case == RotationCase::Snapshot {
                let target = self.layout.identity_path(&current);
                self.step(Operation::CopyFile, |ops| ops.copy_file(&state_path, &target))?;
            }
        }

        Ok(RotationOutcome::Rotated { case, identity: current })
    }

    fn ensure_state_store(&mut self) -> Result<(), RotationError> {
        let store = self.layout.store_path();
        let reason = match self.ops.create_state_store(&store) {
            Ok(true) => return Ok(()),
            Ok(false) => "not a directory".to_string(),
            Err(err) => err.to_string(),
        };

        error!(%store, %reason, "state store unavailable");
        self.resume();
        Err(RotationError::StateStore { path: store, reason })
    }

    /// Fill in `<unknown>` halves for networks the StateStore has not seen.
    fn resolve_known(&mut self, identity: NetworkIdentity) -> NetworkIdentity {
        let known = match self.ops.known_networks(&self.layout.store_path()) {
            Ok(known) => known,
            Err(err) => {
                warn!(%err, "cannot list known networks");
                return identity;
            },
        };

        if known.is_empty() {
            info!("no known networks");
            return identity;
        }
        if known.contains(&identity) {
            info!(essid = identity.essid(), bssid = identity.bssid(), "known network");
            return identity;
        }

        for network in &known {
            debug!(essid = network.essid(), bssid = network.bssid(), "known network");
        }
        identity.with_unknown_halves()
    }

    fn previous_identity(&mut self) -> Result<Option<NetworkIdentity>, RotationError> {
        let path = self.layout.last_ebssid_path();
        let content = self
            .ops
            .read_file(&path)
            .map_err(|source| RotationError::Operation { operation: Operation::ReadFile, source })?;

        let Some(token) = content else {
            info!(%path, "no previous network recorded");
            return Ok(None);
        };

        let previous = NetworkIdentity::from_token(&token);
        if previous.is_none() {
            warn!(%path, %token, "malformed previous network, ignoring it");
        }
        Ok(previous)
    }

    fn disruptive(
        &mut self,
        case: RotationCase,
        previous: Option<&NetworkIdentity>,
        current: &NetworkIdentity,
    ) -> Result<(), RotationError> {
        if let Err(err) = self.ops.stop_process(&self.commands.stop) {
            error!(%err, "stop command failed, leaving state alone");
            self.resume();
            return Err(RotationError::StopFailed(err));
        }

        let moved = self.apply(case, previous, current);
        if let Err(err) = &moved {
            error!(%err, "rotation failed, restarting anyway");
        }

        let start = &self.commands.start;
        let started = self
            .ops
            .start_process(start)
            .map_err(|source| RotationError::Operation { operation: Operation::StartProcess, source });
        moved.and(started)
    }

    /// File operations of cases 1, 2, 4 and 5.
    fn apply(
        &mut self,
        case: RotationCase,
        previous: Option<&NetworkIdentity>,
        current: &NetworkIdentity,
    ) -> Result<(), RotationError> {
        let state_path = self.layout.state_path();

        match (case, previous) {
            (RotationCase::RestorePrevious, Some(previous)) => {
                let previous_path = self.layout.identity_path(previous);
                if self.step(Operation::FileExists, |ops| ops.file_exists(&previous_path))? {
                    self.step(Operation::MoveFile, |ops| ops.move_file(&previous_path, &state_path))?;
                }
            },
            (RotationCase::ArchiveOrphan, _) => {
                let old = self.layout.state_old_path();
                self.step(Operation::MoveFile, |ops| ops.move_file(&state_path, &old))?;
            },
            (RotationCase::SwitchNetwork, Some(previous)) => {
                let previous_path = self.layout.identity_path(previous);
                let current_path = self.layout.identity_path(current);
                self.step(Operation::MoveFile, |ops| ops.move_file(&state_path, &previous_path))?;
                if self.step(Operation::FileExists, |ops| ops.file_exists(&current_path))? {
                    self.step(Operation::CopyFile, |ops| ops.copy_file(&current_path, &state_path))?;
                }
            },
            _ => {},
        }

        let last = self.layout.last_ebssid_path();
        let token = current.token();
        self.step(Operation::UpdateLastEbssidFile, |ops| ops.update_last_ebssid(&last, &token))
    }

    fn step<T>(
        &mut self,
        operation: Operation,
        f: impl FnOnce(&mut P) -> Result<T, PrivilegedError>,
    ) -> Result<T, RotationError> {
        f(&mut *self.ops).map_err(|source| RotationError::Operation { operation, source })
    }

    fn resume(&mut self) {
        if let Err(err) = self.ops.resume_process(self.process) {
            warn!(process = %self.process, %err, "cannot resume process");
        }
    }
}
