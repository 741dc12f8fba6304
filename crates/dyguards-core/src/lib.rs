//! State rotation engine and privileged operations.
//!
//! The engine ([`Rotator`]) decides what happens to a network service's state
//! file when the host changes networks, and carries it out through the
//! [`Privileged`] capability. Implementations of that capability:
//!
//! - [`LocalOps`]: performs the operations with the current credentials.
//! - [`RecordingOps`]: in-memory filesystem with a call log, for tests.
//! - the channel client in the `dyguards` crate, which forwards every call to
//!   a privileged process that dispatches it through an [`OperationTable`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
mod devices;
mod error;
mod identity;
mod iwconfig;
mod layout;
mod local;
pub mod manager;
pub mod privileged;
mod process;
mod recording;
mod rotation;
mod table;

pub use config::{Commands, Config, ConfigError};
pub use devices::{DeviceLists, parse_device_list};
pub use error::{PrivilegedError, RotationError};
pub use identity::{NetworkIdentity, UNKNOWN_HALF, hexify_essid};
pub use iwconfig::{Iwconfig, WirelessProbe, parse_iwconfig};
pub use layout::{DEFAULT_LAST_EBSSID_FILENAME, RESERVED_NAMES, STATE_OLD_FILENAME, StateLayout};
pub use local::LocalOps;
pub use privileged::{PrivResult, Privileged};
pub use process::ProcessHandle;
pub use recording::RecordingOps;
pub use rotation::{RotationCase, RotationOutcome, Rotator, SkipReason, read_pid_file};
pub use table::OperationTable;
