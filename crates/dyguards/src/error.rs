//! Channel and bootstrap errors.

use dyguards_proto::ProtocolError;
use nix::errno::Errno;
use thiserror::Error;

/// Failure of the privilege-separation channel itself.
///
/// Unlike a failed response, any of these ends the channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Framing, encoding or stream I/O failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer closed its end before answering.
    #[error("peer disconnected")]
    Disconnected,

    /// Waiting for the streams failed.
    #[error("poll failed: {0}")]
    Poll(Errno),
}

/// Setting up privilege separation failed.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Could not create a pipe.
    #[error("cannot create pipe: {0}")]
    Pipe(Errno),

    /// Could not fork.
    #[error("cannot fork: {0}")]
    Fork(Errno),

    /// A credential-changing call failed in the child.
    #[error("cannot drop privileges ({step}): {errno}")]
    DropPrivileges {
        /// Call that failed
        step: &'static str,
        /// Error it returned
        errno: Errno,
    },

    /// The child could regain root after dropping credentials.
    #[error("privileges were not dropped irrevocably")]
    PrivilegesRetained,

    /// Reaping the child failed.
    #[error("cannot wait for child: {0}")]
    Wait(Errno),
}
