//! Privilege-separation bootstrap.
//!
//! Forks into two roles joined by two pipes:
//!
//! ```text
//!   child (unprivileged)                 parent (root)
//!   RpcClient ── request pipe ─────────▶ Server ─▶ OperationTable<LocalOps>
//!             ◀─ response pipe ─────────
//! ```
//!
//! The child drops its credentials before it returns to the caller. The parent
//! serves requests until the child closes the request pipe, reaps it and hands
//! back its exit status. It never runs the unprivileged logic.

use std::fs::File;

use dyguards_core::{LocalOps, OperationTable};
use nix::{
    errno::Errno,
    sys::wait::{WaitStatus, waitpid},
    unistd::{
        ForkResult, Pid, Uid, User, fork, geteuid, pipe, setgroups, setresgid, setresuid, setuid,
    },
};
use tracing::{error, info, warn};

use crate::{BootstrapError, Privileges, RpcClient, Server};

/// What this process became.
#[derive(Debug)]
pub enum Role {
    /// Runs the rotation with these privileges.
    Worker(Privileges),
    /// Privileged parent whose child has exited.
    Supervisor {
        /// Child's exit status, to be passed on.
        exit_code: i32,
    },
}

/// Enter privilege separation for `user`, or skip it.
///
/// Separation is skipped, with a warning, when no user is configured, the
/// user does not exist, or the process is not root to begin with.
pub fn enter(user: Option<&str>) -> Result<Role, BootstrapError> {
    let Some(name) = user else {
        warn!("no unprivileged user configured, running without privilege separation");
        return Ok(direct());
    };

    let account = match User::from_name(name) {
        Ok(Some(account)) => account,
        Ok(None) => {
            warn!(user = name, "user not found, running without privilege separation");
            return Ok(direct());
        },
        Err(errno) => {
            warn!(user = name, %errno, "user lookup failed, running without privilege separation");
            return Ok(direct());
        },
    };

    if !geteuid().is_root() {
        warn!("not running as root, running without privilege separation");
        return Ok(direct());
    }

    separate(&account)
}

fn direct() -> Role {
    Role::Worker(Privileges::Direct(LocalOps::new()))
}

fn separate(account: &User) -> Result<Role, BootstrapError> {
    let (request_rx, request_tx) = pipe().map_err(BootstrapError::Pipe)?;
    let (response_rx, response_tx) = pipe().map_err(BootstrapError::Pipe)?;

    // SAFETY: no other thread exists yet; both sides continue as ordinary
    // single-threaded programs.
    #[allow(unsafe_code)]
    let forked = unsafe { fork() }.map_err(BootstrapError::Fork)?;

    match forked {
        ForkResult::Parent { child } => {
            drop(request_tx);
            drop(response_rx);

            let table = OperationTable::new(LocalOps::new());
            let server = Server::new(table, File::from(request_rx), File::from(response_tx));
            match server.run() {
                Ok(stats) => info!(
                    requests = stats.requests,
                    rejected = stats.rejected,
                    "privileged server finished"
                ),
                Err(err) => error!(%err, "privileged server failed"),
            }

            let exit_code = reap(child)?;
            info!(%child, exit_code, "unprivileged child exited");
            Ok(Role::Supervisor { exit_code })
        },
        ForkResult::Child => {
            drop(request_rx);
            drop(response_tx);

            drop_privileges(account)?;
            info!(user = %account.name, uid = %account.uid, "dropped privileges");

            let client = RpcClient::new(File::from(response_rx), File::from(request_tx));
            Ok(Role::Worker(Privileges::Separated(client)))
        },
    }
}

/// Drop real, effective and saved ids plus supplementary groups to `account`.
fn drop_privileges(account: &User) -> Result<(), BootstrapError> {
    let step = |step: &'static str| move |errno: Errno| BootstrapError::DropPrivileges { step, errno };

    setgroups(&[account.gid]).map_err(step("setgroups"))?;
    setresgid(account.gid, account.gid, account.gid).map_err(step("setresgid"))?;
    setresuid(account.uid, account.uid, account.uid).map_err(step("setresuid"))?;

    if !account.uid.is_root() && setuid(Uid::from_raw(0)).is_ok() {
        return Err(BootstrapError::PrivilegesRetained);
    }
    Ok(())
}

/// Wait for `child` and translate its status into an exit code.
fn reap(child: Pid) -> Result<i32, BootstrapError> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(_) | Err(Errno::EINTR) => {},
            Err(errno) => return Err(BootstrapError::Wait(errno)),
        }
    }
}
