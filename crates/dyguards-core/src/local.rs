//! In-process privileged operations.
//!
//! Runs on the privileged side of the channel, or directly in the single
//! process when privilege separation is disabled.

use std::{
    fs::{self, DirBuilder, File, FileTimes},
    io,
    os::unix::fs::DirBuilderExt,
    path::Path,
    process::Command,
};

use nix::{
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use tracing::{debug, info};

use crate::{
    NetworkIdentity, PrivilegedError, ProcessHandle,
    layout::RESERVED_NAMES,
    privileged::{PrivResult, Privileged},
};

/// Shell used for start/stop commands.
pub const SHELL: &str = "/bin/sh";

/// Operations performed with the credentials of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOps;

impl LocalOps {
    /// Create the in-process implementation.
    pub fn new() -> Self {
        Self
    }

    fn signal(process: ProcessHandle, signal: Signal) -> PrivResult<()> {
        Self::signal_with(process, signal, |pid, signal| kill(pid, signal))
    }

    fn signal_with(
        process: ProcessHandle,
        signal: Signal,
        send: impl FnOnce(Pid, Signal) -> nix::Result<()>,
    ) -> PrivResult<()> {
        let Some(pid) = process.pid() else {
            debug!(?signal, "no process tracked, not signalling");
            return Ok(());
        };

        send(pid, signal).map_err(|errno| PrivilegedError::signal(errno, process.to_raw()))?;
        info!(%pid, ?signal, "signalled process");
        Ok(())
    }

    fn run(command: &str) -> PrivResult<()> {
        info!(command, "running command");
        let status = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|err| PrivilegedError::io(&err, Path::new(SHELL)))?;

        if status.success() {
            Ok(())
        } else {
            Err(PrivilegedError::command(command, status))
        }
    }
}

fn fs_err(path: &str) -> impl Fn(io::Error) -> PrivilegedError + '_ {
    move |err| PrivilegedError::io(&err, Path::new(path))
}

impl Privileged for LocalOps {
    fn dir_exists(&mut self, path: &str) -> PrivResult<bool> {
        Ok(Path::new(path).is_dir())
    }

    fn file_exists(&mut self, path: &str) -> PrivResult<bool> {
        Ok(Path::new(path).is_file())
    }

    fn create_state_store(&mut self, path: &str) -> PrivResult<bool> {
        match DirBuilder::new().mode(0o700).create(path) {
            Ok(()) => info!(path, "created state store"),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {},
            Err(err) => return Err(PrivilegedError::io(&err, Path::new(path))),
        }
        Ok(Path::new(path).is_dir())
    }

    fn move_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        fs::rename(from, to).map_err(fs_err(from))?;
        info!(from, to, "moved file");
        Ok(())
    }

    fn copy_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        // fs::copy carries the permission bits; timestamps are set by hand.
        let metadata = fs::metadata(from).map_err(fs_err(from))?;
        fs::copy(from, to).map_err(fs_err(from))?;

        let times = FileTimes::new()
            .set_accessed(metadata.accessed().map_err(fs_err(from))?)
            .set_modified(metadata.modified().map_err(fs_err(from))?);
        File::options().write(true).open(to).and_then(|f| f.set_times(times)).map_err(fs_err(to))?;

        info!(from, to, "copied file");
        Ok(())
    }

    fn known_networks(&mut self, store: &str) -> PrivResult<Vec<NetworkIdentity>> {
        if !Path::new(store).is_dir() {
            info!(store, "state store is not a directory");
            return Ok(Vec::new());
        }

        let mut networks = Vec::new();
        for entry in fs::read_dir(store).map_err(fs_err(store))? {
            let entry = entry.map_err(fs_err(store))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if RESERVED_NAMES.contains(&name) {
                continue;
            }
            if let Some(identity) = NetworkIdentity::from_token(name) {
                debug!(essid = identity.essid(), bssid = identity.bssid(), "known network");
                networks.push(identity);
            }
        }
        networks.sort_by(|a, b| a.token().cmp(&b.token()));
        Ok(networks)
    }

    fn update_last_ebssid(&mut self, path: &str, token: &str) -> PrivResult<()> {
        fs::write(path, token).map_err(fs_err(path))?;
        info!(path, token, "updated last identity");
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> PrivResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PrivilegedError::io(&err, Path::new(path))),
        }
    }

    fn suspend_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        Self::signal(process, Signal::SIGSTOP)
    }

    fn resume_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        Self::signal(process, Signal::SIGCONT)
    }

    fn start_process(&mut self, command: &str) -> PrivResult<()> {
        Self::run(command)
    }

    fn stop_process(&mut self, command: &str) -> PrivResult<()> {
        Self::run(command)
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use nix::errno::Errno;
    use tempfile::TempDir;

    use super::*;
    use crate::StateLayout;

    fn path(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn state_store_is_created_private() {
        let dir = TempDir::new().expect("tempdir");
        let store = path(&dir, "store");
        let mut ops = LocalOps::new();

        assert_eq!(ops.create_state_store(&store), Ok(true));
        assert_eq!(ops.create_state_store(&store), Ok(true));

        let mode = fs::metadata(&store).expect("store metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn state_store_over_a_file_is_not_a_directory() {
        let dir = TempDir::new().expect("tempdir");
        let store = path(&dir, "store");
        fs::write(&store, "").expect("write file");

        assert_eq!(LocalOps::new().create_state_store(&store), Ok(false));
    }

    #[test]
    fn copy_keeps_mode_and_mtime() {
        let dir = TempDir::new().expect("tempdir");
        let from = path(&dir, "state");
        let to = path(&dir, "home.aa_bb");
        fs::write(&from, "guards").expect("write state");
        fs::set_permissions(&from, fs::Permissions::from_mode(0o600)).expect("chmod");

        LocalOps::new().copy_file(&from, &to).expect("copy");

        let source = fs::metadata(&from).expect("source metadata");
        let copy = fs::metadata(&to).expect("copy metadata");
        assert_eq!(fs::read_to_string(&to).expect("read copy"), "guards");
        assert_eq!(copy.permissions().mode() & 0o777, 0o600);
        assert_eq!(copy.modified().expect("mtime"), source.modified().expect("mtime"));
    }

    #[test]
    fn move_reports_strerror_and_path() {
        let dir = TempDir::new().expect("tempdir");
        let from = path(&dir, "missing");
        let err = LocalOps::new().move_file(&from, &path(&dir, "to")).expect_err("no source");

        assert_eq!(
            err,
            PrivilegedError::Os { code: 2, detail: format!("No such file or directory: '{from}'") }
        );
    }

    #[test]
    fn known_networks_skip_reserved_and_malformed_names() {
        let dir = TempDir::new().expect("tempdir");
        for name in ["last_ebssid", "state.old", "home.aa_bb_cc_dd_ee_ff", "junk", "a.b.c"] {
            fs::write(dir.path().join(name), "").expect("write entry");
        }

        let networks = LocalOps::new().known_networks(&path(&dir, "")).expect("list");
        assert_eq!(networks, vec![NetworkIdentity::new("home", "aa:bb:cc:dd:ee:ff")]);
    }

    #[test]
    fn known_networks_of_missing_store_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        assert_eq!(LocalOps::new().known_networks(&path(&dir, "absent")), Ok(Vec::new()));
    }

    #[test]
    fn read_file_trims_and_reports_absence() {
        let dir = TempDir::new().expect("tempdir");
        let pid = path(&dir, "tor.pid");
        let mut ops = LocalOps::new();

        assert_eq!(ops.read_file(&pid), Ok(None));
        fs::write(&pid, "4242\n").expect("write pid");
        assert_eq!(ops.read_file(&pid), Ok(Some("4242".to_string())));
    }

    #[test]
    fn last_identity_is_overwritten() {
        let dir = TempDir::new().expect("tempdir");
        let last = path(&dir, "last_ebssid");
        let mut ops = LocalOps::new();

        ops.update_last_ebssid(&last, "old.aa_bb").expect("first write");
        ops.update_last_ebssid(&last, "home.aa_bb_cc_dd_ee_ff").expect("second write");
        assert_eq!(fs::read_to_string(&last).expect("read"), "home.aa_bb_cc_dd_ee_ff");
    }

    #[test]
    fn bookkeeping_files_of_a_custom_layout_are_not_networks() {
        let dir = TempDir::new().expect("tempdir");
        let layout = StateLayout {
            data_directory: dir.path().join("tor"),
            state_file: "tor-state".to_string(),
            state_store: dir.path().join("store"),
            last_ebssid_filename: "seen".to_string(),
        };
        fs::create_dir(&layout.state_store).expect("mkdir store");
        fs::write(layout.last_ebssid_path(), "home.aa_bb").expect("write last");
        fs::write(layout.state_old_path(), "guards").expect("write archive");

        let networks = LocalOps::new().known_networks(&layout.store_path()).expect("list");
        assert_eq!(networks, Vec::new());
    }

    #[test]
    fn sentinel_pid_is_never_signalled() {
        let mut sent = Vec::new();
        for signal in [Signal::SIGSTOP, Signal::SIGCONT] {
            let result = LocalOps::signal_with(ProcessHandle::NONE, signal, |pid, signal| {
                sent.push((pid, signal));
                Ok(())
            });
            assert_eq!(result, Ok(()));
        }
        assert!(sent.is_empty());
    }

    #[test]
    fn tracked_pid_is_signalled() {
        let mut sent = Vec::new();
        let process = ProcessHandle::from_raw(4242);

        LocalOps::signal_with(process, Signal::SIGSTOP, |pid, signal| {
            sent.push((pid, signal));
            Ok(())
        })
        .expect("signal");

        assert_eq!(sent, vec![(Pid::from_raw(4242), Signal::SIGSTOP)]);
    }

    #[test]
    fn signal_failure_carries_the_pid() {
        let process = ProcessHandle::from_raw(4242);
        let err = LocalOps::signal_with(process, Signal::SIGCONT, |_, _| Err(Errno::ESRCH))
            .expect_err("no such process");
        assert!(matches!(err, PrivilegedError::Os { code, .. } if code == Errno::ESRCH as i64));
    }

    #[test]
    fn commands_succeed_on_zero_exit_only() {
        let mut ops = LocalOps::new();
        assert_eq!(ops.start_process("true"), Ok(()));

        let err = ops.stop_process("exit 3").expect_err("nonzero exit");
        assert!(matches!(err, PrivilegedError::Os { code: 3, .. }));
    }
}
