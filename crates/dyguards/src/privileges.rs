//! The privilege context handed to the rotation engine.

use std::fs::File;

use dyguards_core::{LocalOps, NetworkIdentity, PrivResult, Privileged, ProcessHandle};

use crate::RpcClient;

/// How privileged operations are carried out in this process.
///
/// Created once by the bootstrap and passed explicitly to whatever needs it.
#[derive(Debug)]
pub enum Privileges {
    /// Forwarded to the privileged parent over the channel.
    Separated(RpcClient<File, File>),
    /// Performed in-process with the original credentials.
    Direct(LocalOps),
}

impl Privileges {
    /// Whether operations cross a process boundary.
    pub fn is_separated(&self) -> bool {
        matches!(self, Self::Separated(_))
    }

    fn inner(&mut self) -> &mut dyn Privileged {
        match self {
            Self::Separated(client) => client,
            Self::Direct(local) => local,
        }
    }
}

impl Privileged for Privileges {
    fn dir_exists(&mut self, path: &str) -> PrivResult<bool> {
        self.inner().dir_exists(path)
    }

    fn file_exists(&mut self, path: &str) -> PrivResult<bool> {
        self.inner().file_exists(path)
    }

    fn create_state_store(&mut self, path: &str) -> PrivResult<bool> {
        self.inner().create_state_store(path)
    }

    fn move_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        self.inner().move_file(from, to)
    }

    fn copy_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        self.inner().copy_file(from, to)
    }

    fn known_networks(&mut self, store: &str) -> PrivResult<Vec<NetworkIdentity>> {
        self.inner().known_networks(store)
    }

    fn update_last_ebssid(&mut self, path: &str, token: &str) -> PrivResult<()> {
        self.inner().update_last_ebssid(path, token)
    }

    fn read_file(&mut self, path: &str) -> PrivResult<Option<String>> {
        self.inner().read_file(path)
    }

    fn suspend_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        self.inner().suspend_process(process)
    }

    fn resume_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        self.inner().resume_process(process)
    }

    fn start_process(&mut self, command: &str) -> PrivResult<()> {
        self.inner().start_process(command)
    }

    fn stop_process(&mut self, command: &str) -> PrivResult<()> {
        self.inner().stop_process(command)
    }
}
