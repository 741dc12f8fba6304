//! Paths the rotation engine works with.

use std::path::{Path, PathBuf};

use crate::NetworkIdentity;

/// Default name of the last-identity file.
pub const DEFAULT_LAST_EBSSID_FILENAME: &str = "last_ebssid";

/// Archive for a state file nobody claimed.
pub const STATE_OLD_FILENAME: &str = "state.old";

/// Names in the StateStore that never denote an identity.
///
/// A configured last-identity name other than the default must not parse as
/// an identity token, which keeps it out of listings as well.
pub const RESERVED_NAMES: [&str; 2] = [DEFAULT_LAST_EBSSID_FILENAME, STATE_OLD_FILENAME];

/// Where the canonical state file and the StateStore live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    /// Directory holding the canonical state file.
    pub data_directory: PathBuf,
    /// Canonical state file name.
    pub state_file: String,
    /// Directory holding one file per known identity.
    pub state_store: PathBuf,
    /// Last-identity file name inside the StateStore.
    pub last_ebssid_filename: String,
}

impl StateLayout {
    /// Canonical state file.
    pub fn state_path(&self) -> String {
        join(&self.data_directory, &self.state_file)
    }

    /// Archive for a state file with no known owner.
    pub fn state_old_path(&self) -> String {
        join(&self.state_store, STATE_OLD_FILENAME)
    }

    /// Last-identity file.
    pub fn last_ebssid_path(&self) -> String {
        join(&self.state_store, &self.last_ebssid_filename)
    }

    /// Per-identity state file.
    pub fn identity_path(&self, identity: &NetworkIdentity) -> String {
        join(&self.state_store, &identity.token())
    }

    /// StateStore directory.
    pub fn store_path(&self) -> String {
        self.state_store.to_string_lossy().into_owned()
    }
}

fn join(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let layout = StateLayout {
            data_directory: PathBuf::from("/var/lib/tor"),
            state_file: "state".to_string(),
            state_store: PathBuf::from("/var/lib/dyguards"),
            last_ebssid_filename: DEFAULT_LAST_EBSSID_FILENAME.to_string(),
        };
        let home = NetworkIdentity::new("home", "aa:bb:cc:dd:ee:ff");

        assert_eq!(layout.state_path(), "/var/lib/tor/state");
        assert_eq!(layout.state_old_path(), "/var/lib/dyguards/state.old");
        assert_eq!(layout.last_ebssid_path(), "/var/lib/dyguards/last_ebssid");
        assert_eq!(layout.identity_path(&home), "/var/lib/dyguards/home.aa_bb_cc_dd_ee_ff");
    }

    #[test]
    fn archive_name_is_fixed() {
        let layout = StateLayout {
            data_directory: PathBuf::from("/var/lib/tor"),
            state_file: "tor-state".to_string(),
            state_store: PathBuf::from("/var/lib/dyguards"),
            last_ebssid_filename: "seen".to_string(),
        };

        assert_eq!(layout.state_old_path(), "/var/lib/dyguards/state.old");
        assert!(RESERVED_NAMES.contains(&STATE_OLD_FILENAME));
    }
}
