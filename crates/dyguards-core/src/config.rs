//! Configuration file.
//!
//! ```toml
//! [tor]
//! data_directory = "/var/lib/tor"
//! state_file = "state"
//! pid_file = "/run/tor/tor.pid"
//!
//! [network]
//! state_store = "/var/lib/dyguards"
//! last_ebssid_filename = "last_ebssid"
//!
//! [commands]
//! start = "systemctl start tor"
//! stop = "systemctl stop tor"
//!
//! [privsep]
//! user = "debian-tor"
//! ```
//!
//! `pid_file`, `last_ebssid_filename` and the whole `[privsep]` section are
//! optional. Everything else is required.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
    NetworkIdentity,
    layout::{DEFAULT_LAST_EBSSID_FILENAME, StateLayout},
};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dyguards/dyguards.toml";

/// Configuration loading errors. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML or lacks a required section or key.
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },

    /// A value is present but unusable.
    #[error("invalid config value {key}: {reason}")]
    Invalid {
        /// Dotted key
        key: &'static str,
        /// What is wrong
        reason: &'static str,
    },
}

/// The controlled process and its state file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TorSection {
    /// Directory holding the canonical state file.
    pub data_directory: PathBuf,
    /// Canonical state file name.
    pub state_file: String,
    /// Pid file of the controlled process.
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
}

/// Where per-network state is kept.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NetworkSection {
    /// StateStore directory.
    pub state_store: PathBuf,
    /// Last-identity file name inside the StateStore.
    #[serde(default)]
    pub last_ebssid_filename: Option<String>,
}

/// Shell commands controlling the process.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Commands {
    /// Starts the process.
    pub start: String,
    /// Stops the process.
    pub stop: String,
}

/// Privilege separation.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PrivsepSection {
    /// Account the unprivileged side runs as.
    #[serde(default)]
    pub user: Option<String>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// `[tor]`
    pub tor: TorSection,
    /// `[network]`
    pub network: NetworkSection,
    /// `[commands]`
    pub commands: Commands,
    /// `[privsep]`
    #[serde(default)]
    pub privsep: PrivsepSection,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.to_path_buf(), source },
            other => other,
        })
    }

    /// Parse and validate configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: PathBuf::new(), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tor.state_file.is_empty() || self.tor.state_file.contains('/') {
            return Err(ConfigError::Invalid { key: "tor.state_file", reason: "must be a plain file name" });
        }
        if let Some(name) = &self.network.last_ebssid_filename {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::Invalid {
                    key: "network.last_ebssid_filename",
                    reason: "must be a plain file name",
                });
            }
            if NetworkIdentity::from_token(name).is_some() {
                return Err(ConfigError::Invalid {
                    key: "network.last_ebssid_filename",
                    reason: "must not contain exactly one '.'",
                });
            }
        }
        if self.commands.start.trim().is_empty() || self.commands.stop.trim().is_empty() {
            return Err(ConfigError::Invalid { key: "commands", reason: "start and stop must not be empty" });
        }
        Ok(())
    }

    /// Paths the rotation engine works with.
    pub fn layout(&self) -> StateLayout {
        let last_ebssid_filename = self.network.last_ebssid_filename.clone().unwrap_or_else(|| {
            info!(default = DEFAULT_LAST_EBSSID_FILENAME, "network.last_ebssid_filename not set");
            DEFAULT_LAST_EBSSID_FILENAME.to_string()
        });

        StateLayout {
            data_directory: self.tor.data_directory.clone(),
            state_file: self.tor.state_file.clone(),
            state_store: self.network.state_store.clone(),
            last_ebssid_filename,
        }
    }

    /// Unprivileged account, if privilege separation is configured.
    pub fn privsep_user(&self) -> Option<&str> {
        self.privsep.user.as_deref().filter(|user| !user.is_empty())
    }
}
