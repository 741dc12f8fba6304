//! Wireless identity probing through `iwconfig`.

use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info, warn};

use crate::{NetworkIdentity, identity::hexify_essid};

/// Search path used when `PATH` is not set.
pub const DEFAULT_ROOT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Source of the identity of a wireless interface.
pub trait WirelessProbe {
    /// Identity the interface is attached to. Halves that could not be
    /// determined are empty.
    fn probe(&self, interface: &str) -> NetworkIdentity;
}

/// Probe that runs the `iwconfig` binary found on the search path.
#[derive(Debug, Clone)]
pub struct Iwconfig {
    search_path: String,
}

impl Iwconfig {
    /// Search `PATH`, or [`DEFAULT_ROOT_PATH`] when it is unset.
    pub fn from_env() -> Self {
        let search_path = env::var("PATH").unwrap_or_else(|_| {
            info!("no PATH set, using default root path");
            DEFAULT_ROOT_PATH.to_string()
        });
        Self::with_search_path(search_path)
    }

    /// Search the given colon-separated path.
    pub fn with_search_path(search_path: impl Into<String>) -> Self {
        Self { search_path: search_path.into() }
    }

    /// First `iwconfig` on the search path.
    pub fn locate(&self) -> Option<PathBuf> {
        self.search_path
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(|dir| Path::new(dir).join("iwconfig"))
            .inspect(|candidate| debug!(path = %candidate.display(), "looking for iwconfig"))
            .find(|candidate| candidate.is_file())
    }
}

impl WirelessProbe for Iwconfig {
    fn probe(&self, interface: &str) -> NetworkIdentity {
        let Some(exe) = self.locate() else {
            warn!("iwconfig not found");
            return NetworkIdentity::default();
        };

        info!(exe = %exe.display(), interface, "running iwconfig");
        let output = match Command::new(&exe).arg(interface).output() {
            Ok(output) => output,
            Err(err) => {
                warn!(%err, "iwconfig could not be run");
                return NetworkIdentity::default();
            },
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if text.trim().is_empty() {
            info!("iwconfig printed nothing");
            return NetworkIdentity::default();
        }

        let identity = parse_iwconfig(&text, interface);
        if identity.essid().is_empty() || identity.bssid().is_empty() {
            info!(essid = identity.essid(), bssid = identity.bssid(), "incomplete identity");
        }
        identity
    }
}

/// Extract ESSID (hex encoded) and access point address from `iwconfig` output.
pub fn parse_iwconfig(output: &str, interface: &str) -> NetworkIdentity {
    let mut essid = String::new();
    let mut bssid = String::new();

    for line in output.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [first, _, _, field, ..] if *first == interface => {
                let Some(value) = field.strip_prefix("ESSID:") else { continue };
                if value.contains(':') {
                    info!(field, "malformed ESSID field");
                    continue;
                }
                essid = hexify_essid(value);
            },
            [first, _, _, _, "Point:", address] if first.starts_with("Mode:") => {
                bssid = (*address).to_string();
            },
            _ => {},
        }
    }

    NetworkIdentity::new(essid, bssid)
}
