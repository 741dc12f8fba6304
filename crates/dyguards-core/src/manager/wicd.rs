//! Wicd pre-connect hook.

use tracing::info;

use super::NetworkManager;
use crate::{DeviceLists, NetworkIdentity, identity::hexify_essid};

/// Adapter for Wicd's `preconnect` scripts, called as
/// `<connection type> <essid> <bssid>`.
#[derive(Debug, Clone)]
pub struct WicdPreConnect {
    identity: NetworkIdentity,
}

impl WicdPreConnect {
    /// Adapter for one pre-connect event. The ESSID is hex encoded; the
    /// connection type is only logged.
    pub fn new(connection_type: &str, essid: &str, bssid: &str) -> Self {
        info!(connection_type, essid, bssid, "called by Wicd");
        let essid = if essid.is_empty() { String::new() } else { hexify_essid(essid) };
        Self { identity: NetworkIdentity::new(essid, bssid) }
    }
}

impl NetworkManager for WicdPreConnect {
    fn needs_device_enumeration(&self) -> bool {
        false
    }

    fn assign_device_lists(&mut self, _devices: DeviceLists) {}

    fn should_continue(&mut self) -> bool {
        if self.identity.is_unknown() {
            info!("neither essid nor bssid given");
            return false;
        }
        true
    }

    fn network_identity(&mut self) -> NetworkIdentity {
        self.identity.clone()
    }
}
