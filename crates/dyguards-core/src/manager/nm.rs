//! NetworkManager dispatcher hook.

use tracing::info;

use super::NetworkManager;
use crate::{DeviceLists, NetworkIdentity, iwconfig::WirelessProbe};

/// Longest interface name we look at.
const INTERFACE_LEN: usize = 8;

/// Only the `up` action matters.
const STATUS_LEN: usize = 2;

/// Adapter for `NetworkManager-dispatcher`, called as `<interface> <status>`.
#[derive(Debug)]
pub struct NmDispatcher<W> {
    interface: String,
    status: String,
    devices: DeviceLists,
    probe: W,
}

impl<W: WirelessProbe> NmDispatcher<W> {
    /// Adapter for one dispatcher event.
    ///
    /// The interface is cut to its first word and eight characters, the
    /// status to two.
    pub fn new(interface: &str, status: &str, probe: W, connection_uuid: Option<&str>) -> Self {
        info!(interface, status, "called by NetworkManager");
        if let Some(uuid) = connection_uuid {
            info!(uuid, "CONNECTION_UUID");
        }

        let interface = interface.split_whitespace().next().unwrap_or_default();
        Self {
            interface: interface.chars().take(INTERFACE_LEN).collect(),
            status: status.chars().take(STATUS_LEN).collect(),
            devices: DeviceLists::default(),
            probe,
        }
    }
}

impl<W: WirelessProbe> NetworkManager for NmDispatcher<W> {
    fn needs_device_enumeration(&self) -> bool {
        true
    }

    fn assign_device_lists(&mut self, devices: DeviceLists) {
        self.devices = devices;
    }

    fn should_continue(&mut self) -> bool {
        if self.interface.is_empty() {
            info!("no interface given");
            return false;
        }
        if self.interface == "lo" {
            info!("called for loopback, nothing to do");
            return false;
        }
        if !self.status.is_empty() && self.status != "up" {
            info!(interface = %self.interface, status = %self.status, "interface not up, nothing to do");
            return false;
        }
        if !self.status.is_empty() && !self.devices.all.contains(&self.interface) {
            info!(interface = %self.interface, "unknown interface");
            return false;
        }
        true
    }

    fn network_identity(&mut self) -> NetworkIdentity {
        if !self.devices.wireless.contains(&self.interface) {
            info!(interface = %self.interface, "not a wireless interface");
            return NetworkIdentity::default();
        }

        let identity = self.probe.probe(&self.interface);
        info!(essid = identity.essid(), bssid = identity.bssid(), "probed wireless identity");
        identity
    }
}
