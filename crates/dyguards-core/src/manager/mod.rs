//! Network-manager adapters.
//!
//! Each adapter turns the arguments a network manager passes to its hook into
//! a go/no-go decision and a [`NetworkIdentity`]. The rotation engine calls
//! the methods in declaration order.

mod nm;
mod wicd;

pub use nm::NmDispatcher;
pub use wicd::WicdPreConnect;

use crate::{DeviceLists, NetworkIdentity};

/// Hook adapter for one network manager.
pub trait NetworkManager {
    /// Whether [`assign_device_lists`](Self::assign_device_lists) needs real
    /// device lists.
    fn needs_device_enumeration(&self) -> bool;

    /// Hand over the interfaces known to the kernel.
    fn assign_device_lists(&mut self, devices: DeviceLists);

    /// Whether this event warrants a rotation.
    fn should_continue(&mut self) -> bool;

    /// Identity of the network being attached to.
    fn network_identity(&mut self) -> NetworkIdentity;
}
