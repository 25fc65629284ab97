//! Hub nodes exposed for Ring devices.
//!
//! Addresses are derived from the Ring device id with a suffix per role:
//! `_db` doorbell, `_m` motion, `_l` light.

pub mod camera;
pub mod camera_light;
pub mod controller;
pub mod doorbell;
pub mod doorbell_motion;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::RingError;
use crate::hub::{Driver, Hub, NodeDef};
use crate::ring::{Devices, RingClient};

pub use camera::Camera;
pub use camera_light::CameraLight;
pub use controller::{Controller, CONTROLLER_ADDRESS};
pub use doorbell::Doorbell;
pub use doorbell_motion::DoorbellMotion;

pub fn doorbell_address(device_id: u64) -> String {
    format!("{device_id}_db")
}

pub fn motion_address(device_id: u64) -> String {
    format!("{device_id}_m")
}

pub fn light_address(device_id: u64) -> String {
    format!("{device_id}_l")
}

/// Recover the Ring device id from a node address by dropping non-digits.
pub fn address_to_id(address: &str) -> Option<u64> {
    let digits: String = address.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[async_trait]
pub trait Node: Send + Sync {
    fn address(&self) -> &str;

    fn name(&self) -> &str;

    fn node_def_id(&self) -> &'static str;

    /// Hub device-type hint (`[class, category, sub-category, extra]`).
    fn hint(&self) -> [u8; 4];

    fn drivers(&self) -> Vec<Driver> {
        Vec::new()
    }

    fn definition(&self, parent: &str) -> NodeDef {
        NodeDef {
            address: self.address().to_string(),
            parent: parent.to_string(),
            name: self.name().to_string(),
            node_def_id: self.node_def_id(),
            hint: self.hint(),
            drivers: self.drivers(),
        }
    }

    /// Fire the node's event, as a ding or a motion.
    fn activate(&self, hub: &dyn Hub) {
        hub.report_cmd(self.address(), "DON");
    }

    /// Called when the node server stops.
    fn set_offline(&self, _hub: &dyn Hub) {}

    /// Nodes that can refresh from a shared device list expose it here.
    fn prefetch_query(&self) -> Option<&dyn PrefetchQuery> {
        None
    }

    async fn command(
        &self,
        command: &str,
        hub: &dyn Hub,
        ring: &mut RingClient,
    ) -> Result<(), RingError>;
}

/// Capability of nodes whose state can be updated from a device list fetched
/// once for all of them. `None` means the list could not be fetched.
pub trait PrefetchQuery {
    fn query_with_prefetched(&self, hub: &dyn Hub, devices: Option<&Devices>);
}

/// Nodes known to this node server, keyed by address.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Box<dyn Node>>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.nodes.keys()).finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register with the hub and remember the node. Re-adding an address
    /// replaces the previous node.
    pub fn add(&mut self, hub: &dyn Hub, parent: &str, node: Box<dyn Node>) {
        hub.add_node(node.definition(parent));
        self.nodes.insert(node.address().to_string(), node);
    }

    pub fn get(&self, address: &str) -> Option<&dyn Node> {
        self.nodes.get(address).map(|n| n.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Node> {
        self.nodes.values().map(|n| n.as_ref())
    }

    pub fn addresses(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
