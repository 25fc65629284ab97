use crate::error::RingError;
use crate::hub::{Driver, Hub, NodeDef};
use crate::ring::{Device, Devices, RingClient};

use super::{Camera, CameraLight, Doorbell, DoorbellMotion, NodeRegistry};

pub const CONTROLLER_ADDRESS: &str = "controller";

const CONTROLLER_NAME: &str = "Ring";

/// Root node of the node server. Owns discovery and the device list
/// prefetched for bulk queries.
#[derive(Debug, Default)]
pub struct Controller {
    devices: Option<Devices>,
    user_id: Option<u64>,
    include_shared: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definition() -> NodeDef {
        NodeDef {
            address: CONTROLLER_ADDRESS.to_string(),
            parent: CONTROLLER_ADDRESS.to_string(),
            name: CONTROLLER_NAME.to_string(),
            node_def_id: "CTL",
            hint: [0, 0, 0, 0],
            drivers: vec![Driver::new("ST", 0.0, 2)],
        }
    }

    pub fn include_shared(&self) -> bool {
        self.include_shared
    }

    pub fn set_include_shared(&mut self, include: bool) {
        tracing::info!("Include shared devices: {include}");
        self.include_shared = include;
    }

    /// Device list from the last discovery or bulk query.
    pub fn devices(&self) -> Option<&Devices> {
        self.devices.as_ref()
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    pub fn set_connected(&self, hub: &dyn Hub, connected: bool) {
        let value = if connected { 1.0 } else { 0.0 };
        hub.set_driver(CONTROLLER_ADDRESS, "ST", value, 2);
    }

    /// Fetch the account's devices and register a node for each one that
    /// belongs to this node server. Returns the number of devices added.
    pub async fn discover(
        &mut self,
        hub: &dyn Hub,
        ring: &mut RingClient,
        registry: &mut NodeRegistry,
    ) -> Result<usize, RingError> {
        let user = ring.user_info().await?;
        tracing::info!("User id is: {}", user.user.id);
        self.user_id = Some(user.user.id);

        let devices = ring.all_devices().await?;
        tracing::info!("Devices: {} found", devices.len());

        let mut added = 0;
        for device in &devices.doorbells {
            if device.owner_id() != Some(user.user.id) && !self.include_shared {
                tracing::warn!(
                    "Adding doorbell {} ({}) ignored: Doorbell is shared",
                    device.id,
                    device.description
                );
                continue;
            }
            add_doorbell(hub, registry, device);
            added += 1;
        }

        if self.include_shared {
            for device in &devices.authorized_doorbells {
                add_doorbell(hub, registry, device);
                added += 1;
            }
        }

        for device in &devices.stickup_cams {
            if device.owner_id() != Some(user.user.id) && !self.include_shared {
                tracing::warn!(
                    "Adding camera {} ({}) ignored: Camera is shared",
                    device.id,
                    device.description
                );
                continue;
            }
            tracing::warn!("Adding camera {}: {}", device.id, device.description);
            registry.add(
                hub,
                CONTROLLER_ADDRESS,
                Box::new(Camera::new(device.id, &device.description)),
            );
            if device.has_light() {
                registry.add(
                    hub,
                    CONTROLLER_ADDRESS,
                    Box::new(CameraLight::new(device.id, &device.description)),
                );
            }
            added += 1;
        }

        self.devices = Some(devices);
        Ok(added)
    }

    /// Refresh every node that supports it from a single device list.
    pub async fn query_all(
        &mut self,
        hub: &dyn Hub,
        ring: &mut RingClient,
        registry: &NodeRegistry,
    ) -> Result<(), RingError> {
        let fetched = ring.all_devices().await;
        let result = match fetched {
            Ok(devices) => {
                tracing::info!("Devices: {} found", devices.len());
                self.devices = Some(devices);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Could not prefetch devices: {e}");
                self.devices = None;
                Err(e)
            }
        };

        for node in registry.iter() {
            if let Some(query) = node.prefetch_query() {
                query.query_with_prefetched(hub, self.devices.as_ref());
            }
        }
        result
    }

    /// Query a freshly added node with the devices fetched during discovery.
    pub fn add_node_done(&self, hub: &dyn Hub, registry: &NodeRegistry, address: &str) {
        let Some(node) = registry.get(address) else {
            return;
        };
        if let Some(query) = node.prefetch_query() {
            query.query_with_prefetched(hub, self.devices.as_ref());
        }
    }
}

fn add_doorbell(hub: &dyn Hub, registry: &mut NodeRegistry, device: &Device) {
    tracing::warn!("Adding doorbell {}: {}", device.id, device.description);
    registry.add(
        hub,
        CONTROLLER_ADDRESS,
        Box::new(Doorbell::new(device.id, &device.description)),
    );
    registry.add(
        hub,
        CONTROLLER_ADDRESS,
        Box::new(DoorbellMotion::new(device.id, &device.description)),
    );
}
