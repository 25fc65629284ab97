use async_trait::async_trait;

use crate::error::RingError;
use crate::hub::{Driver, Hub};
use crate::ring::{Device, Devices, RingClient};

use super::{doorbell_address, Node, PrefetchQuery};

const UOM_BOOLEAN: u16 = 2;
const UOM_PERCENT: u16 = 51;
const UOM_MILLIVOLT: u16 = 43;

/// Main doorbell node. A ding reports `DON`; motion lives on [`super::DoorbellMotion`].
#[derive(Debug, Clone)]
pub struct Doorbell {
    address: String,
    name: String,
    device_id: u64,
}

impl Doorbell {
    pub fn new(device_id: u64, name: &str) -> Self {
        Self {
            address: doorbell_address(device_id),
            name: name.to_string(),
            device_id,
        }
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    fn apply(&self, hub: &dyn Hub, device: Option<&Device>) {
        tracing::info!("Query for node {} ({})", self.address, self.name);

        let Some(device) = device else {
            tracing::info!("Ring device id {} not found", self.device_id);
            hub.set_driver(&self.address, "ST", 0.0, UOM_BOOLEAN);
            return;
        };
        tracing::debug!("Device data: {device:?}");

        let online = if device.is_online() { 1.0 } else { 0.0 };
        hub.set_driver(&self.address, "ST", online, UOM_BOOLEAN);

        // Devices report battery_life, battery_voltage or both.
        if let Some(level) = device.battery_life {
            hub.set_driver(&self.address, "BATLVL", level, UOM_PERCENT);
        }
        if let Some(level) = device.battery_life_2 {
            hub.set_driver(&self.address, "GV0", level, UOM_PERCENT);
        }
        if let Some(mv) = device.battery_voltage {
            hub.set_driver(&self.address, "GV1", mv, UOM_MILLIVOLT);
        }
    }
}

impl PrefetchQuery for Doorbell {
    fn query_with_prefetched(&self, hub: &dyn Hub, devices: Option<&Devices>) {
        self.apply(hub, devices.and_then(|d| d.find(self.device_id)));
    }
}

#[async_trait]
impl Node for Doorbell {
    fn address(&self) -> &str {
        &self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_def_id(&self) -> &'static str {
        "DOORBELL"
    }

    fn hint(&self) -> [u8; 4] {
        [1, 8, 1, 1]
    }

    fn drivers(&self) -> Vec<Driver> {
        vec![
            Driver::new("ST", 0.0, UOM_BOOLEAN),
            Driver::new("BATLVL", 0.0, UOM_PERCENT),
            Driver::new("GV0", 0.0, UOM_PERCENT),
            Driver::new("GV1", 0.0, UOM_MILLIVOLT),
        ]
    }

    fn set_offline(&self, hub: &dyn Hub) {
        hub.set_driver(&self.address, "ST", 0.0, UOM_BOOLEAN);
    }

    fn prefetch_query(&self) -> Option<&dyn PrefetchQuery> {
        Some(self)
    }

    async fn command(
        &self,
        command: &str,
        hub: &dyn Hub,
        ring: &mut RingClient,
    ) -> Result<(), RingError> {
        match command {
            "QUERY" => {
                let device = match ring.device_data(self.device_id, None).await {
                    Ok(device) => device,
                    Err(e) => {
                        tracing::error!("Could not fetch devices: {e}");
                        None
                    }
                };
                self.apply(hub, device.as_ref());
                Ok(())
            }
            other => Err(RingError::ProtocolError(format!(
                "Unsupported command {other} for {}",
                self.address
            ))),
        }
    }
}
