use async_trait::async_trait;

use crate::error::RingError;
use crate::hub::Hub;
use crate::ring::RingClient;

use super::{light_address, Node};

/// Floodlight of a camera, switched with `DON` / `DOF`.
#[derive(Debug, Clone)]
pub struct CameraLight {
    address: String,
    name: String,
    device_id: u64,
}

impl CameraLight {
    pub fn new(device_id: u64, name: &str) -> Self {
        Self {
            address: light_address(device_id),
            name: format!("{name} Light"),
            device_id,
        }
    }
}

#[async_trait]
impl Node for CameraLight {
    fn address(&self) -> &str {
        &self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_def_id(&self) -> &'static str {
        "LIGHT"
    }

    fn hint(&self) -> [u8; 4] {
        [1, 2, 16, 1]
    }

    // A light is commanded, it never fires events of its own.
    fn activate(&self, _hub: &dyn Hub) {}

    async fn command(
        &self,
        command: &str,
        _hub: &dyn Hub,
        ring: &mut RingClient,
    ) -> Result<(), RingError> {
        tracing::info!("{command} received for device: {}", self.address);
        match command {
            "DON" => ring.floodlight_on(self.device_id).await.map(|_| ()),
            "DOF" => ring.floodlight_off(self.device_id).await.map(|_| ()),
            other => Err(RingError::ProtocolError(format!(
                "Unsupported command {other} for {}",
                self.address
            ))),
        }
    }
}
