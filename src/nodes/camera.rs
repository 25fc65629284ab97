use async_trait::async_trait;

use crate::error::RingError;
use crate::hub::Hub;
use crate::ring::RingClient;

use super::{motion_address, Node};

/// Stick-up camera. Motion events report `DON`.
#[derive(Debug, Clone)]
pub struct Camera {
    address: String,
    name: String,
}

impl Camera {
    pub fn new(device_id: u64, name: &str) -> Self {
        Self {
            address: motion_address(device_id),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Node for Camera {
    fn address(&self) -> &str {
        &self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_def_id(&self) -> &'static str {
        "CAMERA"
    }

    fn hint(&self) -> [u8; 4] {
        [1, 3, 4, 1]
    }

    async fn command(
        &self,
        command: &str,
        _hub: &dyn Hub,
        _ring: &mut RingClient,
    ) -> Result<(), RingError> {
        Err(RingError::ProtocolError(format!(
            "Unsupported command {command} for {}",
            self.address
        )))
    }
}
