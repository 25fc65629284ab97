use async_trait::async_trait;

use crate::error::RingError;
use crate::hub::Hub;
use crate::ring::RingClient;

use super::{motion_address, Node};

/// Secondary node of a doorbell that fires on motion.
#[derive(Debug, Clone)]
pub struct DoorbellMotion {
    address: String,
    name: String,
}

impl DoorbellMotion {
    pub fn new(device_id: u64, name: &str) -> Self {
        Self {
            address: motion_address(device_id),
            name: format!("{name} Motion"),
        }
    }
}

#[async_trait]
impl Node for DoorbellMotion {
    fn address(&self) -> &str {
        &self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_def_id(&self) -> &'static str {
        "DOORBELLMOTION"
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
