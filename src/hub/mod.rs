//! The plugin host the node server runs inside.
//!
//! The hub owns persistence (custom-data namespaces), user-facing notices and
//! the node tree. Everything the plugin needs from it goes through [`Hub`].

pub mod local;

use serde::{Deserialize, Serialize};

use crate::error::RingError;

pub use local::{LocalHub, NodeState};

/// Notice key used for every "please authenticate" prompt.
pub const AUTH_NOTICE_KEY: &str = "auth";
pub const AUTH_NOTICE: &str = "Please initiate authentication";

/// Identity of this node server installation on the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    pub uuid: String,
    pub profile_num: u32,
    /// Where the node server was installed from: `local` or a store name.
    #[serde(default = "default_store")]
    pub store: String,
}

fn default_store() -> String {
    "production".to_string()
}

impl HubConfig {
    pub fn is_local_store(&self) -> bool {
        self.store.eq_ignore_ascii_case("local")
    }
}

/// A single driver (status value) on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub driver: String,
    pub value: f64,
    pub uom: u16,
}

impl Driver {
    pub fn new(driver: &str, value: f64, uom: u16) -> Self {
        Self {
            driver: driver.to_string(),
            value,
            uom,
        }
    }
}

/// Node registration sent to the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub address: String,
    pub parent: String,
    pub name: String,
    pub node_def_id: &'static str,
    pub hint: [u8; 4],
    pub drivers: Vec<Driver>,
}

pub trait Hub: Send + Sync {
    fn config(&self) -> HubConfig;

    /// Current content of a custom-data namespace, if the hub has one.
    fn custom_data(&self, namespace: &str) -> Option<serde_json::Value>;

    /// Overwrite a custom-data namespace.
    fn save_custom_data(&self, namespace: &str, data: serde_json::Value)
        -> Result<(), RingError>;

    fn set_notice(&self, key: &str, message: &str);

    fn clear_notices(&self);

    fn add_node(&self, node: NodeDef);

    fn set_driver(&self, address: &str, driver: &str, value: f64, uom: u16);

    fn report_cmd(&self, address: &str, command: &str);

    fn stop(&self);
}
