use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hub::HubConfig;

/// Settings for running the node server outside the hub host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingNsConfig {
    pub hub: HubConfig,
    /// What the hub would push in its `oauth` namespace.
    #[serde(default)]
    pub oauth: serde_json::Value,
    #[serde(default)]
    pub custom_params: BTreeMap<String, String>,
    /// Seconds between short polls.
    #[serde(default = "default_short_poll")]
    pub short_poll: u64,
    /// Seconds between long polls.
    #[serde(default = "default_long_poll")]
    pub long_poll: u64,
    /// Port of the local webhook listener; `0` disables it.
    #[serde(default)]
    pub webhook_port: u16,
    #[serde(default)]
    pub postback_url: Option<String>,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// File this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn default_short_poll() -> u64 {
    60
}

fn default_long_poll() -> u64 {
    3600
}

impl RingNsConfig {
    pub fn short_poll_interval(&self) -> Duration {
        Duration::from_secs(self.short_poll.max(1))
    }

    pub fn long_poll_interval(&self) -> Duration {
        Duration::from_secs(self.long_poll.max(1))
    }

    /// Where the local hub keeps custom data, notices and nodes.
    pub fn state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(".ring-ns").join("state.json"))
            .unwrap_or_else(|| PathBuf::from("ring-ns-state.json"))
    }
}
