pub mod ring_mock;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ring_ns::hub::{HubConfig, LocalHub};

#[allow(dead_code)]
pub const USER_ID: u64 = 1001;

#[allow(dead_code)]
pub fn hub_config() -> HubConfig {
    HubConfig {
        uuid: "00:21:b9:02:5b:8c".into(),
        profile_num: 3,
        store: "local".into(),
    }
}

#[allow(dead_code)]
pub fn hub() -> Arc<LocalHub> {
    Arc::new(LocalHub::in_memory(hub_config()))
}

/// OAuth settings as the hub would push them, pointing at `token_endpoint`.
#[allow(dead_code)]
pub fn oauth_settings(token_endpoint: &str) -> serde_json::Value {
    serde_json::json!({
        "auth_endpoint": "https://oauth.ring.com/oauth/authorize",
        "token_endpoint": token_endpoint,
        "client_id": "client-id",
        "client_secret": "client-secret"
    })
}

/// Write a runner config into `dir` and return its path.
#[allow(dead_code)]
pub fn write_config(dir: &Path, api_base_url: &str, oauth: serde_json::Value) -> PathBuf {
    let path = dir.join("ring-ns.json");
    let config = serde_json::json!({
        "hub": {"uuid": "00:21:b9:02:5b:8c", "profileNum": 3, "store": "local"},
        "oauth": oauth,
        "apiBaseUrl": api_base_url,
        "postbackUrl": format!("{api_base_url}/postback"),
        "stateFile": dir.join("state.json"),
    });
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}
