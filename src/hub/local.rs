use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::RingError;

use super::{Driver, Hub, HubConfig, NodeDef};

/// Reported commands kept for inspection; older ones are dropped.
const REPORTED_HISTORY: usize = 256;

/// What the local hub remembers about a registered node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub name: String,
    pub parent: String,
    pub node_def_id: String,
    pub hint: [u8; 4],
    pub drivers: BTreeMap<String, Driver>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    custom: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    notices: BTreeMap<String, String>,
    #[serde(default)]
    nodes: BTreeMap<String, NodeState>,
}

/// A hub that lives in this process, optionally backed by a JSON state file.
///
/// Used by the standalone runner and by tests. Node additions are queued so the
/// runner can deliver the matching add-node-done callbacks.
#[derive(Debug)]
pub struct LocalHub {
    config: HubConfig,
    path: Option<PathBuf>,
    state: Mutex<LocalState>,
    added: Mutex<Vec<String>>,
    reported: Mutex<VecDeque<(String, String)>>,
    stopped: AtomicBool,
}

impl LocalHub {
    pub fn in_memory(config: HubConfig) -> Self {
        Self::with_state(config, None, LocalState::default())
    }

    /// Open a hub persisted at `path`. A missing file starts empty.
    pub fn open(config: HubConfig, path: &Path) -> Result<Self, RingError> {
        let state = match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                RingError::StoreError(format!("Invalid state file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LocalState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::with_state(config, Some(path.to_path_buf()), state))
    }

    fn with_state(config: HubConfig, path: Option<PathBuf>, state: LocalState) -> Self {
        Self {
            config,
            path,
            state: Mutex::new(state),
            added: Mutex::new(Vec::new()),
            reported: Mutex::new(VecDeque::new()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn notices(&self) -> BTreeMap<String, String> {
        self.state().notices.clone()
    }

    pub fn notice(&self, key: &str) -> Option<String> {
        self.state().notices.get(key).cloned()
    }

    pub fn node(&self, address: &str) -> Option<NodeState> {
        self.state().nodes.get(address).cloned()
    }

    pub fn node_addresses(&self) -> Vec<String> {
        self.state().nodes.keys().cloned().collect()
    }

    pub fn driver(&self, address: &str, driver: &str) -> Option<f64> {
        self.state()
            .nodes
            .get(address)
            .and_then(|n| n.drivers.get(driver))
            .map(|d| d.value)
    }

    /// Commands reported since the last call, as `(address, command)` pairs.
    pub fn take_reported_commands(&self) -> Vec<(String, String)> {
        lock(&self.reported).drain(..).collect()
    }

    /// Addresses added since the last call.
    pub fn take_added_nodes(&self) -> Vec<String> {
        std::mem::take(&mut *lock(&self.added))
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        lock(&self.state)
    }

    fn persist(&self, state: &LocalState) -> Result<(), RingError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(state)
            .map_err(|e| RingError::StoreError(format!("Failed to serialize state: {e}")))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn persist_or_warn(&self, state: &LocalState) {
        if let Err(e) = self.persist(state) {
            tracing::warn!("Could not persist hub state: {e}");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Hub for LocalHub {
    fn config(&self) -> HubConfig {
        self.config.clone()
    }

    fn custom_data(&self, namespace: &str) -> Option<serde_json::Value> {
        self.state().custom.get(namespace).cloned()
    }

    fn save_custom_data(
        &self,
        namespace: &str,
        data: serde_json::Value,
    ) -> Result<(), RingError> {
        let mut state = self.state();
        let mut updated = state.clone();
        updated.custom.insert(namespace.to_string(), data);
        self.persist(&updated)?;
        *state = updated;
        Ok(())
    }

    fn set_notice(&self, key: &str, message: &str) {
        let mut state = self.state();
        state.notices.insert(key.to_string(), message.to_string());
        self.persist_or_warn(&state);
    }

    fn clear_notices(&self) {
        let mut state = self.state();
        state.notices.clear();
        self.persist_or_warn(&state);
    }

    fn add_node(&self, node: NodeDef) {
        let mut state = self.state();
        let drivers = node
            .drivers
            .into_iter()
            .map(|d| (d.driver.clone(), d))
            .collect();
        state.nodes.insert(
            node.address.clone(),
            NodeState {
                name: node.name,
                parent: node.parent,
                node_def_id: node.node_def_id.to_string(),
                hint: node.hint,
                drivers,
            },
        );
        self.persist_or_warn(&state);
        drop(state);
        lock(&self.added).push(node.address);
    }

    fn set_driver(&self, address: &str, driver: &str, value: f64, uom: u16) {
        let mut state = self.state();
        match state.nodes.get_mut(address) {
            Some(node) => {
                node.drivers
                    .insert(driver.to_string(), Driver::new(driver, value, uom));
            }
            None => {
                tracing::warn!("set_driver {driver} on unknown node {address}");
                return;
            }
        }
        self.persist_or_warn(&state);
    }

    fn report_cmd(&self, address: &str, command: &str) {
        tracing::info!("Node {address} reports {command}");
        let mut reported = lock(&self.reported);
        if reported.len() == REPORTED_HISTORY {
            reported.pop_front();
        }
        reported.push_back((address.to_string(), command.to_string()));
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
