use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::RingError;
use crate::hub::Hub;
use crate::oauth::token::TokenBundle;

/// Hub custom-data namespace holding the token bundle.
pub const TOKEN_NAMESPACE: &str = "oauthTokens";

/// Namespace older versions kept the bundle in, under the `token` key.
pub const LEGACY_NAMESPACE: &str = "customdata";

/// In-memory copy of the token bundle, written through to the hub store.
pub struct TokenStore {
    hub: Arc<dyn Hub>,
    current: Option<TokenBundle>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_token", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(hub: Arc<dyn Hub>) -> Self {
        Self { hub, current: None }
    }

    /// Start from whatever bundle the hub already has persisted.
    pub fn from_hub(hub: Arc<dyn Hub>) -> Self {
        let mut store = Self::new(hub);
        if let Some(data) = store.hub.custom_data(TOKEN_NAMESPACE) {
            store.load(data);
        }
        store
    }

    pub fn get(&self) -> Option<&TokenBundle> {
        self.current.as_ref()
    }

    pub fn save(&mut self, bundle: TokenBundle) -> Result<&TokenBundle, RingError> {
        self.save_at(bundle, Utc::now())
    }

    /// Stamp the expiry relative to `now`, keep the bundle and persist it.
    pub fn save_at(
        &mut self,
        bundle: TokenBundle,
        now: DateTime<Utc>,
    ) -> Result<&TokenBundle, RingError> {
        let bundle = bundle.stamped(now);
        let data = serde_json::to_value(&bundle)
            .map_err(|e| RingError::StoreError(format!("Failed to serialize token: {e}")))?;
        self.hub.save_custom_data(TOKEN_NAMESPACE, data)?;
        Ok(self.current.insert(bundle))
    }

    /// Adopt a bundle pushed by the hub. The persisted expiry is kept as is.
    pub fn load(&mut self, data: serde_json::Value) {
        if data.is_null() || data.as_object().is_some_and(|o| o.is_empty()) {
            tracing::debug!("No persisted oAuth tokens");
            self.current = None;
            return;
        }
        match serde_json::from_value::<TokenBundle>(data) {
            Ok(bundle) => {
                tracing::debug!("Loaded oAuth tokens, expiry {:?}", bundle.expiry);
                self.current = Some(bundle);
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable persisted oAuth tokens: {e}");
                self.current = None;
            }
        }
    }

    /// Move a bundle kept under `customdata.token` into its own namespace.
    ///
    /// Returns `true` when a migration happened.
    pub fn migrate_legacy(&mut self, custom_data: &serde_json::Value) -> Result<bool, RingError> {
        let Some(obj) = custom_data.as_object() else {
            return Ok(false);
        };
        let Some(token) = obj.get("token").filter(|t| !t.is_null()) else {
            return Ok(false);
        };

        tracing::info!("Migrating tokens for new Ring version");
        self.hub.save_custom_data(TOKEN_NAMESPACE, token.clone())?;

        let remaining: serde_json::Map<String, serde_json::Value> = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "token")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.hub
            .save_custom_data(LEGACY_NAMESPACE, serde_json::Value::Object(remaining))?;

        self.load(token.clone());
        Ok(true)
    }
}
