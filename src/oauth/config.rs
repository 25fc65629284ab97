use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RingError;

/// Hub custom namespace carrying the OAuth settings from the node server store.
pub const OAUTH_NAMESPACE: &str = "oauth";

/// OAuth endpoints and client credentials.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub auth_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Extra query parameters for the authorization request.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Extra form fields sent with every token request.
    #[serde(default)]
    pub token_parameters: BTreeMap<String, String>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("auth_endpoint", &self.auth_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "********"))
            .field("parameters", &self.parameters)
            .field("token_parameters", &self.token_parameters)
            .finish()
    }
}

/// The fields a refresh cannot do without.
#[derive(Debug, Clone, Copy)]
pub struct RefreshCredentials<'a> {
    pub token_endpoint: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl OAuthConfig {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("auth_endpoint", &self.auth_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];
        fields
            .into_iter()
            .filter(|(_, value)| non_empty(value).is_none())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn refresh_credentials(&self) -> Result<RefreshCredentials<'_>, RingError> {
        match (
            non_empty(&self.auth_endpoint),
            non_empty(&self.token_endpoint),
            non_empty(&self.client_id),
            non_empty(&self.client_secret),
        ) {
            (Some(_), Some(token_endpoint), Some(client_id), Some(client_secret)) => {
                Ok(RefreshCredentials {
                    token_endpoint,
                    client_id,
                    client_secret,
                })
            }
            _ => Err(RingError::ConfigIncomplete(self.missing_fields())),
        }
    }

    fn merge(&mut self, update: &OAuthSettingsUpdate) {
        if let Some(id) = &update.client_id {
            self.client_id = Some(id.clone());
        }
        if let Some(secret) = &update.client_secret {
            self.client_secret = Some(secret.clone());
        }
        self.parameters
            .extend(update.parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.token_parameters
            .extend(update.token_parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Overrides the user can set through custom parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OAuthSettingsUpdate {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub parameters: BTreeMap<String, String>,
    pub token_parameters: BTreeMap<String, String>,
}

impl OAuthSettingsUpdate {
    pub fn from_custom_params(params: &BTreeMap<String, String>) -> Self {
        let mut update = Self::default();
        if let Some(id) = params.get("client_id") {
            tracing::info!("oAuth client_id set to: {id}");
            update.client_id = Some(id.clone());
        }
        if let Some(secret) = params.get("client_secret") {
            tracing::info!("oAuth secret set to: ********");
            update.client_secret = Some(secret.clone());
        }
        if let Some(value) = params.get("my_auth_param") {
            tracing::info!("Setting oAuth my_auth_param to: {value}");
            update
                .parameters
                .insert("my_auth_param".to_string(), value.clone());
        }
        if let Some(value) = params.get("my_token_param") {
            tracing::info!("Setting oAuth my_token_param to: {value}");
            update
                .token_parameters
                .insert("my_token_param".to_string(), value.clone());
        }
        update
    }
}

/// Source of the effective OAuth settings: hub push merged with user overrides.
#[derive(Debug, Default)]
pub struct OAuthConfigProvider {
    pushed: OAuthConfig,
    overrides: OAuthSettingsUpdate,
    effective: OAuthConfig,
}

impl OAuthConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &OAuthConfig {
        &self.effective
    }

    /// Take a new configuration pushed by the hub. Missing fields are logged,
    /// never rejected.
    pub fn update(&mut self, data: serde_json::Value) {
        match serde_json::from_value::<OAuthConfig>(data) {
            Ok(config) => self.pushed = config,
            Err(e) => {
                tracing::error!("Unreadable oAuth configuration: {e}");
                self.pushed = OAuthConfig::default();
            }
        }
        self.rebuild();
        for field in self.effective.missing_fields() {
            tracing::error!("oAuth configuration is missing {field}");
        }
    }

    pub fn apply_overrides(&mut self, update: OAuthSettingsUpdate) {
        tracing::debug!("Updating oAuth config using: {update:?}");
        self.overrides = update;
        self.rebuild();
        tracing::info!("Updated oAuth config: {:?}", self.effective);
    }

    fn rebuild(&mut self) {
        let mut effective = self.pushed.clone();
        effective.merge(&self.overrides);
        self.effective = effective;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> serde_json::Value {
        serde_json::json!({
            "auth_endpoint": "https://oauth.ring.com/oauth/authorize",
            "token_endpoint": "https://oauth.ring.com/oauth/token",
            "client_id": "id",
            "client_secret": "secret"
        })
    }

    #[test]
    fn empty_until_pushed() {
        let provider = OAuthConfigProvider::new();
        assert_eq!(provider.get(), &OAuthConfig::default());
        assert_eq!(provider.get().missing_fields().len(), 4);
    }

    #[test]
    fn update_with_full_config() {
        let mut provider = OAuthConfigProvider::new();
        provider.update(full());
        assert!(provider.get().missing_fields().is_empty());
        let creds = provider.get().refresh_credentials().unwrap();
        assert_eq!(creds.token_endpoint, "https://oauth.ring.com/oauth/token");
        assert_eq!(creds.client_secret, "secret");
    }

    #[test]
    fn partial_config_is_accepted_but_reported() {
        let mut provider = OAuthConfigProvider::new();
        provider.update(serde_json::json!({"client_id": "id", "token_endpoint": ""}));
        assert_eq!(provider.get().client_id.as_deref(), Some("id"));
        assert_eq!(
            provider.get().missing_fields(),
            vec!["auth_endpoint", "token_endpoint", "client_secret"]
        );
        let err = provider.get().refresh_credentials().unwrap_err();
        match err {
            RingError::ConfigIncomplete(fields) => {
                assert_eq!(fields, vec!["auth_endpoint", "token_endpoint", "client_secret"])
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn auth_endpoint_is_required_for_refresh() {
        let mut provider = OAuthConfigProvider::new();
        let mut settings = full();
        settings["auth_endpoint"] = serde_json::Value::Null;
        provider.update(settings);
        match provider.get().refresh_credentials().unwrap_err() {
            RingError::ConfigIncomplete(fields) => assert_eq!(fields, vec!["auth_endpoint"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn overrides_survive_later_pushes() {
        let mut provider = OAuthConfigProvider::new();
        let mut params = BTreeMap::new();
        params.insert("client_id".to_string(), "mine".to_string());
        params.insert("my_token_param".to_string(), "x".to_string());
        provider.apply_overrides(OAuthSettingsUpdate::from_custom_params(&params));
        provider.update(full());

        assert_eq!(provider.get().client_id.as_deref(), Some("mine"));
        assert_eq!(provider.get().client_secret.as_deref(), Some("secret"));
        assert_eq!(provider.get().token_parameters["my_token_param"], "x");
    }

    #[test]
    fn custom_params_mapping() {
        let mut params = BTreeMap::new();
        params.insert("client_secret".to_string(), "s".to_string());
        params.insert("my_auth_param".to_string(), "a".to_string());
        params.insert("shared".to_string(), "true".to_string());
        let update = OAuthSettingsUpdate::from_custom_params(&params);
        assert!(update.client_id.is_none());
        assert_eq!(update.client_secret.as_deref(), Some("s"));
        assert_eq!(update.parameters["my_auth_param"], "a");
        assert!(update.token_parameters.is_empty());
    }

    #[test]
    fn debug_redacts_secret() {
        let mut provider = OAuthConfigProvider::new();
        provider.update(full());
        let printed = format!("{:?}", provider.get());
        assert!(!printed.contains("\"secret\""));
        assert!(printed.contains("********"));
    }
}
