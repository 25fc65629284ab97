use chrono::{DateTime, Utc};

use crate::error::RingError;
use crate::oauth::config::OAuthConfigProvider;
use crate::oauth::store::TokenStore;
use crate::oauth::token::{TokenBundle, TokenResponse};

/// Exchanges the stored refresh token for a new bundle.
#[derive(Debug)]
pub struct TokenRefresher {
    http: reqwest::Client,
    store: TokenStore,
    config: OAuthConfigProvider,
}

impl TokenRefresher {
    pub fn new(http: reqwest::Client, store: TokenStore, config: OAuthConfigProvider) -> Self {
        Self {
            http,
            store,
            config,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TokenStore {
        &mut self.store
    }

    pub fn config(&self) -> &OAuthConfigProvider {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut OAuthConfigProvider {
        &mut self.config
    }

    pub async fn refresh(&mut self) -> Result<TokenBundle, RingError> {
        self.refresh_at(Utc::now()).await
    }

    /// Run the refresh-token grant. On any failure the stored bundle is left
    /// untouched and the error is reported as [`RingError::RefreshError`].
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<TokenBundle, RingError> {
        tracing::info!("Refreshing oAuth tokens");

        let previous_refresh = self
            .store
            .get()
            .and_then(|t| t.refresh_token.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RingError::RefreshError("No refresh token available".into()))?;

        let config = self.config.get();
        let creds = config
            .refresh_credentials()
            .map_err(|e| RingError::RefreshError(e.to_string()))?;

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", previous_refresh.as_str()),
            ("client_id", creds.client_id),
            ("client_secret", creds.client_secret),
        ];
        form.extend(
            config
                .token_parameters
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        let resp = self
            .http
            .post(creds.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| RingError::RefreshError(format!("Token refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Failed to refresh oAuth token: {status}");
            return Err(RingError::RefreshError(format!(
                "Token refresh failed with status {status}: {body}"
            )));
        }

        let token_resp: TokenResponse = resp.json().await.map_err(|e| {
            RingError::RefreshError(format!("Failed to parse refresh token response: {e}"))
        })?;

        let bundle = token_resp.into_bundle(Some(previous_refresh));
        let saved = self
            .store
            .save_at(bundle, now)
            .map_err(|e| RingError::RefreshError(format!("Failed to save refreshed tokens: {e}")))?
            .clone();
        tracing::info!("Refreshing oAuth tokens successful");
        Ok(saved)
    }
}
