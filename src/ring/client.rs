use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;

use crate::error::RingError;
use crate::hub::{Hub, HubConfig, AUTH_NOTICE, AUTH_NOTICE_KEY};
use crate::oauth::{AccessTokenGate, OAuthConfigProvider, TokenRefresher, TokenStore};
use crate::ring::types::{Device, Devices, UserInfo};
use crate::webhook::WebhookAuthenticator;

pub const RING_API_BASE: &str = "https://api.ring.com/integrations/v1";

const WEBHOOK_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Webhook URL the hub portal exposes for this node server installation.
pub fn postback_url_for(config: &HubConfig) -> String {
    let host = if config.is_local_store() {
        "dev.isy.io"
    } else {
        "my.isy.io"
    };
    tracing::info!(
        "Store is {}: Using hostname {host} for webhook url",
        config.store
    );
    format!(
        "https://{host}/api/eisy/pg3/webhook/noresponse/{}/{}",
        config.uuid, config.profile_num
    )
}

/// Client for the Ring integrations API.
///
/// Every call obtains its bearer token from the [`AccessTokenGate`], which
/// refreshes it inline when needed.
pub struct RingClient {
    http: reqwest::Client,
    base_url: String,
    gate: AccessTokenGate,
    webhook_auth: WebhookAuthenticator,
    hub: Arc<dyn Hub>,
    postback_url: Option<String>,
}

impl std::fmt::Debug for RingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingClient")
            .field("base_url", &self.base_url)
            .field("gate", &self.gate)
            .field("postback_url", &self.postback_url)
            .finish_non_exhaustive()
    }
}

impl RingClient {
    /// Build a client whose token store is backed by the hub's custom data.
    pub fn new(hub: Arc<dyn Hub>) -> Self {
        let http = reqwest::Client::new();
        let store = TokenStore::from_hub(hub.clone());
        let refresher = TokenRefresher::new(http.clone(), store, OAuthConfigProvider::new());
        Self {
            http,
            base_url: RING_API_BASE.to_string(),
            gate: AccessTokenGate::new(refresher),
            webhook_auth: WebhookAuthenticator::new(),
            hub,
            postback_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Deliver webhooks somewhere other than the hub portal.
    pub fn with_postback_url(mut self, url: Option<String>) -> Self {
        self.postback_url = url;
        self
    }

    pub fn oauth(&self) -> &AccessTokenGate {
        &self.gate
    }

    pub fn oauth_mut(&mut self) -> &mut AccessTokenGate {
        &mut self.gate
    }

    pub fn webhook_auth(&self) -> &WebhookAuthenticator {
        &self.webhook_auth
    }

    pub fn postback_url(&self) -> String {
        match &self.postback_url {
            Some(url) => url.clone(),
            None => postback_url_for(&self.hub.config()),
        }
    }

    async fn call_api(
        &mut self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, RingError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::info!("Making call to {method} {url}");

        let access_token = match self.gate.access_token().await {
            Ok(token) => token,
            Err(RingError::NotAuthenticated) => {
                tracing::info!("Access token is not available. Please authenticate.");
                self.hub.set_notice(AUTH_NOTICE_KEY, AUTH_NOTICE);
                return Err(RingError::NotAuthenticated);
            }
            Err(e) => return Err(e),
        };

        if (method == Method::PATCH || method == Method::POST) && body.is_none() {
            tracing::error!("body is required when using {method} with {url}");
        }

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(access_token);
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::error!("Connection error occurred: {e}");
            RingError::ConnectionFailed {
                url: url.clone(),
                source: Box::new(e),
            }
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| RingError::ConnectionFailed {
            url: url.clone(),
            source: Box::new(e),
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::error!(
                "Call {method} {url} failed with status code 401. Asking to re-authorize."
            );
            self.hub.set_notice(AUTH_NOTICE_KEY, AUTH_NOTICE);
        } else if !status.is_success() {
            tracing::error!("Call {method} {url} failed with status {status}: {text}");
        }
        if !status.is_success() {
            return Err(RingError::Api {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::info!("Call {method} {url} successful");
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    async fn call_typed<T: serde::de::DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
    ) -> Result<T, RingError> {
        let value = self.call_api(method, path, None).await?;
        serde_json::from_value(value)
            .map_err(|e| RingError::ProtocolError(format!("Unexpected response from {path}: {e}")))
    }

    pub async fn user_info(&mut self) -> Result<UserInfo, RingError> {
        self.call_typed(Method::GET, "/user/info").await
    }

    pub async fn all_devices(&mut self) -> Result<Devices, RingError> {
        self.call_typed(Method::GET, "/devices").await
    }

    /// Look a device up, fetching the device list unless one is supplied.
    pub async fn device_data(
        &mut self,
        id: u64,
        prefetched: Option<&Devices>,
    ) -> Result<Option<Device>, RingError> {
        match prefetched {
            Some(devices) => Ok(devices.find(id).cloned()),
            None => {
                tracing::info!("No prefetched device data, fetching devices");
                let devices = self.all_devices().await?;
                Ok(devices.find(id).cloned())
            }
        }
    }

    /// Register the postback URL with a freshly issued pragma.
    pub async fn subscribe(&mut self) -> Result<serde_json::Value, RingError> {
        let postback_url = self.postback_url();
        let pragma = self.webhook_auth.issue_pragma();

        tracing::info!("Requesting subscription to {postback_url}");
        let body = serde_json::json!({
            "subscription": {
                "postback_url": postback_url,
                "metadata": {
                    "headers": {
                        "Pragma": pragma
                    }
                }
            }
        });
        self.call_api(Method::PATCH, "/subscription", Some(body)).await
    }

    pub async fn unsubscribe(&mut self) -> Result<serde_json::Value, RingError> {
        self.call_api(Method::DELETE, "/subscription", None).await
    }

    pub async fn floodlight_on(&mut self, device_id: u64) -> Result<serde_json::Value, RingError> {
        self.call_api(Method::PUT, &format!("/devices/{device_id}/floodlight_on"), None)
            .await
    }

    pub async fn floodlight_off(&mut self, device_id: u64) -> Result<serde_json::Value, RingError> {
        self.call_api(Method::PUT, &format!("/devices/{device_id}/floodlight_off"), None)
            .await
    }

    /// POST an event body to our own postback URL, as Ring would.
    pub async fn test_webhook(&self, body: &serde_json::Value) -> Result<(), RingError> {
        let pragma = self.webhook_auth.current().ok_or_else(|| {
            RingError::Webhook("No subscription is active, subscribe first".into())
        })?;
        let url = self.postback_url();

        let resp = self
            .http
            .post(&url)
            .header("pragma", pragma)
            .json(body)
            .timeout(WEBHOOK_TEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RingError::ConnectionFailed {
                url: url.clone(),
                source: Box::new(e),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            503 => tracing::error!(
                "MQTT connection not online. On my.isy.io, please check Select Tool | PG3 | \
                 Remote connection. It has to be active. If you don't see the option, your \
                 device does not support it. Make sure you are using an eisy at 5.6.0 or more \
                 recent, or a Polisy using PG3x."
            ),
            423 => tracing::error!(
                "Make sure that uuid {} is in your portal account, has a license and is authorized.",
                self.hub.config().uuid
            ),
            _ => tracing::error!("Call event url failed POST {url} failed with HTTP {status}"),
        }
        Err(RingError::Webhook(format!(
            "Error sending event to Portal webhook (HTTP {})",
            status.as_u16()
        )))
    }
}
