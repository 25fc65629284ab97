use chrono::{DateTime, Utc};

use crate::error::RingError;
use crate::oauth::config::OAuthConfigProvider;
use crate::oauth::refresh::TokenRefresher;
use crate::oauth::store::TokenStore;

/// Where the credential lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No token bundle has ever been obtained.
    Unauthenticated,
    /// A bundle exists and is not close to expiry.
    Authenticated,
    /// A bundle exists but the next access will try a refresh.
    RefreshDue,
    /// The last refresh failed; the stale token is still handed out.
    Degraded,
}

/// Hands out an access token, refreshing it inline when it is about to expire.
#[derive(Debug)]
pub struct AccessTokenGate {
    refresher: TokenRefresher,
    last_refresh_failed: bool,
}

impl AccessTokenGate {
    pub fn new(refresher: TokenRefresher) -> Self {
        Self {
            refresher,
            last_refresh_failed: false,
        }
    }

    pub fn store(&self) -> &TokenStore {
        self.refresher.store()
    }

    pub fn store_mut(&mut self) -> &mut TokenStore {
        self.last_refresh_failed = false;
        self.refresher.store_mut()
    }

    pub fn config(&self) -> &OAuthConfigProvider {
        self.refresher.config()
    }

    pub fn config_mut(&mut self) -> &mut OAuthConfigProvider {
        self.refresher.config_mut()
    }

    pub async fn access_token(&mut self) -> Result<String, RingError> {
        self.access_token_at(Utc::now()).await
    }

    /// Return the current access token as seen at `now`.
    ///
    /// A token within 60 seconds of expiry (or without a known expiry) triggers
    /// one refresh attempt. When that attempt fails the stale token is returned
    /// anyway; only a missing bundle is an error.
    pub async fn access_token_at(&mut self, now: DateTime<Utc>) -> Result<String, RingError> {
        let Some(token) = self.refresher.store().get() else {
            return Err(RingError::NotAuthenticated);
        };

        tracing::debug!("Token expiry is {:?}", token.expiry);
        if token.needs_refresh_at(now) {
            tracing::info!("Access token expired or expiring. Initiating refresh.");
            match self.refresher.refresh_at(now).await {
                Ok(_) => self.last_refresh_failed = false,
                Err(e) => {
                    tracing::error!("{e}. Keeping the existing token.");
                    self.last_refresh_failed = true;
                }
            }
        } else {
            tracing::debug!("Access token is still valid, no need to refresh");
        }

        self.refresher
            .store()
            .get()
            .map(|t| t.access_token.clone())
            .ok_or(RingError::NotAuthenticated)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> AuthState {
        match self.refresher.store().get() {
            None => AuthState::Unauthenticated,
            Some(_) if self.last_refresh_failed => AuthState::Degraded,
            Some(t) if t.needs_refresh_at(now) => AuthState::RefreshDue,
            Some(_) => AuthState::Authenticated,
        }
    }
}
