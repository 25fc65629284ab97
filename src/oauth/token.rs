use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RingError;

/// Tokens are refreshed once they are this close to expiry.
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: u64,
    /// Absolute expiry, always computed locally when the bundle is saved.
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenBundle {
    /// Parse a grant delivered by the hub after the user authorized the app.
    pub fn from_grant(grant: serde_json::Value) -> Result<Self, RingError> {
        serde_json::from_value(grant)
            .map_err(|e| RingError::ProtocolError(format!("Invalid OAuth grant: {e}")))
    }

    /// Recompute `expiry` as `now + expires_in`, discarding whatever was there.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.expiry = i64::try_from(self.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        self
    }

    /// True when the bundle has no usable expiry or expires within the margin.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - TimeDelta::seconds(REFRESH_MARGIN_SECS),
            None => true,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry,
            None => true,
        }
    }
}

/// Accept RFC 3339 timestamps and the naive local ISO timestamps written by
/// older versions of the node server. Anything else is treated as no expiry.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(s)) = raw else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    Ok(s.parse::<NaiveDateTime>()
        .ok()
        .and_then(|naive| chrono::Local.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc)))
}

/// Raw token response from the OAuth server.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
    #[serde(default = "default_token_type")]
    token_type: String,
}

impl TokenResponse {
    /// Build a fresh bundle. A response without a refresh token keeps the
    /// previous one so the next refresh can still happen.
    pub(crate) fn into_bundle(self, previous_refresh: Option<String>) -> TokenBundle {
        TokenBundle {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            token_type: self.token_type,
            expires_in: self.expires_in,
            expiry: None,
        }
    }
}
