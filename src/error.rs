use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("Not authenticated with Ring. Please initiate authentication")]
    NotAuthenticated,

    #[error("OAuth token refresh failed: {0}")]
    RefreshError(String),

    #[error("OAuth configuration is missing {}", .0.join(", "))]
    ConfigIncomplete(Vec<&'static str>),

    #[error("Call {method} {url} failed with status {status}: {body}")]
    Api {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Cannot connect to {url}: {source}")]
    ConnectionFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("Custom data store error: {0}")]
    StoreError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RingError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            RingError::NotAuthenticated => "not_authenticated",
            RingError::RefreshError(_) => "refresh_failed",
            RingError::ConfigIncomplete(_) => "config_incomplete",
            RingError::Api { .. } => "api_error",
            RingError::ConnectionFailed { .. } => "connection_refused",
            RingError::Webhook(_) => "webhook_error",
            RingError::ProtocolError(_) => "parse_error",
            RingError::ConfigError { .. } => "config_error",
            RingError::StoreError(_) => "store_error",
            RingError::IoError(_) => "io_error",
        }
    }

    /// HTTP status of a failed Ring API call, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self {
            RingError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
