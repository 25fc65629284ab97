use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::RingError;
use crate::nodes::{doorbell_address, motion_address};

/// An inbound webhook call as handed over by the hub (or the local listener).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookDelivery {
    /// Header names are stored lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl WebhookDelivery {
    pub fn new<I, K, V>(headers: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn pragma(&self) -> Option<&str> {
        self.header("pragma")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingEventKind {
    Ding,
    Motion,
    WebhookTest,
}

impl RingEventKind {
    pub fn parse(event: &str) -> Option<Self> {
        match event {
            "new-ding" => Some(Self::Ding),
            "new-motion" => Some(Self::Motion),
            "webhook-test" => Some(Self::WebhookTest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ding => "new-ding",
            Self::Motion => "new-motion",
            Self::WebhookTest => "webhook-test",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingEvent {
    pub kind: RingEventKind,
    pub device_id: u64,
    pub device_name: String,
}

impl RingEvent {
    /// Address of the node that should fire for this event.
    pub fn node_address(&self) -> String {
        match self.kind {
            RingEventKind::Ding | RingEventKind::WebhookTest => doorbell_address(self.device_id),
            RingEventKind::Motion => motion_address(self.device_id),
        }
    }

    /// Body Ring would send for this event; used to exercise the postback URL.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "event": self.kind.as_str(),
            "data": {
                "doorbell": {
                    "id": self.device_id,
                    "description": self.device_name,
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    doorbell: RawDevice,
}

#[derive(Deserialize)]
struct RawDevice {
    id: u64,
    #[serde(default)]
    description: String,
}

/// Parse a webhook body. Unknown event types yield `Ok(None)`.
pub fn parse_event(body: &str) -> Result<Option<RingEvent>, RingError> {
    let raw: RawEvent = serde_json::from_str(body)
        .map_err(|e| RingError::Webhook(format!("Invalid webhook body: {e}")))?;

    let Some(kind) = RingEventKind::parse(&raw.event) else {
        tracing::info!("Invalid event received: {}", raw.event);
        return Ok(None);
    };

    Ok(Some(RingEvent {
        kind,
        device_id: raw.data.doorbell.id,
        device_name: raw.data.doorbell.description,
    }))
}
