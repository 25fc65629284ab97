//! Standalone event loop: a [`LocalHub`], poll timers and the webhook listener
//! feeding one [`RingPlugin`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::RingNsConfig;
use crate::error::RingError;
use crate::hub::{Hub, LocalHub};
use crate::oauth::{LEGACY_NAMESPACE, OAUTH_NAMESPACE};
use crate::plugin::{PollKind, RingPlugin};
use crate::ring::RingClient;
use crate::webhook::{WebhookDelivery, WebhookListener};

const WEBHOOK_QUEUE: usize = 32;

/// Everything the hub can ask of the node server.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    ConfigDone,
    OAuthGrant(serde_json::Value),
    Poll(PollKind),
    Webhook(WebhookDelivery),
    CustomData(serde_json::Value),
    CustomNs {
        key: String,
        data: serde_json::Value,
    },
    CustomParams(BTreeMap<String, String>),
    AddNodeDone(String),
    Command {
        address: String,
        command: String,
    },
    Stop,
}

#[derive(Debug)]
pub struct Runner {
    config: RingNsConfig,
    hub: Arc<LocalHub>,
    plugin: RingPlugin,
}

impl Runner {
    /// Open the state file named by the config and build the plugin.
    pub fn new(config: RingNsConfig) -> Result<Self, RingError> {
        let hub = Arc::new(LocalHub::open(config.hub.clone(), &config.state_path())?);
        Ok(Self::with_hub(config, hub))
    }

    pub fn with_hub(config: RingNsConfig, hub: Arc<LocalHub>) -> Self {
        let mut ring = RingClient::new(hub.clone()).with_postback_url(config.postback_url.clone());
        if let Some(base_url) = &config.api_base_url {
            ring = ring.with_base_url(base_url);
        }
        let plugin = RingPlugin::new(hub.clone(), ring);
        Self {
            config,
            hub,
            plugin,
        }
    }

    pub fn hub(&self) -> &Arc<LocalHub> {
        &self.hub
    }

    pub fn plugin(&self) -> &RingPlugin {
        &self.plugin
    }

    pub fn plugin_mut(&mut self) -> &mut RingPlugin {
        &mut self.plugin
    }

    /// Replay what the hub delivers on startup, without config-done.
    pub fn start(&mut self) -> Result<(), RingError> {
        self.plugin.on_start();

        if !self.config.oauth.is_null() {
            self.dispatch_sync(HubEvent::CustomNs {
                key: OAUTH_NAMESPACE.to_string(),
                data: self.config.oauth.clone(),
            })?;
        }
        if let Some(data) = self.hub.custom_data(LEGACY_NAMESPACE) {
            self.dispatch_sync(HubEvent::CustomData(data))?;
        }
        self.dispatch_sync(HubEvent::CustomParams(self.config.custom_params.clone()))?;
        self.deliver_added_nodes();
        Ok(())
    }

    /// Handle one event, then deliver add-node-done for nodes it created.
    pub async fn dispatch(&mut self, event: HubEvent) -> Result<(), RingError> {
        let result = match event {
            HubEvent::ConfigDone => self.plugin.on_config_done().await,
            HubEvent::OAuthGrant(grant) => self.plugin.on_oauth_grant(grant).await,
            HubEvent::Poll(kind) => self.plugin.on_poll(kind).await,
            HubEvent::Command { address, command } => {
                self.plugin.on_command(&address, &command).await
            }
            other => self.dispatch_sync(other),
        };
        self.deliver_added_nodes();
        result
    }

    fn dispatch_sync(&mut self, event: HubEvent) -> Result<(), RingError> {
        match event {
            HubEvent::Webhook(delivery) => self.plugin.on_webhook(&delivery).map(|_| ()),
            HubEvent::CustomData(data) => self.plugin.on_custom_data(&data),
            HubEvent::CustomNs { key, data } => {
                self.plugin.on_custom_ns(&key, data);
                Ok(())
            }
            HubEvent::CustomParams(params) => {
                self.plugin.on_custom_params(&params);
                Ok(())
            }
            HubEvent::AddNodeDone(address) => {
                self.plugin.on_add_node_done(&address);
                Ok(())
            }
            HubEvent::Stop => {
                self.plugin.on_stop();
                Ok(())
            }
            other => Err(RingError::ProtocolError(format!(
                "Event {other:?} must be dispatched asynchronously"
            ))),
        }
    }

    fn deliver_added_nodes(&mut self) {
        for address in self.hub.take_added_nodes() {
            self.plugin.on_add_node_done(&address);
        }
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<(), RingError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the event loop until `shutdown` resolves, then stop the plugin.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), RingError>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        self.log_result("config done", HubEvent::ConfigDone).await;

        let (tx, mut rx) = mpsc::channel::<WebhookDelivery>(WEBHOOK_QUEUE);
        let listener = if self.config.webhook_port != 0 {
            let listener =
                WebhookListener::bind(&format!("0.0.0.0:{}", self.config.webhook_port)).await?;
            tracing::info!("Listening for webhooks on {}", listener.local_addr()?);
            Some(listener.spawn(tx.clone()))
        } else {
            None
        };

        let short_period = self.config.short_poll_interval();
        let long_period = self.config.long_poll_interval();
        let mut short = interval_at(Instant::now() + short_period, short_period);
        let mut long = interval_at(Instant::now() + long_period, long_period);
        short.set_missed_tick_behavior(MissedTickBehavior::Delay);
        long.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = short.tick() => {
                    self.log_result("short poll", HubEvent::Poll(PollKind::Short)).await;
                }
                _ = long.tick() => {
                    self.log_result("long poll", HubEvent::Poll(PollKind::Long)).await;
                }
                Some(delivery) = rx.recv() => {
                    self.log_result("webhook", HubEvent::Webhook(delivery)).await;
                }
            }
        }

        if let Some(handle) = listener {
            handle.abort();
        }
        drop(tx);
        self.dispatch(HubEvent::Stop).await
    }

    async fn log_result(&mut self, what: &str, event: HubEvent) {
        if let Err(e) = self.dispatch(event).await {
            tracing::error!("Handling {what} failed: {e}");
        }
    }
}
