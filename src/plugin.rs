//! Hub event handlers.
//!
//! [`RingPlugin`] holds everything that lives between start and stop: the Ring
//! client (and with it the OAuth state), the node tree and the controller.
//! Handlers take `&mut self`; the runner calls them one at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RingError;
use crate::hub::{Hub, AUTH_NOTICE, AUTH_NOTICE_KEY};
use crate::nodes::{Controller, NodeRegistry, CONTROLLER_ADDRESS};
use crate::oauth::{OAuthSettingsUpdate, TokenBundle, OAUTH_NAMESPACE, TOKEN_NAMESPACE};
use crate::ring::RingClient;
use crate::webhook::{parse_event, WebhookDelivery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    Short,
    Long,
}

pub struct RingPlugin {
    hub: Arc<dyn Hub>,
    ring: RingClient,
    registry: NodeRegistry,
    controller: Controller,
}

impl std::fmt::Debug for RingPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingPlugin")
            .field("ring", &self.ring)
            .field("registry", &self.registry)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl RingPlugin {
    pub fn new(hub: Arc<dyn Hub>, ring: RingClient) -> Self {
        Self {
            hub,
            ring,
            registry: NodeRegistry::new(),
            controller: Controller::new(),
        }
    }

    pub fn hub(&self) -> &dyn Hub {
        self.hub.as_ref()
    }

    pub fn ring(&self) -> &RingClient {
        &self.ring
    }

    pub fn ring_mut(&mut self) -> &mut RingClient {
        &mut self.ring
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Register the controller node.
    pub fn on_start(&mut self) {
        tracing::info!("Ring node server starting");
        self.hub.add_node(Controller::definition());
    }

    /// Clear notices, then discover and subscribe if we hold a token.
    pub async fn on_config_done(&mut self) -> Result<(), RingError> {
        self.hub.clear_notices();

        match self.ring.oauth_mut().access_token().await {
            Ok(_) => {}
            Err(RingError::NotAuthenticated) => {
                tracing::info!("Access token is not yet available. Please authenticate.");
                self.hub.set_notice(AUTH_NOTICE_KEY, AUTH_NOTICE);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let added = self
            .controller
            .discover(self.hub.as_ref(), &mut self.ring, &mut self.registry)
            .await?;
        tracing::info!("Discovery done, {added} device(s) added");
        self.controller.set_connected(self.hub.as_ref(), true);

        self.ring.subscribe().await?;
        Ok(())
    }

    /// The user just authorized: keep the tokens and start over.
    pub async fn on_oauth_grant(&mut self, grant: serde_json::Value) -> Result<(), RingError> {
        let bundle = TokenBundle::from_grant(grant)?;
        self.ring.oauth_mut().store_mut().save(bundle)?;
        tracing::info!("oAuth tokens received");
        self.on_config_done().await
    }

    /// Long polls renew the subscription (and its pragma); short polls refresh
    /// every node from one device list.
    pub async fn on_poll(&mut self, kind: PollKind) -> Result<(), RingError> {
        match kind {
            PollKind::Long => self.ring.subscribe().await.map(|_| ()),
            PollKind::Short => {
                self.controller
                    .query_all(self.hub.as_ref(), &mut self.ring, &self.registry)
                    .await
            }
        }
    }

    pub fn on_add_node_done(&self, address: &str) {
        self.controller
            .add_node_done(self.hub.as_ref(), &self.registry, address);
    }

    /// Mark every node offline and stop the hub.
    pub fn on_stop(&mut self) {
        for node in self.registry.iter() {
            node.set_offline(self.hub.as_ref());
        }
        self.controller.set_connected(self.hub.as_ref(), false);
        self.hub.stop();
        tracing::info!("Ring node server stopped");
    }

    /// Fire the node an authenticated webhook points at. Returns the address of
    /// the activated node, or `None` when the delivery was ignored.
    pub fn on_webhook(&self, delivery: &WebhookDelivery) -> Result<Option<String>, RingError> {
        tracing::debug!("Webhook received: {delivery:?}");

        let current = self.ring.webhook_auth().current();
        let received = delivery.pragma();
        if !received.is_some_and(|p| self.ring.webhook_auth().validate(p)) {
            tracing::info!(
                "Expected pragma {current:?}, received pragma {received:?}: Webhook is ignored."
            );
            return Ok(None);
        }

        tracing::info!("Webhook body received: {}", delivery.body);
        let Some(event) = parse_event(&delivery.body)? else {
            return Ok(None);
        };

        let address = event.node_address();
        tracing::info!(
            "Event {} for address {address} ({})",
            event.kind.as_str(),
            event.device_name
        );

        match self.registry.get(&address) {
            Some(node) => {
                node.activate(self.hub.as_ref());
                Ok(Some(address))
            }
            None => {
                tracing::info!("Node {address} not found");
                Ok(None)
            }
        }
    }

    /// Content of the legacy `customdata` namespace.
    pub fn on_custom_data(&mut self, data: &serde_json::Value) -> Result<(), RingError> {
        self.ring
            .oauth_mut()
            .store_mut()
            .migrate_legacy(data)
            .map(|_| ())
    }

    pub fn on_custom_ns(&mut self, key: &str, data: serde_json::Value) {
        tracing::debug!("customNsHandler {key}: {data}");
        match key {
            OAUTH_NAMESPACE => self.ring.oauth_mut().config_mut().update(data),
            TOKEN_NAMESPACE => self.ring.oauth_mut().store_mut().load(data),
            _ => {}
        }
    }

    pub fn on_custom_params(&mut self, params: &BTreeMap<String, String>) {
        let shared = params
            .get("shared")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        self.controller.set_include_shared(shared);

        let update = OAuthSettingsUpdate::from_custom_params(params);
        self.ring.oauth_mut().config_mut().apply_overrides(update);
    }

    /// Dispatch a command sent by the hub to one of our nodes.
    pub async fn on_command(&mut self, address: &str, command: &str) -> Result<(), RingError> {
        tracing::info!("Command {command} for node {address}");
        if address == CONTROLLER_ADDRESS {
            return match command {
                "DISCOVER" => self
                    .controller
                    .discover(self.hub.as_ref(), &mut self.ring, &mut self.registry)
                    .await
                    .map(|_| ()),
                "QUERYALL" => {
                    self.controller
                        .query_all(self.hub.as_ref(), &mut self.ring, &self.registry)
                        .await
                }
                other => Err(RingError::ProtocolError(format!(
                    "Unsupported command {other} for {address}"
                ))),
            };
        }

        let node = self
            .registry
            .get(address)
            .ok_or_else(|| RingError::ProtocolError(format!("Unknown node {address}")))?;
        node.command(command, self.hub.as_ref(), &mut self.ring).await
    }
}
