pub mod cli;
pub mod config;
pub mod error;
pub mod hub;
pub mod nodes;
pub mod oauth;
pub mod plugin;
pub mod ring;
pub mod runner;
pub mod webhook;

pub use config::{load_config, RingNsConfig};
pub use error::RingError;
pub use hub::{Hub, HubConfig, LocalHub};
pub use oauth::{AccessTokenGate, OAuthConfigProvider, TokenBundle, TokenRefresher, TokenStore};
pub use plugin::{PollKind, RingPlugin};
pub use ring::RingClient;
pub use runner::{HubEvent, Runner};
pub use webhook::WebhookAuthenticator;
