pub mod config;
pub mod gate;
pub mod refresh;
pub mod store;
pub mod token;

pub use config::{OAuthConfig, OAuthConfigProvider, OAuthSettingsUpdate, OAUTH_NAMESPACE};
pub use gate::{AccessTokenGate, AuthState};
pub use refresh::TokenRefresher;
pub use store::{TokenStore, LEGACY_NAMESPACE, TOKEN_NAMESPACE};
pub use token::{TokenBundle, REFRESH_MARGIN_SECS};
