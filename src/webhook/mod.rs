pub mod event;
pub mod listener;
pub mod pragma;

pub use event::{parse_event, RingEvent, RingEventKind, WebhookDelivery};
pub use listener::WebhookListener;
pub use pragma::WebhookAuthenticator;
