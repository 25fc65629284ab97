use crate::config::load_config;
use crate::error::RingError;
use crate::runner::Runner;
use crate::webhook::{RingEvent, RingEventKind};

/// Subscribe (issuing a fresh pragma), then POST a `webhook-test` event to the
/// postback URL as Ring would.
///
/// A runner already running against the same hub keeps its own pragma and will
/// ignore deliveries until its next long poll.
pub async fn run_test_webhook(
    cli_config: Option<&str>,
    device_id: u64,
    device_name: &str,
) -> Result<(), RingError> {
    let config = load_config(cli_config)?;
    let mut runner = Runner::new(config)?;
    runner.start()?;

    let ring = runner.plugin_mut().ring_mut();
    ring.subscribe().await?;

    let event = RingEvent {
        kind: RingEventKind::WebhookTest,
        device_id,
        device_name: device_name.to_string(),
    };
    ring.test_webhook(&event.to_body()).await?;
    println!("Test event delivered to {}", ring.postback_url());
    Ok(())
}
