use crate::config::load_config;
use crate::error::RingError;
use crate::runner::Runner;

/// Run the node server until Ctrl-C.
pub async fn run_node_server(cli_config: Option<&str>) -> Result<(), RingError> {
    let config = load_config(cli_config)?;
    tracing::info!(
        "Starting Ring node server for {} (slot {})",
        config.hub.uuid,
        config.hub.profile_num
    );
    Runner::new(config)?.run().await
}
