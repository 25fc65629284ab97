use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ring-ns", version, about = "Ring doorbells and cameras as home automation hub nodes")]
struct Cli {
    /// Path to the runner config file
    #[arg(long, global = true, env = "RING_NS_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node server: poll Ring, receive webhooks, update nodes
    Run,

    /// Store an OAuth grant (token response JSON) and discover devices
    Grant {
        /// File holding the grant, or `-` for stdin
        source: String,
    },

    /// Show authentication state, notices and registered nodes
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the devices of the authorized Ring account
    Devices {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Resubscribe and send a test event through the postback URL
    #[command(name = "test-webhook")]
    TestWebhook {
        /// Ring device id carried by the test event
        #[arg(long, default_value_t = 0)]
        device_id: u64,

        /// Device name carried by the test event
        #[arg(long, default_value = "Test")]
        device_name: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RING_NS_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = matches!(
        cli.command,
        Commands::Status { json: true } | Commands::Devices { json: true }
    );

    if let Err(e) = run(cli).await {
        if json {
            ring_ns::cli::output::print_error(&e, true);
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ring_ns::RingError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run => ring_ns::cli::run::run_node_server(config).await,
        Commands::Grant { source } => ring_ns::cli::grant::run_grant(config, &source).await,
        Commands::Status { json } => ring_ns::cli::status::run_status(config, json).await,
        Commands::Devices { json } => ring_ns::cli::devices::run_devices(config, json).await,
        Commands::TestWebhook {
            device_id,
            device_name,
        } => {
            ring_ns::cli::test_webhook::run_test_webhook(config, device_id, &device_name).await
        }
    }
}
