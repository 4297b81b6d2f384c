use clap::Parser;
use tracing_subscriber::EnvFilter;

use agentq::api::{run_server, AppState};
use agentq::config::{ServiceConfig, DEFAULT_PORT};
use agentq::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "agentq")]
#[command(about = "Centralized task-dispatch service for a fleet of agent workers")]
struct Args {
    /// Port for the HTTP API
    #[arg(long, env = "QUEUE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServiceConfig::new(args.port);

    tracing::info!(port = config.port, "starting agentq");

    let state = AppState::new();
    let shutdown = install_shutdown_handler();

    run_server(config.listen_addr(), state, shutdown).await?;

    tracing::info!("dispatch service stopped");
    Ok(())
}
