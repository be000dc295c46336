//! Astra gesture relay
//!
//! Run with: cargo run --bin astra-relay
//!
//! # Configuration
//!
//! Reads the `[relay]`, `[canvas]` and `[api]` sections of the config file.
//! Environment overrides:
//! - `ASTRA_RELAY_HOST`: Host to bind to (default: 0.0.0.0)
//! - `ASTRA_RELAY_PORT`: Port to listen on (default: 8090)
//! - `ASTRA_API_URL`: Backend used to validate tokens when `require_auth` is set
//! - `RUST_LOG`: Log filter (default: from `[logging]`)

use astra::client::ApiClient;
use astra::config::Config;
use astra::relay::{serve, RelayState};
use astra::session::SessionStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "astra-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Websocket relay running the hand tracker for thin clients")]
struct Args {
    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port, overriding the config
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.relay.port = port;
    }
    astra::logging::init(&config.logging);

    tracing::info!("Starting Astra relay v{}", env!("CARGO_PKG_VERSION"));

    let auth = if config.relay.require_auth {
        tracing::info!(backend = %config.api.base_url, "Token validation enabled");
        let client = ApiClient::new(config.api.client_config(), Arc::new(SessionStore::in_memory()))?;
        Some(client)
    } else {
        tracing::warn!("Token validation disabled, any client may connect");
        None
    };

    let server_config = config.relay.server_config(&config.canvas);
    tracing::info!(
        max_connections = server_config.max_connections,
        width = server_config.tracker.width,
        height = server_config.tracker.height,
        "Relay configured"
    );

    serve(RelayState::new(server_config, auth)).await?;
    Ok(())
}
