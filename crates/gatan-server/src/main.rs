//! Gatan multiplayer relay server.

use gatan_server::{run_server, ServerConfig, ServerState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        addr = %config.addr,
        max_players = config.max_players,
        grace_secs = config.disconnect_grace.as_secs(),
        "Starting Gatan relay..."
    );

    let state = Arc::new(ServerState::new(config));

    run_server(state).await
}
