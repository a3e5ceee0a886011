#![warn(clippy::nursery, clippy::pedantic)]

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use pastebin_lite_server::{app, AppState, Config, SqliteStore};
use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load()?;
    if config.test_mode {
        warn!("TEST_MODE is on: clients may override the clock");
    }

    let store = Arc::new(
        SqliteStore::new(&config.database_path, config.database_max_connections)
            .await
            .with_context(|| format!("Failed to open {}", config.database_path.display()))?,
    );
    info!(path = %config.database_path.display(), "Opened paste store");

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Server starting");

    let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT])?;
    let handle = signals.handle();

    let state = AppState::new(config, store.clone());
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal(signals))
        .await?;

    handle.close();
    // Must be called for a clean WAL checkpoint
    store.close().await;
    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn shutdown_signal(mut signals: Signals) {
    if let Some(signal) = signals.next().await {
        info!(signal, "Received signal, shutting down");
    }
}
