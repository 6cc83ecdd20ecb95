//! # nas-monitor
//!
//! Watches a storage host's lifecycle state (booting, ready, shutting down)
//! over its management socket and logs every change.
//!
//! ## Architecture
//!
//! This is the binary layer that ties together:
//! - nas-monitor-core: Wire messages, statuses and configuration
//! - nas-monitor-session: Session driver and websocket transport

use clap::Parser;
use nas_monitor::{load_config, run, CliArgs};
use nas_monitor_session::{TracingSink, WsConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = CliArgs::parse();
    let config = load_config(&args)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::info!("nas-monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let state = run(WsConnector::new(), &config, TracingSink, shutdown).await?;
    if state.is_terminal() {
        anyhow::bail!("session ended in state {}", state);
    }

    tracing::info!("nas-monitor shutting down");

    Ok(())
}
