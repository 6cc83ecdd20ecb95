//! The monitor loop: one session, run until it dies or the caller stops it.

use std::future::Future;

use anyhow::Context;
use nas_monitor_core::{ClientConfig, ConnectionState, Credential};
use nas_monitor_session::{start_session, Connector, SessionOptions, StatusSink};
use tracing::{info, warn};

/// Monitor the configured host until the session dies or `shutdown`
/// completes.
///
/// Returns the final connection state: [`ConnectionState::Dead`] when the
/// session gave up, [`ConnectionState::Disconnected`] after a shutdown.
pub async fn run<C, S, F>(
    connector: C,
    config: &ClientConfig,
    sink: S,
    shutdown: F,
) -> anyhow::Result<ConnectionState>
where
    C: Connector,
    S: StatusSink + 'static,
    F: Future<Output = ()>,
{
    let endpoint = config
        .host
        .endpoint()
        .context("no host to monitor (use --url, NAS_MONITOR_URL or host.url)")?;
    let credential = config
        .host
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .map(Credential::new)
        .context("no API key (use NAS_MONITOR_API_KEY or host.api_key)")?;

    let handle = start_session(
        connector,
        endpoint,
        credential,
        sink,
        SessionOptions::from_config(config),
    );
    info!("Monitoring {}: session={}", handle.endpoint(), handle.id());

    let mut state = handle.watch_state();
    tokio::pin!(shutdown);
    let stopped = tokio::select! {
        _ = &mut shutdown => true,
        _ = state.wait_for(|state| state.is_terminal()) => false,
    };

    if stopped {
        info!("Shutdown requested, closing session {}", handle.id());
        handle.close().await;
        return Ok(ConnectionState::Disconnected);
    }

    let id = *handle.id();
    let last = handle.wait().await;
    warn!("Session {} ended: state={}", id, last);
    Ok(last)
}
