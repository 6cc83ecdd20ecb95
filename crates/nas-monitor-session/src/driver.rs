//! Session driver task.
//!
//! [`start_session`] spawns one task per session. The task owns the
//! [`Session`] record and drives it through connect, handshake and
//! subscription on each link, consulting the [`ReconnectPolicy`] whenever a
//! link closes. The caller keeps a [`SessionHandle`] to observe the derived
//! [`ConnectionState`] and to stop the session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nas_monitor_core::{
    ClientConfig, ConnectionState, Credential, Endpoint, SessionId, SessionInfo, Status,
};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::protocol::{Protocol, ProtocolAction};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::session::Session;
use crate::sink::StatusSink;
use crate::transport::{Connector, Link};

/// Tunables for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Consecutive reconnections before the session is declared dead
    pub max_retries: u32,
    /// Pause before each reconnection
    pub retry_delay: Duration,
    /// Close a link whose outstanding request stays unanswered this long
    pub stage_timeout: Option<Duration>,
}

impl SessionOptions {
    /// Options from the `reconnect` and `session` config sections.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.reconnect.max_retries,
            retry_delay: config.reconnect.retry_delay(),
            stage_timeout: config.session.stage_timeout(),
        }
    }

    fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::with_delay(self.max_retries, self.retry_delay)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Start a session on the current tokio runtime.
///
/// Every status the session produces is delivered to `sink`. The session
/// runs until its retry budget is exhausted, the login is rejected, or the
/// returned handle is closed or dropped.
pub fn start_session<C, S>(
    connector: C,
    endpoint: Endpoint,
    credential: Credential,
    sink: S,
    options: SessionOptions,
) -> SessionHandle
where
    C: Connector,
    S: StatusSink + 'static,
{
    let session = Session::new(endpoint.clone(), credential);
    let id = *session.id();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let driver = Driver {
        connector,
        session,
        sink: Arc::new(sink),
        policy: options.policy(),
        stage_timeout: options.stage_timeout,
        state: state_tx,
        shutdown: shutdown_rx,
    };
    let task = tokio::spawn(driver.run());

    SessionHandle {
        id,
        endpoint,
        state: state_rx,
        shutdown: shutdown_tx,
        task,
    }
}

/// Handle to a running session.
///
/// Dropping the handle stops the session like [`SessionHandle::close`], but
/// without waiting for the task to finish.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    endpoint: Endpoint,
    state: watch::Receiver<ConnectionState>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Get the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the remote endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current derived connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Snapshot for listings.
    pub fn info(&self) -> SessionInfo {
        SessionInfo::new(self.id, self.endpoint.clone(), self.state())
    }

    /// Whether the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the session and wait for the driver to exit.
    ///
    /// The open link is closed and no reconnection is attempted.
    pub async fn close(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("Session task failed: id={}, error={}", self.id, e);
        }
    }

    /// Wait for the session to end on its own and return its final state.
    pub async fn wait(self) -> ConnectionState {
        let Self {
            id,
            state,
            shutdown,
            task,
            ..
        } = self;
        if let Err(e) = task.await {
            error!("Session task failed: id={}, error={}", id, e);
        }
        drop(shutdown);
        let last = *state.borrow();
        last
    }
}

/// How a single link ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    /// Transport closed or failed; subject to the reconnection policy
    Closed,
    /// Login rejected; never retried
    Terminal,
    /// Caller stopped the session
    Cancelled,
}

enum LinkEvent {
    Frame(String),
    Closed,
    TimedOut,
    Cancelled,
}

struct Driver<C: Connector> {
    connector: C,
    session: Session,
    sink: Arc<dyn StatusSink>,
    policy: ReconnectPolicy,
    stage_timeout: Option<Duration>,
    state: watch::Sender<ConnectionState>,
    shutdown: oneshot::Receiver<()>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        info!(
            "Session started: id={}, endpoint={}",
            self.session.id(),
            self.session.endpoint()
        );

        loop {
            match self.run_link().await {
                LinkOutcome::Cancelled => {
                    info!("Session closed by caller: id={}", self.session.id());
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
                LinkOutcome::Terminal => {
                    self.set_state(ConnectionState::Dead);
                    return;
                }
                LinkOutcome::Closed => self.set_state(ConnectionState::Disconnected),
            }

            match self.policy.on_close(&mut self.session) {
                ReconnectDecision::Retry { delay, .. } => {
                    if delay.is_zero() {
                        continue;
                    }
                    let cancelled = tokio::select! {
                        biased;
                        _ = &mut self.shutdown => true,
                        _ = tokio::time::sleep(delay) => false,
                    };
                    if cancelled {
                        info!("Session closed by caller: id={}", self.session.id());
                        return;
                    }
                }
                ReconnectDecision::GiveUp => {
                    self.sink.notify_status(&Status::Dead);
                    self.set_state(ConnectionState::Dead);
                    return;
                }
            }
        }
    }

    /// Open one link and drive it until it ends.
    async fn run_link(&mut self) -> LinkOutcome {
        self.set_state(ConnectionState::Connecting);

        let connected = tokio::select! {
            biased;
            _ = &mut self.shutdown => return LinkOutcome::Cancelled,
            result = within(
                self.stage_timeout,
                self.connector.connect(self.session.endpoint()),
            ) => result,
        };
        let mut link = match connected {
            Some(Ok(link)) => link,
            Some(Err(e)) => {
                warn!("Connect failed: session={}, {}", self.session.id(), e);
                return LinkOutcome::Closed;
            }
            None => {
                warn!("Connect timed out: session={}", self.session.id());
                return LinkOutcome::Closed;
            }
        };

        let mut protocol = Protocol::new();
        let actions = protocol.on_open(&mut self.session);
        if let Some(outcome) = self.apply(&mut link, &protocol, actions).await {
            link.close().await;
            return outcome;
        }

        loop {
            let deadline = self.stage_timeout.filter(|_| protocol.is_awaiting_reply());
            let event = tokio::select! {
                biased;
                _ = &mut self.shutdown => LinkEvent::Cancelled,
                frame = within(deadline, link.recv()) => match frame {
                    Some(Some(frame)) => LinkEvent::Frame(frame),
                    Some(None) => LinkEvent::Closed,
                    None => LinkEvent::TimedOut,
                },
            };

            match event {
                LinkEvent::Frame(frame) => {
                    let actions = protocol.on_frame(&mut self.session, &frame);
                    if let Some(outcome) = self.apply(&mut link, &protocol, actions).await {
                        link.close().await;
                        return outcome;
                    }
                }
                LinkEvent::Closed => {
                    info!(
                        "Link closed: session={}, stage={:?}",
                        self.session.id(),
                        protocol.stage()
                    );
                    return LinkOutcome::Closed;
                }
                LinkEvent::TimedOut => {
                    warn!(
                        "No reply in stage {:?}, closing link: session={}",
                        protocol.stage(),
                        self.session.id()
                    );
                    link.close().await;
                    return LinkOutcome::Closed;
                }
                LinkEvent::Cancelled => {
                    link.close().await;
                    return LinkOutcome::Cancelled;
                }
            }
        }
    }

    /// Execute protocol actions in order. Returns the outcome if the link
    /// must end.
    async fn apply(
        &self,
        link: &mut C::Link,
        protocol: &Protocol,
        actions: Vec<ProtocolAction>,
    ) -> Option<LinkOutcome> {
        for action in actions {
            match action {
                ProtocolAction::Send(message) => {
                    let frame = match message.encode() {
                        Ok(frame) => frame,
                        Err(e) => {
                            error!("Failed to encode {}: {}", message.kind(), e);
                            return Some(LinkOutcome::Closed);
                        }
                    };
                    debug!("Sending {}: session={}", message.kind(), self.session.id());
                    if let Err(e) = link.send(frame).await {
                        warn!("Send failed: session={}, {}", self.session.id(), e);
                        return Some(LinkOutcome::Closed);
                    }
                }
                ProtocolAction::Notify(status) => self.sink.notify_status(&status),
                ProtocolAction::Close => return Some(LinkOutcome::Terminal),
            }
        }

        self.set_state(protocol.connection_state());
        None
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(
                "State change: session={}, {} -> {}",
                self.session.id(),
                previous,
                state
            );
        }
    }
}

/// Await `future`, giving up after `limit` when one is set.
async fn within<F: Future>(limit: Option<Duration>, future: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}
