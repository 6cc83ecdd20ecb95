//! Session manager for coordinating multiple host sessions.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use nas_monitor_core::{
    ClientConfig, ConnectionState, Credential, Endpoint, Error, Result, SessionId, SessionInfo,
};
use tracing::info;

use crate::driver::{start_session, SessionHandle, SessionOptions};
use crate::sink::StatusSink;
use crate::transport::Connector;

/// Configuration for session manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,

    /// Options applied to every session
    pub options: SessionOptions,
}

impl SessionManagerConfig {
    /// Manager configuration from the client config.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_sessions: config.session.max_sessions,
            options: SessionOptions::from_config(config),
        }
    }
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Session manager for coordinating multiple host sessions.
///
/// Sessions are isolated: each has its own token, retry counter and sink.
/// A session that ended on its own (dead) stays listed until it is closed
/// or its slot is needed by a new session.
pub struct SessionManager<C: Connector + Clone> {
    connector: C,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    config: SessionManagerConfig,
}

impl<C: Connector + Clone> SessionManager<C> {
    /// Create a new session manager with default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, SessionManagerConfig::default())
    }

    /// Create a new session manager with custom configuration.
    pub fn with_config(connector: C, config: SessionManagerConfig) -> Self {
        Self {
            connector,
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Start a new session. Must be called within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`Error::SessionLimitReached`] when `max_sessions` sessions
    /// are still running.
    pub fn start_session<S>(
        &self,
        endpoint: Endpoint,
        credential: Credential,
        sink: S,
    ) -> Result<SessionId>
    where
        S: StatusSink + 'static,
    {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        if sessions.len() >= self.config.max_sessions {
            sessions.retain(|_, handle| !handle.is_finished());
        }
        if sessions.len() >= self.config.max_sessions {
            return Err(Error::SessionLimitReached(self.config.max_sessions));
        }

        let handle = start_session(
            self.connector.clone(),
            endpoint,
            credential,
            sink,
            self.config.options,
        );
        let session_id = *handle.id();
        info!(
            "Session created successfully: id={}, endpoint={}",
            session_id,
            handle.endpoint()
        );
        sessions.insert(session_id, handle);

        Ok(session_id)
    }

    /// Current state of a session.
    pub fn get_state(&self, session_id: &SessionId) -> Result<ConnectionState> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session_id)
            .map(SessionHandle::state)
            .ok_or(Error::SessionNotFound(*session_id))
    }

    /// List all sessions.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.values().map(SessionHandle::info).collect()
    }

    /// Close a session by ID.
    pub async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        let handle = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .ok_or(Error::SessionNotFound(*session_id))?;

        handle.close().await;
        info!("Session closed: id={}", session_id);
        Ok(())
    }

    /// Close all sessions.
    pub async fn close_all(&self) {
        let handles: Vec<SessionHandle> = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        for handle in handles {
            handle.close().await;
        }
    }

    /// Get the number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use crate::transport::{channel, MemoryConnector, MemoryListener};
    use std::time::Duration;

    fn endpoint() -> Endpoint {
        Endpoint::parse("ws://nas.local/websocket").unwrap()
    }

    fn manager(max_sessions: usize) -> (SessionManager<MemoryConnector>, MemoryListener) {
        let (connector, listener) = channel();
        let config = SessionManagerConfig {
            max_sessions,
            options: SessionOptions {
                max_retries: 0,
                retry_delay: Duration::ZERO,
                stage_timeout: None,
            },
        };
        (SessionManager::with_config(connector, config), listener)
    }

    #[test]
    fn test_default_config() {
        let config = SessionManagerConfig::default();
        assert_eq!(config.max_sessions, 4);
        assert_eq!(config.options, SessionOptions::default());
    }

    #[tokio::test]
    async fn test_session_manager_create() {
        let (manager, _listener) = manager(2);
        assert_eq!(manager.session_count(), 0);
        assert!(manager.list_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_session_manager_start_and_list() {
        let (manager, mut listener) = manager(2);

        let id = manager
            .start_session(endpoint(), Credential::new("k"), RecordingSink::new())
            .unwrap();
        let _peer = listener.accept().await.unwrap();

        let sessions = manager.list_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].endpoint, endpoint());
        assert!(manager.get_state(&id).is_ok());

        manager.close_all().await;
    }

    #[tokio::test]
    async fn test_session_manager_get_nonexistent_session() {
        let (manager, _listener) = manager(2);
        let fake_id = SessionId::new();

        assert!(matches!(
            manager.get_state(&fake_id),
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            manager.close_session(&fake_id).await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_session_manager_session_limit() {
        let (manager, mut listener) = manager(2);

        manager
            .start_session(endpoint(), Credential::new("a"), RecordingSink::new())
            .unwrap();
        manager
            .start_session(endpoint(), Credential::new("b"), RecordingSink::new())
            .unwrap();
        let _first = listener.accept().await.unwrap();
        let _second = listener.accept().await.unwrap();

        let result = manager.start_session(endpoint(), Credential::new("c"), RecordingSink::new());
        assert!(matches!(result, Err(Error::SessionLimitReached(2))));

        manager.close_all().await;
    }

    #[tokio::test]
    async fn test_session_manager_close_session() {
        let (manager, mut listener) = manager(2);

        let id = manager
            .start_session(endpoint(), Credential::new("k"), RecordingSink::new())
            .unwrap();
        let mut peer = listener.accept().await.unwrap();
        assert_eq!(manager.session_count(), 1);

        manager.close_session(&id).await.unwrap();
        assert_eq!(manager.session_count(), 0);

        // Connect frame, then the link ends without a reconnection
        assert!(peer.recv().await.is_some());
        assert!(peer.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dead_session_frees_its_slot() {
        let (manager, mut listener) = manager(1);

        let id = manager
            .start_session(endpoint(), Credential::new("k"), RecordingSink::new())
            .unwrap();
        let mut peer = listener.accept().await.unwrap();
        peer.close();

        let mut state = {
            let sessions = manager.sessions.read().unwrap();
            sessions[&id].watch_state()
        };
        state
            .wait_for(|state| *state == ConnectionState::Dead)
            .await
            .unwrap();
        // The watch value is set just before the task returns
        while !manager.sessions.read().unwrap()[&id].is_finished() {
            tokio::task::yield_now().await;
        }

        let replacement =
            manager.start_session(endpoint(), Credential::new("k"), RecordingSink::new());
        assert!(replacement.is_ok());
        assert_eq!(manager.session_count(), 1);

        manager.close_all().await;
    }
}
