//! The per-session record shared by every connection attempt.

use nas_monitor_core::{Credential, Endpoint, Error, Result, SessionId, SessionToken};

/// Mutable state of one logical session.
///
/// A session outlives its transports: every reconnection opens a new link but
/// keeps this record, clearing the token so the next handshake binds a fresh
/// one. Only the component driving the current stage mutates it.
#[derive(Debug)]
pub struct Session {
    /// Local identifier, used in log lines
    id: SessionId,

    /// Remote management socket
    endpoint: Endpoint,

    /// API key
    credential: Credential,

    /// Token bound by the last `connected` frame
    token: Option<SessionToken>,

    /// Reconnection attempts since the last healthy frame
    retry_count: u32,
}

impl Session {
    /// Create a session with no bound token.
    pub fn new(endpoint: Endpoint, credential: Credential) -> Self {
        Self::with_id(SessionId::new(), endpoint, credential)
    }

    /// Create a session with a caller-chosen id.
    pub fn with_id(id: SessionId, endpoint: Endpoint, credential: Credential) -> Self {
        Self {
            id,
            endpoint,
            credential,
            token: None,
            retry_count: 0,
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the remote endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Get the credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Token bound by the current handshake, if any.
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Token for a request; a request before the handshake bound one is a
    /// protocol error.
    pub fn require_token(&self) -> Result<&SessionToken> {
        self.token.as_ref().ok_or_else(|| {
            Error::Protocol("request before the session token was bound".to_string())
        })
    }

    /// Bind the token from a `connected` frame.
    pub fn bind_token(&mut self, token: SessionToken) {
        self.token = Some(token);
    }

    /// Forget the token ahead of a new handshake.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Reconnection attempts since the last healthy frame.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Count one reconnection attempt and return the new count.
    pub fn record_retry(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    /// Reset the retry budget.
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }
}
