//! Error types for the nas-monitor client.

use thiserror::Error;

use crate::SessionId;

/// Main error type for nas-monitor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure (connect refused, socket reset, send on a dead link)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol violation (request before the session is bound, missing token)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Inbound frame that matches none of the known shapes
    #[error("Unrecognized frame: {0}")]
    UnrecognizedFrame(String),

    /// Endpoint address could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Session limit reached
    #[error("Session limit reached (max: {0})")]
    SessionLimitReached(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
