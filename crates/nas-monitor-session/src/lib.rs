//! # nas-monitor-session
//!
//! Session lifecycle for the nas-monitor client.
//!
//! This crate provides:
//! - The handshake and subscription state machine
//! - Bounded reconnection
//! - Status sinks
//! - WebSocket and in-memory transports
//! - The per-session driver task and a multi-session manager
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on nas-monitor-core
//! for wire messages, statuses and configuration, and owns everything that
//! touches a socket.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod manager;
pub mod protocol;
pub mod reconnect;
pub mod session;
pub mod sink;
pub mod transport;

// Re-export commonly used types
pub use driver::{start_session, SessionHandle, SessionOptions};
pub use manager::{SessionManager, SessionManagerConfig};
pub use protocol::{Protocol, ProtocolAction, Stage};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use session::Session;
pub use sink::{RecordingSink, StatusSink, TracingSink};
pub use transport::{
    channel, Connector, Link, MemoryConnector, MemoryLink, MemoryListener, MemoryPeer,
    WsConnector, WsLink,
};
