//! # nas-monitor-core
//!
//! Core types for the nas-monitor session client.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other nas-monitor crates. It provides:
//!
//! - Wire message types (inbound classification, outbound encoding)
//! - Status and connection state types
//! - Session identity types (SessionId, SessionToken, Credential)
//! - Endpoint parsing
//! - Configuration
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other nas-monitor crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use config::{
    ClientConfig, HostSettings, LoggingSettings, ReconnectSettings, SessionSettings,
};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use message::{EventKind, InboundMessage, OutboundMessage, ResultContext, SUBSCRIPTION_TOPIC};
pub use session::{Credential, SessionId, SessionInfo, SessionToken};
pub use status::{ConnectionState, Status};
