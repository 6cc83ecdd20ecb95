//! Transport abstraction.
//!
//! A [`Connector`] opens [`Link`]s to an endpoint. A link carries text frames
//! only and has no knowledge of the session protocol. Two implementations
//! exist: [`WsConnector`] for real hosts and the in-process
//! [`MemoryConnector`] used by tests.

mod memory;
mod ws;

pub use memory::{channel, MemoryConnector, MemoryLink, MemoryListener, MemoryPeer};
pub use ws::{WsConnector, WsLink};

use async_trait::async_trait;
use nas_monitor_core::{Endpoint, Result};

/// Opens links to a remote endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Link type produced by this connector.
    type Link: Link;

    /// Open a new link.
    ///
    /// # Errors
    /// Returns [`nas_monitor_core::Error::Transport`] when the endpoint
    /// cannot be reached.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Link>;
}

/// An open, bidirectional text-frame link.
#[async_trait]
pub trait Link: Send + 'static {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Receive the next text frame, `None` once the link is closed.
    async fn recv(&mut self) -> Option<String>;

    /// Close the link. Closing twice is harmless.
    async fn close(&mut self);
}
