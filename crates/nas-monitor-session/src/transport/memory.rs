//! In-process transport backed by tokio channels.
//!
//! [`channel`] returns a connector and the listener that accepts its links.
//! Every successful [`Connector::connect`] hands the listener a
//! [`MemoryPeer`], the remote side of the new link.

use async_trait::async_trait;
use nas_monitor_core::{Endpoint, Error, Result};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Connector, Link};

/// Create a connected connector/listener pair.
pub fn channel() -> (MemoryConnector, MemoryListener) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemoryConnector { listener: tx }, MemoryListener { incoming: rx })
}

/// Connector whose links terminate at a [`MemoryListener`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    listener: UnboundedSender<MemoryPeer>,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Link = MemoryLink;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MemoryLink> {
        let (to_peer, from_link) = mpsc::unbounded_channel();
        let (to_link, from_peer) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            endpoint: endpoint.clone(),
            tx: Some(to_link),
            rx: from_link,
        };
        self.listener
            .send(peer)
            .map_err(|_| Error::Transport(format!("connection refused: {}", endpoint)))?;

        Ok(MemoryLink {
            tx: Some(to_peer),
            rx: from_peer,
        })
    }
}

/// Accepts links opened by the paired [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryListener {
    incoming: UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Wait for the next link. Returns `None` once every connector is gone.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.incoming.recv().await
    }

    /// Take a pending link without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.incoming.try_recv().ok()
    }
}

/// Client side of an in-process link.
#[derive(Debug)]
pub struct MemoryLink {
    tx: Option<UnboundedSender<String>>,
    rx: UnboundedReceiver<String>,
}

#[async_trait]
impl Link for MemoryLink {
    async fn send(&mut self, frame: String) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| Error::Transport("link closed".to_string()))?;
        tx.send(frame)
            .map_err(|_| Error::Transport("peer closed the link".to_string()))
    }

    async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}

/// Remote side of an in-process link, driven by tests.
#[derive(Debug)]
pub struct MemoryPeer {
    endpoint: Endpoint,
    tx: Option<UnboundedSender<String>>,
    rx: UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Endpoint the client connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send a frame to the client. Returns `false` if the link is closed.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    /// Send a JSON value as a text frame.
    pub fn send_json(&self, value: &Value) -> bool {
        self.send(value.to_string())
    }

    /// Next frame from the client, `None` once the client closed the link.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next frame from the client parsed as JSON.
    pub async fn recv_json(&mut self) -> Option<Value> {
        let frame = self.recv().await?;
        serde_json::from_str(&frame).ok()
    }

    /// Take a pending frame without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Close the link from the host side.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
