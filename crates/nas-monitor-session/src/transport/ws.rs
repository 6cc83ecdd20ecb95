//! WebSocket transport.

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use nas_monitor_core::{Endpoint, Error, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::{Connector, Link};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Connector for `ws://` and `wss://` endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Link = WsLink;

    async fn connect(&self, endpoint: &Endpoint) -> Result<WsLink> {
        debug!("Connecting: endpoint={}", endpoint);

        let (ws, _) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| Error::Transport(format!("connect to {} failed: {}", endpoint, e)))?;
        let (sink, stream) = ws.split();

        debug!("Connected: endpoint={}", endpoint);
        Ok(WsLink {
            sink,
            stream,
            closed: false,
        })
    }
}

/// An open WebSocket.
pub struct WsLink {
    sink: WsSink,
    stream: WsStream,
    closed: bool,
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, frame: String) -> Result<()> {
        self.sink
            .send(Message::Text(frame))
            .await
            .map_err(|e| Error::Transport(format!("send failed: {}", e)))
    }

    async fn recv(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Some(text),
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Peer closed the socket: {:?}", frame);
                    self.closed = true;
                    return None;
                }
                // Pings are answered by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    self.closed = true;
                    return None;
                }
                None => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close().await {
            debug!("Close handshake failed: {}", e);
        }
    }
}
