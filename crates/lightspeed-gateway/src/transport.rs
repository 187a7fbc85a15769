//! Transport seam for the event stream.
//!
//! The session state machine is written against [`GatewayTransport`] and
//! [`GatewayConnector`] rather than a socket type, so tests can drive it
//! with a scripted in-memory transport. [`WsConnector`] is the production
//! implementation over `tokio-tungstenite` with JSON text frames.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use lightspeed_core::{Error, Result};

use crate::protocol::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open bidirectional event-stream connection.
#[async_trait]
pub trait GatewayTransport: Send {
    /// Send a frame to the server.
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Receive the next frame, or `None` once the connection is gone.
    async fn recv(&mut self) -> Option<Frame>;

    /// Close the connection.
    async fn close(&mut self);
}

/// Opens event-stream connections.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    /// Open a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>>;
}

/// Production connector over `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl GatewayConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>> {
        let (ws, _) = connect_async(url).await.map_err(|e| Error::Transport {
            message: format!("websocket connect: {e}"),
        })?;
        Ok(Box::new(WsTransport { ws }))
    }
}

/// WebSocket transport speaking JSON text frames.
pub struct WsTransport {
    ws: WsStream,
}

#[async_trait]
impl GatewayTransport for WsTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let text = frame.encode()?;
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| Error::Transport {
                message: format!("websocket send: {e}"),
            })
    }

    async fn recv(&mut self) -> Option<Frame> {
        loop {
            let message = self.ws.next().await?.ok()?;
            match message {
                Message::Text(text) => match Frame::decode(&text) {
                    Ok(frame) => return Some(frame),
                    Err(err) => {
                        // A malformed frame is the server's bug, not a
                        // reason to drop the connection.
                        tracing::warn!(error = %err, "dropping undecodable frame");
                    }
                },
                Message::Close(_) => return None,
                // Pings are answered by tungstenite itself; binary and
                // pong frames carry nothing for us.
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
