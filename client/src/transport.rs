use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::error::{ClientError, Result};

/// A text-frame socket to the server.
///
/// One transport lives for exactly one invocation and is never reused.
pub trait Transport {
    /// Send one text frame
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` when the server closed the connection.
    async fn recv(&mut self) -> Result<Option<String>>;

    /// Close the socket
    async fn close(&mut self) -> Result<()>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Low-level WebSocket connection handler
pub struct WebSocketTransport {
    ws: WsStream,
}

impl WebSocketTransport {
    /// Connect to a WebSocket URL, giving up after `timeout`
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "Timed out after {}s connecting to {}",
                    timeout.as_secs(),
                    url
                ))
            })?
            .map_err(|e| ClientError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        tracing::debug!(url, "WebSocket connected");
        Ok(Self { ws })
    }
}

impl Transport for WebSocketTransport {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to send message: {}", e)))
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.ws.next().await {
            let message =
                message.map_err(|e| ClientError::Connection(format!("WebSocket error: {}", e)))?;

            match message {
                Message::Text(text) => return Ok(Some(text)),
                Message::Close(_) => return Ok(None),
                Message::Ping(data) => self
                    .ws
                    .send(Message::Pong(data))
                    .await
                    .map_err(|e| ClientError::Connection(format!("Failed to send pong: {}", e)))?,
                _ => {}
            }
        }

        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to close: {}", e)))
    }
}
