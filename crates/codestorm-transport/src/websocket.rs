//! WebSocket transport implementation.
//!
//! This module provides a WebSocket client connector using tokio-tungstenite.

use async_trait::async_trait;
use codestorm_protocol::codec::MAX_MESSAGE_SIZE;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, trace, warn};

use crate::traits::{Connection, ConnectionId, Connector, TransportError};

/// WebSocket connector configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Opens WebSocket client connections.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    /// Create a connector with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector with custom config.
    #[must_use]
    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, response) = connect_async(url).await.map_err(|e| match e {
            WsError::Url(reason) => TransportError::InvalidEndpoint(reason.to_string()),
            WsError::Io(io) => TransportError::Io(io),
            other => TransportError::ConnectFailed(other.to_string()),
        })?;

        debug!(url = %url, status = %response.status(), "WebSocket handshake completed");

        let remote_addr = match stream.get_ref() {
            MaybeTlsStream::Plain(tcp) => tcp.peer_addr().ok().map(|a| a.to_string()),
            _ => None,
        };

        Ok(Box::new(WebSocketConnection::new(
            stream,
            remote_addr,
            self.config.max_message_size,
        )))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A WebSocket client connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    remote_addr: Option<String>,
    is_open: bool,
    max_message_size: usize,
}

impl WebSocketConnection {
    fn new(
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        remote_addr: Option<String>,
        max_message_size: usize,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            stream,
            remote_addr,
            is_open: true,
            max_message_size,
        }
    }

    fn check_size(&self, size: usize) -> Result<(), TransportError> {
        if size > self.max_message_size {
            warn!(
                connection = %self.id,
                size,
                max = self.max_message_size,
                "Message too large"
            );
            return Err(TransportError::Malformed(format!(
                "message of {size} bytes exceeds limit of {}",
                self.max_message_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.check_size(text.len())?;
                    return Ok(Some(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    self.check_size(data.len())?;
                    return String::from_utf8(data).map(Some).map_err(|e| {
                        warn!(connection = %self.id, error = %e, "Binary message is not UTF-8");
                        TransportError::Malformed(format!("invalid UTF-8: {e}"))
                    });
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // tungstenite queues the pong reply itself
                    trace!(connection = %self.id, "Control frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(connection = %self.id, ?frame, "Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {
                    // Raw frame, ignore
                }
                Some(Err(WsError::ConnectionClosed)) | None => {
                    debug!(connection = %self.id, "WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!(connection = %self.id, error = %e, "WebSocket error");
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(format!("Failed to close: {}", e))),
        }
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_websocket_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.max_message_size, MAX_MESSAGE_SIZE);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WebSocketConnector::new();
        let result = connector.connect(&format!("ws://{}/ws", addr)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let connector = WebSocketConnector::new();
        assert!(connector.connect("not a url").await.is_err());
    }

    #[tokio::test]
    async fn test_text_exchange_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let received = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text("pong-from-server".to_string()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            received
        });

        let connector = WebSocketConnector::new();
        let mut conn = connector
            .connect(&format!("ws://{}/ws", addr))
            .await
            .unwrap();
        assert!(conn.is_open());
        assert_eq!(conn.remote_addr(), Some(addr.to_string()));

        conn.send("hello".to_string()).await.unwrap();
        assert_eq!(
            conn.recv().await.unwrap(),
            Some("pong-from-server".to_string())
        );
        assert_eq!(conn.recv().await.unwrap(), None);
        assert!(!conn.is_open());

        assert_eq!(
            server.await.unwrap(),
            Message::Text("hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_undecodable_messages_are_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let mut corrupt = br#"{"type":"authenticated","payload":{"user":""#.to_vec();
            corrupt.push(0xFF);
            corrupt.extend_from_slice(br#""},"timestamp":"2024-05-01T10:00:00Z"}"#);
            ws.send(Message::Binary(corrupt)).await.unwrap();
            ws.send(Message::Text("x".repeat(200))).await.unwrap();
            ws.send(Message::Binary(b"small".to_vec())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let connector = WebSocketConnector::with_config(WebSocketConfig {
            max_message_size: 64,
        });
        let mut conn = connector
            .connect(&format!("ws://{}/ws", addr))
            .await
            .unwrap();

        assert!(matches!(conn.recv().await, Err(TransportError::Malformed(_))));
        assert!(matches!(conn.recv().await, Err(TransportError::Malformed(_))));
        assert!(conn.is_open());
        assert_eq!(conn.recv().await.unwrap(), Some("small".to_string()));
        assert_eq!(conn.recv().await.unwrap(), None);

        server.await.unwrap();
    }
}
