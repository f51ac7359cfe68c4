//! Transport abstraction traits for CodeStorm.
//!
//! The realtime channel talks to the server through these traits only, so
//! the WebSocket connector can be swapped for an in-memory one in tests.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a new connection ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a process-unique connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{:x}_{}", millis, counter))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached or refused the connection.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// A message arrived that can never be decoded (oversize or not UTF-8).
    /// The connection stays usable.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// The endpoint address is not usable.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens client connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `url`.
    ///
    /// Resolves once the transport is usable; fails if the endpoint cannot
    /// be reached at all.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the transport name (e.g., "websocket", "memory").
    fn name(&self) -> &'static str;
}

/// An established duplex, message-oriented connection.
#[async_trait]
pub trait Connection: Send {
    /// Get the connection's unique identifier.
    fn id(&self) -> &ConnectionId;

    /// Receive the next text message.
    ///
    /// Returns `None` if the peer closed the connection cleanly. A
    /// [`TransportError::Malformed`] error rejects one message only; the
    /// caller may keep receiving. Must be cancel-safe: dropping the future
    /// loses no message.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Send a text message.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
