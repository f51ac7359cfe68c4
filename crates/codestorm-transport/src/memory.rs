//! In-memory transport.
//!
//! A [`MemoryConnector`] hands out scripted connection outcomes and records
//! when each attempt happened. The server side of every accepted connection
//! is a [`MemoryPeer`]; dropping the peer looks like a lost connection to the
//! client.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::traits::{Connection, ConnectionId, Connector, TransportError};

/// Create a connected client/peer pair.
#[must_use]
pub fn pair() -> (MemoryConnection, MemoryPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();

    let connection = MemoryConnection {
        id: ConnectionId::generate(),
        inbound,
        outbound,
        is_open: true,
    };
    let peer = MemoryPeer {
        to_client,
        from_client,
    };
    (connection, peer)
}

/// Client end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    is_open: bool,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        match self.inbound.recv().await {
            Some(text) => Ok(Some(text)),
            None => {
                self.is_open = false;
                Ok(None)
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }
        self.outbound
            .send(text)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.is_open = false;
        self.inbound.close();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}

/// Server end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Deliver a message to the client. Returns `false` if the client is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.to_client.send(text.into()).is_ok()
    }

    /// Wait for the next message the client sent.
    ///
    /// Returns `None` once the client has dropped its end.
    pub async fn next_outbound(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Take the next message the client sent, if one is already queued.
    pub fn try_outbound(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Take every queued client message.
    pub fn drain_outbound(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        while let Some(text) = self.try_outbound() {
            messages.push(text);
        }
        messages
    }
}

/// A connector with scripted outcomes.
///
/// Each call to [`Connector::connect`] consumes the next planned outcome.
/// When the plan is empty the attempt is refused.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    plan: Mutex<VecDeque<Option<MemoryConnection>>>,
    attempts: Mutex<Vec<Instant>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryConnector {
    /// Create a connector with an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the next attempt, returning the server end.
    pub fn accept_next(&self) -> MemoryPeer {
        let (connection, peer) = pair();
        lock(&self.plan).push_back(Some(connection));
        peer
    }

    /// Refuse the next attempt.
    pub fn refuse_next(&self) {
        lock(&self.plan).push_back(None);
    }

    /// When each connect attempt happened, oldest first.
    #[must_use]
    pub fn attempts(&self) -> Vec<Instant> {
        lock(&self.attempts).clone()
    }

    /// Number of connect attempts so far.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        lock(&self.attempts).len()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        lock(&self.attempts).push(Instant::now());

        let planned = lock(&self.plan).pop_front().flatten();
        match planned {
            Some(connection) => {
                debug!(url = %url, connection = %connection.id, "Memory connection accepted");
                Ok(Box::new(connection))
            }
            None => {
                debug!(url = %url, "Memory connection refused");
                Err(TransportError::ConnectFailed("connection refused".into()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_exchange() {
        let (mut conn, mut peer) = pair();

        conn.send("from-client".to_string()).await.unwrap();
        assert_eq!(peer.next_outbound().await, Some("from-client".to_string()));

        assert!(peer.push("from-server"));
        assert_eq!(conn.recv().await.unwrap(), Some("from-server".to_string()));
    }

    #[tokio::test]
    async fn test_dropping_peer_ends_stream() {
        let (mut conn, peer) = pair();
        drop(peer);

        assert_eq!(conn.recv().await.unwrap(), None);
        assert!(!conn.is_open());
        assert!(matches!(
            conn.send("late".to_string()).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_connector_follows_plan() {
        let connector = MemoryConnector::new();
        connector.refuse_next();
        let _peer = connector.accept_next();

        assert!(connector.connect("memory://a").await.is_err());
        assert!(connector.connect("memory://a").await.is_ok());
        assert!(connector.connect("memory://a").await.is_err());
        assert_eq!(connector.attempt_count(), 3);
    }
}
