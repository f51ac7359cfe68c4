//! # codestorm-transport
//!
//! Client transport abstraction for the CodeStorm realtime channel.
//!
//! - **WebSocket** - tokio-tungstenite client, used against the real server
//! - **Memory** - scripted in-process connector for tests and tooling
//!
//! ## Transport Abstraction
//!
//! All transports implement the `Connector` and `Connection` traits, so the
//! channel is transport-agnostic.
//!
//! ```rust,ignore
//! use codestorm_transport::{Connector, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new();
//! let mut conn = connector.connect("ws://contest.lan/ws").await?;
//! while let Some(text) = conn.recv().await? {
//!     // Decode and dispatch
//! }
//! ```

pub mod endpoint;
pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use endpoint::endpoint_from_origin;
pub use memory::{MemoryConnector, MemoryPeer};
pub use traits::{Connection, ConnectionId, Connector, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketConnector};
