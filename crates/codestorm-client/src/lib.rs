//! # codestorm-client
//!
//! Resilient realtime event channel for CodeStorm.
//!
//! The channel keeps one connection to the contest server, authenticates,
//! joins a contest topic and fans inbound events out to handlers registered
//! per event kind. Lost connections are retried with bounded linear backoff.
//!
//! ```rust,ignore
//! use codestorm_client::{ChannelConfig, RealtimeChannel};
//! use codestorm_core::handler;
//! use codestorm_protocol::EventKind;
//!
//! let channel = RealtimeChannel::from_config(&ChannelConfig::default())?;
//! channel.on(EventKind::LeaderboardUpdate, handler(|event| {
//!     println!("{}", event.payload);
//! }));
//! channel.connect(Some("user-1".into())).await?;
//! ```

pub mod channel;
pub mod config;
pub mod metrics;
pub mod reconnect;
pub mod state;

pub use channel::{ChannelError, RealtimeChannel};
pub use config::ChannelConfig;
pub use reconnect::ReconnectPolicy;
pub use state::ConnectionState;
