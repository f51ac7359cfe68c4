//! # codestorm-protocol
//!
//! Wire protocol definitions for the CodeStorm realtime channel.
//!
//! Messages are UTF-8 JSON envelopes of the form
//! `{type, payload, timestamp}` carried over a duplex, message-oriented
//! transport.
//!
//! ## Message Types
//!
//! - Inbound: `authenticated`, `authentication_failed` and the contest
//!   update events listed in [`EventKind`]
//! - Outbound: `authenticate`, `join_contest`, `leave_contest`
//!
//! ## Example
//!
//! ```rust
//! use codestorm_protocol::{codec, OutboundRequest};
//!
//! let text = codec::encode(&OutboundRequest::authenticate("user-1")).unwrap();
//! assert!(text.contains("\"type\":\"authenticate\""));
//!
//! let event = codec::decode(
//!     r#"{"type":"authenticated","payload":{},"timestamp":"2024-05-01T10:00:00Z"}"#,
//! )
//! .unwrap();
//! assert_eq!(event.kind, codestorm_protocol::EventKind::Authenticated);
//! ```

pub mod codec;
pub mod events;

pub use codec::{decode, encode, Envelope, ProtocolError};
pub use events::{EventKind, InboundEvent, OutboundRequest};
