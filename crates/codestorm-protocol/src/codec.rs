//! Codec for encoding and decoding CodeStorm wire messages.
//!
//! Every message is a UTF-8 JSON object with three fields:
//!
//! ```json
//! {"type": "leaderboard_update", "payload": {...}, "timestamp": "2024-05-01T10:00:00.000Z"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::events::{EventKind, InboundEvent, OutboundRequest};

/// Maximum accepted message size (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Message exceeds maximum size.
    #[error("Message size {0} exceeds maximum {MAX_MESSAGE_SIZE}")]
    MessageTooLarge(usize),

    /// Text is not a valid envelope.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Envelope carries a type this client does not know.
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),
}

/// The JSON envelope shared by inbound and outbound messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message payload.
    #[serde(default)]
    pub payload: Value,
    /// Sender timestamp (ISO-8601).
    pub timestamp: DateTime<Utc>,
}

/// Encode an outbound request, stamped with the current time.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(request: &OutboundRequest) -> Result<String, ProtocolError> {
    encode_at(request, Utc::now())
}

/// Encode an outbound request with an explicit timestamp.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_at(
    request: &OutboundRequest,
    timestamp: DateTime<Utc>,
) -> Result<String, ProtocolError> {
    let envelope = Envelope {
        kind: request.kind().to_string(),
        payload: request.payload(),
        timestamp,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Encode an inbound event. Used by servers and test peers.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_event(event: &InboundEvent) -> Result<String, ProtocolError> {
    let envelope = Envelope {
        kind: event.kind.as_str().to_string(),
        payload: event.payload.clone(),
        timestamp: event.timestamp,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode an inbound event from message text.
///
/// # Errors
///
/// Returns an error if the text is too large, is not a valid envelope, or
/// names an unknown event type.
pub fn decode(text: &str) -> Result<InboundEvent, ProtocolError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(text.len()));
    }

    let envelope: Envelope = serde_json::from_str(text)?;
    let kind = EventKind::try_from(envelope.kind.as_str()).map_err(ProtocolError::UnknownEvent)?;

    Ok(InboundEvent {
        kind,
        payload: envelope.payload,
        timestamp: envelope.timestamp,
    })
}
