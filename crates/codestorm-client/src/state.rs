//! Connection states of the realtime channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`crate::RealtimeChannel`].
///
/// ```text
/// Idle ─▶ Connecting ─▶ Open ─▶ Closing ─▶ Idle
///                        │  ▲
///                        ▼  │
///                   Reconnecting ─▶ Connecting ─▶ ... ─▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and no pending work.
    Idle,
    /// A transport connection is being established.
    Connecting,
    /// The transport is usable.
    Open,
    /// Waiting to retry after an unexpected loss.
    Reconnecting,
    /// An explicit disconnect is in progress.
    Closing,
    /// The retry budget is exhausted. Only an explicit connect recovers.
    Failed,
}

impl ConnectionState {
    /// Whether a fresh `connect` call is allowed from this state.
    #[must_use]
    pub fn can_connect(&self) -> bool {
        matches!(self, ConnectionState::Idle | ConnectionState::Failed)
    }

    /// Numeric value exported as a gauge.
    #[must_use]
    pub fn as_gauge(&self) -> f64 {
        match self {
            ConnectionState::Idle => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Open => 2.0,
            ConnectionState::Reconnecting => 3.0,
            ConnectionState::Closing => 4.0,
            ConnectionState::Failed => 5.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closing => "closing",
            ConnectionState::Failed => "failed",
        };
        f.write_str(label)
    }
}
