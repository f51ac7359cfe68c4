//! Event types for the CodeStorm realtime channel.
//!
//! Inbound events are pushed by the server; outbound requests are sent by the
//! client. Both travel inside the JSON envelope defined in [`crate::codec`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Inbound event kinds.
///
/// The set is closed so that handler tables can be matched exhaustively.
/// New server event types are added here as variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventKind {
    /// The server accepted an `authenticate` request.
    Authenticated,
    /// The server rejected an `authenticate` request.
    AuthenticationFailed,
    /// A submission changed verdict or status.
    SubmissionUpdate,
    /// The contest leaderboard changed.
    LeaderboardUpdate,
    /// The contest moved to another phase.
    ContestPhaseChange,
    /// An administrator changed system control flags.
    SystemControlUpdate,
    /// The judge queue changed.
    JudgeQueueUpdate,
    /// Contest analytics were recomputed.
    AnalyticsUpdate,
    /// Participant attendance changed.
    AttendanceUpdate,
}

impl EventKind {
    /// Every known event kind, in wire-table order.
    pub const ALL: [EventKind; 9] = [
        EventKind::Authenticated,
        EventKind::AuthenticationFailed,
        EventKind::SubmissionUpdate,
        EventKind::LeaderboardUpdate,
        EventKind::ContestPhaseChange,
        EventKind::SystemControlUpdate,
        EventKind::JudgeQueueUpdate,
        EventKind::AnalyticsUpdate,
        EventKind::AttendanceUpdate,
    ];

    /// The `type` string used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Authenticated => "authenticated",
            EventKind::AuthenticationFailed => "authentication_failed",
            EventKind::SubmissionUpdate => "submission_update",
            EventKind::LeaderboardUpdate => "leaderboard_update",
            EventKind::ContestPhaseChange => "contest_phase_change",
            EventKind::SystemControlUpdate => "system_control_update",
            EventKind::JudgeQueueUpdate => "judge_queue_update",
            EventKind::AnalyticsUpdate => "analytics_update",
            EventKind::AttendanceUpdate => "attendance_update",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EventKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

/// An event received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Event-specific payload, `Null` when the server sent none.
    pub payload: Value,
    /// Server-side timestamp.
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Deserialize the payload into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// A request sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRequest {
    /// Bind the connection to a user identity.
    Authenticate {
        /// User identifier.
        user_id: String,
    },
    /// Subscribe to a contest's live updates.
    JoinContest {
        /// Contest identifier.
        contest_id: String,
    },
    /// Drop the current contest subscription.
    LeaveContest,
}

impl OutboundRequest {
    /// Create an Authenticate request.
    #[must_use]
    pub fn authenticate(user_id: impl Into<String>) -> Self {
        OutboundRequest::Authenticate {
            user_id: user_id.into(),
        }
    }

    /// Create a JoinContest request.
    #[must_use]
    pub fn join_contest(contest_id: impl Into<String>) -> Self {
        OutboundRequest::JoinContest {
            contest_id: contest_id.into(),
        }
    }

    /// The `type` string used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundRequest::Authenticate { .. } => "authenticate",
            OutboundRequest::JoinContest { .. } => "join_contest",
            OutboundRequest::LeaveContest => "leave_contest",
        }
    }

    /// The JSON payload for this request.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            OutboundRequest::Authenticate { user_id } => json!({ "userId": user_id }),
            OutboundRequest::JoinContest { contest_id } => json!({ "contestId": contest_id }),
            OutboundRequest::LeaveContest => json!({}),
        }
    }
}
