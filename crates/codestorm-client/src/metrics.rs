//! Metrics recorded by the realtime channel.
//!
//! Uses the `metrics` facade; nothing is exported unless the host installs a
//! recorder.

use crate::state::ConnectionState;
use codestorm_protocol::EventKind;
use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const EVENTS_TOTAL: &str = "codestorm_events_total";
    pub const MALFORMED_TOTAL: &str = "codestorm_malformed_messages_total";
    pub const OUTBOUND_TOTAL: &str = "codestorm_outbound_requests_total";
    pub const RECONNECT_ATTEMPTS_TOTAL: &str = "codestorm_reconnect_attempts_total";
    pub const RECONNECT_EXHAUSTED_TOTAL: &str = "codestorm_reconnect_exhausted_total";
    pub const CONNECTION_STATE: &str = "codestorm_connection_state";
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(names::EVENTS_TOTAL, "Inbound events dispatched, by type");
    metrics::describe_counter!(
        names::MALFORMED_TOTAL,
        "Inbound messages dropped because they could not be decoded"
    );
    metrics::describe_counter!(names::OUTBOUND_TOTAL, "Outbound requests sent, by type");
    metrics::describe_counter!(
        names::RECONNECT_ATTEMPTS_TOTAL,
        "Reconnect attempts scheduled after a lost connection"
    );
    metrics::describe_counter!(
        names::RECONNECT_EXHAUSTED_TOTAL,
        "Times the reconnect budget ran out"
    );
    metrics::describe_gauge!(
        names::CONNECTION_STATE,
        "Channel state (0 idle, 1 connecting, 2 open, 3 reconnecting, 4 closing, 5 failed)"
    );
}

/// Record a dispatched inbound event.
pub fn record_event(kind: EventKind) {
    counter!(names::EVENTS_TOTAL, "type" => kind.as_str()).increment(1);
}

/// Record a dropped malformed message.
pub fn record_malformed() {
    counter!(names::MALFORMED_TOTAL).increment(1);
}

/// Record a sent outbound request.
pub fn record_outbound(kind: &'static str) {
    counter!(names::OUTBOUND_TOTAL, "type" => kind).increment(1);
}

/// Record a scheduled reconnect attempt.
pub fn record_reconnect_attempt() {
    counter!(names::RECONNECT_ATTEMPTS_TOTAL).increment(1);
}

/// Record an exhausted reconnect budget.
pub fn record_reconnect_exhausted() {
    counter!(names::RECONNECT_EXHAUSTED_TOTAL).increment(1);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!(names::CONNECTION_STATE).set(state.as_gauge());
}
