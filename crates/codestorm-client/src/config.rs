//! Channel configuration.

use crate::reconnect::{ReconnectPolicy, DEFAULT_MAX_ATTEMPTS};
use codestorm_transport::endpoint::{endpoint_from_origin, DEFAULT_PATH};
use codestorm_transport::TransportError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Realtime channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Origin of the web frontend, e.g. `http://contest.lan:3000`.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the realtime endpoint on that origin.
    #[serde(default = "default_path")]
    pub path: String,

    /// Reconnect delay unit in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Reconnect attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Optional ceiling on a single reconnect delay, in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

fn default_origin() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            path: default_path(),
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
            max_delay_ms: None,
        }
    }
}

impl ChannelConfig {
    /// The realtime endpoint URL derived from the origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not an http(s) or ws(s) URL.
    pub fn endpoint(&self) -> Result<String, TransportError> {
        endpoint_from_origin(&self.origin, &self.path)
    }

    /// The reconnect policy described by this config.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let policy = ReconnectPolicy::new(
            Duration::from_millis(self.base_delay_ms),
            self.max_attempts,
        );
        match self.max_delay_ms {
            Some(ms) => policy.with_max_delay(Duration::from_millis(ms)),
            None => policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChannelConfig::default();
        assert_eq!(config.endpoint().unwrap(), "ws://127.0.0.1:3000/ws");
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: ChannelConfig =
            serde_json::from_str(r#"{"origin": "https://contest.lan", "max_delay_ms": 3000}"#)
                .unwrap();

        assert_eq!(config.endpoint().unwrap(), "wss://contest.lan/ws");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(
            config.reconnect_policy().max_delay,
            Some(Duration::from_millis(3000))
        );
    }
}
