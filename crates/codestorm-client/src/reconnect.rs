//! Reconnect policy.
//!
//! Delays grow linearly with the attempt number: attempt `n` waits
//! `base_delay * n`. After `max_attempts` consecutive failures the channel
//! gives up.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay unit for reconnect attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Bounded linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay unit, multiplied by the attempt number.
    pub base_delay: Duration,
    /// Attempts allowed before the channel fails.
    pub max_attempts: u32,
    /// Optional ceiling on a single delay.
    pub max_delay: Option<Duration>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_delay: None,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy without a delay ceiling.
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            max_delay: None,
        }
    }

    /// Cap every delay at `max_delay`.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay before attempt `attempt` (1-based), or `None` once the budget is
    /// spent.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let delay = self.base_delay.saturating_mul(attempt);
        Some(match self.max_delay {
            Some(ceiling) => delay.min(ceiling),
            None => delay,
        })
    }
}
