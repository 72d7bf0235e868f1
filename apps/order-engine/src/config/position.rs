//! Position configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::position::DEFAULT_NOTIFICATION_CAPACITY;

/// Position configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    /// Interval between stale-entry sweeps in milliseconds (0 disables the sweeper).
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Notifications buffered per subscriber.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

impl PositionConfig {
    /// Sweep interval, or `None` when sweeping is disabled.
    #[must_use]
    pub const fn sweep_interval(&self) -> Option<Duration> {
        if self.sweep_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.sweep_interval_ms))
        }
    }
}

const fn default_sweep_interval_ms() -> u64 {
    30_000
}

const fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}
