//! Outcome feed configuration.

use serde::{Deserialize, Serialize};

use crate::application::ports::DEFAULT_FEED_CAPACITY;

/// Outcome feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Events buffered per subscriber before it starts lagging.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

const fn default_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}
