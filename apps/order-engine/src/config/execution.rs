//! Command execution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::command::RetryPolicy;
use crate::application::ports::ExecutionContext;

/// Defaults applied to every command built by the order commands factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Retries after a rejection (0 = fail on the first reject).
    #[serde(default)]
    pub retry_attempts: u32,
    /// Delay before each retry in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Where venue calls run.
    #[serde(default)]
    pub context: ExecutionContext,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 0,
            retry_delay_ms: default_retry_delay_ms(),
            context: ExecutionContext::default(),
        }
    }
}

impl ExecutionConfig {
    /// Default retry policy for commands.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

const fn default_retry_delay_ms() -> u64 {
    500
}
