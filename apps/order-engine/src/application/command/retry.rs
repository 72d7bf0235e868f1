//! Retry policy for rejected venue calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed-delay retry policy applied when the venue rejects a call.
///
/// `max_attempts` counts retries, not invocations: a policy with
/// `max_attempts = n` invokes the action at most `n + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first invocation (default: 0).
    pub max_attempts: u32,
    /// Delay before each retry (default: 0).
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns true if another invocation is allowed after `invocations` calls.
    #[must_use]
    pub const fn allows_retry(&self, invocations: u32) -> bool {
        invocations <= self.max_attempts
    }

    /// Upper bound on the number of invocations.
    #[must_use]
    pub const fn max_invocations(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 1, false)]
    #[test_case(2, 1, true)]
    #[test_case(2, 2, true)]
    #[test_case(2, 3, false)]
    fn retry_allowed_until_attempts_used(max: u32, invocations: u32, expected: bool) {
        let policy = RetryPolicy::new(max, Duration::from_millis(10));
        assert_eq!(policy.allows_retry(invocations), expected);
    }

    #[test]
    fn default_is_no_retry() {
        assert_eq!(RetryPolicy::default(), RetryPolicy::none());
        assert_eq!(RetryPolicy::none().max_invocations(), 1);
    }
}
