//! Fixed-delay, bounded reconnection policy.
//!
//! After a connection failure the supervisor waits [`ReconnectPolicy::delay`]
//! and tries again, up to [`ReconnectPolicy::max_attempts`] consecutive
//! failures. A successful CONNACK resets the count. Once the bound is hit
//! the client stays disconnected until the process is restarted.

use std::time::Duration;

/// Default delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default number of consecutive reconnection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Tunable parameters for the reconnect strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait before each reconnection attempt.
    pub delay: Duration,
    /// Consecutive failed attempts tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// The attempt number to make after `attempts_so_far` failures, or
    /// `None` when the budget is spent.
    pub fn next_attempt(&self, attempts_so_far: u32) -> Option<u32> {
        (attempts_so_far < self.max_attempts).then(|| attempts_so_far + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_five_seconds_and_ten_attempts() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 10);
    }

    #[test]
    fn budget_is_exhausted_after_max_attempts() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next_attempt(0), Some(1));
        assert_eq!(policy.next_attempt(9), Some(10));
        assert_eq!(policy.next_attempt(10), None);
    }

    #[test]
    fn zero_attempts_never_retries() {
        let policy = ReconnectPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(policy.next_attempt(0), None);
    }
}
