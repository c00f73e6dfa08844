//! Retry pacing for URL acquisition.

use std::time::Duration;

/// Retry policy configuration.
///
/// Application-level rejections back off linearly with the attempt number;
/// transport-level failures back off exponentially. Both share the same base
/// delay and attempt cap.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay multiplied per-attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before re-attempting after an application-level rejection.
    ///
    /// `attempt` is 1-based (the attempt that just failed).
    pub fn linear_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    /// Delay before re-attempting after a transport-level failure.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_delay_scales_with_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.linear_delay(1), Duration::from_millis(100));
        assert_eq!(policy.linear_delay(2), Duration::from_millis(200));
        assert_eq!(policy.linear_delay(3), Duration::from_millis(300));
    }

    #[test]
    fn backoff_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn zero_attempt_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.linear_delay(0), policy.base_delay);
        assert_eq!(policy.backoff_delay(0), policy.base_delay);
    }
}
