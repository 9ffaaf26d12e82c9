//! Retry policy for collector exports.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::error::ExportError;

/// HTTP statuses worth retrying: timeouts, throttling and gateway failures.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 502 | 503 | 504)
}

/// Bounded retry schedule for one batch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Delay before the next attempt, or `None` when the batch should be dropped.
    ///
    /// `attempts` is the number of attempts already made. The delay doubles
    /// per attempt up to `max_delay_ms`; the upper half of it is random.
    pub fn next_delay(&self, attempts: u32, error: &ExportError) -> Option<Duration> {
        if attempts >= self.max_attempts || !error.is_retryable() {
            return None;
        }
        let exponent = attempts.saturating_sub(1).min(32);
        let capped = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        let half = capped / 2;
        let jitter = rand::thread_rng().gen_range(0..=capped - half);
        Some(Duration::from_millis(half + jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(500));
    }

    #[test]
    fn test_attempts_are_bounded() {
        let policy = RetryPolicy::default();
        let unreachable = ExportError::Unreachable("refused".into());
        assert!(policy.next_delay(1, &unreachable).is_some());
        assert!(policy.next_delay(2, &unreachable).is_some());
        assert!(policy.next_delay(3, &unreachable).is_none());
    }

    #[test]
    fn test_rejection_is_not_retried() {
        let policy = RetryPolicy::default();
        assert!(policy.next_delay(1, &ExportError::Rejected { status: 400 }).is_none());
    }

    #[test]
    fn test_delay_doubles_within_cap() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        });
        let unreachable = ExportError::Unreachable("refused".into());
        for _ in 0..20 {
            let first = policy.next_delay(1, &unreachable).unwrap();
            assert!((50..=100).contains(&first.as_millis()));
            let third = policy.next_delay(3, &unreachable).unwrap();
            assert!((200..=400).contains(&third.as_millis()));
            let capped = policy.next_delay(9, &unreachable).unwrap();
            assert!((500..=1_000).contains(&capped.as_millis()));
        }
    }

    #[test]
    fn test_zero_base_delay_retries_immediately() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 2,
            base_delay_ms: 0,
            max_delay_ms: 0,
        });
        let delay = policy.next_delay(1, &ExportError::Rejected { status: 503 });
        assert_eq!(delay, Some(Duration::ZERO));
    }
}
