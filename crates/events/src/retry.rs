//! Retry/backoff policy for event processing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^attempt
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Retry policy configuration.
///
/// Defaults match the webhook pipeline: 5 attempts, exponential backoff from
/// a 10s base, capped at 10 minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts before dead-lettering (1 = no retries).
    pub max_attempts: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Backoff strategy.
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(600),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Calculate the delay before the retry following `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u128;
        let max_ms = self.max_delay.as_millis() as u128;

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Exponential => {
                let exp = 1u128 << (attempt - 1).min(32);
                base_ms.saturating_mul(exp).min(max_ms)
            }
        };

        Duration::from_millis(delay_ms.min(u64::MAX as u128) as u64)
    }

    /// Check if another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
