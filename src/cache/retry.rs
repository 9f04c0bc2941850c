//! Backoff schedule for cache revalidation.
//!
//! Sources make a single attempt per call. Retries live here, driven by the
//! key's `retry_count`, so every transport gets the same behaviour.

use rand::Rng;
use std::time::Duration;

use crate::error::FetchError;

/// Whether (and how) a failed revalidation is attempted again.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RetryPolicy {
    #[default]
    Never,
    Backoff(RetryConfig),
}

impl RetryPolicy {
    /// Policy for a key configured with `retry_count` extra attempts.
    pub fn for_key(retry_count: u32) -> Self {
        match retry_count {
            0 => RetryPolicy::Never,
            n => RetryPolicy::Backoff(RetryConfig {
                max_retries: n,
                ..RetryConfig::default()
            }),
        }
    }

    pub fn config(&self) -> Option<&RetryConfig> {
        match self {
            RetryPolicy::Never => None,
            RetryPolicy::Backoff(config) => Some(config),
        }
    }
}

/// Exponential backoff with proportional jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Delay growth per attempt.
    pub multiplier: u32,
    /// Fraction of the delay added or removed at random, in `0.0..1.0`.
    pub jitter: f64,
    /// Statuses treated as transient. Transport failures always are.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2,
            jitter: 0.2,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn should_retry(&self, err: &FetchError) -> bool {
        match err {
            FetchError::Network(_) => true,
            FetchError::Http { status, .. } => self.retryable_statuses.contains(status),
            FetchError::Schema(_) => false,
        }
    }

    /// Delay before retry number `attempt` (0 for the first retry).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter <= 0.0 {
            return delay;
        }
        let spread = self.jitter.min(0.99);
        delay.mul_f64(1.0 + rand::thread_rng().gen_range(-spread..=spread))
    }
}
