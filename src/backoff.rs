use crate::config::RetryConfig;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 800;
pub const DEFAULT_CAP_DELAY_MS: u64 = 10_000;
/// An accepted draft that is never confirmed releases the slot after this.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 8_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub cap_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            cap_delay: Duration::from_millis(DEFAULT_CAP_DELAY_MS),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            cap_delay: Duration::from_millis(cfg.cap_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Requeue(Duration),
    Fail,
}

impl RetryPolicy {
    /// `attempt` counts the attempt that just failed.
    pub fn decide(&self, attempt: u32, max_retries: u32) -> RetryDecision {
        if attempt < max_retries {
            RetryDecision::Requeue(self.compute_backoff(attempt))
        } else {
            RetryDecision::Fail
        }
    }

    pub fn compute_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.cap_delay)
            .min(self.cap_delay)
    }
}

pub fn compute_backoff(attempt: u32) -> Duration {
    RetryPolicy::default().compute_backoff(attempt)
}
