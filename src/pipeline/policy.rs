use std::time::Duration;

use crate::foundation::error::{AdError, AdResult};

/// Bounded exponential backoff for external collaborator calls.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Zero-delay policy, mostly useful in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    pub fn validate(&self) -> AdResult<()> {
        if self.max_attempts == 0 {
            return Err(AdError::configuration("retry.max_attempts must be >= 1"));
        }
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(AdError::configuration(format!(
                "retry.multiplier must be finite and >= 1, got {}",
                self.multiplier
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(AdError::configuration(
                "retry.max_delay_ms must be >= retry.base_delay_ms",
            ));
        }
        Ok(())
    }

    pub fn should_retry(&self, err: &AdError, attempt: u32) -> bool {
        attempt < self.max_attempts && err.is_retryable()
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based.
    ///
    /// A server-provided retry-after hint wins when it is longer than the computed backoff,
    /// capped at `max_delay_ms` like everything else.
    pub fn delay_for(&self, attempt: u32, err: &AdError) -> Duration {
        let exp = attempt.saturating_sub(1).min(30) as i32;
        let backoff = (self.base_delay_ms as f64 * self.multiplier.powi(exp))
            .min(self.max_delay_ms as f64) as u64;
        let hinted = err.retry_after_ms().unwrap_or(0).min(self.max_delay_ms);
        Duration::from_millis(backoff.max(hinted))
    }
}

/// What to do with copy that exceeds the channel's character limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyLimitPolicy {
    /// Log a warning and let the text renderer fit the copy.
    #[default]
    Advisory,
    /// Fail the copy stage with a schema violation.
    Reject,
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/policy.rs"]
mod tests;
