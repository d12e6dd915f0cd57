use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::foundation::error::{AdError, AdResult};

/// Token-bucket limits for collaborator calls, shared by every segment of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 0 disables limiting.
    pub requests_per_minute: u32,
    /// Bucket size; 0 means "same as requests_per_minute".
    pub burst: u32,
}

impl RateLimitConfig {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.requests_per_minute > 0
    }
}

/// Process-wide gate in front of every external call.
pub struct CallLimiter {
    inner: Option<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for CallLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallLimiter")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

impl CallLimiter {
    pub fn new(cfg: &RateLimitConfig) -> AdResult<Self> {
        let Some(rpm) = NonZeroU32::new(cfg.requests_per_minute) else {
            return Ok(Self::unlimited());
        };
        let burst = NonZeroU32::new(cfg.burst).unwrap_or(rpm);
        if burst > rpm.saturating_mul(NonZeroU32::new(60).unwrap_or(NonZeroU32::MIN)) {
            return Err(AdError::configuration(format!(
                "rate_limit.burst {burst} exceeds an hour of quota at {rpm} rpm"
            )));
        }
        let quota = Quota::per_minute(rpm).allow_burst(burst);
        Ok(Self {
            inner: Some(RateLimiter::direct(quota)),
        })
    }

    pub fn unlimited() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Wait until a call may be made.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.inner {
            limiter.until_ready().await;
        }
    }

    /// Take a permit without waiting; `true` when one was available.
    pub fn try_acquire(&self) -> bool {
        match &self.inner {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/limiter.rs"]
mod tests;
