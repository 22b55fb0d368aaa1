//! Retry Policy and Sleep Sources
//!
//! `TigerStyle`: Backoff is `base^attempt` seconds plus uniform jitter, with a
//! zero-based attempt counter and a hard cap on total attempts. Sleeping goes
//! through [`Sleeper`] so simulation runs advance a [`SimClock`] instead of
//! waiting.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::constants::{
    RETRY_ATTEMPTS_COUNT_DEFAULT, RETRY_ATTEMPTS_COUNT_MAX, RETRY_BACKOFF_BASE_SECS,
    RETRY_JITTER_MS_MAX,
};
use crate::dst::SimClock;
use crate::error::{ProviderError, ProviderResult};

// =============================================================================
// RetryPolicy
// =============================================================================

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Exponential base in seconds
    pub backoff_base_secs: u64,
    /// Upper bound of the uniform jitter
    pub jitter_ms_max: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_ATTEMPTS_COUNT_DEFAULT,
            backoff_base_secs: RETRY_BACKOFF_BASE_SECS,
            jitter_ms_max: RETRY_JITTER_MS_MAX,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` total attempts and default backoff.
    ///
    /// # Errors
    /// Returns `Configuration` if `max_attempts` is zero or above the maximum.
    pub fn with_max_attempts(max_attempts: u32) -> ProviderResult<Self> {
        let policy = Self {
            max_attempts,
            ..Self::default()
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check the policy is usable.
    ///
    /// # Errors
    /// Returns `Configuration` if `max_attempts` is outside `1..=RETRY_ATTEMPTS_COUNT_MAX`.
    pub fn validate(&self) -> ProviderResult<()> {
        if !(1..=RETRY_ATTEMPTS_COUNT_MAX).contains(&self.max_attempts) {
            return Err(ProviderError::configuration(format!(
                "max_attempts {} outside 1..={RETRY_ATTEMPTS_COUNT_MAX}",
                self.max_attempts
            )));
        }
        Ok(())
    }

    /// Wait before retrying after zero-based `attempt` failed.
    ///
    /// `jitter` is a uniform draw in [0, 1).
    ///
    /// # Panics
    /// Panics if `jitter` is outside [0, 1).
    #[must_use]
    pub fn backoff(&self, attempt: u32, jitter: f64) -> Duration {
        // Precondition
        assert!((0.0..1.0).contains(&jitter), "jitter must be in [0, 1), got {jitter}");

        let base = Duration::from_secs(self.backoff_base_secs.saturating_pow(attempt));
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jitter = Duration::from_millis((jitter * self.jitter_ms_max as f64) as u64);
        base + jitter
    }
}

// =============================================================================
// Sleeper
// =============================================================================

/// Source of delays between retries.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated sleeping: advances the clock and returns immediately.
#[async_trait]
impl Sleeper for SimClock {
    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
