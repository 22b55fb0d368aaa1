//! Batch Upsert Engine
//!
//! `TigerStyle`: Chunk, write, retry transient failures, keep going.
//!
//! ```text
//! records ──chunks(batch_size)──► chunk 0 ──upsert──► ok
//!                                 chunk 1 ──upsert──► 429 ─wait 1.x s─► ok
//!                                 chunk 2 ──upsert──► 400 (permanent, logged)
//!                                                      │
//!                                   BatchFailed { failed_chunks: 1, total_chunks: 3 }
//! ```
//!
//! Every chunk is attempted even after a failure; the caller gets one
//! aggregate outcome.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::dst::{DeterministicRng, SimClock};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::VectorProvider;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::types::VectorRecord;

// =============================================================================
// BatchWriter
// =============================================================================

/// Retry machinery owned by each provider.
///
/// Holds the policy, the sleep source and the jitter RNG.
#[derive(Debug)]
pub struct BatchWriter {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    jitter: Mutex<DeterministicRng>,
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchWriter {
    /// Default policy, real sleeps, entropy-seeded jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            jitter: Mutex::new(DeterministicRng::from_entropy()),
        }
    }

    /// Default policy, sleeps advance `clock`, jitter seeded with `seed`.
    #[must_use]
    pub fn simulated(clock: SimClock, seed: u64) -> Self {
        Self::new().with_sleeper(Arc::new(clock)).with_seed(seed)
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the sleep source.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Seed the jitter RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.jitter = Mutex::new(DeterministicRng::new(seed));
        self
    }

    /// Active retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// # Errors
    /// Returns the last error seen.
    pub async fn run_with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = ProviderResult<T>> + Send,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt: u32 = 0;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() || attempt + 1 >= max_attempts {
                return Err(err);
            }

            let jitter = self.jitter.lock().expect("jitter lock poisoned").next_float();
            let mut wait = self.policy.backoff(attempt, jitter);
            if let ProviderError::RateLimited {
                retry_after_secs: Some(secs),
            } = &err
            {
                wait = wait.max(Duration::from_secs(*secs));
            }

            #[allow(clippy::cast_possible_truncation)]
            let wait_ms = wait.as_millis() as u64;
            tracing::warn!(
                operation,
                attempt = attempt + 1,
                max_attempts,
                wait_ms,
                error = %err,
                "transient failure, retrying"
            );

            self.sleeper.sleep(wait).await;
            attempt += 1;
        }
    }
}

// =============================================================================
// batch_upsert
// =============================================================================

/// Write `records` in ordered chunks of `batch_size`, retrying each chunk.
///
/// # Errors
/// - `Configuration` if `batch_size` is zero
/// - `BatchFailed` if any chunk failed after its retries
#[tracing::instrument(
    skip(provider, records),
    fields(provider = provider.name(), record_count = records.len())
)]
pub async fn batch_upsert<P: VectorProvider + ?Sized>(
    provider: &P,
    index: &str,
    records: &[VectorRecord],
    batch_size: usize,
    namespace: Option<&str>,
) -> ProviderResult<()> {
    // Payload limits are per backend; adapters check them in `upsert_vectors`.
    if batch_size == 0 {
        return Err(ProviderError::configuration("batch_size must be at least 1"));
    }

    let total_chunks = records.len().div_ceil(batch_size);
    let writer = provider.batch_writer();
    let mut failed_chunks = 0;

    for (chunk_index, chunk) in records.chunks(batch_size).enumerate() {
        // Invariant
        debug_assert!(!chunk.is_empty() && chunk.len() <= batch_size);

        let result = writer
            .run_with_retry("upsert", || provider.upsert_vectors(index, chunk, namespace))
            .await;

        match result {
            Ok(()) => {
                tracing::debug!(chunk_index, record_count = chunk.len(), "chunk written");
            }
            Err(err) => {
                failed_chunks += 1;
                tracing::error!(
                    chunk_index,
                    record_count = chunk.len(),
                    error = %err,
                    "chunk failed"
                );
            }
        }
    }

    if failed_chunks > 0 {
        return Err(ProviderError::batch_failed(failed_chunks, total_chunks));
    }

    tracing::info!(total_chunks, "batch upsert complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sim_writer(clock: &SimClock) -> BatchWriter {
        BatchWriter::simulated(clock.clone(), 7)
    }

    #[tokio::test]
    async fn test_retry_transient_then_success() {
        let clock = SimClock::new();
        let writer = sim_writer(&clock);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = writer
            .run_with_retry("op", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ProviderError::rate_limited(None))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // waits: 1s + jitter, 2s + jitter
        assert!(clock.now_ms() >= 3_000 && clock.now_ms() < 5_000);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let clock = SimClock::new();
        let writer = sim_writer(&clock);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: ProviderResult<()> = writer
            .run_with_retry("op", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::invalid_request("bad vector"))
            })
            .await;

        assert!(matches!(result, Err(ProviderError::InvalidRequest { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(clock.now_ms(), 0);
    }

    #[tokio::test]
    async fn test_attempts_capped() {
        let clock = SimClock::new();
        let writer = sim_writer(&clock);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: ProviderResult<()> = writer
            .run_with_retry("op", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::timeout(100))
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_honored() {
        let clock = SimClock::new();
        let writer = sim_writer(&clock).with_policy(RetryPolicy::with_max_attempts(2).unwrap());
        let counter = AtomicU32::new(0);
        let calls = &counter;

        writer
            .run_with_retry("op", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::rate_limited(Some(30)))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(clock.now_ms(), 30_000);
    }

    #[tokio::test]
    async fn test_same_seed_same_waits() {
        let run = || async {
            let clock = SimClock::new();
            let writer = sim_writer(&clock);
            let _: ProviderResult<()> = writer
                .run_with_retry("op", || async move { Err(ProviderError::unavailable("503")) })
                .await;
            clock.now_ms()
        };

        assert_eq!(run().await, run().await);
    }
}
