//! Simulated Embedding Provider for Deterministic Testing
//!
//! `TigerStyle`: Deterministic, reproducible embeddings for DST.
//!
//! # Algorithm
//!
//! Dense: every lowercase token seeds a `DeterministicRng` (token hash +
//! provider seed) that draws a vector in [-1, 1]^d; the token vectors are
//! summed and normalized. Texts sharing tokens therefore land close together,
//! which keeps dense search results meaningful in tests.
//!
//! Sparse: every token hashes to a bucket; the weight is `1 + ln(tf)`.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;

use super::{normalize_vector, validate_text, EmbeddingError, EmbeddingProvider};
use crate::constants::{
    EMBEDDING_SIM_DIMENSIONS_COUNT, EMBEDDING_SIM_SPARSE_BUCKETS_COUNT,
    EMBEDDING_TIMEOUT_MS_DEFAULT,
};
use crate::dst::{DeterministicRng, FaultInjector, FaultType};
use crate::sparse::SparseVector;

/// In-memory embedding provider for deterministic simulation testing.
#[derive(Clone, Debug)]
pub struct SimEmbeddingProvider {
    seed: u64,
    dimensions: usize,
    fault_injector: Option<Arc<FaultInjector>>,
}

impl SimEmbeddingProvider {
    /// Create a new simulated embedding provider with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            dimensions: EMBEDDING_SIM_DIMENSIONS_COUNT,
            fault_injector: None,
        }
    }

    /// Override the dense dimension.
    ///
    /// # Panics
    /// Panics if `dimensions` is zero.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        assert!(dimensions > 0, "dimensions must be positive");
        self.dimensions = dimensions;
        self
    }

    /// Enable fault injection (operation names `embed` / `embed_sparse`).
    #[must_use]
    pub fn with_faults(mut self, fault_injector: Arc<FaultInjector>) -> Self {
        self.fault_injector = Some(fault_injector);
        self
    }

    /// Dense dimension produced by `embed`.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_fault(&self, operation: &str) -> Result<(), EmbeddingError> {
        let Some(injector) = &self.fault_injector else {
            return Ok(());
        };
        match injector.should_inject(operation) {
            None => Ok(()),
            Some(FaultType::EmbeddingRateLimit | FaultType::WriteRateLimit) => {
                Err(EmbeddingError::rate_limit(Some(1)))
            }
            Some(
                FaultType::EmbeddingTimeout | FaultType::QueryTimeout | FaultType::WriteTimeout,
            ) => Err(EmbeddingError::timeout(EMBEDDING_TIMEOUT_MS_DEFAULT)),
            Some(other) => Err(EmbeddingError::service_unavailable(format!(
                "simulated fault: {}",
                other.as_str()
            ))),
        }
    }

    fn hash_token(&self, token: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn dense_for(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let mut rng = DeterministicRng::new(self.hash_token(&token));
            for slot in &mut sum {
                #[allow(clippy::cast_possible_truncation)]
                let draw = (rng.next_float() * 2.0 - 1.0) as f32;
                *slot += draw;
            }
        }

        let embedding = normalize_vector(&sum);

        // Postcondition
        debug_assert_eq!(embedding.len(), self.dimensions);
        embedding
    }

    fn sparse_for(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for token in tokenize(text) {
            #[allow(clippy::cast_possible_truncation)]
            let bucket =
                (self.hash_token(&token) % u64::from(EMBEDDING_SIM_SPARSE_BUCKETS_COUNT)) as u32;
            *counts.entry(bucket).or_insert(0) += 1;
        }

        let mut vector = SparseVector::new();
        for (bucket, tf) in counts {
            #[allow(clippy::cast_precision_loss)]
            let weight = 1.0 + (tf as f32).ln();
            // weights are finite by construction
            let _ = vector.insert(bucket, weight);
        }
        vector
    }
}

/// Lowercase alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for SimEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        validate_text(text)?;
        self.check_fault("embed")?;
        Ok(self.dense_for(text))
    }

    async fn embed_sparse(&self, text: &str) -> Result<SparseVector, EmbeddingError> {
        validate_text(text)?;
        self.check_fault("embed_sparse")?;
        Ok(self.sparse_for(text))
    }

    fn name(&self) -> &'static str {
        "sim"
    }

    fn is_simulation(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{FaultConfig, FaultInjectorBuilder};

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic() {
        let a = SimEmbeddingProvider::new(42);
        let b = SimEmbeddingProvider::new(42);

        assert_eq!(
            a.embed("trail running shoe").await.unwrap(),
            b.embed("trail running shoe").await.unwrap()
        );
        assert_eq!(
            a.embed_sparse("trail running shoe").await.unwrap(),
            b.embed_sparse("trail running shoe").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_different_seeds_differ() {
        let a = SimEmbeddingProvider::new(1).embed("shoe").await.unwrap();
        let b = SimEmbeddingProvider::new(2).embed("shoe").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_dense_normalized_and_sized() {
        let provider = SimEmbeddingProvider::new(7).with_dimensions(16);
        let v = provider.embed("leather boots").await.unwrap();

        assert_eq!(v.len(), 16);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_shared_tokens_are_closer() {
        let provider = SimEmbeddingProvider::new(42);
        let query = provider.embed("red running shoe").await.unwrap();
        let near = provider.embed("running shoe").await.unwrap();
        let far = provider.embed("ceramic teapot").await.unwrap();

        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_sparse_term_frequency() {
        let provider = SimEmbeddingProvider::new(42);
        let v = provider.embed_sparse("Shoe shoe SHOE sock").await.unwrap();

        assert_eq!(v.len(), 2);
        let weights: Vec<f32> = v.iter().map(|(_, w)| w).collect();
        assert!(weights.iter().any(|w| (w - 1.0).abs() < 1e-6));
        assert!(weights.iter().any(|w| (w - (1.0 + 3f32.ln())).abs() < 1e-6));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = SimEmbeddingProvider::new(42);
        assert!(matches!(
            provider.embed("").await,
            Err(EmbeddingError::EmptyInput)
        ));
        assert!(matches!(
            provider.embed_sparse(" ").await,
            Err(EmbeddingError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let injector = Arc::new(
            FaultInjectorBuilder::new(DeterministicRng::new(42))
                .with_fault(
                    FaultConfig::new(FaultType::EmbeddingRateLimit, 1.0).with_max_injections(1),
                )
                .build(),
        );
        let provider = SimEmbeddingProvider::new(42).with_faults(injector);

        let first = provider.embed("shoe").await;
        assert!(matches!(first, Err(EmbeddingError::RateLimit { .. })));
        assert!(first.unwrap_err().is_retryable());

        assert!(provider.embed("shoe").await.is_ok());
    }
}
