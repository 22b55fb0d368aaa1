//! Embedding Provider Trait - Query Text to Vectors
//!
//! `TigerStyle`: Simulation-first embedding generation.
//!
//! Backends without integrated inference (pgvector) turn query text into a
//! dense or sparse vector through this collaborator before searching.
//!
//! # Architecture
//!
//! ```text
//! EmbeddingProvider (trait)
//! ├── SimEmbeddingProvider      (always available, deterministic)
//! └── ServiceEmbeddingProvider  (feature: embedding-service)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use vecbridge::embedding::{EmbeddingProvider, SimEmbeddingProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = SimEmbeddingProvider::new(42);
//!
//!     let dense = provider.embed("red running shoes").await.unwrap();
//!     let sparse = provider.embed_sparse("red running shoes").await.unwrap();
//!     assert_eq!(sparse.len(), 3);
//!     assert!(!dense.is_empty());
//! }
//! ```

mod sim;

#[cfg(feature = "embedding-service")]
mod service;

pub use sim::SimEmbeddingProvider;

#[cfg(feature = "embedding-service")]
pub use service::ServiceEmbeddingProvider;

use async_trait::async_trait;

use crate::sparse::SparseVector;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all embedding providers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Request timed out
    #[error("request timed out after {duration_ms}ms")]
    Timeout {
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded, retry after {retry_after_secs:?}s")]
    RateLimit {
        /// Seconds until rate limit resets (if known)
        retry_after_secs: Option<u64>,
    },

    /// Input text too long
    #[error("input too long: {bytes} bytes")]
    InputTooLong {
        /// Length of the rejected text
        bytes: usize,
    },

    /// Response did not have the expected shape
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Service unavailable
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// Reason for unavailability
        message: String,
    },

    /// Network error
    #[error("network error: {message}")]
    Network {
        /// Description of the network error
        message: String,
    },

    /// Invalid request parameters
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of what was invalid
        message: String,
    },

    /// Empty input provided
    #[error("empty input provided")]
    EmptyInput,

    /// Dimension mismatch in returned embedding
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: usize,
        /// Actual dimensions received
        actual: usize,
    },
}

impl EmbeddingError {
    /// Create a timeout error.
    #[must_use]
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limit(retry_after_secs: Option<u64>) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a service unavailable error.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::RateLimit { .. }
                | Self::ServiceUnavailable { .. }
                | Self::Network { .. }
        )
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Turns query text into vectors.
///
/// # Example
///
/// ```rust
/// use vecbridge::embedding::{EmbeddingProvider, SimEmbeddingProvider};
///
/// async fn query_vector<P: EmbeddingProvider>(provider: &P, text: &str) -> Vec<f32> {
///     provider.embed(text).await.unwrap()
/// }
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Dense embedding of `text`.
    ///
    /// # Errors
    /// Returns `EmbeddingError` on failure (rate limit, network error, etc.)
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Sparse (lexical) embedding of `text`.
    ///
    /// # Errors
    /// Returns `EmbeddingError` on failure.
    async fn embed_sparse(&self, text: &str) -> Result<SparseVector, EmbeddingError>;

    /// Provider name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Returns `true` for `SimEmbeddingProvider`, `false` for real providers.
    fn is_simulation(&self) -> bool;
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate that an embedding has the expected dimensions.
///
/// # Errors
/// Returns `EmbeddingError::DimensionMismatch` if dimensions don't match
pub fn validate_dimensions(embedding: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if embedding.len() != expected {
        return Err(EmbeddingError::dimension_mismatch(expected, embedding.len()));
    }
    Ok(())
}

/// Reject empty or oversized input before any work is done.
///
/// # Errors
/// Returns `EmptyInput` or `InputTooLong`.
pub fn validate_text(text: &str) -> Result<(), EmbeddingError> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::EmptyInput);
    }
    if text.len() > crate::constants::EMBEDDING_TEXT_BYTES_MAX {
        return Err(EmbeddingError::InputTooLong { bytes: text.len() });
    }
    Ok(())
}

/// Normalize a vector to unit length (L2 norm = 1).
///
/// A zero vector is returned unchanged.
#[must_use]
pub fn normalize_vector(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vec.to_vec();
    }
    vec.iter().map(|x| x / norm).collect()
}

// =============================================================================
// Tests
// =============================================================================
