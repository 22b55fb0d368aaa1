//! Provider Errors
//!
//! `TigerStyle`: One taxonomy for every backend. Adapters classify their
//! native failures into these variants so the batch engine can decide what
//! to retry without knowing which backend it is talking to.

use thiserror::Error;

use crate::embedding::EmbeddingError;

/// Errors from vector provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Invalid or missing configuration
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Operation attempted before `setup()` succeeded
    #[error("provider '{provider}' is not set up")]
    NotReady {
        /// Provider name
        provider: String,
    },

    /// Backend throttled the request
    #[error(
        "rate limited{}",
        .retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default()
    )]
    RateLimited {
        /// Suggested wait, when the backend provides one
        retry_after_secs: Option<u64>,
    },

    /// Request did not complete in time
    #[error("timeout after {duration_ms}ms")]
    Timeout {
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Backend unreachable or temporarily failing
    #[error("backend unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },

    /// Request rejected as malformed
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Error message
        message: String,
    },

    /// Index does not exist
    #[error("index not found: {index}")]
    IndexNotFound {
        /// Index name
        index: String,
    },

    /// Any other backend failure
    #[error("backend error: {message}")]
    Backend {
        /// Error message
        message: String,
    },

    /// Payload could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Embedding collaborator failed
    #[error("embedding failed: {source}")]
    Embedding {
        /// Underlying embedding error
        #[from]
        source: EmbeddingError,
    },

    /// One or more chunks of a batch upsert failed after retries
    #[error("batch upsert failed: {failed_chunks} of {total_chunks} chunks")]
    BatchFailed {
        /// Chunks that did not succeed
        failed_chunks: usize,
        /// Chunks attempted
        total_chunks: usize,
    },
}

impl ProviderError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not-ready error.
    #[must_use]
    pub fn not_ready(provider: impl Into<String>) -> Self {
        Self::NotReady {
            provider: provider.into(),
        }
    }

    /// Create a rate-limit error.
    #[must_use]
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an invalid-request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an index-not-found error.
    #[must_use]
    pub fn index_not_found(index: impl Into<String>) -> Self {
        Self::IndexNotFound {
            index: index.into(),
        }
    }

    /// Create a generic backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a batch failure.
    ///
    /// # Panics
    /// Panics if `failed_chunks` is zero or exceeds `total_chunks`.
    #[must_use]
    pub fn batch_failed(failed_chunks: usize, total_chunks: usize) -> Self {
        // Precondition
        assert!(failed_chunks > 0, "batch_failed requires at least one failure");
        assert!(
            failed_chunks <= total_chunks,
            "failed_chunks ({failed_chunks}) > total_chunks ({total_chunks})"
        );

        Self::BatchFailed {
            failed_chunks,
            total_chunks,
        }
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Unavailable { .. } => true,
            Self::Embedding { source } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(any(feature = "pinecone", feature = "embedding-service"))]
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout(crate::constants::PINECONE_REQUEST_TIMEOUT_SECS * 1000);
        }
        if err.is_connect() {
            return Self::unavailable(err.to_string());
        }
        if err.is_decode() {
            return Self::serialization(err.to_string());
        }
        match err.status() {
            Some(status) if status.as_u16() == 429 => Self::rate_limited(None),
            Some(status) if status.is_server_error() => Self::unavailable(err.to_string()),
            Some(status) if status.as_u16() == 404 => Self::backend(err.to_string()),
            Some(status) if status.is_client_error() => Self::invalid_request(err.to_string()),
            _ => Self::backend(err.to_string()),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => {
                Self::timeout(crate::constants::PGVECTOR_ACQUIRE_TIMEOUT_MS_DEFAULT)
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::unavailable(err.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // undefined_table
                Some("42P01") => Self::index_not_found(db.message().to_string()),
                // serialization_failure, deadlock_detected, too_many_connections
                Some("40001" | "40P01" | "53300") => Self::unavailable(db.message().to_string()),
                // invalid_text_representation, data_exception (bad vector literal, dimension)
                Some("22P02" | "22000") => Self::invalid_request(db.message().to_string()),
                _ => Self::backend(db.message().to_string()),
            },
            _ => Self::backend(err.to_string()),
        }
    }
}
