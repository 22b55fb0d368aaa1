//! Vector Providers - Backend Trait and Implementations
//!
//! `TigerStyle`: One contract, many backends, simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   VectorProvider Trait                       │
//! │   batch_upsert_vectors ──► batch::batch_upsert (default)     │
//! │   hybrid_search        ──► fusion::rrf_merge   (default)     │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                    ↑                    ↑
//!          │                    │                    │
//! ┌────────┴────────┐  ┌────────┴────────┐  ┌───────┴────────┐
//! │ MemoryProvider  │  │PineconeProvider │  │PgVectorProvider│
//! │   (testing)     │  │   (managed)     │  │  (postgres)    │
//! └─────────────────┘  └─────────────────┘  └────────────────┘
//! ```
//!
//! Every operation before a successful `setup()` fails with `NotReady`.

mod memory;

#[cfg(feature = "pinecone")]
mod pinecone;

#[cfg(feature = "postgres")]
mod pgvector;

pub use memory::{MemoryConfig, MemoryProvider};

#[cfg(feature = "pinecone")]
pub use pinecone::{PineconeConfig, PineconeProvider};

#[cfg(feature = "postgres")]
pub use pgvector::{PgVectorConfig, PgVectorProvider};

use async_trait::async_trait;

use crate::batch::{batch_upsert, BatchWriter};
use crate::constants::{RRF_FANOUT_MULTIPLIER, SEARCH_TOP_K_MAX};
use crate::error::ProviderResult;
use crate::fusion::{rrf_merge, RrfParams};
use crate::sparse::SparseVector;
use crate::types::{IndexConfig, SearchOptions, SearchResult, SearchType, VectorRecord};

/// Contract every vector backend implements.
///
/// Providers are shared behind `Arc` and must be safe to call concurrently.
#[async_trait]
pub trait VectorProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Registry name (`memory`, `pinecone`, `pgvector`).
    fn name(&self) -> &'static str;

    /// Acquire clients or pools. Idempotent.
    ///
    /// # Errors
    /// Returns `Configuration` if the backend cannot be initialised.
    async fn setup(&self) -> ProviderResult<()>;

    /// True once `setup()` has succeeded.
    fn is_ready(&self) -> bool;

    /// Create an index; a no-op if one with that name exists.
    async fn create_index(&self, config: &IndexConfig) -> ProviderResult<()>;

    /// Write `records` in a single request.
    async fn upsert_vectors(
        &self,
        index: &str,
        records: &[VectorRecord],
        namespace: Option<&str>,
    ) -> ProviderResult<()>;

    /// Write `records` in chunks of `batch_size`, retrying transient failures.
    ///
    /// # Errors
    /// `BatchFailed` if any chunk could not be written.
    async fn batch_upsert_vectors(
        &self,
        index: &str,
        records: &[VectorRecord],
        batch_size: usize,
        namespace: Option<&str>,
    ) -> ProviderResult<()> {
        batch_upsert(self, index, records, batch_size, namespace).await
    }

    /// Search by query text; the backend or an embedding collaborator
    /// turns the text into a vector. `Hybrid` dispatches to
    /// [`VectorProvider::hybrid_search`] over [`VectorProvider::role_indexes`].
    async fn search(
        &self,
        index: &str,
        query: &str,
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>>;

    /// Search a dense index with a precomputed vector.
    async fn search_by_vector(
        &self,
        index: &str,
        vector: &[f32],
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>>;

    /// Search a sparse index with a precomputed sparse vector.
    async fn search_by_sparse_vector(
        &self,
        index: &str,
        vector: &SparseVector,
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>>;

    /// Dense + sparse search fused with RRF.
    ///
    /// Each side is queried for `2 * top_k` results with the same filter
    /// and namespace. Backends with native fusion override this.
    async fn hybrid_search(
        &self,
        dense_index: &str,
        sparse_index: &str,
        query: &str,
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>> {
        options.validate()?;
        let fanout = fanout_top_k(options.top_k);
        let dense_options = options.derive(fanout, SearchType::Dense);
        let sparse_options = options.derive(fanout, SearchType::Sparse);

        let (dense, sparse) = futures::try_join!(
            self.search(dense_index, query, &dense_options),
            self.search(sparse_index, query, &sparse_options),
        )?;

        tracing::debug!(
            dense_hits = dense.len(),
            sparse_hits = sparse.len(),
            top_k = options.top_k,
            "fusing hybrid results"
        );
        Ok(rrf_merge(&dense, &sparse, options.top_k, self.fusion()))
    }

    /// Hybrid search with precomputed dense and sparse query vectors.
    async fn hybrid_search_by_vectors(
        &self,
        dense_index: &str,
        sparse_index: &str,
        dense: &[f32],
        sparse: &SparseVector,
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>> {
        options.validate()?;
        let fanout = fanout_top_k(options.top_k);
        let dense_options = options.derive(fanout, SearchType::Dense);
        let sparse_options = options.derive(fanout, SearchType::Sparse);

        let (dense_hits, sparse_hits) = futures::try_join!(
            self.search_by_vector(dense_index, dense, &dense_options),
            self.search_by_sparse_vector(sparse_index, sparse, &sparse_options),
        )?;

        Ok(rrf_merge(&dense_hits, &sparse_hits, options.top_k, self.fusion()))
    }

    /// Delete records by id within one namespace.
    async fn delete_vectors(
        &self,
        index: &str,
        ids: &[String],
        namespace: Option<&str>,
    ) -> ProviderResult<()>;

    /// Drop an index and everything in it.
    async fn delete_index(&self, index: &str) -> ProviderResult<()>;

    /// Cheap liveness probe. Never errors.
    async fn health_check(&self) -> bool;

    /// Retry machinery used by `batch_upsert_vectors`.
    fn batch_writer(&self) -> &BatchWriter;

    /// RRF weights used by the default `hybrid_search`.
    fn fusion(&self) -> RrfParams {
        RrfParams::default()
    }

    /// Dense and sparse index names a `Hybrid` search on `index` fans out to.
    ///
    /// Defaults to `index` for both roles.
    fn role_indexes(&self, index: &str) -> (String, String) {
        (index.to_string(), index.to_string())
    }
}

/// Per-side result count for hybrid fan-out.
#[must_use]
pub fn fanout_top_k(top_k: usize) -> usize {
    top_k.saturating_mul(RRF_FANOUT_MULTIPLIER).min(SEARCH_TOP_K_MAX)
}

/// Configured role index names with a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RoleIndexes {
    /// Index queried for the dense side of hybrid search
    #[serde(default, rename = "dense_index_name")]
    pub dense: Option<String>,
    /// Index queried for the sparse side of hybrid search
    #[serde(default, rename = "sparse_index_name")]
    pub sparse: Option<String>,
}

impl RoleIndexes {
    /// Resolve both roles, falling back to `index`.
    #[must_use]
    pub fn resolve(&self, index: &str) -> (String, String) {
        (
            self.dense.clone().unwrap_or_else(|| index.to_string()),
            self.sparse.clone().unwrap_or_else(|| index.to_string()),
        )
    }
}
