//! # vecbridge
//!
//! Backend-agnostic vector storage with batched upserts and hybrid retrieval.
//!
//! ## Features
//!
//! - **One contract**: [`VectorProvider`] covers index management, writes,
//!   dense, sparse and hybrid search, deletion and health checks
//! - **Three backends**: in-memory (testing), Pinecone (managed) and
//!   Postgres with pgvector
//! - **Batch engine**: chunked upserts with exponential backoff and jitter
//! - **Hybrid search**: dense and sparse rankings fused with Reciprocal Rank Fusion
//! - **Deterministic testing**: seeded RNG, simulated clock and fault injection
//!   from `vecbridge-core`
//!
//! ## Quick Start
//!
//! ```rust
//! use vecbridge::provider::{MemoryProvider, VectorProvider};
//! use vecbridge::types::{IndexConfig, Metric, SearchOptions, VectorRecord};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MemoryProvider::default();
//! provider.setup().await?;
//! provider.create_index(&IndexConfig::dense("products", 3, Metric::Cosine)).await?;
//!
//! let records = vec![
//!     VectorRecord::dense("p1", vec![1.0, 0.0, 0.0]),
//!     VectorRecord::dense("p2", vec![0.0, 1.0, 0.0]),
//! ];
//! provider.batch_upsert_vectors("products", &records, 100, None).await?;
//!
//! let hits = provider
//!     .search_by_vector("products", &[1.0, 0.0, 0.0], &SearchOptions::new(1))
//!     .await?;
//! assert_eq!(hits[0].id, "p1");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   VectorRepository (facade)   ◄── VectorSettings        │
//! ├─────────────────────────────────────────────────────────┤
//! │   ProviderRegistry  name ──► Arc<dyn VectorProvider>    │
//! ├─────────────────────────────────────────────────────────┤
//! │   batch_upsert (retry)   │   rrf_merge (fusion)         │
//! ├─────────────────────────────────────────────────────────┤
//! │  MemoryProvider │ PineconeProvider │ PgVectorProvider   │
//! ├─────────────────────────────────────────────────────────┤
//! │   DST Framework          │ Fault injection + SimClock   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - `pinecone` - Pinecone REST adapter (default)
//! - `postgres` - pgvector adapter (default)
//! - `embedding-service` - HTTP embedding client used by `postgres`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod constants;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod provider;
pub mod registry;
pub mod repository;
pub mod retry;
pub mod settings;
pub mod sparse;
pub mod telemetry;
pub mod types;

pub use vecbridge_core::dst;

// Re-export common types
pub use batch::{batch_upsert, BatchWriter};
pub use error::{ProviderError, ProviderResult};
pub use fusion::{rrf_merge, RrfParams};
pub use provider::{MemoryConfig, MemoryProvider, VectorProvider};
pub use registry::ProviderRegistry;
pub use repository::{IngestRecord, VectorRepository};
pub use retry::{RetryPolicy, Sleeper};
pub use settings::VectorSettings;
pub use sparse::{SparseEncoding, SparseVector};
pub use types::{
    IndexConfig, IndexType, Metric, SearchOptions, SearchResult, SearchType, VectorRecord,
};

#[cfg(feature = "pinecone")]
pub use provider::{PineconeConfig, PineconeProvider};

#[cfg(feature = "postgres")]
pub use provider::{PgVectorConfig, PgVectorProvider};

// Embedding Provider exports
pub use embedding::{EmbeddingError, EmbeddingProvider, SimEmbeddingProvider};

#[cfg(feature = "embedding-service")]
pub use embedding::ServiceEmbeddingProvider;
