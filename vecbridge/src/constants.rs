//! `TigerStyle` Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`
//! Example: `BATCH_RECORDS_COUNT_DEFAULT` (not `DEFAULT_BATCH_SIZE`)
//!
//! Every constant includes units in the name:
//! - _`COUNT_MAX/DEFAULT` for quantity limits
//! - _`SECS` / _`MS` for durations
//! - _`BYTES_MAX` for size limits

// =============================================================================
// Namespaces and Index Names
// =============================================================================

/// Namespace used when the caller does not name one
pub const NAMESPACE_DEFAULT: &str = "__default__";

/// Dense index name used by the repository when settings leave it unset
pub const INDEX_NAME_DENSE_DEFAULT: &str = "dense";

/// Sparse index name used by the repository when settings leave it unset
pub const INDEX_NAME_SPARSE_DEFAULT: &str = "sparse";

/// Maximum index name length (Pinecone limit, also keeps Postgres identifiers short)
pub const INDEX_NAME_BYTES_MAX: usize = 45;

/// Maximum record id length
pub const RECORD_ID_BYTES_MAX: usize = 512;

// =============================================================================
// Vector Limits
// =============================================================================

/// Maximum dense vector dimension (pgvector column limit for indexed vectors)
pub const VECTOR_DIMENSIONS_COUNT_MAX: usize = 16_000;

/// Dense dimension the repository uses when creating its dense index
pub const VECTOR_DIMENSIONS_COUNT_DEFAULT: usize = 1024;

/// Default number of results returned by a search
pub const SEARCH_TOP_K_DEFAULT: usize = 10;

/// Maximum number of results a single search may request
pub const SEARCH_TOP_K_MAX: usize = 10_000;

// =============================================================================
// Batch Upsert
// =============================================================================

/// Records per chunk when the caller does not specify a batch size
pub const BATCH_RECORDS_COUNT_DEFAULT: usize = 100;

/// Total attempts per chunk (first try included)
pub const RETRY_ATTEMPTS_COUNT_DEFAULT: u32 = 3;

/// Maximum total attempts per chunk
pub const RETRY_ATTEMPTS_COUNT_MAX: u32 = 10;

/// Backoff base: wait = BASE^attempt seconds plus jitter
pub const RETRY_BACKOFF_BASE_SECS: u64 = 2;

/// Upper bound of the uniform jitter added to each backoff
pub const RETRY_JITTER_MS_MAX: u64 = 1_000;

// =============================================================================
// Reciprocal Rank Fusion
// =============================================================================

/// Weight of the dense ranking in the fused score
pub const RRF_ALPHA_DEFAULT: f32 = 0.5;

/// Rank damping constant
pub const RRF_K_DEFAULT: u32 = 60;

/// Each sub-search fetches this many times `top_k` before fusion
pub const RRF_FANOUT_MULTIPLIER: usize = 2;

// =============================================================================
// Pinecone
// =============================================================================

/// Control-plane base URL
pub const PINECONE_CONTROL_URL_DEFAULT: &str = "https://api.pinecone.io";

/// API version header value
pub const PINECONE_API_VERSION: &str = "2025-04";

/// Serverless cloud used when none is configured
pub const PINECONE_CLOUD_DEFAULT: &str = "aws";

/// Serverless region used when none is configured
pub const PINECONE_REGION_DEFAULT: &str = "us-east-1";

/// Fixed per-request timeout
pub const PINECONE_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on waiting for a freshly created index to report ready
pub const PINECONE_INDEX_READY_WAIT_SECS_MAX: u64 = 120;

/// Interval between readiness polls
pub const PINECONE_INDEX_READY_POLL_MS: u64 = 1_000;

/// Maximum vectors in one upsert request
pub const PINECONE_UPSERT_RECORDS_COUNT_MAX: usize = 1_000;

// =============================================================================
// pgvector
// =============================================================================

/// Table name prefix used when none is configured
pub const PGVECTOR_TABLE_PREFIX_DEFAULT: &str = "vectors";

/// Minimum pooled connections
pub const PGVECTOR_POOL_SIZE_MIN_DEFAULT: u32 = 2;

/// Maximum pooled connections
pub const PGVECTOR_POOL_SIZE_MAX_DEFAULT: u32 = 10;

/// Per-statement timeout
pub const PGVECTOR_STATEMENT_TIMEOUT_MS_DEFAULT: u64 = 30_000;

/// Pool acquire timeout
pub const PGVECTOR_ACQUIRE_TIMEOUT_MS_DEFAULT: u64 = 10_000;

/// HNSW build parameter `m`
pub const PGVECTOR_HNSW_M: u32 = 16;

/// HNSW build parameter `ef_construction`
pub const PGVECTOR_HNSW_EF_CONSTRUCTION: u32 = 64;

/// IVFFlat list count
pub const PGVECTOR_IVFFLAT_LISTS: u32 = 100;

// =============================================================================
// Embedding Service
// =============================================================================

/// Embedding request timeout
pub const EMBEDDING_TIMEOUT_MS_DEFAULT: u64 = 30_000;

/// Maximum embedding retries after the first request
pub const EMBEDDING_RETRIES_COUNT_MAX: u32 = 3;

/// Base delay between embedding retries
pub const EMBEDDING_RETRY_DELAY_MS: u64 = 500;

/// Maximum text length accepted for embedding
pub const EMBEDDING_TEXT_BYTES_MAX: usize = 32_000;

/// Dimension of the simulated dense embedding
pub const EMBEDDING_SIM_DIMENSIONS_COUNT: usize = 64;

/// Hash buckets for the simulated sparse embedding
pub const EMBEDDING_SIM_SPARSE_BUCKETS_COUNT: u32 = 30_000;
