//! `MemoryProvider` - In-Memory Vector Provider for Testing
//!
//! `TigerStyle`: Deterministic testing with fault injection.
//!
//! Exact (brute-force) search over records held in process memory. Query
//! text is embedded with a [`SimEmbeddingProvider`] sized to the index, so
//! text, vector and hybrid search all work without any external service.
//!
//! Fault injection operation names: `upsert`, `query_dense`, `query_sparse`,
//! `delete`, `health`, plus `embed` / `embed_sparse` for text queries.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{RoleIndexes, VectorProvider};
use crate::batch::BatchWriter;
use crate::dst::{FaultInjector, FaultType};
use crate::embedding::{EmbeddingProvider, SimEmbeddingProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::filter::{self, FilterClause};
use crate::fusion::RrfParams;
use crate::sparse::SparseVector;
use crate::types::{
    resolve_namespace, IndexConfig, IndexType, Metric, SearchOptions, SearchResult, SearchType,
    VectorRecord,
};

const SIM_FAULT_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// MemoryConfig
// =============================================================================

/// Settings for [`MemoryProvider`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Seed for the query embedder
    pub seed: u64,
    /// Index names used for hybrid search
    #[serde(flatten)]
    pub roles: RoleIndexes,
    /// Fusion weights
    pub rrf: RrfParams,
}

impl MemoryConfig {
    /// Check the config is usable.
    ///
    /// # Errors
    /// Returns `Configuration` if the fusion weights are invalid.
    pub fn validate(&self) -> ProviderResult<()> {
        self.rrf.validate()
    }
}

// =============================================================================
// MemoryProvider
// =============================================================================

#[derive(Debug)]
struct MemoryIndex {
    config: IndexConfig,
    /// namespace -> id -> record
    namespaces: HashMap<String, BTreeMap<String, VectorRecord>>,
}

/// In-memory vector provider.
///
/// `TigerStyle`:
/// - Deterministic ordering (ties broken by id)
/// - Fault injection via `FaultInjector`
/// - Thread-safe with `RwLock`
#[derive(Debug)]
pub struct MemoryProvider {
    config: MemoryConfig,
    indexes: RwLock<HashMap<String, MemoryIndex>>,
    ready: AtomicBool,
    fault_injector: Option<Arc<FaultInjector>>,
    writer: BatchWriter,
    upsert_calls: AtomicU64,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryProvider {
    /// Create a provider. Call `setup()` before use.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            indexes: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
            fault_injector: None,
            writer: BatchWriter::new(),
            upsert_calls: AtomicU64::new(0),
        }
    }

    /// Build from a JSON config bundle.
    ///
    /// # Errors
    /// Returns `Configuration` on malformed or invalid settings.
    pub fn from_value(value: serde_json::Value) -> ProviderResult<Self> {
        let config: MemoryConfig = serde_json::from_value(value)
            .map_err(|e| ProviderError::configuration(format!("memory config: {e}")))?;
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Inject faults into provider operations.
    #[must_use]
    pub fn with_faults(mut self, fault_injector: Arc<FaultInjector>) -> Self {
        self.fault_injector = Some(fault_injector);
        self
    }

    /// Replace the retry machinery (e.g. with a simulated clock).
    #[must_use]
    pub fn with_batch_writer(mut self, writer: BatchWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Number of `upsert_vectors` calls seen, failed ones included.
    #[must_use]
    pub fn upsert_calls(&self) -> u64 {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Records stored in `index` under `namespace`.
    #[must_use]
    pub fn record_count(&self, index: &str, namespace: Option<&str>) -> usize {
        let indexes = self.indexes.read().expect("indexes lock poisoned");
        indexes
            .get(index)
            .and_then(|idx| idx.namespaces.get(resolve_namespace(namespace)))
            .map_or(0, BTreeMap::len)
    }

    /// Stored copy of a record.
    #[must_use]
    pub fn get_record(
        &self,
        index: &str,
        id: &str,
        namespace: Option<&str>,
    ) -> Option<VectorRecord> {
        let indexes = self.indexes.read().expect("indexes lock poisoned");
        indexes
            .get(index)?
            .namespaces
            .get(resolve_namespace(namespace))?
            .get(id)
            .cloned()
    }

    fn ensure_ready(&self) -> ProviderResult<()> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ProviderError::not_ready(self.name()))
        }
    }

    fn maybe_inject_fault(&self, operation: &str) -> ProviderResult<()> {
        let Some(injector) = &self.fault_injector else {
            return Ok(());
        };
        match injector.should_inject(operation) {
            Some(fault) => Err(fault_to_error(fault, operation)),
            None => Ok(()),
        }
    }

    fn embedder(&self, dimensions: usize) -> SimEmbeddingProvider {
        let embedder = SimEmbeddingProvider::new(self.config.seed).with_dimensions(dimensions);
        match &self.fault_injector {
            Some(injector) => embedder.with_faults(Arc::clone(injector)),
            None => embedder,
        }
    }

    fn index_config(&self, index: &str) -> ProviderResult<IndexConfig> {
        let indexes = self.indexes.read().expect("indexes lock poisoned");
        indexes
            .get(index)
            .map(|idx| idx.config.clone())
            .ok_or_else(|| ProviderError::index_not_found(index))
    }

    /// Score every record in the namespace that passes the filter.
    fn scan<F>(
        &self,
        index: &str,
        expected: IndexType,
        options: &SearchOptions,
        score: F,
    ) -> ProviderResult<Vec<SearchResult>>
    where
        F: Fn(&IndexConfig, &VectorRecord) -> Option<f32>,
    {
        let clauses: Vec<FilterClause> = match &options.filter {
            Some(f) => filter::parse(f)?,
            None => Vec::new(),
        };

        let indexes = self.indexes.read().expect("indexes lock poisoned");
        let idx = indexes
            .get(index)
            .ok_or_else(|| ProviderError::index_not_found(index))?;

        if idx.config.index_type != expected {
            return Err(ProviderError::invalid_request(format!(
                "index '{index}' is {}, not {expected}",
                idx.config.index_type
            )));
        }

        let Some(records) = idx.namespaces.get(options.namespace()) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SearchResult> = records
            .values()
            .filter(|record| filter::matches(&clauses, record.metadata.as_ref()))
            .filter_map(|record| {
                score(&idx.config, record).map(|s| SearchResult {
                    id: record.id.clone(),
                    score: s,
                    metadata: record.metadata.clone(),
                })
            })
            .collect();

        let ascending = !idx.config.metric.higher_is_better() && expected == IndexType::Dense;
        results.sort_by(|a, b| {
            let by_score = if ascending {
                a.score.total_cmp(&b.score)
            } else {
                b.score.total_cmp(&a.score)
            };
            by_score.then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(options.top_k);

        // Postcondition
        assert!(results.len() <= options.top_k, "results must not exceed top_k");
        Ok(results)
    }
}

/// Map a simulated fault onto the error a real backend would return.
fn fault_to_error(fault: FaultType, operation: &str) -> ProviderError {
    match fault {
        FaultType::WriteRateLimit | FaultType::EmbeddingRateLimit => {
            ProviderError::rate_limited(None)
        }
        FaultType::WriteTimeout | FaultType::QueryTimeout | FaultType::EmbeddingTimeout => {
            ProviderError::timeout(SIM_FAULT_TIMEOUT_MS)
        }
        FaultType::WriteRejected => {
            ProviderError::invalid_request(format!("injected rejection during {operation}"))
        }
        FaultType::QueryFail => {
            ProviderError::backend(format!("injected failure during {operation}"))
        }
        FaultType::BackendUnavailable | FaultType::PoolExhausted => {
            ProviderError::unavailable(format!("injected {} during {operation}", fault.as_str()))
        }
        FaultType::IndexMissing => ProviderError::index_not_found(operation),
    }
}

/// Dense similarity under `metric`. Euclidean returns the distance.
fn dense_score(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    // Precondition
    assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match metric {
        Metric::DotProduct => dot,
        Metric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        Metric::Cosine => {
            let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                0.0
            } else {
                dot / (norm_a * norm_b)
            }
        }
    }
}

#[async_trait]
impl VectorProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn setup(&self) -> ProviderResult<()> {
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    #[tracing::instrument(skip(self, config), fields(index = %config.name))]
    async fn create_index(&self, config: &IndexConfig) -> ProviderResult<()> {
        self.ensure_ready()?;
        config.validate()?;

        let mut indexes = self.indexes.write().expect("indexes lock poisoned");
        if indexes.contains_key(&config.name) {
            tracing::debug!("index already exists");
            return Ok(());
        }
        indexes.insert(
            config.name.clone(),
            MemoryIndex {
                config: config.clone(),
                namespaces: HashMap::new(),
            },
        );

        tracing::info!(
            index_type = %config.index_type,
            metric = %config.metric,
            "index created"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self, records), fields(record_count = records.len()))]
    async fn upsert_vectors(
        &self,
        index: &str,
        records: &[VectorRecord],
        namespace: Option<&str>,
    ) -> ProviderResult<()> {
        self.ensure_ready()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_inject_fault("upsert")?;

        let mut indexes = self.indexes.write().expect("indexes lock poisoned");
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| ProviderError::index_not_found(index))?;

        // All-or-nothing per call
        for record in records {
            record.validate_for(idx.config.index_type, idx.config.dimension)?;
        }

        let bucket = idx
            .namespaces
            .entry(resolve_namespace(namespace).to_string())
            .or_default();
        for record in records {
            bucket.insert(record.id.clone(), record.clone());
        }

        Ok(())
    }

    #[tracing::instrument(
        skip(self, query, options),
        fields(top_k = options.top_k, search_type = ?options.search_type)
    )]
    async fn search(
        &self,
        index: &str,
        query: &str,
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>> {
        self.ensure_ready()?;
        options.validate()?;

        match options.search_type {
            SearchType::Hybrid => {
                let (dense, sparse) = self.role_indexes(index);
                self.hybrid_search(&dense, &sparse, query, options).await
            }
            SearchType::Dense => {
                let dimension = self.index_config(index)?.dimension.ok_or_else(|| {
                    ProviderError::invalid_request(format!("index '{index}' is not dense"))
                })?;
                let vector = self.embedder(dimension).embed(query).await?;
                self.search_by_vector(index, &vector, options).await
            }
            SearchType::Sparse => {
                let vector = self.embedder(1).embed_sparse(query).await?;
                self.search_by_sparse_vector(index, &vector, options).await
            }
        }
    }

    #[tracing::instrument(skip(self, vector, options), fields(top_k = options.top_k))]
    async fn search_by_vector(
        &self,
        index: &str,
        vector: &[f32],
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>> {
        self.ensure_ready()?;
        options.validate()?;
        self.maybe_inject_fault("query_dense")?;

        let config = self.index_config(index)?;
        if config.dimension.is_some_and(|d| d != vector.len()) {
            return Err(ProviderError::invalid_request(format!(
                "query has dimension {}, index '{index}' expects {}",
                vector.len(),
                config.dimension.unwrap_or_default()
            )));
        }

        self.scan(index, IndexType::Dense, options, |config, record| {
            record
                .values
                .as_deref()
                .map(|values| dense_score(config.metric, vector, values))
        })
    }

    #[tracing::instrument(
        skip(self, vector, options),
        fields(top_k = options.top_k, terms = vector.len())
    )]
    async fn search_by_sparse_vector(
        &self,
        index: &str,
        vector: &SparseVector,
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>> {
        self.ensure_ready()?;
        options.validate()?;
        self.maybe_inject_fault("query_sparse")?;

        self.scan(index, IndexType::Sparse, options, |_, record| {
            let stored = record.sparse_values.as_ref()?;
            let score = vector.dot(stored);
            // Records sharing no terms are not matches
            (score != 0.0).then_some(score)
        })
    }

    #[tracing::instrument(skip(self, ids), fields(id_count = ids.len()))]
    async fn delete_vectors(
        &self,
        index: &str,
        ids: &[String],
        namespace: Option<&str>,
    ) -> ProviderResult<()> {
        self.ensure_ready()?;
        self.maybe_inject_fault("delete")?;

        let mut indexes = self.indexes.write().expect("indexes lock poisoned");
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| ProviderError::index_not_found(index))?;

        if let Some(bucket) = idx.namespaces.get_mut(resolve_namespace(namespace)) {
            for id in ids {
                bucket.remove(id);
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_index(&self, index: &str) -> ProviderResult<()> {
        self.ensure_ready()?;

        let removed = self
            .indexes
            .write()
            .expect("indexes lock poisoned")
            .remove(index)
            .is_some();
        if removed {
            tracing::info!("index deleted");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.is_ready() && self.maybe_inject_fault("health").is_ok()
    }

    fn batch_writer(&self) -> &BatchWriter {
        &self.writer
    }

    fn fusion(&self) -> RrfParams {
        self.config.rrf
    }

    fn role_indexes(&self, index: &str) -> (String, String) {
        self.config.roles.resolve(index)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{DeterministicRng, FaultConfig, FaultInjectorBuilder, SimClock};
    use serde_json::json;

    async fn ready() -> MemoryProvider {
        let provider = MemoryProvider::default();
        provider.setup().await.unwrap();
        provider
    }

    async fn with_dense_index(metric: Metric) -> MemoryProvider {
        let provider = ready().await;
        provider
            .create_index(&IndexConfig::dense("dense", 3, metric))
            .await
            .unwrap();
        provider
    }

    fn sparse(pairs: &[(u32, f32)]) -> SparseVector {
        SparseVector::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_not_ready_before_setup() {
        let provider = MemoryProvider::default();
        assert!(!provider.is_ready());
        assert!(!provider.health_check().await);

        let err = provider
            .create_index(&IndexConfig::sparse("sparse"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_search_by_vector_exact_match() {
        let provider = with_dense_index(Metric::Cosine).await;
        provider
            .upsert_vectors(
                "dense",
                &[
                    VectorRecord::dense("p1", vec![1.0, 0.0, 0.0]),
                    VectorRecord::dense("p2", vec![0.0, 1.0, 0.0]),
                ],
                None,
            )
            .await
            .unwrap();

        let results = provider
            .search_by_vector("dense", &[1.0, 0.0, 0.0], &SearchOptions::new(1))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_euclidean_sorts_ascending() {
        let provider = with_dense_index(Metric::Euclidean).await;
        provider
            .upsert_vectors(
                "dense",
                &[
                    VectorRecord::dense("far", vec![5.0, 5.0, 5.0]),
                    VectorRecord::dense("near", vec![1.0, 0.1, 0.0]),
                ],
                None,
            )
            .await
            .unwrap();

        let results = provider
            .search_by_vector("dense", &[1.0, 0.0, 0.0], &SearchOptions::new(2))
            .await
            .unwrap();
        assert_eq!(results[0].id, "near");
        assert!(results[0].score < results[1].score);
    }

    #[tokio::test]
    async fn test_create_index_idempotent() {
        let provider = with_dense_index(Metric::Cosine).await;
        provider
            .upsert_vectors("dense", &[VectorRecord::dense("a", vec![1.0, 0.0, 0.0])], None)
            .await
            .unwrap();

        provider
            .create_index(&IndexConfig::dense("dense", 3, Metric::Cosine))
            .await
            .unwrap();
        assert_eq!(provider.record_count("dense", None), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_whole_call_on_bad_record() {
        let provider = with_dense_index(Metric::Cosine).await;
        let err = provider
            .upsert_vectors(
                "dense",
                &[
                    VectorRecord::dense("ok", vec![1.0, 0.0, 0.0]),
                    VectorRecord::dense("bad", vec![1.0]),
                ],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidRequest { .. }));
        assert_eq!(provider.record_count("dense", None), 0);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let provider = with_dense_index(Metric::Cosine).await;
        for values in [vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]] {
            provider
                .upsert_vectors("dense", &[VectorRecord::dense("a", values)], None)
                .await
                .unwrap();
        }

        let stored = provider.get_record("dense", "a", None).unwrap();
        assert_eq!(stored.values, Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(provider.record_count("dense", None), 1);
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let provider = with_dense_index(Metric::Cosine).await;
        provider
            .upsert_vectors("dense", &[VectorRecord::dense("x", vec![1.0, 0.0, 0.0])], Some("a"))
            .await
            .unwrap();
        provider
            .upsert_vectors("dense", &[VectorRecord::dense("x", vec![0.0, 1.0, 0.0])], Some("b"))
            .await
            .unwrap();

        let in_a = provider
            .search_by_vector("dense", &[0.0, 1.0, 0.0], &SearchOptions::new(5).with_namespace("a"))
            .await
            .unwrap();
        assert_eq!(in_a.len(), 1);
        assert!(in_a[0].score.abs() < 1e-6);

        let in_default = provider
            .search_by_vector("dense", &[0.0, 1.0, 0.0], &SearchOptions::new(5))
            .await
            .unwrap();
        assert!(in_default.is_empty());
    }

    #[tokio::test]
    async fn test_filter_applied() {
        let provider = with_dense_index(Metric::Cosine).await;
        let meta = |brand: &str| json!({ "brand": brand }).as_object().cloned().unwrap();
        provider
            .upsert_vectors(
                "dense",
                &[
                    VectorRecord::dense("a", vec![1.0, 0.0, 0.0]).with_metadata(meta("acme")),
                    VectorRecord::dense("b", vec![0.9, 0.1, 0.0]).with_metadata(meta("zeta")),
                    VectorRecord::dense("c", vec![0.8, 0.2, 0.0]),
                ],
                None,
            )
            .await
            .unwrap();

        let filter = json!({"brand": {"$in": ["zeta", "other"]}}).as_object().cloned().unwrap();
        let results = provider
            .search_by_vector("dense", &[1.0, 0.0, 0.0], &SearchOptions::new(5).with_filter(filter))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "b");
        assert_eq!(results[0].metadata.as_ref().unwrap()["brand"], "zeta");
    }

    #[tokio::test]
    async fn test_sparse_search_dot_product() {
        let provider = ready().await;
        provider.create_index(&IndexConfig::sparse("sparse")).await.unwrap();
        provider
            .upsert_vectors(
                "sparse",
                &[
                    VectorRecord::sparse("a", sparse(&[(1, 1.0), (2, 1.0)])),
                    VectorRecord::sparse("b", sparse(&[(2, 3.0)])),
                    VectorRecord::sparse("c", sparse(&[(9, 1.0)])),
                ],
                None,
            )
            .await
            .unwrap();

        let results = provider
            .search_by_sparse_vector("sparse", &sparse(&[(2, 1.0)]), &SearchOptions::new(5))
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!((results[0].score - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_wrong_index_type_rejected() {
        let provider = ready().await;
        provider.create_index(&IndexConfig::sparse("sparse")).await.unwrap();

        let err = provider
            .search_by_vector("sparse", &[1.0], &SearchOptions::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_missing_index() {
        let provider = ready().await;
        let err = provider
            .upsert_vectors("nope", &[VectorRecord::dense("a", vec![1.0])], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::IndexNotFound { .. }));
    }

    #[tokio::test]
    async fn test_text_search_prefers_shared_tokens() {
        let provider = ready().await;
        provider
            .create_index(&IndexConfig::dense("dense", 32, Metric::Cosine))
            .await
            .unwrap();

        let embedder = SimEmbeddingProvider::new(0).with_dimensions(32);
        let mut records = Vec::new();
        for (id, text) in [("shoe", "red running shoe"), ("pan", "cast iron pan")] {
            records.push(VectorRecord::dense(id, embedder.embed(text).await.unwrap()));
        }
        provider.upsert_vectors("dense", &records, None).await.unwrap();

        let results = provider
            .search("dense", "red running shoe", &SearchOptions::new(1))
            .await
            .unwrap();
        assert_eq!(results[0].id, "shoe");
    }

    #[tokio::test]
    async fn test_hybrid_uses_role_indexes() {
        let config = MemoryConfig {
            roles: RoleIndexes {
                dense: Some("catalog-dense".into()),
                sparse: Some("catalog-sparse".into()),
            },
            ..MemoryConfig::default()
        };
        let provider = MemoryProvider::new(config);
        provider.setup().await.unwrap();
        provider
            .create_index(&IndexConfig::dense("catalog-dense", 16, Metric::Cosine))
            .await
            .unwrap();
        provider
            .create_index(&IndexConfig::sparse("catalog-sparse"))
            .await
            .unwrap();

        let embedder = SimEmbeddingProvider::new(0).with_dimensions(16);
        let text = "trail running shoe";
        provider
            .upsert_vectors(
                "catalog-dense",
                &[VectorRecord::dense("p1", embedder.embed(text).await.unwrap())],
                None,
            )
            .await
            .unwrap();
        provider
            .upsert_vectors(
                "catalog-sparse",
                &[VectorRecord::sparse("p1", embedder.embed_sparse(text).await.unwrap())],
                None,
            )
            .await
            .unwrap();

        let results = provider
            .search(
                "catalog",
                text,
                &SearchOptions::new(3).with_search_type(SearchType::Hybrid),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");
        let expected = 0.5 / 61.0 + 0.5 / 61.0;
        assert!((f64::from(results[0].score) - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_delete_vectors_and_index() {
        let provider = with_dense_index(Metric::Cosine).await;
        provider
            .upsert_vectors(
                "dense",
                &[
                    VectorRecord::dense("a", vec![1.0, 0.0, 0.0]),
                    VectorRecord::dense("b", vec![0.0, 1.0, 0.0]),
                ],
                None,
            )
            .await
            .unwrap();

        provider
            .delete_vectors("dense", &["a".to_string(), "missing".to_string()], None)
            .await
            .unwrap();
        assert_eq!(provider.record_count("dense", None), 1);

        provider.delete_index("dense").await.unwrap();
        provider.delete_index("dense").await.unwrap();
        assert!(matches!(
            provider.search_by_vector("dense", &[1.0, 0.0, 0.0], &SearchOptions::new(1)).await,
            Err(ProviderError::IndexNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_upsert_has_no_payload_cap() {
        let provider = MemoryProvider::default();
        provider.setup().await.unwrap();
        provider
            .create_index(&IndexConfig::dense("dense", 3, Metric::Cosine))
            .await
            .unwrap();

        provider
            .batch_upsert_vectors(
                "dense",
                &[VectorRecord::dense("a", vec![1.0, 0.0, 0.0])],
                20_000,
                None,
            )
            .await
            .unwrap();
        assert_eq!(provider.upsert_calls(), 1);
        assert_eq!(provider.record_count("dense", None), 1);
    }

    #[tokio::test]
    async fn test_fault_injection_maps_to_transient() {
        let injector = FaultInjectorBuilder::new(DeterministicRng::new(42))
            .with_fault(FaultConfig::new(FaultType::WriteRateLimit, 1.0).with_filter("upsert"))
            .build();
        let provider = MemoryProvider::default().with_faults(Arc::new(injector));
        provider.setup().await.unwrap();
        provider
            .create_index(&IndexConfig::dense("dense", 3, Metric::Cosine))
            .await
            .unwrap();

        let err = provider
            .upsert_vectors("dense", &[VectorRecord::dense("a", vec![1.0, 0.0, 0.0])], None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(provider.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_upsert_recovers_from_limited_faults() {
        let clock = SimClock::new();
        let injector = FaultInjectorBuilder::new(DeterministicRng::new(1))
            .with_fault(
                FaultConfig::new(FaultType::WriteTimeout, 1.0)
                    .with_filter("upsert")
                    .with_max_injections(2),
            )
            .build();
        let provider = MemoryProvider::default()
            .with_faults(Arc::new(injector))
            .with_batch_writer(BatchWriter::simulated(clock.clone(), 9));
        provider.setup().await.unwrap();
        provider
            .create_index(&IndexConfig::dense("dense", 3, Metric::Cosine))
            .await
            .unwrap();

        let records: Vec<VectorRecord> = (0..5)
            .map(|i| VectorRecord::dense(format!("r{i}"), vec![1.0, i as f32, 0.0]))
            .collect();
        provider
            .batch_upsert_vectors("dense", &records, 2, None)
            .await
            .unwrap();

        assert_eq!(provider.record_count("dense", None), 5);
        // 3 chunks + 2 retried attempts on the first chunk
        assert_eq!(provider.upsert_calls(), 5);
        assert!(clock.now_ms() >= 3_000);
    }

    #[test]
    fn test_config_from_value() {
        let provider = MemoryProvider::from_value(json!({
            "seed": 7,
            "dense_index_name": "d",
            "rrf": {"alpha": 0.7, "k": 10}
        }))
        .unwrap();
        assert_eq!(provider.role_indexes("x"), ("d".to_string(), "x".to_string()));
        assert!((provider.fusion().alpha - 0.7).abs() < f32::EPSILON);

        assert!(MemoryProvider::from_value(json!({"rrf": {"alpha": 2.0, "k": 60}})).is_err());
        assert!(MemoryProvider::from_value(json!({"seed": "x"})).is_err());
    }

    #[test]
    fn test_dense_score() {
        assert!((dense_score(Metric::Cosine, &[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((dense_score(Metric::DotProduct, &[1.0, 2.0], &[3.0, 4.0]) - 11.0).abs() < 1e-6);
        assert!((dense_score(Metric::Euclidean, &[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(dense_score(Metric::Cosine, &[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
