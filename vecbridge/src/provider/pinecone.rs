//! `PineconeProvider` - Managed Vector Service Adapter
//!
//! `TigerStyle`: Production provider, feature-gated.
//!
//! Requires the `pinecone` feature (on by default). Talks to the REST API
//! with one shared `reqwest::Client`:
//!
//! ```text
//! control plane  {control_url}/indexes[/{name}]         list, create, describe, delete
//! data plane     https://{host}/vectors/upsert           upsert
//!                https://{host}/query                     vector and sparse-vector query
//!                https://{host}/vectors/delete            delete by id
//!                https://{host}/records/namespaces/{ns}/search   text query (integrated inference)
//! ```
//!
//! Index hosts are resolved through `describe` once and cached until the
//! index is deleted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{RoleIndexes, VectorProvider};
use crate::batch::BatchWriter;
use crate::constants::{
    PINECONE_API_VERSION, PINECONE_CLOUD_DEFAULT, PINECONE_CONTROL_URL_DEFAULT,
    PINECONE_INDEX_READY_POLL_MS, PINECONE_INDEX_READY_WAIT_SECS_MAX, PINECONE_REGION_DEFAULT,
    PINECONE_REQUEST_TIMEOUT_SECS, PINECONE_UPSERT_RECORDS_COUNT_MAX,
};
use crate::error::{ProviderError, ProviderResult};
use crate::fusion::RrfParams;
use crate::sparse::{PositionalSparse, SparseVector};
use crate::types::{
    resolve_namespace, Filter, IndexConfig, IndexType, Metadata, SearchOptions, SearchResult,
    SearchType, VectorRecord,
};

// =============================================================================
// PineconeConfig
// =============================================================================

fn default_cloud() -> String {
    PINECONE_CLOUD_DEFAULT.to_string()
}

fn default_region() -> String {
    PINECONE_REGION_DEFAULT.to_string()
}

fn default_control_url() -> String {
    PINECONE_CONTROL_URL_DEFAULT.to_string()
}

fn default_timeout_secs() -> u64 {
    PINECONE_REQUEST_TIMEOUT_SECS
}

/// Settings for [`PineconeProvider`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PineconeConfig {
    /// API key (required)
    pub api_key: String,
    /// Serverless cloud for new indexes
    #[serde(default = "default_cloud")]
    pub cloud: String,
    /// Serverless region for new indexes
    #[serde(default = "default_region")]
    pub region: String,
    /// Control-plane base URL
    #[serde(default = "default_control_url")]
    pub control_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Index names used for hybrid search
    #[serde(flatten)]
    pub roles: RoleIndexes,
    /// Fusion weights
    #[serde(default)]
    pub rrf: RrfParams,
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("cloud", &self.cloud)
            .field("region", &self.region)
            .field("control_url", &self.control_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl PineconeConfig {
    /// Config with defaults for everything but the key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            cloud: default_cloud(),
            region: default_region(),
            control_url: default_control_url(),
            timeout_secs: default_timeout_secs(),
            roles: RoleIndexes::default(),
            rrf: RrfParams::default(),
        }
    }

    /// Check required settings are present.
    ///
    /// # Errors
    /// Returns `Configuration` on an empty key or URL, a zero timeout or
    /// invalid fusion weights.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::configuration("pinecone api_key is required"));
        }
        if self.control_url.trim().is_empty() {
            return Err(ProviderError::configuration("pinecone control_url is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ProviderError::configuration("pinecone timeout_secs must be positive"));
        }
        self.rrf.validate()
    }
}

// =============================================================================
// API Types
// =============================================================================

/// Index description returned by the control plane.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    /// Index name
    pub name: String,
    /// Data-plane host, without scheme
    #[serde(default)]
    pub host: String,
    /// Dense dimension
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Metric name
    #[serde(default)]
    pub metric: Option<String>,
    /// Provisioning status
    #[serde(default)]
    pub status: IndexStatus,
}

/// Provisioning status of an index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    /// Ready to serve traffic
    #[serde(default)]
    pub ready: bool,
    /// Lifecycle state (`Initializing`, `Ready`, ...)
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireVector<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'a [f32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_values: Option<PositionalSparse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
}

impl<'a> From<&'a VectorRecord> for WireVector<'a> {
    fn from(record: &'a VectorRecord) -> Self {
        Self {
            id: &record.id,
            values: record.values.as_deref(),
            sparse_values: record.sparse_values.as_ref().map(SparseVector::to_positional),
            metadata: record.metadata.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector: Option<&'a [f32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_vector: Option<PositionalSparse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Filter>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    result: TextSearchResult,
}

#[derive(Debug, Deserialize)]
struct TextSearchResult {
    #[serde(default)]
    hits: Vec<TextSearchHit>,
}

#[derive(Debug, Deserialize)]
struct TextSearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: f32,
    #[serde(default)]
    fields: Option<Metadata>,
}

// =============================================================================
// PineconeProvider
// =============================================================================

/// Adapter for the managed vector service.
///
/// # Example
///
/// ```rust,ignore
/// use vecbridge::provider::{PineconeConfig, PineconeProvider, VectorProvider};
///
/// let provider = PineconeProvider::new(PineconeConfig::new(std::env::var("PINECONE_API_KEY")?))?;
/// provider.setup().await?;
/// let hits = provider.search("products-dense", "trail shoe", &Default::default()).await?;
/// ```
pub struct PineconeProvider {
    config: PineconeConfig,
    client: OnceLock<reqwest::Client>,
    /// index name -> `https://{host}`
    hosts: RwLock<HashMap<String, String>>,
    writer: BatchWriter,
}

impl fmt::Debug for PineconeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeProvider")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl PineconeProvider {
    /// Create a provider. Call `setup()` before use.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid.
    pub fn new(config: PineconeConfig) -> ProviderResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: OnceLock::new(),
            hosts: RwLock::new(HashMap::new()),
            writer: BatchWriter::new(),
        })
    }

    /// Build from a JSON config bundle.
    ///
    /// # Errors
    /// Returns `Configuration` on missing or malformed settings.
    pub fn from_value(value: Value) -> ProviderResult<Self> {
        let config: PineconeConfig = serde_json::from_value(value)
            .map_err(|e| ProviderError::configuration(format!("pinecone config: {e}")))?;
        Self::new(config)
    }

    /// Replace the retry machinery.
    #[must_use]
    pub fn with_batch_writer(mut self, writer: BatchWriter) -> Self {
        self.writer = writer;
        self
    }

    fn client(&self) -> ProviderResult<&reqwest::Client> {
        self.client
            .get()
            .ok_or_else(|| ProviderError::not_ready(self.name()))
    }

    fn build_client(&self) -> ProviderResult<reqwest::Client> {
        let mut api_key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| ProviderError::configuration("pinecone api_key is not a valid header"))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("Api-Key", api_key);
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_static(PINECONE_API_VERSION),
        );

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::configuration(format!("pinecone client: {e}")))
    }

    fn control_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.control_url.trim_end_matches('/'))
    }

    /// Names of every index in the project.
    ///
    /// # Errors
    /// Propagates transport and API errors.
    pub async fn list_indexes(&self) -> ProviderResult<Vec<String>> {
        let response = self
            .client()?
            .get(self.control_url("/indexes"))
            .send()
            .await?;
        let list: IndexList = expect_success(response, None).await?.json().await?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    /// Describe one index.
    ///
    /// # Errors
    /// `IndexNotFound` if the index does not exist.
    pub async fn describe_index(&self, index: &str) -> ProviderResult<IndexDescription> {
        let response = self
            .client()?
            .get(self.control_url(&format!("/indexes/{index}")))
            .send()
            .await?;
        Ok(expect_success(response, Some(index)).await?.json().await?)
    }

    /// Poll until the index reports ready.
    async fn wait_until_ready(&self, index: &str) -> ProviderResult<IndexDescription> {
        let started = Instant::now();
        let limit = Duration::from_secs(PINECONE_INDEX_READY_WAIT_SECS_MAX);

        loop {
            let description = self.describe_index(index).await?;
            if description.status.ready {
                return Ok(description);
            }
            if started.elapsed() >= limit {
                return Err(ProviderError::timeout(PINECONE_INDEX_READY_WAIT_SECS_MAX * 1000));
            }
            tracing::debug!(state = %description.status.state, "waiting for index");
            tokio::time::sleep(Duration::from_millis(PINECONE_INDEX_READY_POLL_MS)).await;
        }
    }

    fn cache_host(&self, index: &str, host: &str) {
        if host.is_empty() {
            return;
        }
        let url = if host.starts_with("http") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        self.hosts
            .write()
            .expect("hosts lock poisoned")
            .insert(index.to_string(), url);
    }

    /// Data-plane base URL for `index`, resolved once.
    async fn host(&self, index: &str) -> ProviderResult<String> {
        if let Some(url) = self.hosts.read().expect("hosts lock poisoned").get(index) {
            return Ok(url.clone());
        }

        let description = self.describe_index(index).await?;
        if description.host.is_empty() {
            return Err(ProviderError::backend(format!("index '{index}' has no host yet")));
        }
        self.cache_host(index, &description.host);

        self.hosts
            .read()
            .expect("hosts lock poisoned")
            .get(index)
            .cloned()
            .ok_or_else(|| ProviderError::index_not_found(index))
    }

    async fn post_data<B: Serialize + Sync>(
        &self,
        index: &str,
        path: &str,
        body: &B,
    ) -> ProviderResult<reqwest::Response> {
        let url = format!("{}{path}", self.host(index).await?);
        let response = self.client()?.post(url).json(body).send().await?;
        expect_success(response, Some(index)).await
    }

    fn create_body(&self, config: &IndexConfig) -> (String, Value) {
        // Integrated-inference indexes carry an `embed` model spec
        if let Some(embed) = config.extra.get("embed") {
            return (
                self.control_url("/indexes/create-for-model"),
                json!({
                    "name": config.name,
                    "cloud": self.config.cloud,
                    "region": self.config.region,
                    "embed": embed,
                }),
            );
        }

        let mut body = json!({
            "name": config.name,
            "metric": config.metric.as_str(),
            "vector_type": config.index_type.as_str(),
            "spec": {
                "serverless": {
                    "cloud": self.config.cloud,
                    "region": self.config.region,
                }
            },
        });
        if let (IndexType::Dense, Some(dimension)) = (config.index_type, config.dimension) {
            body["dimension"] = json!(dimension);
        }
        (self.control_url("/indexes"), body)
    }
}

/// Pass a success response through; map anything else to a `ProviderError`.
async fn expect_success(
    response: reqwest::Response,
    index: Option<&str>,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    Err(status_to_error(status, retry_after, &body, index))
}

/// Classify an HTTP failure.
fn status_to_error(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
    index: Option<&str>,
) -> ProviderError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(retry_after_secs),
        StatusCode::NOT_FOUND => match index {
            Some(name) => ProviderError::index_not_found(name),
            None => ProviderError::backend(format!("HTTP 404: {detail}")),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::configuration(format!("pinecone rejected credentials: {detail}"))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::timeout(PINECONE_REQUEST_TIMEOUT_SECS * 1000)
        }
        s if s.is_server_error() => ProviderError::unavailable(format!("HTTP {s}: {detail}")),
        s => ProviderError::invalid_request(format!("HTTP {s}: {detail}")),
    }
}

fn into_results(matches: Vec<QueryMatch>) -> Vec<SearchResult> {
    matches
        .into_iter()
        .map(|m| SearchResult {
            id: m.id,
            score: m.score,
            metadata: m.metadata,
        })
        .collect()
}

#[async_trait]
impl VectorProvider for PineconeProvider {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    #[tracing::instrument(skip(self))]
    async fn setup(&self) -> ProviderResult<()> {
        if self.client.get().is_some() {
            return Ok(());
        }
        let client = self.build_client()?;
        // A concurrent setup may have won; either client is equivalent
        let _ = self.client.set(client);
        tracing::info!(region = %self.config.region, "pinecone client ready");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.client.get().is_some()
    }

    #[tracing::instrument(skip(self, config), fields(index = %config.name))]
    async fn create_index(&self, config: &IndexConfig) -> ProviderResult<()> {
        config.validate()?;

        if self.list_indexes().await?.iter().any(|name| name == &config.name) {
            tracing::info!("index already exists");
            return Ok(());
        }

        let (url, body) = self.create_body(config);
        let response = self.client()?.post(url).json(&body).send().await?;
        if response.status() != StatusCode::CONFLICT {
            expect_success(response, None).await?;
        }

        let description = self.wait_until_ready(&config.name).await?;
        self.cache_host(&config.name, &description.host);

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
        self.client()?;
        if records.len() > PINECONE_UPSERT_RECORDS_COUNT_MAX {
            return Err(ProviderError::invalid_request(format!(
                "{} vectors exceed the per-request limit {PINECONE_UPSERT_RECORDS_COUNT_MAX}",
                records.len()
            )));
        }
        if let Some(bad) = records
            .iter()
            .find(|r| r.id.is_empty() || (r.values.is_none() && r.sparse_values.is_none()))
        {
            return Err(ProviderError::invalid_request(format!(
                "record '{}' needs an id and dense or sparse values",
                bad.id
            )));
        }

        let body = UpsertRequest {
            vectors: records.iter().map(WireVector::from).collect(),
            namespace: resolve_namespace(namespace),
        };
        self.post_data(index, "/vectors/upsert", &body).await?;
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
        self.client()?;
        options.validate()?;

        if options.search_type == SearchType::Hybrid {
            let (dense, sparse) = self.role_indexes(index);
            return self.hybrid_search(&dense, &sparse, query, options).await;
        }

        let mut request = json!({
            "query": {
                "top_k": options.top_k,
                "inputs": { "text": query },
            }
        });
        if let Some(filter) = &options.filter {
            request["query"]["filter"] = Value::Object(filter.clone());
        }

        let path = format!("/records/namespaces/{}/search", options.namespace());
        let response: TextSearchResponse =
            self.post_data(index, &path, &request).await?.json().await?;

        Ok(response
            .result
            .hits
            .into_iter()
            .map(|hit| SearchResult {
                id: hit.id,
                score: hit.score,
                metadata: hit.fields,
            })
            .collect())
    }

    #[tracing::instrument(skip(self, vector, options), fields(top_k = options.top_k))]
    async fn search_by_vector(
        &self,
        index: &str,
        vector: &[f32],
        options: &SearchOptions,
    ) -> ProviderResult<Vec<SearchResult>> {
        self.client()?;
        options.validate()?;

        let request = QueryRequest {
            namespace: options.namespace(),
            top_k: options.top_k,
            vector: Some(vector),
            sparse_vector: None,
            filter: options.filter.as_ref(),
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse =
            self.post_data(index, "/query", &request).await?.json().await?;
        Ok(into_results(response.matches))
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
        self.client()?;
        options.validate()?;

        let request = QueryRequest {
            namespace: options.namespace(),
            top_k: options.top_k,
            vector: None,
            sparse_vector: Some(vector.to_positional()),
            filter: options.filter.as_ref(),
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse =
            self.post_data(index, "/query", &request).await?.json().await?;
        Ok(into_results(response.matches))
    }

    #[tracing::instrument(skip(self, ids), fields(id_count = ids.len()))]
    async fn delete_vectors(
        &self,
        index: &str,
        ids: &[String],
        namespace: Option<&str>,
    ) -> ProviderResult<()> {
        self.client()?;
        if ids.is_empty() {
            return Ok(());
        }

        let body = json!({ "ids": ids, "namespace": resolve_namespace(namespace) });
        self.post_data(index, "/vectors/delete", &body).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_index(&self, index: &str) -> ProviderResult<()> {
        let response = self
            .client()?
            .delete(self.control_url(&format!("/indexes/{index}")))
            .send()
            .await?;

        self.hosts.write().expect("hosts lock poisoned").remove(index);

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("index already absent");
            return Ok(());
        }
        expect_success(response, Some(index)).await?;
        tracing::info!("index deleted");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        if !self.is_ready() {
            return false;
        }
        match self.list_indexes().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "pinecone health check failed");
                false
            }
        }
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
    use crate::types::Metric;

    fn provider() -> PineconeProvider {
        PineconeProvider::new(PineconeConfig::new("test-key")).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_rejects_oversized_request() {
        let provider = provider();
        provider.setup().await.unwrap();

        let records: Vec<VectorRecord> = (0..=PINECONE_UPSERT_RECORDS_COUNT_MAX)
            .map(|i| VectorRecord::dense(format!("r{i}"), vec![1.0]))
            .collect();

        let err = provider
            .upsert_vectors("dense", &records, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));

        // permanent, so the engine gives up on the chunk without retrying
        let err = provider
            .batch_upsert_vectors("dense", &records, records.len(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::BatchFailed { failed_chunks: 1, total_chunks: 1 }
        ));
    }

    #[test]
    fn test_config_requires_api_key() {
        let err = PineconeProvider::from_value(json!({"cloud": "gcp"})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));

        let err = PineconeProvider::new(PineconeConfig::new("  ")).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[test]
    fn test_config_defaults_and_roles() {
        let provider = PineconeProvider::from_value(json!({
            "api_key": "k",
            "dense_index_name": "catalog-dense",
            "sparse_index_name": "catalog-sparse",
        }))
        .unwrap();

        assert_eq!(provider.config.cloud, "aws");
        assert_eq!(provider.config.region, "us-east-1");
        assert_eq!(provider.config.timeout_secs, 30);
        assert_eq!(
            provider.role_indexes("ignored"),
            ("catalog-dense".to_string(), "catalog-sparse".to_string())
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider = PineconeProvider::new(PineconeConfig::new("secret-123")).unwrap();
        let rendered = format!("{provider:?}");
        assert!(!rendered.contains("secret-123"));
    }

    #[tokio::test]
    async fn test_not_ready_before_setup() {
        let provider = provider();
        assert!(!provider.is_ready());
        assert!(!provider.health_check().await);

        let err = provider
            .upsert_vectors("dense", &[VectorRecord::dense("a", vec![1.0])], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_setup_idempotent() {
        let provider = provider();
        provider.setup().await.unwrap();
        provider.setup().await.unwrap();
        assert!(provider.is_ready());
    }

    #[test]
    fn test_wire_vector_shape() {
        let record = VectorRecord::sparse(
            "p1",
            SparseVector::from_positional(&[7, 3], &[0.5, 0.25]).unwrap(),
        )
        .with_metadata(json!({"brand": "acme"}).as_object().cloned().unwrap());

        let wire = serde_json::to_value(WireVector::from(&record)).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": "p1",
                "sparseValues": {"indices": [3, 7], "values": [0.25, 0.5]},
                "metadata": {"brand": "acme"},
            })
        );
    }

    #[test]
    fn test_query_request_shape() {
        let filter = json!({"brand": {"$eq": "acme"}}).as_object().cloned().unwrap();
        let request = QueryRequest {
            namespace: "__default__",
            top_k: 5,
            vector: Some(&[1.0, 0.0]),
            sparse_vector: None,
            filter: Some(&filter),
            include_metadata: true,
            include_values: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "namespace": "__default__",
                "topK": 5,
                "vector": [1.0, 0.0],
                "filter": {"brand": {"$eq": "acme"}},
                "includeMetadata": true,
                "includeValues": false,
            })
        );
    }

    #[test]
    fn test_create_body() {
        let provider = provider();

        let (url, body) =
            provider.create_body(&IndexConfig::dense("products", 1024, Metric::Cosine));
        assert_eq!(url, "https://api.pinecone.io/indexes");
        assert_eq!(body["dimension"], 1024);
        assert_eq!(body["vector_type"], "dense");
        assert_eq!(body["spec"]["serverless"]["region"], "us-east-1");

        let (_, sparse) = provider.create_body(&IndexConfig::sparse("products-sparse"));
        assert_eq!(sparse["metric"], "dotproduct");
        assert!(sparse.get("dimension").is_none());

        let integrated = IndexConfig::dense("docs", 1024, Metric::Cosine).with_extra(
            "embed",
            json!({"model": "llama-text-embed-v2", "field_map": {"text": "chunk_text"}}),
        );
        let (url, body) = provider.create_body(&integrated);
        assert!(url.ends_with("/indexes/create-for-model"));
        assert_eq!(body["embed"]["model"], "llama-text-embed-v2");
    }

    #[test]
    fn test_status_to_error() {
        assert!(matches!(
            status_to_error(StatusCode::TOO_MANY_REQUESTS, Some(4), "", None),
            ProviderError::RateLimited { retry_after_secs: Some(4) }
        ));
        assert!(matches!(
            status_to_error(StatusCode::NOT_FOUND, None, "", Some("dense")),
            ProviderError::IndexNotFound { .. }
        ));

        let unavailable = status_to_error(
            StatusCode::SERVICE_UNAVAILABLE,
            None,
            r#"{"error": {"code": "UNAVAILABLE", "message": "try later"}}"#,
            None,
        );
        assert!(unavailable.is_transient());
        assert!(unavailable.to_string().contains("try later"));

        let bad = status_to_error(StatusCode::BAD_REQUEST, None, r#"{"message": "dim"}"#, None);
        assert!(matches!(bad, ProviderError::InvalidRequest { .. }));
        assert!(!bad.is_transient());

        assert!(matches!(
            status_to_error(StatusCode::UNAUTHORIZED, None, "", None),
            ProviderError::Configuration { .. }
        ));
    }

    #[test]
    fn test_text_search_response_parse() {
        let response: TextSearchResponse = serde_json::from_value(json!({
            "result": {"hits": [{"_id": "p1", "_score": 0.9, "fields": {"title": "shoe"}}]},
            "usage": {"read_units": 1}
        }))
        .unwrap();
        assert_eq!(response.result.hits[0].id, "p1");
        assert_eq!(response.result.hits[0].fields.as_ref().unwrap()["title"], "shoe");
    }

    #[tokio::test]
    #[ignore = "requires PINECONE_API_KEY"]
    async fn test_pinecone_live() {
        let key = std::env::var("PINECONE_API_KEY").expect("PINECONE_API_KEY not set");
        let provider = PineconeProvider::new(PineconeConfig::new(key)).unwrap();
        provider.setup().await.unwrap();

        let index = "vecbridge-live-test";
        provider
            .create_index(&IndexConfig::dense(index, 3, Metric::Cosine))
            .await
            .unwrap();
        provider
            .upsert_vectors(index, &[VectorRecord::dense("p1", vec![1.0, 0.0, 0.0])], None)
            .await
            .unwrap();
        assert!(provider.health_check().await);
        provider.delete_index(index).await.unwrap();
    }
}
