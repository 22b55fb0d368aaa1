//! Vector Settings
//!
//! `TigerStyle`: One settings struct, explicit defaults, fail fast on bad input.
//!
//! [`VectorSettings`] is the configuration surface of the repository facade.
//! It can be deserialized, built with `with_*` methods, or read from the
//! environment, and it renders the JSON bundle the chosen provider is
//! constructed from.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::constants::{
    BATCH_RECORDS_COUNT_DEFAULT, INDEX_NAME_DENSE_DEFAULT, INDEX_NAME_SPARSE_DEFAULT,
    PGVECTOR_POOL_SIZE_MAX_DEFAULT, PGVECTOR_POOL_SIZE_MIN_DEFAULT,
    PGVECTOR_TABLE_PREFIX_DEFAULT, PINECONE_CLOUD_DEFAULT, PINECONE_REGION_DEFAULT,
    VECTOR_DIMENSIONS_COUNT_DEFAULT, VECTOR_DIMENSIONS_COUNT_MAX,
};
use crate::error::{ProviderError, ProviderResult};
use crate::fusion::RrfParams;

/// Provider used when none is configured.
pub const PROVIDER_DEFAULT: &str = "pgvector";

// =============================================================================
// Provider Sections
// =============================================================================

/// Pinecone section.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    /// API key
    pub api_key: Option<String>,
    /// Serverless cloud
    pub cloud: String,
    /// Serverless region
    pub region: String,
    /// Control-plane override
    pub control_url: Option<String>,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            cloud: PINECONE_CLOUD_DEFAULT.to_string(),
            region: PINECONE_REGION_DEFAULT.to_string(),
            control_url: None,
        }
    }
}

impl std::fmt::Debug for PineconeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cloud", &self.cloud)
            .field("region", &self.region)
            .field("control_url", &self.control_url)
            .finish()
    }
}

/// pgvector section.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PgVectorSettings {
    /// Postgres connection string
    pub connection_string: Option<String>,
    /// Table name prefix
    pub table_prefix: String,
    /// Connections kept open
    pub pool_min_size: u32,
    /// Connection cap
    pub pool_max_size: u32,
    /// Embedding service for text queries
    pub embedding_service_url: Option<String>,
    /// Per-statement timeout override
    pub request_timeout_ms: Option<u64>,
}

impl Default for PgVectorSettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            table_prefix: PGVECTOR_TABLE_PREFIX_DEFAULT.to_string(),
            pool_min_size: PGVECTOR_POOL_SIZE_MIN_DEFAULT,
            pool_max_size: PGVECTOR_POOL_SIZE_MAX_DEFAULT,
            embedding_service_url: None,
            request_timeout_ms: None,
        }
    }
}

impl std::fmt::Debug for PgVectorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgVectorSettings")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("table_prefix", &self.table_prefix)
            .field("pool_min_size", &self.pool_min_size)
            .field("pool_max_size", &self.pool_max_size)
            .field("embedding_service_url", &self.embedding_service_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

// =============================================================================
// VectorSettings
// =============================================================================

/// Configuration for [`crate::repository::VectorRepository`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    /// Registry name of the provider
    pub provider: String,
    /// Records per upsert chunk
    pub batch_size: usize,
    /// Namespace for every call; the default namespace when unset
    pub namespace: Option<String>,
    /// Dense index name override
    pub dense_index_name: Option<String>,
    /// Sparse index name override
    pub sparse_index_name: Option<String>,
    /// Dimension of the dense index created by `create_indexes`
    pub dimension: usize,
    /// Fusion weights
    pub rrf: RrfParams,
    /// Pinecone settings
    pub pinecone: PineconeSettings,
    /// pgvector settings
    pub pgvector: PgVectorSettings,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            provider: PROVIDER_DEFAULT.to_string(),
            batch_size: BATCH_RECORDS_COUNT_DEFAULT,
            namespace: None,
            dense_index_name: None,
            sparse_index_name: None,
            dimension: VECTOR_DIMENSIONS_COUNT_DEFAULT,
            rrf: RrfParams::default(),
            pinecone: PineconeSettings::default(),
            pgvector: PgVectorSettings::default(),
        }
    }
}

impl VectorSettings {
    /// Settings for `provider` with everything else defaulted.
    #[must_use]
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `Configuration` if a numeric variable does not parse or the
    /// result fails [`VectorSettings::validate`].
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset or empty keys keep defaults.
    ///
    /// # Errors
    /// See [`VectorSettings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ProviderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(provider) = get("VECTOR_PROVIDER") {
            settings.provider = provider.trim().to_lowercase();
        }
        settings.namespace = get("VECTOR_NAMESPACE");
        if let Some(raw) = get("VECTOR_BATCH_SIZE") {
            settings.batch_size = parse_var("VECTOR_BATCH_SIZE", &raw)?;
        }
        settings.dense_index_name = get("VECTOR_DENSE_INDEX");
        settings.sparse_index_name = get("VECTOR_SPARSE_INDEX");

        settings.pinecone.api_key = get("PINECONE_API_KEY");
        if let Some(cloud) = get("PINECONE_CLOUD") {
            settings.pinecone.cloud = cloud;
        }
        if let Some(region) = get("PINECONE_REGION") {
            settings.pinecone.region = region;
        }

        settings.pgvector.connection_string = get("PGVECTOR_CONNECTION_STRING");
        if let Some(prefix) = get("PGVECTOR_TABLE_PREFIX") {
            settings.pgvector.table_prefix = prefix;
        }
        if let Some(raw) = get("PGVECTOR_POOL_MIN_SIZE") {
            settings.pgvector.pool_min_size = parse_var("PGVECTOR_POOL_MIN_SIZE", &raw)?;
        }
        if let Some(raw) = get("PGVECTOR_POOL_MAX_SIZE") {
            settings.pgvector.pool_max_size = parse_var("PGVECTOR_POOL_MAX_SIZE", &raw)?;
        }
        settings.pgvector.embedding_service_url = get("PGVECTOR_EMBEDDING_SERVICE_URL");

        if let Some(raw) = get("VECTOR_RRF_ALPHA") {
            settings.rrf.alpha = parse_var("VECTOR_RRF_ALPHA", &raw)?;
        }
        if let Some(raw) = get("VECTOR_RRF_K") {
            settings.rrf.k = parse_var("VECTOR_RRF_K", &raw)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Set the provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the upsert chunk size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set both role index names.
    #[must_use]
    pub fn with_index_names(mut self, dense: impl Into<String>, sparse: impl Into<String>) -> Self {
        self.dense_index_name = Some(dense.into());
        self.sparse_index_name = Some(sparse.into());
        self
    }

    /// Set the dense dimension.
    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set the fusion weights.
    #[must_use]
    pub fn with_rrf(mut self, rrf: RrfParams) -> Self {
        self.rrf = rrf;
        self
    }

    /// Set the Pinecone API key.
    #[must_use]
    pub fn with_pinecone_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.pinecone.api_key = Some(api_key.into());
        self
    }

    /// Set the pgvector connection string.
    #[must_use]
    pub fn with_pgvector_connection(mut self, connection_string: impl Into<String>) -> Self {
        self.pgvector.connection_string = Some(connection_string.into());
        self
    }

    /// Dense index name, explicit or default.
    #[must_use]
    pub fn dense_index(&self) -> &str {
        self.dense_index_name
            .as_deref()
            .unwrap_or(INDEX_NAME_DENSE_DEFAULT)
    }

    /// Sparse index name, explicit or default.
    #[must_use]
    pub fn sparse_index(&self) -> &str {
        self.sparse_index_name
            .as_deref()
            .unwrap_or(INDEX_NAME_SPARSE_DEFAULT)
    }

    /// Check provider-independent settings.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first violated rule.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.provider.trim().is_empty() {
            return Err(ProviderError::configuration("provider name is empty"));
        }
        if self.batch_size == 0 {
            return Err(ProviderError::configuration("batch_size must be at least 1"));
        }
        if self.dimension == 0 || self.dimension > VECTOR_DIMENSIONS_COUNT_MAX {
            return Err(ProviderError::configuration(format!(
                "dimension {} outside [1, {VECTOR_DIMENSIONS_COUNT_MAX}]",
                self.dimension
            )));
        }
        self.rrf.validate()
    }

    /// JSON bundle handed to the provider constructor.
    ///
    /// Common keys are the role index names and `rrf`; provider sections
    /// contribute only the keys their adapter reads. Unset secrets are
    /// omitted so the adapter reports them as missing.
    #[must_use]
    pub fn provider_config(&self) -> Value {
        let mut bundle = Map::new();
        bundle.insert("dense_index_name".into(), json!(self.dense_index()));
        bundle.insert("sparse_index_name".into(), json!(self.sparse_index()));
        bundle.insert("rrf".into(), json!({"alpha": self.rrf.alpha, "k": self.rrf.k}));

        match self.provider.as_str() {
            "pinecone" => {
                let pc = &self.pinecone;
                if let Some(key) = &pc.api_key {
                    bundle.insert("api_key".into(), json!(key));
                }
                bundle.insert("cloud".into(), json!(pc.cloud));
                bundle.insert("region".into(), json!(pc.region));
                if let Some(url) = &pc.control_url {
                    bundle.insert("control_url".into(), json!(url));
                }
            }
            "pgvector" => {
                let pg = &self.pgvector;
                if let Some(conn) = &pg.connection_string {
                    bundle.insert("connection_string".into(), json!(conn));
                }
                bundle.insert("table_prefix".into(), json!(pg.table_prefix));
                bundle.insert("pool_min_size".into(), json!(pg.pool_min_size));
                bundle.insert("pool_max_size".into(), json!(pg.pool_max_size));
                if let Some(url) = &pg.embedding_service_url {
                    bundle.insert("embedding_service_url".into(), json!(url));
                }
                if let Some(ms) = pg.request_timeout_ms {
                    bundle.insert("request_timeout_ms".into(), json!(ms));
                }
            }
            _ => {}
        }

        Value::Object(bundle)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> ProviderResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ProviderError::configuration(format!("{key}='{raw}': {e}")))
}
