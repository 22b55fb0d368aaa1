//! Vector Repository
//!
//! `TigerStyle`: Thin facade, one provider, canonical index names.
//!
//! The repository resolves a provider once, fixes the dense and sparse index
//! names, and turns inbound [`IngestRecord`]s into provider records. It adds
//! no storage behavior of its own.
//!
//! ```rust,ignore
//! let repo = VectorRepository::from_settings(VectorSettings::from_env()?).await?;
//! repo.create_indexes().await?;
//! repo.upsert_dense(&records).await?;
//! let hits = repo.search_hybrid("trail running shoes", 10, None).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::VectorProvider;
use crate::registry::{self, ProviderRegistry};
use crate::settings::VectorSettings;
use crate::sparse::{SparseEncoding, SparseVector};
use crate::types::{
    Filter, IndexConfig, Metadata, Metric, SearchOptions, SearchResult, SearchType, VectorRecord,
};

// =============================================================================
// IngestRecord
// =============================================================================

/// Inbound record as callers submit it.
///
/// `sparse_values` accepts both `{"indices": [..], "values": [..]}` and
/// `{"<index>": weight}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    /// Record id
    pub id: String,
    /// Dense values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    /// Sparse values in either encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_values: Option<SparseEncoding>,
    /// Attached metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl IngestRecord {
    /// Provider record for the dense index.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the record has no dense values.
    pub fn to_dense(&self) -> ProviderResult<VectorRecord> {
        let values = self.values.clone().ok_or_else(|| {
            ProviderError::invalid_request(format!("record '{}' has no dense values", self.id))
        })?;
        Ok(VectorRecord {
            id: self.id.clone(),
            values: Some(values),
            sparse_values: None,
            metadata: self.metadata.clone(),
        })
    }

    /// Provider record for the sparse index.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the record has no sparse values or they
    /// do not decode.
    pub fn to_sparse(&self) -> ProviderResult<VectorRecord> {
        let encoding = self.sparse_values.clone().ok_or_else(|| {
            ProviderError::invalid_request(format!("record '{}' has no sparse values", self.id))
        })?;
        Ok(VectorRecord {
            id: self.id.clone(),
            values: None,
            sparse_values: Some(SparseVector::try_from(encoding)?),
            metadata: self.metadata.clone(),
        })
    }
}

// =============================================================================
// VectorRepository
// =============================================================================

/// Facade over one configured provider.
#[derive(Debug, Clone)]
pub struct VectorRepository {
    provider: Arc<dyn VectorProvider>,
    settings: VectorSettings,
}

impl VectorRepository {
    /// Build the configured provider from the global registry and set it up.
    ///
    /// # Errors
    /// Returns `Configuration` on invalid settings or an unknown provider,
    /// or whatever the provider's `setup()` fails with.
    pub async fn from_settings(settings: VectorSettings) -> ProviderResult<Self> {
        Self::from_registry(registry::global(), settings).await
    }

    /// Like [`VectorRepository::from_settings`] with an explicit registry.
    ///
    /// # Errors
    /// See [`VectorRepository::from_settings`].
    pub async fn from_registry(
        registry: &ProviderRegistry,
        settings: VectorSettings,
    ) -> ProviderResult<Self> {
        settings.validate()?;
        let provider = registry
            .create(&settings.provider, settings.provider_config())
            .await?;
        Ok(Self { provider, settings })
    }

    /// Wrap an already set-up provider.
    ///
    /// # Errors
    /// Returns `Configuration` on invalid settings.
    pub fn with_provider(
        provider: Arc<dyn VectorProvider>,
        settings: VectorSettings,
    ) -> ProviderResult<Self> {
        settings.validate()?;
        Ok(Self { provider, settings })
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn VectorProvider> {
        &self.provider
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &VectorSettings {
        &self.settings
    }

    /// Dense index name.
    #[must_use]
    pub fn dense_index(&self) -> &str {
        self.settings.dense_index()
    }

    /// Sparse index name.
    #[must_use]
    pub fn sparse_index(&self) -> &str {
        self.settings.sparse_index()
    }

    fn options(
        &self,
        top_k: usize,
        search_type: SearchType,
        filter: Option<Filter>,
    ) -> SearchOptions {
        SearchOptions {
            top_k,
            search_type,
            filter,
            namespace: self.settings.namespace.clone(),
        }
    }

    /// Create the dense index (configured dimension, cosine) and the sparse
    /// index (dot product). Existing indexes are left alone.
    ///
    /// # Errors
    /// Propagates the first failure after attempting both.
    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn create_indexes(&self) -> ProviderResult<()> {
        let dense = IndexConfig::dense(self.dense_index(), self.settings.dimension, Metric::Cosine);
        let sparse = IndexConfig::sparse(self.sparse_index());

        let dense_result = self.provider.create_index(&dense).await;
        let sparse_result = self.provider.create_index(&sparse).await;
        if let Err(e) = &dense_result {
            tracing::error!(index = self.dense_index(), error = %e, "dense index creation failed");
        }
        if let Err(e) = &sparse_result {
            tracing::error!(
                index = self.sparse_index(),
                error = %e,
                "sparse index creation failed"
            );
        }
        dense_result.and(sparse_result)
    }

    /// Batch-upsert records into the dense index.
    ///
    /// # Errors
    /// `InvalidRequest` if a record lacks dense values (nothing is written),
    /// otherwise the batch engine's result.
    #[tracing::instrument(skip(self, records), fields(record_count = records.len()))]
    pub async fn upsert_dense(&self, records: &[IngestRecord]) -> ProviderResult<()> {
        let converted = records
            .iter()
            .map(IngestRecord::to_dense)
            .collect::<ProviderResult<Vec<_>>>()?;
        self.provider
            .batch_upsert_vectors(
                self.dense_index(),
                &converted,
                self.settings.batch_size,
                self.settings.namespace.as_deref(),
            )
            .await
    }

    /// Batch-upsert records into the sparse index.
    ///
    /// # Errors
    /// `InvalidRequest` if a record lacks or mis-encodes sparse values
    /// (nothing is written), otherwise the batch engine's result.
    #[tracing::instrument(skip(self, records), fields(record_count = records.len()))]
    pub async fn upsert_sparse(&self, records: &[IngestRecord]) -> ProviderResult<()> {
        let converted = records
            .iter()
            .map(IngestRecord::to_sparse)
            .collect::<ProviderResult<Vec<_>>>()?;
        self.provider
            .batch_upsert_vectors(
                self.sparse_index(),
                &converted,
                self.settings.batch_size,
                self.settings.namespace.as_deref(),
            )
            .await
    }

    /// Text search over the dense index.
    ///
    /// # Errors
    /// Propagates provider errors.
    pub async fn search_dense(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<Filter>,
    ) -> ProviderResult<Vec<SearchResult>> {
        let options = self.options(top_k, SearchType::Dense, filter);
        self.provider.search(self.dense_index(), query, &options).await
    }

    /// Text search over the sparse index.
    ///
    /// # Errors
    /// Propagates provider errors.
    pub async fn search_sparse(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<Filter>,
    ) -> ProviderResult<Vec<SearchResult>> {
        let options = self.options(top_k, SearchType::Sparse, filter);
        self.provider.search(self.sparse_index(), query, &options).await
    }

    /// Text search over both indexes, fused with RRF.
    ///
    /// # Errors
    /// Propagates provider errors from either side.
    pub async fn search_hybrid(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<Filter>,
    ) -> ProviderResult<Vec<SearchResult>> {
        let options = self.options(top_k, SearchType::Hybrid, filter);
        self.provider
            .hybrid_search(self.dense_index(), self.sparse_index(), query, &options)
            .await
    }

    /// Delete `ids` from both indexes.
    ///
    /// # Errors
    /// Propagates the first failure after attempting both indexes.
    #[tracing::instrument(skip(self, ids), fields(id_count = ids.len()))]
    pub async fn delete(&self, ids: &[String]) -> ProviderResult<()> {
        let namespace = self.settings.namespace.as_deref();
        let dense = self
            .provider
            .delete_vectors(self.dense_index(), ids, namespace)
            .await;
        let sparse = self
            .provider
            .delete_vectors(self.sparse_index(), ids, namespace)
            .await;
        if let Err(e) = &dense {
            tracing::warn!(index = self.dense_index(), error = %e, "dense delete failed");
        }
        if let Err(e) = &sparse {
            tracing::warn!(index = self.sparse_index(), error = %e, "sparse delete failed");
        }
        dense.and(sparse)
    }

    /// Provider liveness.
    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }
}
