//! Core Data Types
//!
//! `TigerStyle`: Records, results and index definitions shared by every
//! provider. Validation lives next to the types so each adapter rejects the
//! same inputs the same way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    INDEX_NAME_BYTES_MAX, NAMESPACE_DEFAULT, RECORD_ID_BYTES_MAX, SEARCH_TOP_K_DEFAULT,
    SEARCH_TOP_K_MAX, VECTOR_DIMENSIONS_COUNT_MAX,
};
use crate::error::{ProviderError, ProviderResult};
use crate::sparse::SparseVector;

/// Arbitrary JSON metadata attached to a record.
pub type Metadata = Map<String, Value>;

/// Metadata filter: `{"field": value}`, `{"field": {"$eq": v}}`, `{"field": {"$in": [..]}}`.
pub type Filter = Map<String, Value>;

// =============================================================================
// Enums
// =============================================================================

/// Similarity metric of a dense index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity (higher is closer)
    #[default]
    Cosine,
    /// L2 distance (lower is closer)
    Euclidean,
    /// Inner product (higher is closer)
    #[serde(alias = "dot_product")]
    DotProduct,
}

impl Metric {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }

    /// Whether a larger score means a closer match.
    #[must_use]
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Self::Euclidean)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" | "dot_product" => Ok(Self::DotProduct),
            other => Err(ProviderError::configuration(format!(
                "unknown metric '{other}'"
            ))),
        }
    }
}

/// Representation stored in an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Fixed-length float vectors
    #[default]
    Dense,
    /// Index -> weight maps
    Sparse,
}

impl IndexType {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" => Ok(Self::Dense),
            "sparse" => Ok(Self::Sparse),
            other => Err(ProviderError::configuration(format!(
                "unknown index type '{other}'"
            ))),
        }
    }
}

/// Kind of search to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Dense similarity only
    #[default]
    Dense,
    /// Sparse (lexical) only
    Sparse,
    /// Dense and sparse, fused
    Hybrid,
}

// =============================================================================
// VectorRecord
// =============================================================================

/// One record to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique within index + namespace
    pub id: String,
    /// Dense values (dense indexes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    /// Sparse values (sparse indexes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_values: Option<SparseVector>,
    /// Attached metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl VectorRecord {
    /// Dense record.
    #[must_use]
    pub fn dense(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values: Some(values),
            sparse_values: None,
            metadata: None,
        }
    }

    /// Sparse record.
    #[must_use]
    pub fn sparse(id: impl Into<String>, sparse_values: SparseVector) -> Self {
        Self {
            id: id.into(),
            values: None,
            sparse_values: Some(sparse_values),
            metadata: None,
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check the record carries what an index of `index_type` needs.
    ///
    /// # Errors
    /// Returns `InvalidRequest` on an empty or oversized id, a missing
    /// representation, a dimension mismatch or non-finite values.
    pub fn validate_for(
        &self,
        index_type: IndexType,
        dimension: Option<usize>,
    ) -> ProviderResult<()> {
        if self.id.is_empty() || self.id.len() > RECORD_ID_BYTES_MAX {
            return Err(ProviderError::invalid_request(format!(
                "record id must be 1..={RECORD_ID_BYTES_MAX} bytes"
            )));
        }

        match index_type {
            IndexType::Dense => {
                let values = self.values.as_ref().ok_or_else(|| {
                    ProviderError::invalid_request(format!(
                        "record '{}' has no dense values",
                        self.id
                    ))
                })?;
                if let Some(expected) = dimension {
                    if values.len() != expected {
                        return Err(ProviderError::invalid_request(format!(
                            "record '{}' has dimension {}, index expects {expected}",
                            self.id,
                            values.len()
                        )));
                    }
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(ProviderError::invalid_request(format!(
                        "record '{}' has non-finite values",
                        self.id
                    )));
                }
            }
            IndexType::Sparse => {
                let sparse = self.sparse_values.as_ref().ok_or_else(|| {
                    ProviderError::invalid_request(format!(
                        "record '{}' has no sparse values",
                        self.id
                    ))
                })?;
                if sparse.is_empty() {
                    return Err(ProviderError::invalid_request(format!(
                        "record '{}' has an empty sparse vector",
                        self.id
                    )));
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// SearchResult
// =============================================================================

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Record id
    pub id: String,
    /// Similarity, distance, dot product, or fused rank score
    pub score: f32,
    /// Record metadata, if stored and requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl SearchResult {
    /// Create a result without metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: None,
        }
    }
}

// =============================================================================
// IndexConfig
// =============================================================================

/// Definition of an index to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name (lowercase letters, digits, `-` and `_`)
    pub name: String,
    /// Vector dimension; dense only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    /// Similarity metric
    #[serde(default)]
    pub metric: Metric,
    /// Dense or sparse
    #[serde(default)]
    pub index_type: IndexType,
    /// Backend-specific settings
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl IndexConfig {
    /// Dense index definition.
    #[must_use]
    pub fn dense(name: impl Into<String>, dimension: usize, metric: Metric) -> Self {
        Self {
            name: name.into(),
            dimension: Some(dimension),
            metric,
            index_type: IndexType::Dense,
            extra: Map::new(),
        }
    }

    /// Sparse index definition (always dot product).
    #[must_use]
    pub fn sparse(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: None,
            metric: Metric::DotProduct,
            index_type: IndexType::Sparse,
            extra: Map::new(),
        }
    }

    /// Add a backend-specific setting.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Check the definition is creatable on any backend.
    ///
    /// # Errors
    /// Returns `InvalidRequest` describing the first violated rule.
    pub fn validate(&self) -> ProviderResult<()> {
        validate_index_name(&self.name)?;

        match self.index_type {
            IndexType::Dense => match self.dimension {
                Some(d) if (1..=VECTOR_DIMENSIONS_COUNT_MAX).contains(&d) => {}
                Some(d) => {
                    return Err(ProviderError::invalid_request(format!(
                        "dimension {d} outside 1..={VECTOR_DIMENSIONS_COUNT_MAX}"
                    )))
                }
                None => {
                    return Err(ProviderError::invalid_request(format!(
                        "dense index '{}' needs a dimension",
                        self.name
                    )))
                }
            },
            IndexType::Sparse => {
                if self.dimension.is_some() {
                    return Err(ProviderError::invalid_request(format!(
                        "sparse index '{}' must not set a dimension",
                        self.name
                    )));
                }
                if self.metric != Metric::DotProduct {
                    return Err(ProviderError::invalid_request(format!(
                        "sparse index '{}' requires metric dotproduct",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Check an index name.
///
/// # Errors
/// Returns `InvalidRequest` if empty, too long, or containing characters
/// other than lowercase ASCII letters, digits, `-` and `_`.
pub fn validate_index_name(name: &str) -> ProviderResult<()> {
    if name.is_empty() || name.len() > INDEX_NAME_BYTES_MAX {
        return Err(ProviderError::invalid_request(format!(
            "index name must be 1..={INDEX_NAME_BYTES_MAX} bytes"
        )));
    }
    let valid = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if !valid {
        return Err(ProviderError::invalid_request(format!(
            "index name '{name}' may only contain a-z, 0-9, '-' and '_'"
        )));
    }
    Ok(())
}

// =============================================================================
// SearchOptions
// =============================================================================

/// Options shared by every search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Number of results to return
    pub top_k: usize,
    /// Dense, sparse or hybrid
    pub search_type: SearchType,
    /// Metadata filter
    pub filter: Option<Filter>,
    /// Namespace; `None` means the default namespace
    pub namespace: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: SEARCH_TOP_K_DEFAULT,
            search_type: SearchType::Dense,
            filter: None,
            namespace: None,
        }
    }
}

impl SearchOptions {
    /// Options returning `top_k` dense results.
    #[must_use]
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    /// Set the search type.
    #[must_use]
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Set the metadata filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Same options with a different `top_k` and search type.
    #[must_use]
    pub fn derive(&self, top_k: usize, search_type: SearchType) -> Self {
        Self {
            top_k,
            search_type,
            filter: self.filter.clone(),
            namespace: self.namespace.clone(),
        }
    }

    /// Effective namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        resolve_namespace(self.namespace.as_deref())
    }

    /// Check `top_k` is in range.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if `top_k` is zero or above the maximum.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.top_k == 0 || self.top_k > SEARCH_TOP_K_MAX {
            return Err(ProviderError::invalid_request(format!(
                "top_k {} outside 1..={SEARCH_TOP_K_MAX}",
                self.top_k
            )));
        }
        Ok(())
    }
}

/// `namespace` or the default namespace.
#[must_use]
pub fn resolve_namespace(namespace: Option<&str>) -> &str {
    match namespace {
        Some(ns) if !ns.is_empty() => ns,
        _ => NAMESPACE_DEFAULT,
    }
}
