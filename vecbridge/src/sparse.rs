//! Sparse Vectors
//!
//! `TigerStyle`: One canonical representation (index -> weight, ordered by
//! index) with lossless conversion to and from the positional wire form.
//!
//! Two encodings arrive from callers:
//!
//! ```text
//! positional: {"indices": [3, 17], "values": [0.5, 1.25]}
//! mapping:    {"3": 0.5, "17": 1.25}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

// =============================================================================
// SparseVector
// =============================================================================

/// Sparse vector: active dimension indices and their weights.
///
/// Serializes as the mapping encoding (`{"<index>": weight}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseVector(BTreeMap<u32, f32>);

impl SparseVector {
    /// Create an empty sparse vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from positional arrays.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if lengths differ, an index repeats or a
    /// weight is not finite.
    pub fn from_positional(indices: &[u32], values: &[f32]) -> ProviderResult<Self> {
        if indices.len() != values.len() {
            return Err(ProviderError::invalid_request(format!(
                "sparse indices ({}) and values ({}) differ in length",
                indices.len(),
                values.len()
            )));
        }

        let mut map = BTreeMap::new();
        for (&index, &value) in indices.iter().zip(values) {
            check_weight(index, value)?;
            if map.insert(index, value).is_some() {
                return Err(ProviderError::invalid_request(format!(
                    "duplicate sparse index {index}"
                )));
            }
        }

        // Postcondition
        assert_eq!(map.len(), indices.len(), "every pair must be kept");
        Ok(Self(map))
    }

    /// Build from `(index, weight)` pairs.
    ///
    /// # Errors
    /// Same rules as [`SparseVector::from_positional`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f32)>) -> ProviderResult<Self> {
        let (indices, values): (Vec<u32>, Vec<f32>) = pairs.into_iter().unzip();
        Self::from_positional(&indices, &values)
    }

    /// Positional arrays, ascending by index.
    #[must_use]
    pub fn to_positional(&self) -> PositionalSparse {
        let (indices, values) = self.0.iter().map(|(&i, &v)| (i, v)).unzip();
        PositionalSparse { indices, values }
    }

    /// Set the weight of one dimension.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if `value` is not finite.
    pub fn insert(&mut self, index: u32, value: f32) -> ProviderResult<()> {
        check_weight(index, value)?;
        self.0.insert(index, value);
        Ok(())
    }

    /// Weight of a dimension, if active.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<f32> {
        self.0.get(&index).copied()
    }

    /// Number of active dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no dimension is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Active `(index, weight)` pairs, ascending by index.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.0.iter().map(|(&i, &v)| (i, v))
    }

    /// Active indices, ascending.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    /// Dot product over the shared dimensions.
    #[must_use]
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .iter()
            .filter_map(|(i, v)| large.get(i).map(|w| v * w))
            .sum()
    }
}

fn check_weight(index: u32, value: f32) -> ProviderResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProviderError::invalid_request(format!(
            "sparse weight at index {index} is not finite"
        )))
    }
}

// =============================================================================
// Encodings
// =============================================================================

/// Positional (wire) form of a sparse vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionalSparse {
    /// Active dimension indices
    pub indices: Vec<u32>,
    /// Weights aligned with `indices`
    pub values: Vec<f32>,
}

/// Either inbound encoding of a sparse vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SparseEncoding {
    /// `{"indices": [...], "values": [...]}`
    Positional {
        /// Active dimension indices
        indices: Vec<u32>,
        /// Weights aligned with `indices`
        values: Vec<f32>,
    },
    /// `{"<index>": weight}`
    Mapping(BTreeMap<String, f32>),
}

impl TryFrom<SparseEncoding> for SparseVector {
    type Error = ProviderError;

    fn try_from(encoding: SparseEncoding) -> ProviderResult<Self> {
        match encoding {
            SparseEncoding::Positional { indices, values } => {
                SparseVector::from_positional(&indices, &values)
            }
            SparseEncoding::Mapping(map) => {
                let mut vector = SparseVector::new();
                for (key, value) in map {
                    let index = key.trim().parse::<u32>().map_err(|_| {
                        ProviderError::invalid_request(format!(
                            "sparse mapping key '{key}' is not a dimension index"
                        ))
                    })?;
                    if vector.get(index).is_some() {
                        return Err(ProviderError::invalid_request(format!(
                            "duplicate sparse index {index}"
                        )));
                    }
                    vector.insert(index, value)?;
                }
                Ok(vector)
            }
        }
    }
}

impl From<PositionalSparse> for SparseEncoding {
    fn from(p: PositionalSparse) -> Self {
        SparseEncoding::Positional {
            indices: p.indices,
            values: p.values,
        }
    }
}

impl From<&SparseVector> for SparseEncoding {
    fn from(v: &SparseVector) -> Self {
        SparseEncoding::Mapping(v.iter().map(|(i, w)| (i.to_string(), w)).collect())
    }
}
