//! Metadata Filters
//!
//! The portable subset every adapter understands:
//!
//! ```text
//! {"brand": "acme"}                    equality
//! {"brand": {"$eq": "acme"}}           equality
//! {"brand": {"$in": ["acme", "zeta"]}} membership
//! ```
//!
//! All clauses must hold. Pinecone receives the filter verbatim; the memory
//! and pgvector adapters evaluate it through [`FilterClause`].

use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};
use crate::types::{Filter, Metadata};

/// One parsed clause of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// `field == value`
    Eq {
        /// Metadata key
        field: String,
        /// Expected value
        value: Value,
    },
    /// `field` is one of `values`
    In {
        /// Metadata key
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
}

impl FilterClause {
    /// Metadata key the clause tests.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. } | Self::In { field, .. } => field,
        }
    }

    fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::Eq { field, value } => metadata.get(field) == Some(value),
            Self::In { field, values } => metadata
                .get(field)
                .is_some_and(|actual| values.contains(actual)),
        }
    }
}

/// Parse a filter into clauses.
///
/// # Errors
/// Returns `InvalidRequest` for operators other than `$eq` / `$in`, or an
/// `$in` whose operand is not an array.
pub fn parse(filter: &Filter) -> ProviderResult<Vec<FilterClause>> {
    let mut clauses = Vec::with_capacity(filter.len());

    for (field, condition) in filter {
        let clause = match condition {
            Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                if ops.len() != 1 {
                    return Err(ProviderError::invalid_request(format!(
                        "filter on '{field}' must use exactly one operator"
                    )));
                }
                let (op, operand) = ops.iter().next().ok_or_else(|| {
                    ProviderError::invalid_request(format!("empty filter on '{field}'"))
                })?;
                match (op.as_str(), operand) {
                    ("$eq", value) => FilterClause::Eq {
                        field: field.clone(),
                        value: value.clone(),
                    },
                    ("$in", Value::Array(values)) => FilterClause::In {
                        field: field.clone(),
                        values: values.clone(),
                    },
                    ("$in", _) => {
                        return Err(ProviderError::invalid_request(format!(
                            "$in on '{field}' needs an array"
                        )))
                    }
                    (other, _) => {
                        return Err(ProviderError::invalid_request(format!(
                            "unsupported filter operator '{other}' on '{field}'"
                        )))
                    }
                }
            }
            value => FilterClause::Eq {
                field: field.clone(),
                value: value.clone(),
            },
        };
        clauses.push(clause);
    }

    Ok(clauses)
}

/// True if `metadata` satisfies every clause.
///
/// A record without metadata only matches the empty filter.
#[must_use]
pub fn matches(clauses: &[FilterClause], metadata: Option<&Metadata>) -> bool {
    match metadata {
        Some(metadata) => clauses.iter().all(|c| c.matches(metadata)),
        None => clauses.is_empty(),
    }
}
