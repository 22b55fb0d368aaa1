//! Reciprocal Rank Fusion
//!
//! `TigerStyle`: Deterministic merge of a dense and a sparse ranking.
//!
//! ```text
//! score(id) = alpha / (k + rank_dense + 1) + (1 - alpha) / (k + rank_sparse + 1)
//! ```
//!
//! Ranks are zero-based; a term is omitted when the id is absent from that
//! list. Ties go to the better dense rank (absent from dense sorts last),
//! then to the first appearance across `[dense, sparse]`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::{RRF_ALPHA_DEFAULT, RRF_K_DEFAULT};
use crate::error::{ProviderError, ProviderResult};
use crate::types::SearchResult;

/// Fusion weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RrfParams {
    /// Weight of the dense ranking, in [0, 1]
    pub alpha: f32,
    /// Rank damping constant
    pub k: u32,
}

impl Default for RrfParams {
    fn default() -> Self {
        Self {
            alpha: RRF_ALPHA_DEFAULT,
            k: RRF_K_DEFAULT,
        }
    }
}

impl RrfParams {
    /// Validated parameters.
    ///
    /// # Errors
    /// Returns `Configuration` if `alpha` is outside [0, 1].
    pub fn new(alpha: f32, k: u32) -> ProviderResult<Self> {
        let params = Self { alpha, k };
        params.validate()?;
        Ok(params)
    }

    /// Check `alpha` is in range.
    ///
    /// # Errors
    /// Returns `Configuration` if `alpha` is outside [0, 1] or not finite.
    pub fn validate(&self) -> ProviderResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ProviderError::configuration(format!(
                "rrf alpha {} outside [0, 1]",
                self.alpha
            )));
        }
        Ok(())
    }
}

struct Candidate<'a> {
    score: f64,
    dense_rank: Option<usize>,
    first_seen: usize,
    dense: Option<&'a SearchResult>,
    sparse: Option<&'a SearchResult>,
}

/// Merge two rankings into the top `top_k` by fused score.
///
/// Returned scores are the fused scores; metadata comes from the dense entry
/// when present, else the sparse entry. A repeated id within one list counts
/// only at its first position.
#[must_use]
pub fn rrf_merge(
    dense: &[SearchResult],
    sparse: &[SearchResult],
    top_k: usize,
    params: RrfParams,
) -> Vec<SearchResult> {
    // Precondition
    debug_assert!(params.validate().is_ok(), "rrf params must be valid");

    let alpha = f64::from(params.alpha);
    let k = f64::from(params.k);
    #[allow(clippy::cast_precision_loss)]
    let term = |weight: f64, rank: usize| weight / (k + rank as f64 + 1.0);

    let mut candidates: Vec<Candidate<'_>> = Vec::with_capacity(dense.len() + sparse.len());
    let mut slot: HashMap<&str, usize> = HashMap::with_capacity(dense.len() + sparse.len());

    for (rank, result) in dense.iter().enumerate() {
        if slot.contains_key(result.id.as_str()) {
            continue;
        }
        slot.insert(&result.id, candidates.len());
        candidates.push(Candidate {
            score: term(alpha, rank),
            dense_rank: Some(rank),
            first_seen: candidates.len(),
            dense: Some(result),
            sparse: None,
        });
    }

    let mut seen_sparse: HashSet<&str> = HashSet::with_capacity(sparse.len());
    for (rank, result) in sparse.iter().enumerate() {
        if !seen_sparse.insert(&result.id) {
            continue;
        }
        let contribution = term(1.0 - alpha, rank);
        if let Some(&idx) = slot.get(result.id.as_str()) {
            let candidate = &mut candidates[idx];
            candidate.score += contribution;
            candidate.sparse = Some(result);
        } else {
            slot.insert(&result.id, candidates.len());
            candidates.push(Candidate {
                score: contribution,
                dense_rank: None,
                first_seen: candidates.len(),
                dense: None,
                sparse: Some(result),
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| match (a.dense_rank, b.dense_rank) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });

    let merged: Vec<SearchResult> = candidates
        .into_iter()
        .take(top_k)
        .filter_map(|c| {
            let source = c.dense.or(c.sparse)?;
            #[allow(clippy::cast_possible_truncation)]
            let score = c.score as f32;
            Some(SearchResult {
                id: source.id.clone(),
                score,
                metadata: source.metadata.clone(),
            })
        })
        .collect();

    // Postcondition
    debug_assert!(merged.len() <= top_k);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ranked(ids: &[&str]) -> Vec<SearchResult> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| SearchResult::new(*id, 1.0 - i as f32 * 0.1))
            .collect()
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_reference_example() {
        let dense = ranked(&["a", "b", "c"]);
        let sparse = ranked(&["b", "a", "d"]);

        let merged = rrf_merge(&dense, &sparse, 10, RrfParams::default());

        assert_eq!(ids(&merged), vec!["a", "b", "c", "d"]);

        let expected_ab = 0.5 / 61.0 + 0.5 / 62.0;
        assert!((f64::from(merged[0].score) - expected_ab).abs() < 1e-7);
        assert_eq!(merged[0].score, merged[1].score);
        // c: dense rank 2, d: sparse rank 2 -> equal; c wins on dense rank
        assert!((f64::from(merged[2].score) - 0.5 / 63.0).abs() < 1e-7);
        assert_eq!(merged[2].score, merged[3].score);
    }

    #[test]
    fn test_top_k_truncates() {
        let merged = rrf_merge(
            &ranked(&["a", "b", "c"]),
            &ranked(&["b", "a", "d"]),
            2,
            RrfParams::default(),
        );
        assert_eq!(ids(&merged), vec!["a", "b"]);
    }

    #[test]
    fn test_alpha_extremes() {
        let dense = ranked(&["a", "b"]);
        let sparse = ranked(&["b", "a"]);

        let dense_only = rrf_merge(&dense, &sparse, 2, RrfParams::new(1.0, 60).unwrap());
        assert_eq!(ids(&dense_only), vec!["a", "b"]);

        let sparse_only = rrf_merge(&dense, &sparse, 2, RrfParams::new(0.0, 60).unwrap());
        assert_eq!(ids(&sparse_only), vec!["b", "a"]);
    }

    #[test]
    fn test_sparse_only_list() {
        let merged = rrf_merge(&[], &ranked(&["x", "y"]), 5, RrfParams::new(0.5, 0).unwrap());
        assert_eq!(ids(&merged), vec!["x", "y"]);
    }

    #[test]
    fn test_duplicates_count_once() {
        let dense = ranked(&["a", "a", "b"]);
        let merged = rrf_merge(&dense, &[], 5, RrfParams::default());

        assert_eq!(ids(&merged), vec!["a", "b"]);
        assert!((f64::from(merged[1].score) - 0.5 / 63.0).abs() < 1e-7);
    }

    #[test]
    fn test_metadata_prefers_dense() {
        let mut dense = ranked(&["a"]);
        dense[0].metadata = json!({"src": "dense"}).as_object().cloned();
        let mut sparse = ranked(&["a", "z"]);
        sparse[0].metadata = json!({"src": "sparse"}).as_object().cloned();
        sparse[1].metadata = json!({"src": "sparse"}).as_object().cloned();

        let merged = rrf_merge(&dense, &sparse, 5, RrfParams::default());

        assert_eq!(merged[0].metadata.as_ref().unwrap()["src"], "dense");
        assert_eq!(merged[1].metadata.as_ref().unwrap()["src"], "sparse");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(rrf_merge(&[], &[], 10, RrfParams::default()).is_empty());
    }

    #[test]
    fn test_params_validation() {
        assert!(RrfParams::new(1.5, 60).is_err());
        assert!(RrfParams::new(-0.1, 60).is_err());
        assert!(RrfParams::new(f32::NAN, 60).is_err());
        assert!(RrfParams::new(0.3, 10).is_ok());
    }
}
