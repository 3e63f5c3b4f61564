//! Reciprocal Rank Fusion and sibling rank-fusion algorithms.
//!
//! This crate has no I/O and no knowledge of decisions, courts, or SQL — it only
//! knows about ranked lists of opaque ids. Candidate retrieval crates own
//! accumulating contributions per id; this crate owns the arithmetic of how a
//! single rank position turns into a fusion contribution.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Errors from malformed fusion configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FusionError {
    /// `k` must be positive — a non-positive rank constant blows up near rank 0.
    NonPositiveK(f64),
    /// A weight must be finite and non-negative.
    InvalidWeight(f64),
}

impl fmt::Display for FusionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionError::NonPositiveK(k) => write!(f, "rank constant must be positive, got {k}"),
            FusionError::InvalidWeight(w) => write!(f, "weight must be finite and non-negative, got {w}"),
        }
    }
}

impl std::error::Error for FusionError {}

/// Configuration for Reciprocal Rank Fusion: `score = weight / (k + rank)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfConfig {
    pub k: f64,
}

impl RrfConfig {
    pub fn new(k: f64) -> Result<Self, FusionError> {
        if !(k > 0.0) {
            return Err(FusionError::NonPositiveK(k));
        }
        Ok(Self { k })
    }
}

impl Default for RrfConfig {
    /// `k = 60`, the rank constant used throughout the candidate retrieval pipeline.
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

/// Configuration for weighted-sum fusion of already-normalized per-source scores.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedConfig {
    pub weight: f64,
}

/// The RRF contribution of a single `(weight, rank)` pair. `rank` is 1-based.
///
/// This is the core formula candidate retrievers accumulate across strategies:
/// `contribution = weight / (k + rank)`.
pub fn rrf_contribution(weight: f64, rank: usize, config: RrfConfig) -> f64 {
    weight / (config.k + rank as f64)
}

/// Fuse a single ranked list (1-based rank order, best first) into per-id RRF scores
/// using the default rank constant.
pub fn rrf<Id: Eq + Hash + Clone>(ranked_ids: &[Id]) -> HashMap<Id, f64> {
    rrf_k(ranked_ids, RrfConfig::default())
}

/// Same as [`rrf`] with an explicit rank constant.
pub fn rrf_k<Id: Eq + Hash + Clone>(ranked_ids: &[Id], config: RrfConfig) -> HashMap<Id, f64> {
    let mut out = HashMap::with_capacity(ranked_ids.len());
    for (idx, id) in ranked_ids.iter().enumerate() {
        let rank = idx + 1;
        out.insert(id.clone(), rrf_contribution(1.0, rank, config));
    }
    out
}

/// Fuse several independently-ranked lists, each with its own weight, accumulating
/// contributions per id across all lists.
pub fn rrf_multi<Id: Eq + Hash + Clone>(lists: &[(&[Id], f64)]) -> HashMap<Id, f64> {
    rrf_multi_k(lists, RrfConfig::default())
}

/// Same as [`rrf_multi`] with an explicit rank constant.
pub fn rrf_multi_k<Id: Eq + Hash + Clone>(
    lists: &[(&[Id], f64)],
    config: RrfConfig,
) -> HashMap<Id, f64> {
    let mut out: HashMap<Id, f64> = HashMap::new();
    for (ranked_ids, weight) in lists {
        for (idx, id) in ranked_ids.iter().enumerate() {
            let rank = idx + 1;
            *out.entry(id.clone()).or_insert(0.0) += rrf_contribution(*weight, rank, config);
        }
    }
    out
}

/// Weighted-sum fusion: `score = weight * normalized_score`, accumulated per id
/// across sources. Used for signals that are already normalized to a common scale
/// (e.g. `max(0, 1 - distance)` for vector hits) rather than rank-based.
pub fn weighted<Id: Eq + Hash + Clone>(scores: &[(Id, f64)], config: WeightedConfig) -> HashMap<Id, f64> {
    weighted_multi(&[(scores, config.weight)])
}

/// Fuse several weighted, already-normalized score lists by summing contributions.
pub fn weighted_multi<Id: Eq + Hash + Clone>(lists: &[(&[(Id, f64)], f64)]) -> HashMap<Id, f64> {
    let mut out: HashMap<Id, f64> = HashMap::new();
    for (scores, weight) in lists {
        for (id, score) in scores.iter() {
            *out.entry(id.clone()).or_insert(0.0) += weight * score;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_default_k_is_60() {
        assert_eq!(RrfConfig::default().k, 60.0);
    }

    #[test]
    fn rrf_contribution_decreases_with_rank() {
        let cfg = RrfConfig::default();
        let first = rrf_contribution(1.0, 1, cfg);
        let second = rrf_contribution(1.0, 2, cfg);
        assert!(first > second);
    }

    #[test]
    fn rrf_multi_accumulates_across_lists() {
        let a = vec!["x", "y"];
        let b = vec!["y", "x"];
        let fused = rrf_multi(&[(a.as_slice(), 1.0), (b.as_slice(), 1.0)]);
        // "x" is rank 1 in list a and rank 2 in list b; "y" the reverse — symmetric, so equal.
        assert!((fused["x"] - fused["y"]).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_k() {
        assert_eq!(RrfConfig::new(0.0), Err(FusionError::NonPositiveK(0.0)));
        assert!(RrfConfig::new(60.0).is_ok());
    }
}
