//! Pure-arithmetic helpers for the handful of features that are more than a simple
//! weighted indicator: statute/citation boosts that scale with hit counts, the
//! incoming-citation authority signal, and the vector/sparse similarity signals.

/// Boost for a query that references statutes which the candidate also mentions,
/// scaling with mention count up to a cap. Zero unless the query had statute
/// references AND the candidate had at least one mention.
pub fn statute_signal(query_has_statutes: bool, statute_mentions: f64) -> f64 {
    if query_has_statutes && statute_mentions > 0.0 {
        2.2 + (0.25 * statute_mentions).min(1.2)
    } else {
        0.0
    }
}

/// Boost for a query that references citations which the candidate also cites,
/// scaling with hit count up to a cap.
pub fn citation_signal(query_has_citations: bool, query_citation_hits: f64) -> f64 {
    if query_has_citations && query_citation_hits > 0.0 {
        2.4 + (0.30 * query_citation_hits).min(1.2)
    } else {
        0.0
    }
}

/// Authority boost from incoming citation count, capped at 1.0.
pub fn authority_signal(incoming_citations: f64) -> f64 {
    if incoming_citations > 0.0 {
        (incoming_citations * 0.03).min(1.0)
    } else {
        0.0
    }
}

/// Vector similarity signal: `weight * max(0, 1 - distance)`, zero if there was no
/// vector hit for this candidate.
pub fn vector_signal(distance: Option<f64>, weight: f64) -> f64 {
    match distance {
        Some(d) => weight * (1.0 - d).max(0.0),
        None => 0.0,
    }
}

/// Sparse similarity signal: `weight * min(1, score / max(max_score, 0.01))`, zero
/// if there was no sparse hit for this candidate.
pub fn sparse_signal(score: Option<f64>, max_score: f64, weight: f64) -> f64 {
    match score {
        Some(s) => weight * (s / max_score.max(0.01)).min(1.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statute_signal_requires_both_query_refs_and_mentions() {
        assert_eq!(statute_signal(false, 5.0), 0.0);
        assert_eq!(statute_signal(true, 0.0), 0.0);
        assert!(statute_signal(true, 1.0) > 0.0);
    }

    #[test]
    fn statute_signal_caps_at_three_point_four() {
        assert!((statute_signal(true, 1000.0) - 3.4).abs() < 1e-9);
    }

    #[test]
    fn authority_signal_caps_at_one() {
        assert_eq!(authority_signal(1000.0), 1.0);
        assert_eq!(authority_signal(0.0), 0.0);
    }

    #[test]
    fn vector_signal_ignores_distances_above_one() {
        assert_eq!(vector_signal(Some(1.5), 2.0), 0.0);
        assert_eq!(vector_signal(None, 2.0), 0.0);
        assert!((vector_signal(Some(0.5), 2.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sparse_signal_normalizes_against_max() {
        assert!((sparse_signal(Some(5.0), 10.0, 1.0) - 0.5).abs() < 1e-9);
        assert_eq!(sparse_signal(Some(5.0), 0.0, 1.0), 1.0);
    }
}
