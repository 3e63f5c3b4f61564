//! The per-candidate feature vector and its linear combination into a final score.

/// Every signal the linear reranker combines for one candidate. Text-coverage and
/// query-intent signals are computed upstream (query analysis and text matching
/// happen in `lex-search`, which owns normalized text and query structure); this
/// crate only owns the weighting and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Features {
    /// Raw BM25 score from the backing store (lower is better in SQLite's FTS5).
    pub bm25_score: f64,
    pub docket_exact: f64,
    pub docket_partial: f64,
    pub title_coverage: f64,
    pub regeste_coverage: f64,
    pub snippet_coverage: f64,
    pub expanded_regeste_coverage: f64,
    pub expanded_title_coverage: f64,
    pub phrase_hit: f64,
    pub rrf_score: f64,
    pub strategy_hits: u32,
    pub statute_signal: f64,
    pub citation_signal: f64,
    pub authority_signal: f64,
    pub local_ref_signal: f64,
    pub court_prior_signal: f64,
    pub court_intent_signal: f64,
    pub procedure_signal: f64,
    pub language_signal: f64,
    pub vector_signal: f64,
    pub sparse_signal: f64,
}

/// Combine a feature vector into the final linear rerank score.
///
/// `bm25_score` enters negated (SQLite's `bm25()` is lower-is-better) so every other
/// term here is "higher is better", matching the rest of the formula.
pub fn linear_score(f: &Features) -> f64 {
    let strategy_hit_term = 0.18 * (f.strategy_hits.min(8) as f64);
    -f.bm25_score
        + 6.0 * f.docket_exact
        + 2.0 * f.docket_partial
        + 3.0 * f.title_coverage
        + 2.2 * f.regeste_coverage
        + 0.8 * f.snippet_coverage
        + 1.2 * f.expanded_regeste_coverage
        + 0.8 * f.expanded_title_coverage
        + 1.8 * f.phrase_hit
        + 32.0 * f.rrf_score
        + strategy_hit_term
        + f.statute_signal
        + f.citation_signal
        + f.authority_signal
        + f.local_ref_signal
        + f.court_prior_signal
        + f.court_intent_signal
        + f.procedure_signal
        + f.language_signal
        + f.vector_signal
        + f.sparse_signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_enters_negated() {
        let mut low = Features::default();
        low.bm25_score = 1.0;
        let mut high = Features::default();
        high.bm25_score = 5.0;
        assert!(linear_score(&low) > linear_score(&high));
    }

    #[test]
    fn strategy_hits_saturate_at_eight() {
        let mut seven = Features::default();
        seven.strategy_hits = 7;
        let mut eight = Features::default();
        eight.strategy_hits = 8;
        let mut twenty = Features::default();
        twenty.strategy_hits = 20;
        assert_eq!(linear_score(&eight), linear_score(&twenty));
        assert!(linear_score(&eight) > linear_score(&seven));
    }
}
