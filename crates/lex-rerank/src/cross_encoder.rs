//! Optional cross-encoder boost, applied to the top of the linear-scored set.
//!
//! The cross-encoder model itself is external (this crate never loads an ML
//! runtime); callers inject a scorer through the [`CrossEncoder`] trait.

/// A cross-encoder scorer: rates how well `document` answers `query`. Higher is
/// more relevant. No constraint on output range — boosting min-max normalizes.
pub trait CrossEncoder {
    fn score_pair(&self, query: &str, document: &str) -> f32;
}

/// Characters of full text to include after title/regeste/snippet in the
/// cross-encoder's document input, matching the store's rerank text budget.
pub const FULL_TEXT_RERANK_CHARS: usize = 1400;

/// Build the `title|regeste|snippet|full_text[:1400]` document text the
/// cross-encoder scores the query against.
pub fn build_document_text(title: &str, regeste: &str, snippet: &str, full_text: &str) -> String {
    let truncated_len = full_text
        .char_indices()
        .nth(FULL_TEXT_RERANK_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(full_text.len());
    format!("{title}|{regeste}|{snippet}|{}", &full_text[..truncated_len])
}

/// Re-score the top `top_n` linear-scored candidates with a cross-encoder, min-max
/// normalize the raw scores into `[0, 1]`, and add `weight * normalized` to each
/// candidate's linear score in place.
///
/// Candidates beyond `top_n` are left untouched. `documents[i]` must correspond to
/// `linear_scores[i]`.
pub fn apply_boost<E: CrossEncoder>(
    encoder: &E,
    query: &str,
    documents: &[String],
    linear_scores: &mut [f64],
    top_n: usize,
    weight: f64,
) {
    let n = top_n.min(documents.len()).min(linear_scores.len());
    if n == 0 {
        return;
    }

    let raw: Vec<f32> = documents[..n]
        .iter()
        .map(|doc| encoder.score_pair(query, doc))
        .collect();

    let min = raw.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    for (i, score) in raw.iter().enumerate() {
        let normalized = if range > 0.0 { (score - min) / range } else { 0.0 };
        linear_scores[i] += weight * normalized as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer;
    impl CrossEncoder for FixedScorer {
        fn score_pair(&self, _query: &str, document: &str) -> f32 {
            document.len() as f32
        }
    }

    #[test]
    fn boost_normalizes_and_adds_weighted() {
        let docs = vec!["a".to_string(), "aaaaa".to_string()];
        let mut scores = vec![0.0, 0.0];
        apply_boost(&FixedScorer, "q", &docs, &mut scores, 2, 2.0);
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[1], 2.0);
    }

    #[test]
    fn boost_leaves_candidates_beyond_top_n_untouched() {
        let docs = vec!["a".to_string(), "aaaaa".to_string()];
        let mut scores = vec![1.0, 1.0];
        apply_boost(&FixedScorer, "q", &docs, &mut scores, 1, 5.0);
        assert_eq!(scores[1], 1.0);
    }

    #[test]
    fn constant_scores_yield_zero_normalized_boost() {
        struct Flat;
        impl CrossEncoder for Flat {
            fn score_pair(&self, _q: &str, _d: &str) -> f32 {
                1.0
            }
        }
        let docs = vec!["a".to_string(), "b".to_string()];
        let mut scores = vec![3.0, 3.0];
        apply_boost(&Flat, "q", &docs, &mut scores, 2, 10.0);
        assert_eq!(scores, vec![3.0, 3.0]);
    }
}
