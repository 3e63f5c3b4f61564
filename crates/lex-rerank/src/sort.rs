//! Final ordering and pagination of the reranked candidate set.

/// The sort order requested by a caller, overriding relevance ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Default: descending score, tie-broken by ascending bm25, then source index.
    Relevance,
    DateDesc,
    DateAsc,
}

/// One scored candidate, carrying just enough to sort and paginate: its linear
/// (plus any cross-encoder boost) score, raw bm25 for tie-breaking, original
/// retrieval order for stable tie-breaking, and an optional date for date sorts.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub score: f64,
    pub bm25_score: f64,
    pub source_index: usize,
    pub date: Option<String>,
    pub item: T,
}

/// Sort candidates by the requested order, then apply `[offset : offset + limit]`.
///
/// Default order is descending `(score, -bm25, source_index)`: higher score first,
/// and among equal scores, lower bm25 first, then original retrieval order — stable
/// and deterministic. A date sort fully replaces the ordering but never changes
/// which candidates are present (the rerank subset is preserved).
pub fn sort_and_paginate<T>(mut items: Vec<Scored<T>>, order: SortOrder, offset: usize, limit: usize) -> Vec<Scored<T>> {
    match order {
        SortOrder::Relevance => {
            items.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.bm25_score.partial_cmp(&b.bm25_score).unwrap_or(std::cmp::Ordering::Equal))
                    .then_with(|| a.source_index.cmp(&b.source_index))
            });
        }
        SortOrder::DateDesc | SortOrder::DateAsc => {
            items.sort_by(|a, b| {
                let ord = a.date.cmp(&b.date);
                if order == SortOrder::DateDesc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
    }

    items.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(score: f64, bm25: f64, idx: usize, date: &str) -> Scored<&'static str> {
        Scored {
            score,
            bm25_score: bm25,
            source_index: idx,
            date: Some(date.to_string()),
            item: "x",
        }
    }

    #[test]
    fn relevance_sort_breaks_ties_by_bm25_then_index() {
        let items = vec![scored(1.0, 2.0, 1, "2020-01-01"), scored(1.0, 1.0, 0, "2021-01-01")];
        let sorted = sort_and_paginate(items, SortOrder::Relevance, 0, 10);
        assert_eq!(sorted[0].bm25_score, 1.0);
    }

    #[test]
    fn date_desc_overrides_score_order() {
        let items = vec![scored(5.0, 1.0, 0, "2020-01-01"), scored(1.0, 1.0, 1, "2025-01-01")];
        let sorted = sort_and_paginate(items, SortOrder::DateDesc, 0, 10);
        assert_eq!(sorted[0].date.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn pagination_applies_after_sort() {
        let items = vec![scored(3.0, 1.0, 0, "2020-01-01"), scored(2.0, 1.0, 1, "2021-01-01"), scored(1.0, 1.0, 2, "2022-01-01")];
        let page = sort_and_paginate(items, SortOrder::Relevance, 1, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].score, 2.0);
    }
}
