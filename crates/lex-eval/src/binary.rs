//! Metrics over binary relevance judgments (a result is either relevant or not).

/// Reciprocal rank: `1 / rank` of the first relevant result, 0 if none is relevant.
/// `relevant` is aligned with the ranked result list, 1-based rank internally.
pub fn reciprocal_rank(relevant: &[bool]) -> f64 {
    for (idx, &is_relevant) in relevant.iter().enumerate() {
        if is_relevant {
            return 1.0 / (idx + 1) as f64;
        }
    }
    0.0
}

/// Precision at k: fraction of the top-k results that are relevant.
pub fn precision_at_k(relevant: &[bool], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let n = k.min(relevant.len());
    let hits = relevant[..n].iter().filter(|&&r| r).count();
    hits as f64 / k as f64
}

/// Recall at k: fraction of all relevant items captured in the top-k.
pub fn recall_at_k(relevant: &[bool], k: usize, total_relevant: usize) -> f64 {
    if total_relevant == 0 {
        return 0.0;
    }
    let n = k.min(relevant.len());
    let hits = relevant[..n].iter().filter(|&&r| r).count();
    hits as f64 / total_relevant as f64
}

/// Average precision: mean of precision@k over every rank where a relevant result
/// appears, divided by the total number of relevant items.
pub fn average_precision(relevant: &[bool], total_relevant: usize) -> f64 {
    if total_relevant == 0 {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum_precision = 0.0;
    for (idx, &is_relevant) in relevant.iter().enumerate() {
        if is_relevant {
            hits += 1;
            sum_precision += hits as f64 / (idx + 1) as f64;
        }
    }
    sum_precision / total_relevant as f64
}

/// nDCG@k for binary relevance: DCG with gain `1` per relevant hit, normalized by
/// the ideal DCG (all relevant items packed at the top).
pub fn ndcg_at_k(relevant: &[bool], k: usize, total_relevant: usize) -> f64 {
    let n = k.min(relevant.len());
    let dcg: f64 = relevant[..n]
        .iter()
        .enumerate()
        .filter(|(_, &r)| r)
        .map(|(idx, _)| 1.0 / ((idx as f64 + 2.0).log2()))
        .sum();

    let ideal_hits = total_relevant.min(k);
    let idcg: f64 = (0..ideal_hits).map(|idx| 1.0 / ((idx as f64 + 2.0).log2())).sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reciprocal_rank_of_first_hit() {
        assert_eq!(reciprocal_rank(&[false, true, false]), 0.5);
        assert_eq!(reciprocal_rank(&[false, false]), 0.0);
    }

    #[test]
    fn precision_and_recall_at_k() {
        let relevant = [true, false, true, false];
        assert_eq!(precision_at_k(&relevant, 2), 0.5);
        assert_eq!(recall_at_k(&relevant, 2, 4), 0.25);
    }

    #[test]
    fn average_precision_perfect_ranking() {
        let relevant = [true, true, true];
        assert_eq!(average_precision(&relevant, 3), 1.0);
    }

    #[test]
    fn ndcg_perfect_ranking_is_one() {
        let relevant = [true, true, false];
        assert!((ndcg_at_k(&relevant, 3, 2) - 1.0).abs() < 1e-9);
    }
}
