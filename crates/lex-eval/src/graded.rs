//! Metrics over graded relevance judgments (each result has a relevance grade,
//! not just relevant/not-relevant).

/// Discounted cumulative gain with exponential gain `2^grade - 1`, standard
/// log2-discounted position weighting.
fn dcg(grades: &[f64]) -> f64 {
    grades
        .iter()
        .enumerate()
        .map(|(idx, &grade)| (2f64.powf(grade) - 1.0) / (idx as f64 + 2.0).log2())
        .sum()
}

/// nDCG over graded relevance: DCG normalized by the ideal DCG (grades sorted
/// descending).
pub fn compute_ndcg(grades: &[f64]) -> f64 {
    let actual = dcg(grades);
    let mut ideal_grades = grades.to_vec();
    ideal_grades.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let ideal = dcg(&ideal_grades);
    if ideal == 0.0 {
        0.0
    } else {
        actual / ideal
    }
}

/// Expected Reciprocal Rank: models a user scanning down the list and stopping at
/// the first satisfying result, weighted by each position's satisfaction
/// probability derived from its relevance grade (assumes grades in `[0, max_grade]`).
pub fn compute_err(grades: &[f64], max_grade: f64) -> f64 {
    if max_grade <= 0.0 {
        return 0.0;
    }
    let mut err = 0.0;
    let mut p_not_stopped = 1.0;
    for (idx, &grade) in grades.iter().enumerate() {
        let satisfaction = (2f64.powf(grade) - 1.0) / 2f64.powf(max_grade);
        let rank = (idx + 1) as f64;
        err += p_not_stopped * satisfaction / rank;
        p_not_stopped *= 1.0 - satisfaction;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_ndcg_one() {
        let grades = [3.0, 2.0, 1.0, 0.0];
        assert!((compute_ndcg(&grades) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reversed_ranking_scores_below_one() {
        let grades = [0.0, 1.0, 2.0, 3.0];
        assert!(compute_ndcg(&grades) < 1.0);
    }

    #[test]
    fn err_is_zero_for_all_irrelevant() {
        let grades = [0.0, 0.0, 0.0];
        assert_eq!(compute_err(&grades, 3.0), 0.0);
    }
}
