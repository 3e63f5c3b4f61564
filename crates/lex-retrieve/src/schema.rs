//! Fixed column layout and BM25 weighting for the `decisions_fts` virtual table.
//!
//! The full-text index is a single FTS5 table built over the `decisions` table in a
//! fixed column order. Scoring is delegated entirely to SQLite's `bm25()` function;
//! this module just carries the column order and per-column weights `bm25()` expects,
//! plus a fallback sentinel for the rare row where `bm25()` itself returns something
//! that doesn't parse as a finite float.

/// Column order of the `decisions_fts` virtual table, as created by the index builder.
///
/// `bm25()` takes one weight argument per column, in this exact order. Changing the
/// order here without changing the table schema will silently misattribute weights.
pub const FTS_COLUMNS: [&str; 8] = [
    "decision_id",
    "court",
    "canton",
    "docket_number",
    "language",
    "title",
    "regeste",
    "full_text",
];

/// Per-column BM25 weights, in `FTS_COLUMNS` order.
///
/// Title and regeste carry most of the signal; docket_number gets a moderate boost
/// so exact docket fragments surface even outside the dedicated docket fast path;
/// full_text is weighted just above the floor since it dominates term counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Weights {
    pub decision_id: f64,
    pub court: f64,
    pub canton: f64,
    pub docket_number: f64,
    pub language: f64,
    pub title: f64,
    pub regeste: f64,
    pub full_text: f64,
}

impl Default for Bm25Weights {
    fn default() -> Self {
        Self {
            decision_id: 0.8,
            court: 0.8,
            canton: 0.8,
            docket_number: 2.0,
            language: 0.8,
            title: 6.0,
            regeste: 5.0,
            full_text: 1.2,
        }
    }
}

impl Bm25Weights {
    /// Render as the positional argument list `bm25()` expects, in `FTS_COLUMNS` order.
    pub fn as_args(&self) -> [f64; 8] {
        [
            self.decision_id,
            self.court,
            self.canton,
            self.docket_number,
            self.language,
            self.title,
            self.regeste,
            self.full_text,
        ]
    }

    /// Build the `bm25(decisions_fts, ...)` SQL fragment for these weights.
    pub fn sql_expr(&self) -> String {
        let args = self.as_args();
        let joined = args
            .iter()
            .map(|w| format!("{w}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("bm25(decisions_fts, {joined})")
    }
}

/// Sentinel used in place of a `bm25_score` that fails to parse as a finite float.
///
/// Large enough to sort below any real score while staying a finite f64, so the
/// "scores are always finite" invariant holds even when SQLite hands back something
/// unexpected.
pub const UNPARSEABLE_SCORE_SENTINEL: f64 = 1.0e9;

/// Parse a raw `bm25_score` column value, falling back to the sentinel on failure.
pub fn parse_bm25_score(raw: Option<f64>) -> f64 {
    match raw {
        Some(v) if v.is_finite() => v,
        _ => UNPARSEABLE_SCORE_SENTINEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_match_resolved_discrepancy() {
        let w = Bm25Weights::default();
        assert_eq!(w.title, 6.0);
        assert_eq!(w.regeste, 5.0);
        assert_eq!(w.docket_number, 2.0);
        assert_eq!(w.full_text, 1.2);
        assert_eq!(w.court, 0.8);
    }

    #[test]
    fn sql_expr_orders_args_by_fts_columns() {
        let expr = Bm25Weights::default().sql_expr();
        assert_eq!(
            expr,
            "bm25(decisions_fts, 0.8, 0.8, 0.8, 2, 0.8, 6, 5, 1.2)"
        );
    }

    #[test]
    fn unparseable_score_falls_back_to_sentinel() {
        assert_eq!(parse_bm25_score(None), UNPARSEABLE_SCORE_SENTINEL);
        assert_eq!(parse_bm25_score(Some(f64::NAN)), UNPARSEABLE_SCORE_SENTINEL);
        assert_eq!(parse_bm25_score(Some(3.5)), 3.5);
    }
}
