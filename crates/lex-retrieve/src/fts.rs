//! Multi-strategy full-text execution against `decisions_fts`.
//!
//! A query is expanded upstream (see the strategy planner in `lex-search`) into an
//! ordered list of weighted FTS5 MATCH expressions. This module runs each strategy
//! in turn against the `bm25()`-scored virtual table and folds the results into a
//! per-decision candidate map, accumulating Reciprocal Rank Fusion contributions
//! strategy by strategy rather than computing RRF over a single ranked list.

use std::collections::HashMap;

use lex_fusion::{rrf_contribution, RrfConfig};
use rusqlite::Connection;

use crate::schema::{parse_bm25_score, Bm25Weights};
use crate::RetrieveError;

/// One weighted FTS5 sub-query to run against `decisions_fts`.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub match_query: String,
    pub weight: f64,
}

/// A decision surfaced by one or more strategies, with its best (lowest) BM25 score
/// and accumulated RRF contribution across every strategy that hit it.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub decision_id: String,
    pub court: Option<String>,
    pub canton: Option<String>,
    pub chamber: Option<String>,
    pub docket_number: Option<String>,
    pub decision_date: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub regeste: Option<String>,
    pub full_text: Option<String>,
    pub snippet: Option<String>,
    pub source_url: Option<String>,
    pub pdf_url: Option<String>,
    pub best_bm25: f64,
    pub rrf_score: f64,
    pub strategy_hits: u32,
}

/// Reciprocal Rank Fusion constant (`1 / (k + rank)`). Matches `RrfConfig::default()`
/// in `lex-fusion`; re-exported here since it's part of this module's documented
/// contract.
pub const RRF_RANK_CONSTANT: f64 = 60.0;

/// Run every strategy in order, stopping early once the candidate pool reaches
/// `target_pool`, and return the accumulated candidate map in strategy-execution
/// order (insertion order is preserved by iterating a `Vec` alongside the map).
///
/// An explicit-syntax query additionally stops as soon as a strategy *after* the
/// first has filled the requested page (`page_size`): the first strategy alone
/// (`raw`, the literal boolean query) isn't enough signal to call it done, but
/// once a second ranking pass agrees there's no need to keep running the more
/// expensive follow-up strategies for a query that already spelled out its own
/// boolean syntax.
#[allow(clippy::too_many_arguments)]
pub fn execute_strategies(
    conn: &Connection,
    strategies: &[Strategy],
    where_clause: &str,
    where_params: &[&dyn rusqlite::ToSql],
    weights: &Bm25Weights,
    candidate_limit: usize,
    target_pool: usize,
    page_size: usize,
    has_explicit_syntax: bool,
) -> Result<Vec<CandidateRow>, RetrieveError> {
    let bm25_expr = weights.sql_expr();
    let sql = format!(
        "SELECT d.decision_id, d.court, d.canton, d.chamber, d.docket_number, \
         d.decision_date, d.language, d.title, d.regeste, d.full_text AS full_text_raw, \
         snippet(decisions_fts, 7, '<mark>', '</mark>', '...', 40) as snippet, \
         d.source_url, d.pdf_url, {bm25_expr} as bm25_score \
         FROM decisions_fts \
         JOIN decisions d ON d.rowid = decisions_fts.rowid \
         WHERE decisions_fts MATCH ?1{where_clause} \
         ORDER BY bm25_score ASC \
         LIMIT ?2"
    );

    let mut order: Vec<String> = Vec::new();
    let mut candidates: HashMap<String, CandidateRow> = HashMap::new();

    for (strategy_idx, strategy) in strategies.iter().enumerate() {
        let limit = candidate_limit as i64;
        let mut stmt = conn.prepare(&sql)?;
        let mut bound: Vec<&dyn rusqlite::ToSql> = vec![&strategy.match_query];
        bound.extend_from_slice(where_params);
        bound.push(&limit);

        let rows = match stmt.query_map(bound.as_slice(), |row| {
            let bm25_raw: Option<f64> = row.get("bm25_score").ok();
            Ok((
                row.get::<_, String>("decision_id")?,
                row.get::<_, Option<String>>("court")?,
                row.get::<_, Option<String>>("canton")?,
                row.get::<_, Option<String>>("chamber")?,
                row.get::<_, Option<String>>("docket_number")?,
                row.get::<_, Option<String>>("decision_date")?,
                row.get::<_, Option<String>>("language")?,
                row.get::<_, Option<String>>("title")?,
                row.get::<_, Option<String>>("regeste")?,
                row.get::<_, Option<String>>("full_text_raw")?,
                row.get::<_, Option<String>>("snippet")?,
                row.get::<_, Option<String>>("source_url")?,
                row.get::<_, Option<String>>("pdf_url")?,
                bm25_raw,
            ))
        }) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(strategy = %strategy.name, error = %e, "FTS strategy failed, trying next");
                continue;
            }
        };

        for (rank, row) in rows.enumerate() {
            let rank = rank + 1;
            let (
                decision_id,
                court,
                canton,
                chamber,
                docket_number,
                decision_date,
                language,
                title,
                regeste,
                full_text,
                snippet,
                source_url,
                pdf_url,
                bm25_raw,
            ) = match row {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(strategy = %strategy.name, error = %e, "row decode failed");
                    continue;
                }
            };
            let bm25 = parse_bm25_score(bm25_raw);

            let entry = candidates.entry(decision_id.clone()).or_insert_with(|| {
                order.push(decision_id.clone());
                CandidateRow {
                    decision_id: decision_id.clone(),
                    court: court.clone(),
                    canton: canton.clone(),
                    chamber: chamber.clone(),
                    docket_number: docket_number.clone(),
                    decision_date: decision_date.clone(),
                    language: language.clone(),
                    title: title.clone(),
                    regeste: regeste.clone(),
                    full_text: full_text.clone(),
                    snippet: snippet.clone(),
                    source_url: source_url.clone(),
                    pdf_url: pdf_url.clone(),
                    best_bm25: bm25,
                    rrf_score: 0.0,
                    strategy_hits: 0,
                }
            });

            if bm25 < entry.best_bm25 {
                entry.best_bm25 = bm25;
                entry.court = court;
                entry.canton = canton;
                entry.chamber = chamber;
                entry.docket_number = docket_number;
                entry.decision_date = decision_date;
                entry.language = language;
                entry.title = title;
                entry.regeste = regeste;
                entry.full_text = full_text;
                entry.snippet = snippet;
                entry.source_url = source_url;
                entry.pdf_url = pdf_url;
            }
            entry.rrf_score += rrf_contribution(strategy.weight, rank, RrfConfig::default());
            entry.strategy_hits += 1;
        }

        if has_explicit_syntax && strategy_idx > 0 && candidates.len() >= page_size {
            break;
        }
        if candidates.len() >= target_pool {
            break;
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| candidates.remove(&id))
        .collect())
}

/// Filter-only scan of `decisions`, bypassing FTS entirely. Used for an empty
/// query plus filters, where there is no text to rank against: rows come back
/// ordered by `decision_date DESC` with neutral scoring fields (BM25/RRF both
/// zero, no snippet) so downstream sort/paginate can still apply whatever
/// order the caller asked for.
pub fn filter_only_scan(
    conn: &Connection,
    where_clause: &str,
    where_params: &[&dyn rusqlite::ToSql],
    limit: usize,
) -> Result<Vec<CandidateRow>, RetrieveError> {
    let sql = format!(
        "SELECT d.decision_id, d.court, d.canton, d.chamber, d.docket_number, \
         d.decision_date, d.language, d.title, d.regeste, d.full_text AS full_text_raw, \
         d.source_url, d.pdf_url \
         FROM decisions d \
         WHERE 1=1{where_clause} \
         ORDER BY d.decision_date DESC \
         LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let limit = limit as i64;
    let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(where_params.len() + 1);
    bound.extend_from_slice(where_params);
    bound.push(&limit);

    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok(CandidateRow {
            decision_id: row.get("decision_id")?,
            court: row.get("court")?,
            canton: row.get("canton")?,
            chamber: row.get("chamber")?,
            docket_number: row.get("docket_number")?,
            decision_date: row.get("decision_date")?,
            language: row.get("language")?,
            title: row.get("title")?,
            regeste: row.get("regeste")?,
            full_text: row.get("full_text_raw")?,
            snippet: None,
            source_url: row.get("source_url")?,
            pdf_url: row.get("pdf_url")?,
            best_bm25: 0.0,
            rrf_score: 0.0,
            strategy_hits: 0,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_constant_matches_resolved_value() {
        assert_eq!(RRF_RANK_CONSTANT, 60.0);
    }

    fn build_fixture_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE decisions (
                decision_id TEXT, court TEXT, canton TEXT, chamber TEXT, docket_number TEXT,
                decision_date TEXT, language TEXT, title TEXT, regeste TEXT, full_text TEXT,
                source_url TEXT, pdf_url TEXT
            );
            CREATE VIRTUAL TABLE decisions_fts USING fts5(
                decision_id, court, canton, docket_number, language, title, regeste, full_text
            );",
        )
        .unwrap();
        let rows = [
            ("d1", "asyl wegweisung"),
            ("d2", "asyl beschwerde"),
            ("d3", "mobbing kuendigung"),
        ];
        for (idx, (id, text)) in rows.iter().enumerate() {
            let rowid = (idx + 1) as i64;
            conn.execute(
                "INSERT INTO decisions (decision_id, court, full_text) VALUES (?1, 'bger', ?2)",
                rusqlite::params![id, text],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO decisions_fts (rowid, decision_id, full_text) VALUES (?1, ?2, ?3)",
                rusqlite::params![rowid, id, text],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn explicit_syntax_stops_after_page_is_filled_by_a_later_strategy() {
        let conn = build_fixture_db();
        let strategies = vec![
            Strategy { name: "raw".into(), match_query: "asyl".into(), weight: 1.5 },
            Strategy { name: "nl_and".into(), match_query: "asyl OR mobbing".into(), weight: 0.9 },
            Strategy { name: "unreachable".into(), match_query: "kuendigung".into(), weight: 0.1 },
        ];
        let weights = Bm25Weights::default();
        let rows = execute_strategies(&conn, &strategies, "", &[], &weights, 50, 50, 3, true).unwrap();
        assert_eq!(rows.len(), 3, "first two strategies alone should fill the 3-row page");
        let total_hits: u32 = rows.iter().map(|r| r.strategy_hits).sum();
        assert_eq!(total_hits, 5, "the unreachable third strategy must not have run");
    }

    #[test]
    fn non_explicit_syntax_runs_every_strategy_regardless_of_page_size() {
        let conn = build_fixture_db();
        let strategies = vec![
            Strategy { name: "nl_and".into(), match_query: "asyl".into(), weight: 1.3 },
            Strategy { name: "nl_or".into(), match_query: "asyl OR mobbing OR kuendigung".into(), weight: 1.0 },
        ];
        let weights = Bm25Weights::default();
        let rows = execute_strategies(&conn, &strategies, "", &[], &weights, 50, 50, 1, false).unwrap();
        assert_eq!(rows.len(), 3, "non-explicit queries keep running strategies past the page size");
    }
}
