//! Reference-graph enrichment and citation/appeal-chain/trend analytics.
//!
//! Everything here reads from the optional reference-graph store; a missing store
//! degrades every function to an empty/zeroed result rather than an error, matching
//! `lex_retrieve::handles::open_graph`'s silent-degradation contract.

use std::collections::{BTreeSet, HashMap};

use rusqlite::Connection;

use lex_retrieve::handles::{has_column, has_table};

/// Per-decision signals folded into the linear reranker's feature set.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphSignals {
    pub statute_mentions: f64,
    pub query_citation_hits: f64,
    pub incoming_citations: f64,
}

/// Load statute-mention / query-citation-hit / incoming-citation counts for a
/// batch of decisions. Returns an empty map if the graph store is unavailable,
/// `decision_ids` is empty, or signals are disabled in configuration.
pub fn load_graph_signal_map(
    conn: Option<&Connection>,
    decision_ids: &[String],
    query_statutes: &BTreeSet<String>,
    query_citations: &BTreeSet<String>,
) -> HashMap<String, GraphSignals> {
    let mut map: HashMap<String, GraphSignals> =
        decision_ids.iter().cloned().map(|id| (id, GraphSignals::default())).collect();
    let Some(conn) = conn else { return HashMap::new() };
    if map.is_empty() {
        return map;
    }

    if !query_statutes.is_empty() {
        if let Ok(rows) = statute_mentions(conn, decision_ids, query_statutes) {
            for (id, n) in rows {
                if let Some(signal) = map.get_mut(&id) {
                    signal.statute_mentions = n;
                }
            }
        }
    }

    if !query_citations.is_empty() {
        if let Ok(rows) = query_citation_hits(conn, decision_ids, query_citations) {
            for (id, n) in rows {
                if let Some(signal) = map.get_mut(&id) {
                    signal.query_citation_hits = n;
                }
            }
        }
    }

    if let Ok(rows) = incoming_citation_counts(conn, decision_ids) {
        for (id, n) in rows {
            if let Some(signal) = map.get_mut(&id) {
                signal.incoming_citations = n.max(0.0);
            }
        }
    }

    map
}

fn in_clause(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

fn statute_mentions(
    conn: &Connection,
    decision_ids: &[String],
    query_statutes: &BTreeSet<String>,
) -> rusqlite::Result<Vec<(String, f64)>> {
    let sql = format!(
        "SELECT decision_id, SUM(mention_count) AS n FROM decision_statutes \
         WHERE decision_id IN ({}) AND statute_id IN ({}) GROUP BY decision_id",
        in_clause(decision_ids.len()),
        in_clause(query_statutes.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut params: Vec<&dyn rusqlite::ToSql> = decision_ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    params.extend(query_statutes.iter().map(|s| s as &dyn rusqlite::ToSql));
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?.unwrap_or(0.0)))
    })?;
    rows.collect()
}

fn query_citation_hits(
    conn: &Connection,
    decision_ids: &[String],
    query_citations: &BTreeSet<String>,
) -> rusqlite::Result<Vec<(String, f64)>> {
    let sql = format!(
        "SELECT source_decision_id AS decision_id, SUM(mention_count) AS n FROM decision_citations \
         WHERE source_decision_id IN ({}) AND target_ref IN ({}) GROUP BY source_decision_id",
        in_clause(decision_ids.len()),
        in_clause(query_citations.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut params: Vec<&dyn rusqlite::ToSql> = decision_ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    params.extend(query_citations.iter().map(|s| s as &dyn rusqlite::ToSql));
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?.unwrap_or(0.0)))
    })?;
    rows.collect()
}

/// Incoming citation count, weighted by `confidence_score` when the graph
/// store carries one; falls back to a legacy `target_decision_id` column on
/// `decision_citations` for older store layouts.
fn incoming_citation_counts(conn: &Connection, decision_ids: &[String]) -> rusqlite::Result<Vec<(String, f64)>> {
    let has_citation_targets = has_table(conn, "citation_targets");
    let has_legacy_target_column = has_column(conn, "decision_citations", "target_decision_id");
    let ids_clause = in_clause(decision_ids.len());
    let params: Vec<&dyn rusqlite::ToSql> = decision_ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    if has_citation_targets {
        let has_confidence = has_column(conn, "citation_targets", "confidence_score");
        let sql = if has_confidence {
            format!(
                "SELECT ct.target_decision_id AS decision_id, \
                 SUM(dc.mention_count * COALESCE(ct.confidence_score, 1.0)) AS n \
                 FROM citation_targets ct \
                 JOIN decision_citations dc ON dc.source_decision_id = ct.source_decision_id \
                 AND dc.target_ref = ct.target_ref \
                 WHERE ct.target_decision_id IN ({ids_clause}) GROUP BY ct.target_decision_id"
            )
        } else {
            format!(
                "SELECT ct.target_decision_id AS decision_id, SUM(dc.mention_count) AS n \
                 FROM citation_targets ct \
                 JOIN decision_citations dc ON dc.source_decision_id = ct.source_decision_id \
                 AND dc.target_ref = ct.target_ref \
                 WHERE ct.target_decision_id IN ({ids_clause}) GROUP BY ct.target_decision_id"
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?.unwrap_or(0.0)))
        })?;
        return rows.collect();
    }

    if has_legacy_target_column {
        let sql = format!(
            "SELECT target_decision_id AS decision_id, SUM(mention_count) AS n \
             FROM decision_citations WHERE target_decision_id IN ({ids_clause}) \
             GROUP BY target_decision_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?.unwrap_or(0.0)))
        })?;
        return rows.collect();
    }

    Ok(Vec::new())
}

/// A single citation edge, as returned by `find_citations`.
#[derive(Debug, Clone)]
pub struct CitationEdge {
    pub decision_id: String,
    pub target_ref: Option<String>,
    pub mention_count: i64,
    pub confidence_score: Option<f64>,
}

/// Outgoing citations from `decision_id` (what it cites), filtered by
/// `min_confidence` when the store carries confidence scores.
pub fn find_outgoing_citations(
    conn: &Connection,
    decision_id: &str,
    min_confidence: f64,
    limit: usize,
) -> rusqlite::Result<Vec<CitationEdge>> {
    let has_citation_targets = has_table(conn, "citation_targets");
    let sql = if has_citation_targets {
        "SELECT dc.target_ref, dc.mention_count, ct.confidence_score \
         FROM decision_citations dc \
         LEFT JOIN citation_targets ct ON ct.source_decision_id = dc.source_decision_id \
         AND ct.target_ref = dc.target_ref \
         WHERE dc.source_decision_id = ?1 AND COALESCE(ct.confidence_score, 1.0) >= ?2 \
         ORDER BY dc.mention_count DESC LIMIT ?3"
    } else {
        "SELECT target_ref, mention_count, NULL as confidence_score \
         FROM decision_citations WHERE source_decision_id = ?1 \
         ORDER BY mention_count DESC LIMIT ?3"
    };
    let mut stmt = conn.prepare(sql)?;
    let limit = limit as i64;
    let rows = stmt.query_map(rusqlite::params![decision_id, min_confidence, limit], |row| {
        Ok(CitationEdge {
            decision_id: decision_id.to_string(),
            target_ref: row.get::<_, Option<String>>(0)?,
            mention_count: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
            confidence_score: row.get::<_, Option<f64>>(2)?,
        })
    })?;
    rows.collect()
}

/// Incoming citations to `decision_id` (what cites it).
pub fn find_incoming_citations(
    conn: &Connection,
    decision_id: &str,
    min_confidence: f64,
    limit: usize,
) -> rusqlite::Result<Vec<CitationEdge>> {
    if !has_table(conn, "citation_targets") {
        return Ok(Vec::new());
    }
    let sql = "SELECT ct.source_decision_id, dc.mention_count, ct.confidence_score \
               FROM citation_targets ct \
               JOIN decision_citations dc ON dc.source_decision_id = ct.source_decision_id \
               AND dc.target_ref = ct.target_ref \
               WHERE ct.target_decision_id = ?1 AND COALESCE(ct.confidence_score, 1.0) >= ?2 \
               ORDER BY dc.mention_count DESC LIMIT ?3";
    let mut stmt = conn.prepare(sql)?;
    let limit = limit as i64;
    let rows = stmt.query_map(rusqlite::params![decision_id, min_confidence, limit], |row| {
        Ok(CitationEdge {
            decision_id: row.get::<_, String>(0)?,
            target_ref: None,
            mention_count: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
            confidence_score: row.get::<_, Option<f64>>(2)?,
        })
    })?;
    rows.collect()
}

/// One node of an appeal chain: the neighboring decision, which direction the
/// procedural link runs, and its depth from the starting decision (1-based).
#[derive(Debug, Clone)]
pub struct AppealLink {
    pub decision_id: String,
    pub relation: AppealRelation,
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppealRelation {
    /// A prior (lower-court) instance that the chain's root appealed.
    PriorInstance,
    /// A subsequent (higher-court) instance that appealed the chain's root.
    SubsequentInstance,
}

const APPEAL_CHAIN_DEPTH_CAP: u32 = 5;

/// Walk `decision_citations` rows flagged `is_prior_instance`, depth-first in
/// both directions from `decision_id`, with a per-direction visited set and a
/// depth cap of 5. Procedural links are distinct from doctrinal citations:
/// both live in `decision_citations`, disambiguated by the flag column.
pub fn find_appeal_chain(conn: &Connection, decision_id: &str) -> rusqlite::Result<Vec<AppealLink>> {
    if !has_column(conn, "decision_citations", "is_prior_instance") {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    walk_appeal_direction(conn, decision_id, AppealRelation::PriorInstance, &mut out)?;
    walk_appeal_direction(conn, decision_id, AppealRelation::SubsequentInstance, &mut out)?;
    Ok(out)
}

fn walk_appeal_direction(
    conn: &Connection,
    root: &str,
    relation: AppealRelation,
    out: &mut Vec<AppealLink>,
) -> rusqlite::Result<()> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    visited.insert(root.to_string());
    let mut frontier = vec![root.to_string()];
    let mut depth = 0u32;
    while depth < APPEAL_CHAIN_DEPTH_CAP && !frontier.is_empty() {
        depth += 1;
        let mut next_frontier = Vec::new();
        for decision_id in &frontier {
            for neighbor in appeal_neighbors(conn, decision_id, relation)? {
                if visited.insert(neighbor.clone()) {
                    out.push(AppealLink { decision_id: neighbor.clone(), relation, depth });
                    next_frontier.push(neighbor);
                }
            }
        }
        frontier = next_frontier;
    }
    Ok(())
}

fn appeal_neighbors(
    conn: &Connection,
    decision_id: &str,
    relation: AppealRelation,
) -> rusqlite::Result<Vec<String>> {
    let sql = match relation {
        // source_decision_id appealed target_decision_id (target is the prior instance).
        AppealRelation::PriorInstance => {
            "SELECT target_decision_id FROM decision_citations \
             WHERE source_decision_id = ?1 AND is_prior_instance = 1 AND target_decision_id IS NOT NULL"
        }
        AppealRelation::SubsequentInstance => {
            "SELECT source_decision_id FROM decision_citations \
             WHERE target_decision_id = ?1 AND is_prior_instance = 1"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([decision_id], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// A decision ranked by incoming-citation count, for `find_leading_cases`.
#[derive(Debug, Clone)]
pub struct LeadingCase {
    pub decision_id: String,
    pub citation_count: i64,
}

/// Most-cited decisions citing a given statute article, ranked by incoming
/// citation count, optionally restricted to a court and date range.
pub fn find_leading_cases_for_statute(
    conn: &Connection,
    law_code: &str,
    article: &str,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
    limit: usize,
) -> rusqlite::Result<Vec<LeadingCase>> {
    let mut sql = String::from(
        "SELECT ct.target_decision_id AS decision_id, COUNT(*) AS cite_count \
         FROM citation_targets ct \
         JOIN decisions d ON d.decision_id = ct.target_decision_id \
         WHERE ct.target_decision_id IN ( \
             SELECT ds.decision_id FROM decision_statutes ds \
             JOIN statutes s ON s.statute_id = ds.statute_id \
             WHERE s.law_code = ? AND s.article = ?)",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(law_code.to_string()), Box::new(article.to_string())];
    if let Some(court) = court {
        sql.push_str(" AND d.court = ?");
        params.push(Box::new(court.to_string()));
    }
    if let Some(date_from) = date_from {
        sql.push_str(" AND d.decision_date >= ?");
        params.push(Box::new(date_from.to_string()));
    }
    if let Some(date_to) = date_to {
        sql.push_str(" AND d.decision_date <= ?");
        params.push(Box::new(date_to.to_string()));
    }
    sql.push_str(" GROUP BY ct.target_decision_id ORDER BY cite_count DESC LIMIT ?");
    params.push(Box::new(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok(LeadingCase { decision_id: row.get(0)?, citation_count: row.get::<_, i64>(1)? })
    })?;
    rows.collect()
}

/// Globally most-cited decisions, optionally restricted to a court and date
/// range, with no topical filter.
pub fn find_leading_cases_global(
    conn: &Connection,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
    limit: usize,
) -> rusqlite::Result<Vec<LeadingCase>> {
    let mut sql = String::from("SELECT ct.target_decision_id AS decision_id, COUNT(*) AS cite_count FROM citation_targets ct");
    let needs_join = court.is_some() || date_from.is_some() || date_to.is_some();
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if needs_join {
        sql.push_str(" JOIN decisions d ON d.decision_id = ct.target_decision_id");
        if let Some(court) = court {
            conditions.push("d.court = ?");
            params.push(Box::new(court.to_string()));
        }
        if let Some(date_from) = date_from {
            conditions.push("d.decision_date >= ?");
            params.push(Box::new(date_from.to_string()));
        }
        if let Some(date_to) = date_to {
            conditions.push("d.decision_date <= ?");
            params.push(Box::new(date_to.to_string()));
        }
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" GROUP BY ct.target_decision_id ORDER BY cite_count DESC LIMIT ?");
    params.push(Box::new(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok(LeadingCase { decision_id: row.get(0)?, citation_count: row.get::<_, i64>(1)? })
    })?;
    rows.collect()
}

/// Restrict a candidate id set to those citation counts whose decision also
/// matches an FTS query, preserving the input's relative order.
pub fn filter_by_fts_match(
    fts_conn: &Connection,
    query: &str,
    candidate_ids: &[String],
) -> rusqlite::Result<BTreeSet<String>> {
    if candidate_ids.is_empty() {
        return Ok(BTreeSet::new());
    }
    let placeholders = in_clause(candidate_ids.len());
    let sql = format!(
        "SELECT decision_id FROM decisions_fts WHERE decisions_fts MATCH ?1 \
         AND decision_id IN ({placeholders})"
    );
    let mut stmt = fts_conn.prepare(&sql)?;
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&query];
    params.extend(candidate_ids.iter().map(|s| s as &dyn rusqlite::ToSql));
    let rows = stmt.query_map(params.as_slice(), |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// Year -> decision count, for `analyze_legal_trend`'s statute path.
pub fn trend_by_statute(
    conn: &Connection,
    law_code: &str,
    article: &str,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> rusqlite::Result<HashMap<i32, i64>> {
    let mut sql = String::from(
        "SELECT CAST(SUBSTR(d.decision_date, 1, 4) AS INTEGER) AS year, \
         COUNT(DISTINCT ds.decision_id) AS cnt \
         FROM decision_statutes ds \
         JOIN statutes s ON s.statute_id = ds.statute_id \
         JOIN decisions d ON d.decision_id = ds.decision_id \
         WHERE s.law_code = ? AND s.article = ? \
         AND d.decision_date IS NOT NULL \
         AND CAST(SUBSTR(d.decision_date, 1, 4) AS INTEGER) BETWEEN 1800 AND 2100",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(law_code.to_string()), Box::new(article.to_string())];
    if let Some(court) = court {
        sql.push_str(" AND d.court = ?");
        params.push(Box::new(court.to_string()));
    }
    if let Some(date_from) = date_from {
        sql.push_str(" AND d.decision_date >= ?");
        params.push(Box::new(date_from.to_string()));
    }
    if let Some(date_to) = date_to {
        sql.push_str(" AND d.decision_date <= ?");
        params.push(Box::new(date_to.to_string()));
    }
    sql.push_str(" GROUP BY year ORDER BY year");

    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?))
    })?;
    rows.collect()
}

/// Year -> decision count, for `analyze_legal_trend`'s free-text path.
pub fn trend_by_query(
    fts_conn: &Connection,
    query: &str,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> rusqlite::Result<HashMap<i32, i64>> {
    let mut sql = String::from(
        "SELECT CAST(SUBSTR(d.decision_date, 1, 4) AS INTEGER) AS year, COUNT(*) AS cnt \
         FROM decisions_fts f JOIN decisions d ON d.decision_id = f.decision_id \
         WHERE decisions_fts MATCH ? \
         AND d.decision_date IS NOT NULL \
         AND CAST(SUBSTR(d.decision_date, 1, 4) AS INTEGER) BETWEEN 1800 AND 2100",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(query.to_string())];
    if let Some(court) = court {
        sql.push_str(" AND d.court = ?");
        params.push(Box::new(court.to_string()));
    }
    if let Some(date_from) = date_from {
        sql.push_str(" AND d.decision_date >= ?");
        params.push(Box::new(date_from.to_string()));
    }
    if let Some(date_to) = date_to {
        sql.push_str(" AND d.decision_date <= ?");
        params.push(Box::new(date_to.to_string()));
    }
    sql.push_str(" GROUP BY year ORDER BY year");

    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?))
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_graph_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE decision_statutes (decision_id TEXT, statute_id TEXT, mention_count INTEGER);
             CREATE TABLE decision_citations (source_decision_id TEXT, target_ref TEXT, mention_count INTEGER);
             CREATE TABLE citation_targets (source_decision_id TEXT, target_ref TEXT, target_decision_id TEXT, confidence_score REAL);
             INSERT INTO decision_statutes VALUES ('d1', 'ART.8.BV', 3);
             INSERT INTO decision_citations VALUES ('d1', 'BGE 141 I 60', 1);
             INSERT INTO citation_targets VALUES ('d2', 'BGE 141 I 60', 'd1', 0.9);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn loads_statute_and_incoming_citation_signals() {
        let conn = setup_graph_db();
        let ids = vec!["d1".to_string()];
        let mut statutes = BTreeSet::new();
        statutes.insert("ART.8.BV".to_string());
        let map = load_graph_signal_map(Some(&conn), &ids, &statutes, &BTreeSet::new());
        let signal = map["d1"];
        assert_eq!(signal.statute_mentions, 3.0);
        assert!(signal.incoming_citations > 0.0);
    }

    #[test]
    fn missing_graph_conn_degrades_to_empty_map() {
        let map = load_graph_signal_map(None, &["d1".to_string()], &BTreeSet::new(), &BTreeSet::new());
        assert!(map.is_empty());
    }
}
