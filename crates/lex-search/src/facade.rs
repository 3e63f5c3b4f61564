//! Analytics facade: decision lookup, citation graph queries, leading
//! cases, trend histograms, and statute lookup/search.
//!
//! Every function here opens exactly the connections it needs and degrades
//! a missing optional store yields `SearchError::IndexUnavailable`
//! only for operations that strictly require it, never a panic.

use std::collections::{BTreeSet, HashMap};

use rusqlite::{Connection, OptionalExtension};

use crate::error::SearchError;
use crate::graph::{self, AppealLink, CitationEdge, LeadingCase};

/// A full decision row, as returned by `get_decision`.
#[derive(Debug, Clone, Default)]
pub struct DecisionRecord {
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
    pub source_url: Option<String>,
    pub pdf_url: Option<String>,
}

const FULL_TEXT_RESPONSE_CAP: usize = 50_000;

fn truncate_chars(text: String, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DecisionRecord> {
    Ok(DecisionRecord {
        decision_id: row.get("decision_id")?,
        court: row.get("court")?,
        canton: row.get("canton")?,
        chamber: row.get("chamber")?,
        docket_number: row.get("docket_number")?,
        decision_date: row.get("decision_date")?,
        language: row.get("language")?,
        title: row.get("title")?,
        regeste: row.get("regeste")?,
        full_text: row.get("full_text")?,
        source_url: row.get("source_url")?,
        pdf_url: row.get("pdf_url")?,
    })
}

/// Resolve `id` the same way `get_decision` does (exact id, then newest
/// matching docket, then newest docket `LIKE`), returning the stored row.
fn resolve_decision_row(conn: &Connection, id: &str) -> rusqlite::Result<Option<DecisionRecord>> {
    let exact = conn
        .query_row("SELECT * FROM decisions WHERE decision_id = ?1", [id], row_to_record)
        .optional()?;
    if exact.is_some() {
        return Ok(exact);
    }

    let by_docket = conn
        .query_row(
            "SELECT * FROM decisions WHERE docket_number = ?1 ORDER BY decision_date DESC LIMIT 1",
            [id],
            row_to_record,
        )
        .optional()?;
    if by_docket.is_some() {
        return Ok(by_docket);
    }

    conn.query_row(
        "SELECT * FROM decisions WHERE docket_number LIKE ?1 ORDER BY decision_date DESC LIMIT 1",
        [format!("%{id}%")],
        row_to_record,
    )
    .optional()
}

/// Fetch a decision by id, falling back to exact-docket then partial-docket
/// match (newest first). `full_text` controls whether the body is included
/// and capped at 50,000 characters; the stored data itself is never
/// truncated.
pub fn get_decision(conn: &Connection, id: &str, include_full_text: bool) -> Result<DecisionRecord, SearchError> {
    let mut record = resolve_decision_row(conn, id)
        .map_err(|e| SearchError::Internal(e.to_string()))?
        .ok_or_else(|| SearchError::NotFound(id.to_string()))?;
    if !include_full_text {
        record.full_text = None;
    } else if let Some(text) = record.full_text.take() {
        record.full_text = Some(truncate_chars(text, FULL_TEXT_RESPONSE_CAP));
    }
    Ok(record)
}

/// Resolve a user-supplied id to the stored `decision_id`, same chain as
/// `get_decision`. Returns the input unchanged if nothing matches.
pub fn resolve_decision_id(conn: &Connection, id: &str) -> String {
    resolve_decision_row(conn, id)
        .ok()
        .flatten()
        .map(|r| r.decision_id)
        .unwrap_or_else(|| id.to_string())
}

/// BGE decisions are stored under two id shapes by different ingestion
/// paths (`bge_138 III 374` vs `bge_BGE_138_III_374`); generate every
/// plausible variant so an `IN (...)` lookup against the graph store
/// matches either.
pub fn decision_id_variants(decision_id: &str) -> Vec<String> {
    let mut variants: BTreeSet<String> = BTreeSet::new();
    variants.insert(decision_id.to_string());

    if let Some((court, rest)) = decision_id.split_once('_') {
        variants.insert(format!("{court}_{}", rest.replace('_', " ")));
        variants.insert(format!("{court}_{}", rest.replace(' ', "_")));

        if court == "bge" {
            let stripped = strip_bge_prefix(rest);
            if stripped != rest {
                variants.insert(format!("bge_{stripped}"));
                variants.insert(format!("bge_{}", stripped.replace('_', " ")));
                variants.insert(format!("bge_{}", stripped.replace(' ', "_")));
            }
        }
    }

    variants.into_iter().collect()
}

fn strip_bge_prefix(rest: &str) -> &str {
    for prefix in ["CH_BGE_", "CH BGE ", "BGE_", "BGE ", "ATF_", "ATF ", "DTF_", "DTF "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            return stripped;
        }
    }
    rest
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationDirection {
    Outgoing,
    Incoming,
    Both,
}

/// Citations made by and/or received by a decision, with id-variant
/// resolution to cover dual BGE id forms.
pub fn find_citations(
    graph_conn: Option<&Connection>,
    decision_id: &str,
    direction: CitationDirection,
    min_confidence: f64,
    limit: usize,
) -> Result<(Vec<CitationEdge>, Vec<CitationEdge>), SearchError> {
    let conn = graph_conn
        .ok_or_else(|| SearchError::IndexUnavailable("reference graph not available".to_string()))?;
    let min_confidence = min_confidence.clamp(0.0, 1.0);
    let limit = limit.clamp(1, 200);

    let variants = decision_id_variants(decision_id);
    let mut outgoing = Vec::new();
    let mut incoming = Vec::new();

    if matches!(direction, CitationDirection::Both | CitationDirection::Outgoing) {
        for variant in &variants {
            outgoing.extend(
                graph::find_outgoing_citations(conn, variant, min_confidence, limit)
                    .map_err(|e| SearchError::Internal(e.to_string()))?,
            );
        }
        outgoing.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
        outgoing.truncate(limit);
    }

    if matches!(direction, CitationDirection::Both | CitationDirection::Incoming) {
        for variant in &variants {
            incoming.extend(
                graph::find_incoming_citations(conn, variant, min_confidence, limit)
                    .map_err(|e| SearchError::Internal(e.to_string()))?,
            );
        }
        incoming.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
        incoming.truncate(limit);
    }

    Ok((outgoing, incoming))
}

/// Recursive appeal chain for a decision, trying every id variant until one
/// yields edges.
pub fn find_appeal_chain(graph_conn: Option<&Connection>, decision_id: &str) -> Result<Vec<AppealLink>, SearchError> {
    let conn = graph_conn
        .ok_or_else(|| SearchError::IndexUnavailable("reference graph not available".to_string()))?;
    for variant in decision_id_variants(decision_id) {
        let links = graph::find_appeal_chain(conn, &variant).map_err(|e| SearchError::Internal(e.to_string()))?;
        if !links.is_empty() {
            return Ok(links);
        }
    }
    Ok(Vec::new())
}

/// One row of `find_leading_cases`' enriched output.
#[derive(Debug, Clone)]
pub struct LeadingCaseResult {
    pub decision_id: String,
    pub docket_number: String,
    pub decision_date: String,
    pub court: String,
    pub citation_count: i64,
    pub regeste: String,
    pub source_url: String,
}

#[allow(clippy::too_many_arguments)]
pub fn find_leading_cases(
    graph_conn: Option<&Connection>,
    fts_conn: &Connection,
    query: Option<&str>,
    law_code: Option<&str>,
    article: Option<&str>,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
    limit: usize,
) -> Result<Vec<LeadingCaseResult>, SearchError> {
    let limit = limit.clamp(1, 100);
    let conn = graph_conn
        .ok_or_else(|| SearchError::IndexUnavailable("reference graph not available".to_string()))?;

    let mut candidates: Vec<LeadingCase> = if let (Some(law_code), Some(article)) = (law_code, article) {
        graph::find_leading_cases_for_statute(conn, law_code, article, court, date_from, date_to, limit)
            .map_err(|e| SearchError::Internal(e.to_string()))?
    } else if let Some(query) = query {
        let fts_ids = fts_candidate_ids(fts_conn, query, court, date_from, date_to)
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        if fts_ids.is_empty() {
            return Ok(Vec::new());
        }
        citation_counts_for_ids(conn, &fts_ids, limit).map_err(|e| SearchError::Internal(e.to_string()))?
    } else {
        graph::find_leading_cases_global(conn, court, date_from, date_to, limit)
            .map_err(|e| SearchError::Internal(e.to_string()))?
    };

    // The statute path still gets an optional post-hoc FTS filter; the
    // query-only path already started from FTS so it's skipped there.
    if let (Some(query), Some(_law_code)) = (query, law_code) {
        let candidate_ids: Vec<String> = candidates.iter().map(|c| c.decision_id.clone()).collect();
        if let Ok(matched) = graph::filter_by_fts_match(fts_conn, query, &candidate_ids) {
            candidates.retain(|c| matched.contains(&c.decision_id));
        }
    }
    candidates.truncate(limit);
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = candidates.iter().map(|c| c.decision_id.clone()).collect();
    let rows_by_id = fetch_decision_summaries(fts_conn, &ids).map_err(|e| SearchError::Internal(e.to_string()))?;

    Ok(candidates
        .into_iter()
        .map(|c| {
            let row = rows_by_id.get(&c.decision_id);
            LeadingCaseResult {
                docket_number: row.and_then(|r| r.docket_number.clone()).unwrap_or_else(|| c.decision_id.clone()),
                decision_date: row.and_then(|r| r.decision_date.clone()).unwrap_or_default(),
                court: row.and_then(|r| r.court.clone()).unwrap_or_default(),
                regeste: row
                    .and_then(|r| r.regeste.clone())
                    .map(|r| truncate_chars(r, 300))
                    .unwrap_or_default(),
                source_url: row.and_then(|r| r.source_url.clone()).unwrap_or_default(),
                decision_id: c.decision_id,
                citation_count: c.citation_count,
            }
        })
        .collect())
}

fn fts_candidate_ids(
    fts_conn: &Connection,
    query: &str,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> rusqlite::Result<Vec<String>> {
    let mut sql = String::from(
        "SELECT d.decision_id FROM decisions_fts f JOIN decisions d ON d.decision_id = f.decision_id \
         WHERE decisions_fts MATCH ?1",
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
    sql.push_str(" LIMIT 5000");
    let mut stmt = fts_conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| row.get::<_, String>(0))?;
    rows.collect()
}

fn citation_counts_for_ids(conn: &Connection, ids: &[String], limit: usize) -> rusqlite::Result<Vec<LeadingCase>> {
    let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT target_decision_id AS decision_id, COUNT(*) AS cite_count FROM citation_targets \
         WHERE target_decision_id IN ({placeholders}) GROUP BY target_decision_id \
         ORDER BY cite_count DESC LIMIT ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let limit = limit as i64;
    params.push(&limit);
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok(LeadingCase { decision_id: row.get(0)?, citation_count: row.get(1)? })
    })?;
    rows.collect()
}

#[derive(Debug, Clone, Default)]
struct DecisionSummary {
    docket_number: Option<String>,
    decision_date: Option<String>,
    court: Option<String>,
    regeste: Option<String>,
    source_url: Option<String>,
}

fn fetch_decision_summaries(conn: &Connection, ids: &[String]) -> rusqlite::Result<HashMap<String, DecisionSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT decision_id, docket_number, decision_date, court, regeste, source_url \
         FROM decisions WHERE decision_id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            DecisionSummary {
                docket_number: row.get(1)?,
                decision_date: row.get(2)?,
                court: row.get(3)?,
                regeste: row.get(4)?,
                source_url: row.get(5)?,
            },
        ))
    })?;
    rows.collect()
}

/// Year -> decision count, combining the statute and free-text paths by
/// element-wise maximum when both are provided.
pub fn analyze_legal_trend(
    graph_conn: Option<&Connection>,
    fts_conn: &Connection,
    query: Option<&str>,
    law_code: Option<&str>,
    article: Option<&str>,
    court: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> Result<HashMap<i32, i64>, SearchError> {
    if query.is_none() && law_code.is_none() {
        return Err(SearchError::QueryRejected("at least one of query or law_code is required".to_string()));
    }

    let mut year_counts: HashMap<i32, i64> = HashMap::new();

    if let (Some(law_code), Some(article)) = (law_code, article) {
        let conn = graph_conn
            .ok_or_else(|| SearchError::IndexUnavailable("reference graph not available".to_string()))?;
        let statute_counts = graph::trend_by_statute(conn, law_code, article, court, date_from, date_to)
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        for (year, count) in statute_counts {
            year_counts.insert(year, count);
        }
    }

    if let Some(query) = query {
        let query_counts = graph::trend_by_query(fts_conn, query, court, date_from, date_to)
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        for (year, count) in query_counts {
            year_counts
                .entry(year)
                .and_modify(|existing| *existing = (*existing).max(count))
                .or_insert(count);
        }
    }

    Ok(year_counts)
}

/// A single statute article, with or without body text depending on the
/// caller (list mode omits `text` to stay compact).
#[derive(Debug, Clone)]
pub struct StatuteArticle {
    pub article_num: String,
    pub heading: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LawRecord {
    pub sr_number: String,
    pub title: String,
    pub abbreviation: String,
    pub consolidation_date: Option<String>,
    pub articles: Vec<StatuteArticle>,
    pub article_count: Option<usize>,
}

/// Look up a law and, optionally, one article from it. Abbreviation lookup
/// tries `abbr_de`/`abbr_fr`/`abbr_it` case-insensitively; article lookup
/// tries an exact match first, then a `LIKE 'N%'` prefix match to catch
/// suffixed forms like `41a` against a stored `41`-family article.
pub fn get_law(
    conn: &Connection,
    sr_number: Option<&str>,
    abbreviation: Option<&str>,
    article: Option<&str>,
    language: &str,
) -> Result<LawRecord, SearchError> {
    let sr_number = match sr_number {
        Some(sr) => sr.to_string(),
        None => {
            let abbreviation =
                abbreviation.ok_or_else(|| SearchError::QueryRejected("provide sr_number or abbreviation".to_string()))?;
            let abbr_upper = abbreviation.to_uppercase();
            conn.query_row(
                "SELECT sr_number FROM laws WHERE UPPER(abbr_de) = ?1 OR UPPER(abbr_fr) = ?1 OR UPPER(abbr_it) = ?1 LIMIT 1",
                [&abbr_upper],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| SearchError::Internal(e.to_string()))?
            .ok_or_else(|| SearchError::NotFound(format!("no law found with abbreviation '{abbreviation}'")))?
        }
    };

    let lang_column = |col: &str| format!("{col}_{language}");
    let title = conn
        .query_row(
            &format!("SELECT {}, title_de, {}, abbr_de, consolidation_date FROM laws WHERE sr_number = ?1", lang_column("title"), lang_column("abbr")),
            [&sr_number],
            |row| {
                let title: Option<String> = row.get(0)?;
                let title_de: Option<String> = row.get(1)?;
                let abbr: Option<String> = row.get(2)?;
                let abbr_de: Option<String> = row.get(3)?;
                let consolidation_date: Option<String> = row.get(4)?;
                Ok((title.or(title_de).unwrap_or_default(), abbr.or(abbr_de).unwrap_or_default(), consolidation_date))
            },
        )
        .optional()
        .map_err(|e| SearchError::Internal(e.to_string()))?
        .ok_or_else(|| SearchError::NotFound(format!("no law found with SR number '{sr_number}'")))?;

    let (title, abbreviation, consolidation_date) = title;

    let (articles, article_count) = if let Some(article) = article {
        let mut stmt = conn
            .prepare("SELECT article_num, heading, text FROM articles WHERE sr_number = ?1 AND article_num = ?2 AND lang = ?3")
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        let mut rows: Vec<StatuteArticle> = stmt
            .query_map(rusqlite::params![sr_number, article, language], |row| {
                Ok(StatuteArticle { article_num: row.get(0)?, heading: row.get(1)?, text: row.get(2)? })
            })
            .map_err(|e| SearchError::Internal(e.to_string()))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| SearchError::Internal(e.to_string()))?;

        if rows.is_empty() {
            let mut stmt = conn
                .prepare(
                    "SELECT article_num, heading, text FROM articles \
                     WHERE sr_number = ?1 AND lang = ?2 AND (article_num = ?3 OR article_num LIKE ?4)",
                )
                .map_err(|e| SearchError::Internal(e.to_string()))?;
            rows = stmt
                .query_map(rusqlite::params![sr_number, language, article, format!("{article}%")], |row| {
                    Ok(StatuteArticle { article_num: row.get(0)?, heading: row.get(1)?, text: row.get(2)? })
                })
                .map_err(|e| SearchError::Internal(e.to_string()))?
                .collect::<rusqlite::Result<_>>()
                .map_err(|e| SearchError::Internal(e.to_string()))?;
        }
        (rows, None)
    } else {
        let mut stmt = conn
            .prepare(
                "SELECT article_num, heading FROM articles WHERE sr_number = ?1 AND lang = ?2 \
                 ORDER BY CAST(article_num AS INTEGER), article_num",
            )
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        let rows: Vec<StatuteArticle> = stmt
            .query_map(rusqlite::params![sr_number, language], |row| {
                Ok(StatuteArticle { article_num: row.get(0)?, heading: row.get(1)?, text: None })
            })
            .map_err(|e| SearchError::Internal(e.to_string()))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        let count = rows.len();
        (rows, Some(count))
    };

    Ok(LawRecord { sr_number, title, abbreviation, consolidation_date, articles, article_count })
}

/// One statute-article FTS hit, as returned by `search_laws`.
#[derive(Debug, Clone)]
pub struct StatuteSearchHit {
    pub sr_number: String,
    pub abbreviation: String,
    pub article_num: String,
    pub heading: Option<String>,
    pub snippet: Option<String>,
}

/// Full-text search across statute articles, optionally scoped to one law.
pub fn search_laws(
    conn: &Connection,
    query: &str,
    sr_number: Option<&str>,
    language: &str,
    limit: usize,
) -> Result<Vec<StatuteSearchHit>, SearchError> {
    let limit = limit.clamp(1, 50);
    let abbr_column = format!("abbr_{language}");

    let sql = format!(
        "SELECT a.sr_number, a.article_num, a.heading, \
         snippet(articles_fts, 3, '>>>', '<<<', '...', 40) AS snippet, \
         l.{abbr_column} AS abbr_lang, l.abbr_de \
         FROM articles_fts f JOIN articles a ON a.id = f.rowid \
         LEFT JOIN laws l ON a.sr_number = l.sr_number \
         WHERE articles_fts MATCH ?1 AND a.lang = ?2{} ORDER BY f.rank LIMIT ?3",
        if sr_number.is_some() { " AND a.sr_number = ?4" } else { "" }
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| SearchError::Internal(e.to_string()))?;
    let limit_i64 = limit as i64;
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&query, &language, &limit_i64];
    if let Some(sr) = &sr_number {
        params.push(sr);
    }

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            let abbr_lang: Option<String> = row.get(4)?;
            let abbr_de: Option<String> = row.get(5)?;
            Ok(StatuteSearchHit {
                sr_number: row.get(0)?,
                article_num: row.get(1)?,
                heading: row.get(2)?,
                snippet: row.get(3)?,
                abbreviation: abbr_lang.or(abbr_de).unwrap_or_else(|| "?".to_string()),
            })
        })
        .map_err(|e| SearchError::Internal(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| SearchError::Internal(e.to_string()))?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_id_variants_cover_bge_prefix_forms() {
        let variants = decision_id_variants("bge_BGE_138_III_374");
        assert!(variants.contains(&"bge_138_III_374".to_string()) || variants.contains(&"bge_138 III 374".to_string()));
    }

    #[test]
    fn decision_id_variants_includes_input_unchanged() {
        let variants = decision_id_variants("bger_6B_1_2025");
        assert!(variants.contains(&"bger_6B_1_2025".to_string()));
    }

    fn setup_decisions_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE decisions (
                decision_id TEXT, court TEXT, canton TEXT, chamber TEXT, docket_number TEXT,
                decision_date TEXT, language TEXT, title TEXT, regeste TEXT, full_text TEXT,
                source_url TEXT, pdf_url TEXT);
             INSERT INTO decisions VALUES ('d1', 'bger', 'CH', null, '6B_1/2025', '2025-01-01', 'de', 'Title', 'Regeste', 'Full text here', 'http://x', 'http://y');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn get_decision_resolves_exact_id() {
        let conn = setup_decisions_db();
        let record = get_decision(&conn, "d1", true).unwrap();
        assert_eq!(record.decision_id, "d1");
        assert_eq!(record.full_text.as_deref(), Some("Full text here"));
    }

    #[test]
    fn get_decision_falls_back_to_docket_match() {
        let conn = setup_decisions_db();
        let record = get_decision(&conn, "6B_1/2025", false).unwrap();
        assert_eq!(record.decision_id, "d1");
        assert!(record.full_text.is_none());
    }

    #[test]
    fn get_decision_not_found_returns_error() {
        let conn = setup_decisions_db();
        assert!(matches!(get_decision(&conn, "nope", false), Err(SearchError::NotFound(_))));
    }

    #[test]
    fn trend_requires_query_or_law_code() {
        let conn = setup_decisions_db();
        let err = analyze_legal_trend(None, &conn, None, None, None, None, None, None).unwrap_err();
        assert!(matches!(err, SearchError::QueryRejected(_)));
    }
}
