//! Candidate retrieval orchestration: ties the docket fast path, FTS
//! multi-strategy execution, vector KNN, and sparse retrieval into one fused
//! candidate pool, then folds in graph signals.

use std::collections::{BTreeSet, HashMap};

use rusqlite::Connection;

use lex_retrieve::docket::{self, DocketHit};
use lex_retrieve::fts::{self, CandidateRow};
use lex_retrieve::schema::Bm25Weights;
use lex_retrieve::{sparse, vector, RetrieveError};

use crate::analyzer;
use crate::config::Config;
use crate::graph::{self, GraphSignals};
use crate::planner;

/// Maximum `limit` for a query that exercises FTS and reranking.
pub const MAX_LIMIT: usize = 2000;
/// Maximum `limit` for a filter-only query (no FTS, no reranking).
pub const FILTER_MAX_LIMIT: usize = 10_000;

/// Filters accepted alongside a query; every field is optional.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub court: Option<String>,
    pub canton: Option<String>,
    pub language: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub chamber: Option<String>,
    pub decision_type: Option<String>,
}

impl Filters {
    /// Build the `AND ...` WHERE-clause fragment and its bound parameters, in
    /// the fixed field order above so callers can zip clause and params.
    fn where_clause(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(v) = &self.court {
            clauses.push("d.court = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &self.canton {
            clauses.push("d.canton = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &self.language {
            clauses.push("d.language = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &self.date_from {
            clauses.push("d.decision_date >= ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &self.date_to {
            clauses.push("d.decision_date <= ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &self.chamber {
            clauses.push("d.chamber = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &self.decision_type {
            clauses.push("d.decision_type = ?");
            params.push(Box::new(v.clone()));
        }
        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" AND {}", clauses.join(" AND ")), params)
        }
    }
}

/// An embedder adapter: the core never loads an ML runtime itself, so
/// dense/sparse encoding is injected through this trait.
pub trait Embedder {
    /// Encode `text` into the dense embedding byte layout the vector store expects.
    fn encode_dense(&self, text: &str) -> Vec<u8>;
    /// Tokenize `text` into sparse token ids, special tokens already stripped.
    fn encode_sparse_tokens(&self, text: &str) -> Vec<i64>;
}

/// One fused candidate, carrying everything the reranker needs.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub row: CandidateRow,
    pub rrf_score: f64,
    pub vector_distance: Option<f64>,
    pub sparse_score: Option<f64>,
    pub graph: GraphSignals,
}

/// Output of the candidate-assembly stage, before reranking.
pub struct CandidatePool {
    pub candidates: Vec<FusedCandidate>,
    pub docket_hits: Vec<DocketHit>,
    pub is_docket_query: bool,
}

/// Assemble the fused candidate pool for one query: docket fast path, FTS
/// multi-strategy retrieval, optional vector/sparse folding, and graph signal
/// enrichment. This is a pure retrieval step; linear scoring happens in
/// `rerank.rs`.
#[allow(clippy::too_many_arguments)]
pub fn build_candidate_pool(
    fts_conn: &Connection,
    vector_conn: Option<&Connection>,
    graph_conn: Option<&Connection>,
    config: &Config,
    embedder: Option<&dyn Embedder>,
    expander: Option<&dyn planner::QueryExpander>,
    raw_query: &str,
    filters: &Filters,
    offset: usize,
    limit: usize,
) -> Result<CandidatePool, RetrieveError> {
    let query = raw_query.trim();
    let (where_clause, where_boxed) = filters.where_clause();
    let where_params: Vec<&dyn rusqlite::ToSql> = where_boxed.iter().map(|p| p.as_ref()).collect();

    if query.is_empty() {
        let rows = fts::filter_only_scan(fts_conn, &where_clause, &where_params, FILTER_MAX_LIMIT)?;
        let candidates: Vec<FusedCandidate> = rows
            .into_iter()
            .map(|row| FusedCandidate {
                row,
                rrf_score: 0.0,
                vector_distance: None,
                sparse_score: None,
                graph: GraphSignals::default(),
            })
            .collect();
        return Ok(CandidatePool { candidates, docket_hits: Vec::new(), is_docket_query: false });
    }

    let is_docket_query = docket::looks_like_docket_query(query);

    let mut docket_hits = Vec::new();
    if is_docket_query {
        docket_hits = docket::search_by_docket(fts_conn, query, &where_clause, &where_params, (limit * 4).max(limit))?;
    }

    let has_explicit_syntax = analyzer::has_explicit_fts_syntax(query);
    let (strategies, target_pool) = planner::plan_strategies(query, offset, limit, is_docket_query, expander);
    let weights = Bm25Weights::default();
    let candidate_limit = target_pool.max(limit * 4);
    let page_size = offset + limit;
    let rows = fts::execute_strategies(
        fts_conn,
        &strategies,
        &where_clause,
        &where_params,
        &weights,
        candidate_limit,
        target_pool,
        page_size,
        has_explicit_syntax,
    )?;

    let mut order: Vec<String> = rows.iter().map(|r| r.decision_id.clone()).collect();
    let mut by_id: HashMap<String, FusedCandidate> = rows
        .into_iter()
        .map(|row| {
            let id = row.decision_id.clone();
            (
                id,
                FusedCandidate {
                    row,
                    rrf_score: 0.0,
                    vector_distance: None,
                    sparse_score: None,
                    graph: GraphSignals::default(),
                },
            )
        })
        .collect();
    for candidate in by_id.values_mut() {
        candidate.rrf_score = candidate.row.rrf_score;
    }

    // Vector/sparse folding only applies to free-text, non-docket, non-explicit
    // queries; the docket fast path and boolean FTS syntax don't
    // benefit from a dense/sparse recall pass.
    if !is_docket_query && !has_explicit_syntax {
        if let (Some(vconn), Some(embedder)) = (vector_conn, embedder) {
            let expanded_text = match expander {
                Some(exp) => {
                    let terms = exp.expand(query);
                    if terms.is_empty() {
                        query.to_string()
                    } else {
                        format!("{query} {}", terms.join(" "))
                    }
                }
                None => query.to_string(),
            };
            let embedding = embedder.encode_dense(&expanded_text);
            let language = filters.language.as_deref();
            if let Ok(mut decisions) = vector::search_decisions(vconn, &embedding, language, config.vector_k) {
                if let Ok(chunks) = vector::search_chunks(vconn, &embedding, language, config.vector_k * 3) {
                    vector::merge_min(&mut decisions, chunks);
                }
                fold_vector_hits(&mut order, &mut by_id, decisions, config.vector_weight);
            }

            let token_ids = embedder.encode_sparse_tokens(&expanded_text);
            if let Ok(scores) = sparse::search(vconn, &token_ids, config.sparse_k) {
                fold_sparse_hits(&mut order, &mut by_id, scores, config.sparse_rrf_weight);
            }
        }
    }

    let mut candidates: Vec<FusedCandidate> = order.into_iter().filter_map(|id| by_id.remove(&id)).collect();

    if config.graph_signals_enabled {
        let decision_ids: Vec<String> = candidates.iter().map(|c| c.row.decision_id.clone()).collect();
        let query_statutes = analyzer::extract_statute_refs(query);
        let query_citations = analyzer::extract_citation_refs(query);
        let signal_map = graph::load_graph_signal_map(graph_conn, &decision_ids, &query_statutes, &query_citations);
        for candidate in &mut candidates {
            if let Some(signal) = signal_map.get(&candidate.row.decision_id) {
                candidate.graph = *signal;
            }
        }
    }

    Ok(CandidatePool { candidates, docket_hits, is_docket_query })
}

/// Fold decision-level vector KNN distances into the candidate pool: existing
/// rows get a distance attached, vector-only hits join with a placeholder FTS
/// row (BM25=0, empty text).
fn fold_vector_hits(
    order: &mut Vec<String>,
    by_id: &mut HashMap<String, FusedCandidate>,
    decisions: vector::DecisionDistances,
    vector_weight: f64,
) {
    let mut ranked: Vec<(String, f64)> = decisions.into_iter().collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    for (rank, (decision_id, distance)) in ranked.into_iter().enumerate() {
        let rank = rank + 1;
        let contribution = lex_fusion::rrf_contribution(vector_weight, rank, lex_fusion::RrfConfig::default());
        match by_id.get_mut(&decision_id) {
            Some(candidate) => {
                candidate.vector_distance = Some(distance);
                candidate.rrf_score += contribution;
            }
            None => {
                order.push(decision_id.clone());
                by_id.insert(
                    decision_id.clone(),
                    FusedCandidate {
                        row: placeholder_row(decision_id),
                        rrf_score: contribution,
                        vector_distance: Some(distance),
                        sparse_score: None,
                        graph: GraphSignals::default(),
                    },
                );
            }
        }
    }
}

/// Fold sparse-retrieval scores into the candidate pool, same placeholder-row
/// contract as vector hits.
fn fold_sparse_hits(
    order: &mut Vec<String>,
    by_id: &mut HashMap<String, FusedCandidate>,
    scores: sparse::SparseScores,
    sparse_rrf_weight: f64,
) {
    let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (rank, (decision_id, score)) in ranked.into_iter().enumerate() {
        let rank = rank + 1;
        let contribution = lex_fusion::rrf_contribution(sparse_rrf_weight, rank, lex_fusion::RrfConfig::default());
        match by_id.get_mut(&decision_id) {
            Some(candidate) => {
                candidate.sparse_score = Some(score);
                candidate.rrf_score += contribution;
            }
            None => {
                order.push(decision_id.clone());
                by_id.insert(
                    decision_id.clone(),
                    FusedCandidate {
                        row: placeholder_row(decision_id),
                        rrf_score: contribution,
                        vector_distance: None,
                        sparse_score: Some(score),
                        graph: GraphSignals::default(),
                    },
                );
            }
        }
    }
}

fn placeholder_row(decision_id: String) -> CandidateRow {
    CandidateRow {
        decision_id,
        court: None,
        canton: None,
        chamber: None,
        docket_number: None,
        decision_date: None,
        language: None,
        title: None,
        regeste: None,
        full_text: None,
        snippet: None,
        source_url: None,
        pdf_url: None,
        best_bm25: 0.0,
        rrf_score: 0.0,
        strategy_hits: 0,
    }
}

/// The canonical merge/dedup key for a decision, used both to fold docket
/// fast-path hits into the fused results and for final presentation dedup:
/// `court|alphanum(docket)|yyyymmdd`. An empty docket number suppresses
/// canonical dedup (returns `None`) so unrelated undocketed rows never
/// collide.
pub fn canonical_key(court: Option<&str>, docket_number: Option<&str>, decision_date: Option<&str>) -> Option<String> {
    let docket = docket_number.unwrap_or("");
    if docket.trim().is_empty() {
        return None;
    }
    let court = court.unwrap_or("").to_lowercase();
    let normalized_docket = docket::normalize_docket(docket);
    let date = decision_date.unwrap_or("").replace('-', "");
    Some(format!("{court}|{normalized_docket}|{date}"))
}

/// Prepend docket fast-path hits ahead of the fused FTS/vector/sparse pool,
/// deduplicating by `decision_id` and canonical key. The docket hits
/// carry their own `relevance_score`; fused candidates keep whatever the
/// reranker later computes.
pub fn merge_docket_hits(docket_hits: Vec<DocketHit>, fused: Vec<FusedCandidate>) -> (Vec<DocketHit>, Vec<FusedCandidate>) {
    if docket_hits.is_empty() {
        return (docket_hits, fused);
    }
    let mut seen_ids: BTreeSet<String> = BTreeSet::new();
    let mut seen_keys: BTreeSet<String> = BTreeSet::new();
    let mut kept_hits = Vec::new();
    for hit in docket_hits {
        let key = canonical_key(hit.court.as_deref(), hit.docket_number.as_deref(), hit.decision_date.as_deref());
        if seen_ids.contains(&hit.decision_id) {
            continue;
        }
        if let Some(k) = &key {
            if seen_keys.contains(k) {
                continue;
            }
            seen_keys.insert(k.clone());
        }
        seen_ids.insert(hit.decision_id.clone());
        kept_hits.push(hit);
    }

    let remaining: Vec<FusedCandidate> = fused
        .into_iter()
        .filter(|c| {
            if seen_ids.contains(&c.row.decision_id) {
                return false;
            }
            match canonical_key(c.row.court.as_deref(), c.row.docket_number.as_deref(), c.row.decision_date.as_deref()) {
                Some(k) => !seen_keys.contains(&k),
                None => true,
            }
        })
        .collect();

    (kept_hits, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, court: &str, docket: &str, date: &str) -> CandidateRow {
        CandidateRow {
            decision_id: id.to_string(),
            court: Some(court.to_string()),
            canton: None,
            chamber: None,
            docket_number: Some(docket.to_string()),
            decision_date: Some(date.to_string()),
            language: None,
            title: None,
            regeste: None,
            full_text: None,
            snippet: None,
            source_url: None,
            pdf_url: None,
            best_bm25: 1.0,
            rrf_score: 0.1,
            strategy_hits: 1,
        }
    }

    #[test]
    fn canonical_key_is_none_for_empty_docket() {
        assert_eq!(canonical_key(Some("bger"), Some(""), Some("2020-01-01")), None);
        assert_eq!(canonical_key(Some("bger"), None, Some("2020-01-01")), None);
    }

    #[test]
    fn merge_dedups_fused_candidates_matching_docket_hits() {
        let hit = DocketHit {
            decision_id: "d1".into(),
            court: Some("bger".into()),
            canton: None,
            docket_number: Some("6B_1/2025".into()),
            decision_date: Some("2025-01-01".into()),
            relevance_score: 100.0,
        };
        let fused = vec![FusedCandidate {
            row: row("d2", "bger", "6B_1/2025", "2025-01-01"),
            rrf_score: 0.2,
            vector_distance: None,
            sparse_score: None,
            graph: GraphSignals::default(),
        }];
        let (hits, remaining) = merge_docket_hits(vec![hit], fused);
        assert_eq!(hits.len(), 1);
        assert!(remaining.is_empty());
    }

    fn setup_plain_decisions_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE decisions (
                decision_id TEXT, court TEXT, canton TEXT, chamber TEXT, docket_number TEXT,
                decision_date TEXT, language TEXT, title TEXT, regeste TEXT, full_text TEXT,
                source_url TEXT, pdf_url TEXT);
             INSERT INTO decisions VALUES ('d1', 'bger', 'CH', null, '6B_1/2025', '2025-03-01', 'de', 'T1', 'R1', 'full 1', null, null);
             INSERT INTO decisions VALUES ('d2', 'bger', 'CH', null, '6B_2/2025', '2025-05-01', 'de', 'T2', 'R2', 'full 2', null, null);
             INSERT INTO decisions VALUES ('d3', 'bvger', 'CH', null, 'D-1/2025', '2025-06-01', 'de', 'T3', 'R3', 'full 3', null, null);",
        )
        .unwrap();
        conn
    }

    fn test_config() -> Config {
        Config {
            index_dir: std::path::PathBuf::from("."),
            vector_db_path: std::path::PathBuf::from("vectors.db"),
            graph_db_path: std::path::PathBuf::from("reference_graph.db"),
            statutes_db_path: std::path::PathBuf::from("statutes.db"),
            llm_expansion_enabled: false,
            llm_expansion_timeout_ms: 2000,
            vector_weight: 1.0,
            vector_k: 50,
            vector_signal_weight: 3.0,
            sparse_k: 100,
            sparse_rrf_weight: 1.2,
            sparse_signal_weight: 2.5,
            cross_encoder_enabled: false,
            cross_encoder_weight: 1.4,
            graph_signals_enabled: false,
            auth_token: None,
            cors_origins: None,
        }
    }

    #[test]
    fn empty_query_returns_filtered_candidates_ordered_by_date_desc() {
        let conn = setup_plain_decisions_db();
        let filters = Filters { court: Some("bger".to_string()), ..Filters::default() };
        let pool = build_candidate_pool(&conn, None, None, &test_config(), None, None, "", &filters, 0, 5).unwrap();
        assert!(pool.docket_hits.is_empty());
        assert!(!pool.is_docket_query);
        let ids: Vec<&str> = pool.candidates.iter().map(|c| c.row.decision_id.as_str()).collect();
        assert_eq!(ids, vec!["d2", "d1"]);
    }

    #[test]
    fn merge_keeps_unrelated_fused_candidates() {
        let hit = DocketHit {
            decision_id: "d1".into(),
            court: Some("bger".into()),
            canton: None,
            docket_number: Some("6B_1/2025".into()),
            decision_date: Some("2025-01-01".into()),
            relevance_score: 100.0,
        };
        let fused = vec![FusedCandidate {
            row: row("d2", "bger", "6B_2/2025", "2025-01-02"),
            rrf_score: 0.2,
            vector_distance: None,
            sparse_score: None,
            graph: GraphSignals::default(),
        }];
        let (_, remaining) = merge_docket_hits(vec![hit], fused);
        assert_eq!(remaining.len(), 1);
    }
}
