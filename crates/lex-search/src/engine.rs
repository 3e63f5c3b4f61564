//! `SearchCore`: the orchestrator that owns every backing connection for one
//! process and exposes the search tool contract plus the analytics facade as
//! a single type.

use lex_rerank::prelude::{CrossEncoder, SortOrder};
use rusqlite::Connection;

use crate::candidates::{self, Embedder, Filters, FILTER_MAX_LIMIT, MAX_LIMIT};
use crate::config::Config;
use crate::error::SearchError;
use crate::facade::{self, CitationDirection, DecisionRecord, LawRecord, LeadingCaseResult, StatuteSearchHit};
use crate::graph::{AppealLink, CitationEdge};
use crate::planner::QueryExpander;
use crate::presentation::{self, SearchResult};
use crate::rerank;

/// Result field projection requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fields {
    Full,
    /// Only `docket_number, decision_date, court, language, decision_id`.
    Compact,
}

fn to_compact(result: SearchResult) -> SearchResult {
    SearchResult {
        title: None,
        regeste: None,
        snippet: None,
        source_url: None,
        pdf_url: None,
        chamber: None,
        relevance_score: result.relevance_score,
        ..result
    }
}

/// Everything `SearchCore` needs for one request beyond the query string.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub filters: Filters,
    pub offset: usize,
    pub limit: usize,
    pub sort: SortOrder,
    pub fields: Fields,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: Filters::default(),
            offset: 0,
            limit: MAX_LIMIT,
            sort: SortOrder::Relevance,
            fields: Fields::Full,
        }
    }
}

impl Default for Fields {
    fn default() -> Self {
        Fields::Full
    }
}

/// Owns every backing connection and runs the full search pipeline:
/// candidate assembly, reranking, and presentation. The core holds no
/// long-lived writable state; callers are expected to construct a fresh
/// `SearchCore` per request or reuse one across a process's read-only
/// lifetime.
pub struct SearchCore {
    pub config: Config,
    fts_conn: Connection,
    vector_conn: Option<Connection>,
    graph_conn: Option<Connection>,
    statutes_conn: Option<Connection>,
    embedder: Option<Box<dyn Embedder>>,
    expander: Option<Box<dyn QueryExpander>>,
    cross_encoder: Option<Box<dyn CrossEncoder>>,
}

impl SearchCore {
    /// Open every backing store per `config`. The full-text index is
    /// required and surfaces as `IndexUnavailable` if missing; the graph,
    /// vector, and statutes stores degrade silently to `None`.
    pub fn open(config: Config) -> Result<Self, SearchError> {
        let fts_path = config.index_dir.join("decisions.db");
        let fts_conn = lex_retrieve::handles::open_fts(&fts_path)?;
        let vector_conn = lex_retrieve::handles::open_vectors(&config.vector_db_path);
        let graph_conn = lex_retrieve::handles::open_graph(&config.graph_db_path);
        let statutes_conn = lex_retrieve::handles::open_statutes(&config.statutes_db_path);

        Ok(Self {
            config,
            fts_conn,
            vector_conn,
            graph_conn,
            statutes_conn,
            embedder: None,
            expander: None,
            cross_encoder: None,
        })
    }

    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_expander(mut self, expander: Box<dyn QueryExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_cross_encoder(mut self, cross_encoder: Box<dyn CrossEncoder>) -> Self {
        self.cross_encoder = Some(cross_encoder);
        self
    }

    /// Run the full search pipeline and return a presentation-ready page
    /// plus the union total across docket hits and reranked candidates.
    pub fn search(&self, req: &SearchRequest) -> Result<(Vec<SearchResult>, usize), SearchError> {
        let max_limit = if req.query.trim().is_empty() { FILTER_MAX_LIMIT } else { MAX_LIMIT };
        let limit = req.limit.min(max_limit).max(1);

        let pool = candidates::build_candidate_pool(
            &self.fts_conn,
            self.vector_conn.as_ref(),
            self.graph_conn.as_ref(),
            &self.config,
            self.embedder.as_deref(),
            self.expander.as_deref(),
            &req.query,
            &req.filters,
            req.offset,
            limit,
        )?;

        let (docket_hits, remaining) = candidates::merge_docket_hits(pool.docket_hits, pool.candidates);

        let reranked = rerank::rerank(
            &req.query,
            remaining,
            &self.config,
            self.cross_encoder.as_deref(),
            req.sort,
            0,
            usize::MAX / 2,
        );

        let rank_terms = crate::analyzer::extract_rank_terms(&req.query);
        let rank_terms: Vec<String> = rank_terms.iter().map(|t| crate::analyzer::normalize_for_match(t)).collect();
        let phrase = presentation_phrase(&req.query);

        let mut combined: Vec<SearchResult> = Vec::with_capacity(docket_hits.len() + reranked.len());
        for hit in &docket_hits {
            combined.push(self.present_docket_hit(hit, &rank_terms, &phrase, &req.query));
        }
        for scored in &reranked {
            combined.push(presentation::present(scored, &rank_terms, &phrase, &req.query));
        }

        let combined = presentation::dedupe_results(combined);
        let total = combined.len();
        let page: Vec<SearchResult> = combined.into_iter().skip(req.offset).take(limit).collect();

        let page = match req.fields {
            Fields::Full => page,
            Fields::Compact => page.into_iter().map(to_compact).collect(),
        };

        Ok((page, total))
    }

    fn present_docket_hit(
        &self,
        hit: &lex_retrieve::docket::DocketHit,
        rank_terms: &[String],
        phrase: &str,
        raw_query: &str,
    ) -> SearchResult {
        match facade::get_decision(&self.fts_conn, &hit.decision_id, true) {
            Ok(record) => {
                let snippet = presentation::select_best_passage_snippet(
                    record.full_text.as_deref(),
                    rank_terms,
                    phrase,
                    raw_query,
                    None,
                );
                let regeste = record.regeste.map(|r| truncate_regeste(&r));
                SearchResult {
                    decision_id: record.decision_id,
                    court: record.court,
                    canton: record.canton,
                    chamber: record.chamber,
                    docket_number: record.docket_number,
                    decision_date: record.decision_date,
                    language: record.language,
                    title: record.title,
                    regeste,
                    snippet,
                    source_url: record.source_url,
                    pdf_url: record.pdf_url,
                    relevance_score: (hit.relevance_score * 10_000.0).round() / 10_000.0,
                }
            }
            Err(_) => SearchResult {
                decision_id: hit.decision_id.clone(),
                court: hit.court.clone(),
                canton: hit.canton.clone(),
                chamber: None,
                docket_number: hit.docket_number.clone(),
                decision_date: hit.decision_date.clone(),
                language: None,
                title: None,
                regeste: None,
                snippet: None,
                source_url: None,
                pdf_url: None,
                relevance_score: (hit.relevance_score * 10_000.0).round() / 10_000.0,
            },
        }
    }

    // -- Analytics facade passthroughs ---------------------------------------

    pub fn get_decision(&self, decision_id: &str, include_full_text: bool) -> Result<DecisionRecord, SearchError> {
        facade::get_decision(&self.fts_conn, decision_id, include_full_text)
    }

    pub fn find_citations(
        &self,
        decision_id: &str,
        direction: CitationDirection,
        min_confidence: f64,
        limit: usize,
    ) -> Result<(Vec<CitationEdge>, Vec<CitationEdge>), SearchError> {
        let resolved = facade::resolve_decision_id(&self.fts_conn, decision_id);
        facade::find_citations(self.graph_conn.as_ref(), &resolved, direction, min_confidence, limit)
    }

    pub fn find_appeal_chain(&self, decision_id: &str) -> Result<Vec<AppealLink>, SearchError> {
        let resolved = facade::resolve_decision_id(&self.fts_conn, decision_id);
        facade::find_appeal_chain(self.graph_conn.as_ref(), &resolved)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn find_leading_cases(
        &self,
        query: Option<&str>,
        law_code: Option<&str>,
        article: Option<&str>,
        court: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeadingCaseResult>, SearchError> {
        facade::find_leading_cases(
            self.graph_conn.as_ref(),
            &self.fts_conn,
            query,
            law_code,
            article,
            court,
            date_from,
            date_to,
            limit,
        )
    }

    pub fn analyze_legal_trend(
        &self,
        query: Option<&str>,
        law_code: Option<&str>,
        article: Option<&str>,
        court: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> Result<std::collections::HashMap<i32, i64>, SearchError> {
        facade::analyze_legal_trend(self.graph_conn.as_ref(), &self.fts_conn, query, law_code, article, court, date_from, date_to)
    }

    pub fn get_law(
        &self,
        sr_number: Option<&str>,
        abbreviation: Option<&str>,
        article: Option<&str>,
        language: &str,
    ) -> Result<LawRecord, SearchError> {
        let conn = self
            .statutes_conn
            .as_ref()
            .ok_or_else(|| SearchError::IndexUnavailable("statutes database not available".to_string()))?;
        facade::get_law(conn, sr_number, abbreviation, article, language)
    }

    pub fn search_laws(
        &self,
        query: &str,
        sr_number: Option<&str>,
        language: &str,
        limit: usize,
    ) -> Result<Vec<StatuteSearchHit>, SearchError> {
        let conn = self
            .statutes_conn
            .as_ref()
            .ok_or_else(|| SearchError::IndexUnavailable("statutes database not available".to_string()))?;
        facade::search_laws(conn, query, sr_number, language, limit)
    }
}

fn truncate_regeste(text: &str) -> String {
    match text.char_indices().nth(presentation::MAX_REGESTE_LEN) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn presentation_phrase(raw_query: &str) -> String {
    let tokens = crate::analyzer::tokenize(raw_query);
    tokens
        .iter()
        .map(|t| crate::analyzer::normalize_for_match(t))
        .collect::<Vec<_>>()
        .join(" ")
}
