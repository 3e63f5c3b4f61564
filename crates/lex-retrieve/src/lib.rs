//! Candidate retrieval against the SQLite-backed legal decision stores.
//!
//! This crate owns every `rusqlite` connection in the search pipeline. It does not
//! reimplement BM25 or vector similarity math — those live inside SQLite itself
//! (FTS5's `bm25()` function, the vector extension's `MATCH`/`k =` KNN syntax). What
//! this crate provides is:
//!
//! - [`handles`]: opening the four backing stores, with retry-on-busy for the
//!   required full-text index and silent degradation for the optional graph,
//!   vector, and statutes stores.
//! - [`docket`]: the docket-number fast path, run ahead of general full-text search
//!   for queries that look like a docket reference.
//! - [`fts`]: multi-strategy execution of a weighted list of FTS5 sub-queries,
//!   folding hits into a per-decision candidate map with accumulated RRF scores.
//! - [`vector`]: decision- and chunk-level KNN search against the vector store.
//! - [`sparse`]: learned-sparse token-weight lookup against the vector store.
//! - [`schema`]: the fixed FTS column order and BM25 column weights.
//!
//! Candidate pools from these modules are merged and fused (see `lex-fusion`) and
//! reranked (see `lex-rerank`) by the `lex-search` facade; this crate never fuses
//! across retrieval methods itself.

pub mod docket;
pub mod error;
pub mod fts;
pub mod handles;
pub mod schema;
pub mod sparse;
pub mod vector;

pub use error::RetrieveError;

/// Re-exports commonly needed together by callers outside this crate.
pub mod prelude {
    pub use crate::docket::{
        build_docket_variants, detect_query_preferred_courts, looks_like_docket_query,
        parse_docket_family, search_by_docket, DocketFamily, DocketHit,
        DOCKET_MIN_CANDIDATE_POOL,
    };
    pub use crate::error::RetrieveError;
    pub use crate::fts::{execute_strategies, CandidateRow, Strategy, RRF_RANK_CONSTANT};
    pub use crate::handles::{has_column, has_table, open_fts, open_graph, open_statutes, open_vectors};
    pub use crate::schema::{parse_bm25_score, Bm25Weights, FTS_COLUMNS, UNPARSEABLE_SCORE_SENTINEL};
    pub use crate::sparse::SparseScores;
    pub use crate::vector::{merge_min, DecisionDistances};
}
