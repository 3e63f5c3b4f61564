//! # lex-search
//!
//! Facade crate for the hybrid legal-decision search engine: query
//! understanding, candidate retrieval orchestration, reranking, and
//! result presentation, plus the analytics facade (citations, leading
//! cases, legal trends, statute lookup) built on top of `lex-retrieve`,
//! `lex-fusion`, and `lex-rerank`.
//!
//! [`engine::SearchCore`] is the single entry point: it owns every
//! backing connection for a process and exposes both the search tool
//! contract and the analytics facade.

pub mod analyzer;
pub mod candidates;
pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod graph;
pub mod planner;
pub mod presentation;
pub mod rerank;

pub mod prelude {
    pub use crate::candidates::{Embedder, Filters};
    pub use crate::config::Config;
    pub use crate::engine::{Fields, SearchCore, SearchRequest};
    pub use crate::error::SearchError;
    pub use crate::facade::{CitationDirection, DecisionRecord, LawRecord, LeadingCaseResult, StatuteSearchHit};
    pub use crate::planner::QueryExpander;
    pub use crate::presentation::SearchResult;
    pub use lex_rerank::prelude::{CrossEncoder, SortOrder};
}
