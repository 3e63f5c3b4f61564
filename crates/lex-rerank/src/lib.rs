//! Linear multi-feature reranking, optional cross-encoder boost, and final
//! sort/pagination over a fused candidate set.
//!
//! This crate is pure scoring: it knows about feature weights and score arithmetic,
//! not SQL, text normalization, or query analysis — those live in `lex-search` and
//! `lex-retrieve`. Callers compute each [`features::Features`] field from the
//! normalized text and query structure they already hold, then call
//! [`features::linear_score`].

pub mod cross_encoder;
pub mod features;
pub mod signals;
pub mod sort;

pub mod prelude {
    pub use crate::cross_encoder::{apply_boost, build_document_text, CrossEncoder, FULL_TEXT_RERANK_CHARS};
    pub use crate::features::{linear_score, Features};
    pub use crate::signals::{authority_signal, citation_signal, sparse_signal, statute_signal, vector_signal};
    pub use crate::sort::{sort_and_paginate, Scored, SortOrder};
}
