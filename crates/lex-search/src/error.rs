//! The four error kinds surfaced at the search core's boundary.
//!
//! `IndexDegraded` is deliberately not a variant here: a missing optional store
//! zeroes the corresponding signal and the search continues, it never becomes an
//! error. What's here is exactly what a tool call can fail with.

use std::fmt;

#[derive(Debug)]
pub enum SearchError {
    /// Decision id, docket, law, or article absent.
    NotFound(String),
    /// A backing store required for this operation is missing or unreadable.
    IndexUnavailable(String),
    /// A docket/citation lookup was given empty input.
    QueryRejected(String),
    /// Unexpected backing-store error after retries.
    Internal(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::NotFound(msg) => write!(f, "not found: {msg}"),
            SearchError::IndexUnavailable(msg) => write!(f, "index unavailable: {msg}"),
            SearchError::QueryRejected(msg) => write!(f, "query rejected: {msg}"),
            SearchError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<lex_retrieve::RetrieveError> for SearchError {
    fn from(e: lex_retrieve::RetrieveError) -> Self {
        match e {
            lex_retrieve::RetrieveError::EmptyQuery => {
                SearchError::QueryRejected("query is empty".to_string())
            }
            lex_retrieve::RetrieveError::HandleUnavailable(msg) => SearchError::IndexUnavailable(msg),
            lex_retrieve::RetrieveError::InvalidParameter(msg) => {
                SearchError::QueryRejected(msg)
            }
            lex_retrieve::RetrieveError::Sqlite(e) => SearchError::Internal(e.to_string()),
        }
    }
}

impl From<crate::config::ConfigError> for SearchError {
    fn from(e: crate::config::ConfigError) -> Self {
        SearchError::Internal(e.to_string())
    }
}

/// Render a tool-boundary error as the single-key `{error: <message>}` payload
/// every tool returns in place of a result on failure.
pub fn as_error_payload(err: &SearchError) -> serde_json::Value {
    serde_json::json!({ "error": err.to_string() })
}
