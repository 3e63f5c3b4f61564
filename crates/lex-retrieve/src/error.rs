//! Error types for candidate retrieval.

use std::fmt;

/// Errors that can occur while opening a store handle or running a retrieval query.
#[derive(Debug)]
pub enum RetrieveError {
    /// Query string was empty where a non-empty query is required.
    EmptyQuery,
    /// A required backing store could not be opened (missing file, or unreadable
    /// after the read-only open retry budget was exhausted).
    HandleUnavailable(String),
    /// A parameter value was out of range or otherwise invalid.
    InvalidParameter(String),
    /// The backing SQLite engine returned an error.
    Sqlite(rusqlite::Error),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::EmptyQuery => write!(f, "query is empty"),
            RetrieveError::HandleUnavailable(msg) => write!(f, "store unavailable: {msg}"),
            RetrieveError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            RetrieveError::Sqlite(e) => write!(f, "sqlite error: {e}"),
        }
    }
}

impl std::error::Error for RetrieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetrieveError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RetrieveError {
    fn from(e: rusqlite::Error) -> Self {
        RetrieveError::Sqlite(e)
    }
}
