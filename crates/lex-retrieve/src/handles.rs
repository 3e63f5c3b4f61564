//! Store handles: opening the four backing SQLite databases.
//!
//! The full-text index is required; the graph, vector, and statutes stores are all
//! optional — a missing file degrades the corresponding signal to empty rather than
//! failing the search, and each missing-store warning fires at most once per process.
//! The vector store additionally depends on a native similarity extension for its
//! KNN virtual tables; that extension's `dlopen` is attempted exactly once per
//! process, and vector retrieval stays disabled for the rest of the process if it
//! fails.

use std::path::Path;
use std::sync::{Once, OnceLock};

use rusqlite::{Connection, OpenFlags};

use crate::RetrieveError;

/// Retry budget for opening a store under contention (`SQLITE_BUSY`).
const OPEN_RETRIES: usize = 3;
const OPEN_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(200);

/// Loadable-library name for the native vector similarity extension (resolved by
/// the platform's dynamic loader, same convention the extension's own loader
/// helpers use: no path, no extension suffix).
const VECTOR_EXTENSION_ENTRY: &str = "vec0";

static FTS_WARN: Once = Once::new();
static GRAPH_WARN: Once = Once::new();
static VECTOR_WARN: Once = Once::new();
static STATUTES_WARN: Once = Once::new();

static VECTOR_EXTENSION_LOAD: Once = Once::new();
static VECTOR_EXTENSION_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Load the native vector similarity extension into `conn`. The `dlopen`
/// attempt itself happens at most once per process; every later call reuses
/// the outcome of that first attempt instead of retrying.
fn load_vector_extension(conn: &Connection) -> bool {
    VECTOR_EXTENSION_LOAD.call_once(|| {
        let outcome: rusqlite::Result<()> = (|| unsafe {
            conn.load_extension_enable()?;
            let result = conn.load_extension(VECTOR_EXTENSION_ENTRY, None::<&str>);
            conn.load_extension_disable()?;
            result
        })();
        match outcome {
            Ok(()) => {
                let _ = VECTOR_EXTENSION_AVAILABLE.set(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load vector similarity extension, vector retrieval disabled");
                let _ = VECTOR_EXTENSION_AVAILABLE.set(false);
            }
        }
    });
    VECTOR_EXTENSION_AVAILABLE.get().copied().unwrap_or(false)
}

/// Open the full-text index database. This store is required: callers should
/// surface its absence as `IndexUnavailable`, not degrade silently.
pub fn open_fts(path: &Path) -> Result<Connection, RetrieveError> {
    if !path.exists() {
        FTS_WARN.call_once(|| {
            tracing::warn!(path = %path.display(), "full-text index database not found");
        });
        return Err(RetrieveError::HandleUnavailable(format!(
            "full-text index not found at {}",
            path.display()
        )));
    }
    open_readonly(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to open full-text index");
        e.into()
    })
}

/// Open the citation graph database, or `None` if the file is absent or unopenable.
pub fn open_graph(path: &Path) -> Option<Connection> {
    if !path.exists() {
        GRAPH_WARN.call_once(|| {
            tracing::warn!(path = %path.display(), "citation graph database not found, citation signals disabled");
        });
        return None;
    }
    match open_readonly(path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to open citation graph database");
            None
        }
    }
}

/// Open the vector/sparse database, or `None` if the file is absent, unopenable,
/// or the native similarity extension its KNN queries depend on fails to load.
pub fn open_vectors(path: &Path) -> Option<Connection> {
    if !path.exists() {
        VECTOR_WARN.call_once(|| {
            tracing::warn!(path = %path.display(), "vector database not found, vector and sparse signals disabled");
        });
        return None;
    }
    match open_readonly(path) {
        Ok(conn) => {
            if load_vector_extension(&conn) {
                Some(conn)
            } else {
                None
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to open vector database");
            None
        }
    }
}

/// Open the statutes database, or `None` if the file is absent or unopenable.
pub fn open_statutes(path: &Path) -> Option<Connection> {
    if !path.exists() {
        STATUTES_WARN.call_once(|| {
            tracing::warn!(path = %path.display(), "statutes database not found, statute tools disabled");
        });
        return None;
    }
    match open_readonly(path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to open statutes database");
            None
        }
    }
}

fn open_readonly(path: &Path) -> rusqlite::Result<Connection> {
    let mut last_err = None;
    for attempt in 0..OPEN_RETRIES {
        match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
            Ok(conn) => {
                conn.execute_batch("PRAGMA query_only = ON;")?;
                return Ok(conn);
            }
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < OPEN_RETRIES {
                    std::thread::sleep(OPEN_RETRY_DELAY);
                }
            }
        }
    }
    Err(last_err.expect("loop always sets last_err before exiting"))
}

/// True if `table` exists in `conn`'s schema. Used to detect optional tables
/// (`vec_chunks`, `sparse_terms`, `citation_targets`, ...) before querying them.
pub fn has_table(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |_| Ok(()),
    )
    .is_ok()
}

/// True if `column` exists on `table`. Used for the legacy-schema fallback on the
/// citation graph store (older builds lack `confidence_score`/`citation_targets`).
pub fn has_column(conn: &Connection, table: &str, column: &str) -> bool {
    let sql = format!("PRAGMA table_info({table})");
    let Ok(mut stmt) = conn.prepare(&sql) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        let name: String = match row.get(1) {
            Ok(n) => n,
            Err(_) => continue,
        };
        if name == column {
            return true;
        }
    }
    false
}
