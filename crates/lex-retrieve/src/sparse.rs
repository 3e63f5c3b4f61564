//! Learned-sparse candidate retrieval.
//!
//! The caller supplies already-tokenized query token ids (special tokens like
//! CLS/SEP/PAD stripped upstream); this module sums the matching token weights per
//! decision directly in SQL rather than materializing sparse vectors in process.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::handles::has_table;
use crate::RetrieveError;

/// Sparse match scores keyed by decision id.
pub type SparseScores = HashMap<String, f64>;

/// Sum token weights per decision for the given token ids, descending by score,
/// capped at `k`. Returns an empty map (not an error) when `sparse_terms` doesn't
/// exist in this build of the store.
pub fn search(
    conn: &Connection,
    token_ids: &[i64],
    k: usize,
) -> Result<SparseScores, RetrieveError> {
    if token_ids.is_empty() || !has_table(conn, "sparse_terms") {
        return Ok(HashMap::new());
    }

    let placeholders = std::iter::repeat("?")
        .take(token_ids.len())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT decision_id, SUM(weight) as score FROM sparse_terms \
         WHERE token_id IN ({placeholders}) \
         GROUP BY decision_id ORDER BY score DESC LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut bound: Vec<&dyn rusqlite::ToSql> =
        token_ids.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
    let limit = k as i64;
    bound.push(&limit);

    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut out = HashMap::new();
    for row in rows {
        let (decision_id, score) = row?;
        out.insert(decision_id, score);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_ids_short_circuit() {
        let conn = Connection::open_in_memory().unwrap();
        let scores = search(&conn, &[], 10).unwrap();
        assert!(scores.is_empty());
    }
}
