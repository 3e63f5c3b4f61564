//! Dense vector KNN candidate retrieval.
//!
//! The caller supplies an already-encoded query embedding (see the `Embedder` trait
//! in `lex-search`); this module only issues the `MATCH`/`k =` KNN syntax against the
//! vector extension's virtual tables and aggregates chunk-level hits to decision
//! level by taking the minimum distance per decision.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::handles::has_table;
use crate::RetrieveError;

/// KNN hits keyed by decision id, cosine distance (lower is closer).
pub type DecisionDistances = HashMap<String, f64>;

/// Decision-level KNN search against `vec_decisions`.
pub fn search_decisions(
    conn: &Connection,
    query_embedding: &[u8],
    language: Option<&str>,
    k: usize,
) -> Result<DecisionDistances, RetrieveError> {
    let k = k as i64;
    let mut out = HashMap::new();
    let mut stmt = if language.is_some() {
        conn.prepare(
            "SELECT decision_id, distance FROM vec_decisions \
             WHERE embedding MATCH ?1 AND k = ?2 AND language = ?3 ORDER BY distance",
        )?
    } else {
        conn.prepare(
            "SELECT decision_id, distance FROM vec_decisions \
             WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
        )?
    };
    let rows = if let Some(lang) = language {
        stmt.query_map(rusqlite::params![query_embedding, k, lang], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
    } else {
        stmt.query_map(rusqlite::params![query_embedding, k], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
    };
    for row in rows {
        let (decision_id, distance) = row?;
        out.insert(decision_id, distance);
    }
    Ok(out)
}

/// Chunk-level KNN search against `vec_chunks`, aggregated to decision level by
/// taking the minimum distance across a decision's chunks. Returns an empty map
/// (not an error) when `vec_chunks` doesn't exist in this build of the store.
///
/// Chunk ids are expected in `"<decision_id>__chunk_<n>"` form.
pub fn search_chunks(
    conn: &Connection,
    query_embedding: &[u8],
    language: Option<&str>,
    k: usize,
) -> Result<DecisionDistances, RetrieveError> {
    if !has_table(conn, "vec_chunks") {
        return Ok(HashMap::new());
    }
    let k = k as i64;
    let mut out: DecisionDistances = HashMap::new();
    let mut stmt = if language.is_some() {
        conn.prepare(
            "SELECT chunk_id, distance FROM vec_chunks \
             WHERE embedding MATCH ?1 AND k = ?2 AND language = ?3 ORDER BY distance",
        )?
    } else {
        conn.prepare(
            "SELECT chunk_id, distance FROM vec_chunks \
             WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
        )?
    };
    let rows = if let Some(lang) = language {
        stmt.query_map(rusqlite::params![query_embedding, k, lang], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
    } else {
        stmt.query_map(rusqlite::params![query_embedding, k], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
    };
    for row in rows {
        let (chunk_id, distance) = row?;
        let decision_id = match chunk_id.rsplit_once("__chunk_") {
            Some((decision_id, _)) => decision_id.to_string(),
            None => chunk_id,
        };
        out.entry(decision_id)
            .and_modify(|best| {
                if distance < *best {
                    *best = distance;
                }
            })
            .or_insert(distance);
    }
    Ok(out)
}

/// Merge chunk-level distances into decision-level distances, keeping the minimum
/// per decision. Mirrors the merge the caller performs between the two KNN passes.
pub fn merge_min(decisions: &mut DecisionDistances, chunks: DecisionDistances) {
    for (decision_id, distance) in chunks {
        decisions
            .entry(decision_id)
            .and_modify(|best| {
                if distance < *best {
                    *best = distance;
                }
            })
            .or_insert(distance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_min_keeps_lowest_distance() {
        let mut decisions = DecisionDistances::new();
        decisions.insert("a".to_string(), 0.5);
        let mut chunks = DecisionDistances::new();
        chunks.insert("a".to_string(), 0.2);
        chunks.insert("b".to_string(), 0.9);
        merge_min(&mut decisions, chunks);
        assert_eq!(decisions["a"], 0.2);
        assert_eq!(decisions["b"], 0.9);
    }
}
