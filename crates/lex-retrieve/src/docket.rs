//! Docket-number fast path.
//!
//! Docket-like queries (`6B_1234/2025`, `6B 1234 2025`, `BGE 140 III 115`, ...) bypass
//! the general FTS/RRF strategies entirely: an exact-match lookup across separator
//! variants, topped up with neighboring dockets from the same filing family when the
//! exact match alone doesn't fill the candidate pool.

use std::collections::BTreeSet;

use regex::Regex;
use rusqlite::Connection;

use crate::RetrieveError;

/// Minimum candidate pool size the docket fast path tries to fill before giving up
/// on family expansion.
pub const DOCKET_MIN_CANDIDATE_POOL: usize = 80;

/// Window of serial numbers (on either side) searched when expanding to the filing
/// family of a parsed docket reference.
const SERIAL_WINDOW: i64 = 40;

/// A row returned from the docket fast path, already carrying its relevance score.
#[derive(Debug, Clone)]
pub struct DocketHit {
    pub decision_id: String,
    pub court: Option<String>,
    pub canton: Option<String>,
    pub docket_number: Option<String>,
    pub decision_date: Option<String>,
    pub relevance_score: f64,
}

/// Strip whitespace and lowercase to alphanumerics only, for loose docket comparison.
pub fn normalize_docket(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// True if `query` looks like a docket-number search rather than free text.
///
/// Mirrors the original heuristic: a full match against a docket pattern always
/// qualifies; otherwise a docket-like fragment has to dominate the query (>=70% of
/// its non-space characters) for the fast path to kick in.
pub fn looks_like_docket_query(query: &str) -> bool {
    let q = query.trim();
    if q.is_empty() {
        return false;
    }
    let nonspace: String = q.chars().filter(|c| !c.is_whitespace()).collect();
    if nonspace.is_empty() {
        return false;
    }

    let patterns = docket_patterns();
    if patterns.iter().any(|re| is_match_full(re, q)) {
        return true;
    }
    for re in &patterns {
        for frag in find_all(re, q) {
            let frag_nonspace: String = frag.chars().filter(|c| !c.is_whitespace()).collect();
            if !frag_nonspace.is_empty()
                && frag_nonspace.len() as f64 / nonspace.len() as f64 >= 0.7
            {
                return true;
            }
        }
    }
    if is_spaced_numeric_triplet(q) {
        return true;
    }
    collapse_spaced_docket(q).is_some()
}

/// Build every separator permutation of a compact docket string that's worth an
/// exact-match lookup (`.`/`_`/`-` before the serial, `/`/`_` before the year).
pub fn build_docket_variants(raw_query: &str) -> BTreeSet<String> {
    let q: String = raw_query.chars().filter(|c| !c.is_whitespace()).collect();
    if q.is_empty() {
        return BTreeSet::new();
    }
    let mut variants: BTreeSet<String> = BTreeSet::new();
    variants.insert(q.clone());
    variants.insert(q.to_uppercase());
    for (from, to) in [
        ('_', '/'),
        ('-', '/'),
        ('.', '/'),
        ('/', '_'),
        ('-', '_'),
        ('.', '_'),
        ('/', '-'),
        ('_', '-'),
        ('.', '-'),
    ] {
        variants.insert(q.replace(from, &to.to_string()));
    }

    let mut clean = BTreeSet::new();
    for v in variants {
        let collapsed = collapse_repeated_separators(&v);
        let trimmed = collapsed.trim_matches(|c| "/_.-".contains(c));
        if !trimmed.is_empty() {
            clean.insert(trimmed.to_string());
        }
    }
    clean
}

/// Collapse runs of `/_.-` down to their first character, e.g. `6B--1234` -> `6B-1234`.
fn collapse_repeated_separators(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if "/_.-".contains(c) {
            while matches!(chars.peek(), Some(next) if "/_.-".contains(*next)) {
                chars.next();
            }
        }
    }
    out
}

/// Try collapsing space-separated tokens ("6B 1234 2025") into a docket-like string.
/// Returns the first permutation that fully matches a docket pattern.
pub fn collapse_spaced_docket(query: &str) -> Option<String> {
    let parts: Vec<&str> = query.split_whitespace().collect();
    if !(2..=4).contains(&parts.len()) {
        return None;
    }
    if !parts
        .iter()
        .all(|p| p.len() <= 6 && p.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        return None;
    }
    if !parts[0].chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut candidates = Vec::new();
    for sep1 in ['_', '.', '-'] {
        for sep2 in ['/', '_', '.'] {
            let v = match parts.len() {
                2 => format!("{}{}{}", parts[0], sep1, parts[1]),
                3 => format!("{}{}{}{}{}", parts[0], sep1, parts[1], sep2, parts[2]),
                4 => format!(
                    "{}{}{}{}{}{}{}",
                    parts[0], sep1, parts[1], sep2, parts[2], sep1, parts[3]
                ),
                _ => unreachable!(),
            };
            candidates.push(v);
        }
    }

    if let Some(last) = parts.last() {
        if last.len() == 2 && last.chars().all(|c| c.is_ascii_digit()) {
            let mut expanded: Vec<String> = parts[..parts.len() - 1]
                .iter()
                .map(|s| s.to_string())
                .collect();
            expanded.push(format!("20{last}"));
            for sep1 in ['_', '.', '-'] {
                for sep2 in ['/', '_', '.'] {
                    let v = match expanded.len() {
                        3 => format!("{}{}{}{}{}", expanded[0], sep1, expanded[1], sep2, expanded[2]),
                        4 => format!(
                            "{}{}{}{}{}{}{}",
                            expanded[0], sep1, expanded[1], sep2, expanded[2], sep1, expanded[3]
                        ),
                        _ => continue,
                    };
                    candidates.push(v);
                }
            }
        }
    }

    let patterns = docket_patterns();
    candidates
        .into_iter()
        .find(|c| patterns.iter().any(|re| is_match_full(re, c)))
}

fn is_spaced_numeric_triplet(q: &str) -> bool {
    let parts: Vec<&str> = q.split_whitespace().collect();
    if parts.len() != 3 {
        return false;
    }
    let digits = |s: &str, max: usize| !s.is_empty() && s.len() <= max && s.chars().all(|c| c.is_ascii_digit());
    let letters = |s: &str| !s.is_empty() && s.len() <= 4 && s.chars().all(|c| c.is_ascii_alphabetic());
    digits(parts[0], 4) && letters(parts[1]) && digits(parts[2], 4)
}

/// A parsed docket reference: alphanumeric prefix, serial number, four-digit year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocketFamily {
    pub prefix: String,
    pub serial: i64,
    pub year: String,
}

/// Parse a compact docket string as `<prefix>[._-]<serial>[/_]<year>`, full match only.
pub fn parse_docket_family(raw_query: &str) -> Option<DocketFamily> {
    let text: String = raw_query
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let bytes = text.as_bytes();

    // prefix: 1-4 of [A-Z0-9], then one of [._-], then 1-6 digits, then one of [/_], then 4 digits.
    let mut i = 0;
    let start_prefix = i;
    while i < bytes.len() && i - start_prefix < 4 && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i == start_prefix || i >= bytes.len() {
        return None;
    }
    let prefix = text[start_prefix..i].to_string();
    if !matches!(bytes[i], b'.' | b'_' | b'-') {
        return None;
    }
    i += 1;
    let start_serial = i;
    while i < bytes.len() && i - start_serial < 6 && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == start_serial || i >= bytes.len() {
        return None;
    }
    let serial: i64 = text[start_serial..i].parse().ok()?;
    if !matches!(bytes[i], b'/' | b'_') {
        return None;
    }
    i += 1;
    let start_year = i;
    while i < bytes.len() && i - start_year < 4 && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i - start_year != 4 || i != bytes.len() {
        return None;
    }
    let year = text[start_year..i].to_string();
    Some(DocketFamily { prefix, serial, year })
}

/// Extract the serial number from a stored docket string, given a known prefix/year,
/// matching at the end of the string (case-insensitive).
pub fn extract_docket_serial(docket: &str, prefix: &str, year: &str) -> Option<i64> {
    let upper = docket.to_uppercase();
    let prefix_up = prefix.to_uppercase();
    for sep1 in ['.', '_', '-'] {
        for sep2 in ['/', '_'] {
            let needle = format!("{prefix_up}{sep1}");
            if let Some(pos) = upper.rfind(&needle) {
                let rest = &upper[pos + needle.len()..];
                if let Some(sep2_pos) = rest.find(sep2) {
                    let serial_str = &rest[..sep2_pos];
                    let year_str = &rest[sep2_pos + 1..];
                    if year_str == year && !serial_str.is_empty() && serial_str.chars().all(|c| c.is_ascii_digit()) {
                        if let Ok(n) = serial_str.parse() {
                            return Some(n);
                        }
                    }
                }
            }
        }
    }
    None
}

/// Build every docket string within `SERIAL_WINDOW` of `family.serial`, across the
/// same separator permutations as [`build_docket_variants`].
pub fn build_docket_family_candidates(family: &DocketFamily) -> Vec<String> {
    if family.serial <= 0 || family.prefix.is_empty() || family.year.is_empty() {
        return Vec::new();
    }
    let lo = (family.serial - SERIAL_WINDOW).max(1);
    let hi = family.serial + SERIAL_WINDOW;
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for n in lo..=hi {
        for sep1 in ['.', '_', '-'] {
            for sep2 in ['/', '_'] {
                let candidate = format!("{}{}{}{}{}", family.prefix, sep1, n, sep2, family.year);
                if seen.insert(candidate.clone()) {
                    out.push(candidate);
                }
            }
        }
    }
    out
}

/// Courts whose names/abbreviations a query can hint at, each mapped to further
/// court codes implied by that hint (e.g. a BGer hint also favors "bge").
fn court_query_hints() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("bger", &["bger", "bundesgericht", "tribunal federal", "tribunale federale"]),
        (
            "bvger",
            &[
                "bvger",
                "bundesverwaltungsgericht",
                "tribunal administratif federal",
                "tribunale amministrativo federale",
            ],
        ),
        ("bstger", &["bstger", "bundesstrafgericht", "tribunal penal federal"]),
    ]
}

fn court_query_expansions(court: &str) -> &'static [&'static str] {
    match court {
        "bger" => &["bge"],
        _ => &[],
    }
}

/// Detect which court codes a free-text query implies, for result re-ranking bias.
pub fn detect_query_preferred_courts(query: &str) -> BTreeSet<String> {
    let text = query.to_lowercase();
    let mut preferred = BTreeSet::new();
    if text.trim().is_empty() {
        return preferred;
    }
    for (court, hints) in court_query_hints() {
        if hints.iter().any(|hint| text.contains(hint)) {
            preferred.insert((*court).to_string());
            for expanded in court_query_expansions(court) {
                preferred.insert((*expanded).to_string());
            }
        }
    }
    preferred
}

/// The two docket grammars this module scans for: `[A-Z0-9]{1,4}[._-]\d{1,6}[/_]\d{4}`
/// (`6B_1234/2025`) and `[A-Z]{1,6}\.\d{4}\.\d{1,6}` (`BGE.2025.1234`-style), both
/// case-insensitive. Shared with `lex_search::analyzer`'s statute/citation reference
/// extraction so the two crates scan for exactly one docket grammar, not two.
pub fn docket_patterns() -> [Regex; 2] {
    [
        Regex::new(r"(?i)\b[A-Z0-9]{1,4}[._-]\d{1,6}[/_]\d{4}\b").expect("static docket pattern is valid"),
        Regex::new(r"(?i)\b[A-Z]{1,6}\.\d{4}\.\d{1,6}\b").expect("static docket pattern is valid"),
    ]
}

fn is_match_full(re: &Regex, s: &str) -> bool {
    re.find(s).map(|m| m.start() == 0 && m.end() == s.len()).unwrap_or(false)
}

fn find_all(re: &Regex, s: &str) -> Vec<String> {
    re.find_iter(s).map(|m| m.as_str().to_string()).collect()
}

/// Run the docket fast path: exact variant lookup, ranked ahead of family-neighbor
/// expansion, against an already-open full-text connection.
///
/// `where_clause`/`where_params` thread through caller-supplied filters (court,
/// canton, date range, ...) exactly as the general FTS path does.
pub fn search_by_docket(
    conn: &Connection,
    raw_query: &str,
    where_clause: &str,
    where_params: &[&dyn rusqlite::ToSql],
    limit: usize,
) -> Result<Vec<DocketHit>, RetrieveError> {
    // A space-separated docket ("6B 1234 2025") carries no separator for
    // `build_docket_variants`/`parse_docket_family` to permute; collapse it to a
    // canonical separated form first so it resolves the same as its typed variants.
    let effective_query = collapse_spaced_docket(raw_query).unwrap_or_else(|| raw_query.to_string());

    let variants = build_docket_variants(&effective_query);
    if variants.is_empty() {
        return Ok(Vec::new());
    }
    let preferred_courts = detect_query_preferred_courts(raw_query);

    let exact_variants: Vec<&String> = variants.iter().collect();
    let placeholders = std::iter::repeat("?")
        .take(exact_variants.len())
        .collect::<Vec<_>>()
        .join(",");
    let rank_expr = format!("CASE WHEN d.docket_number IN ({placeholders}) THEN 0 ELSE 1 END");

    let sql = format!(
        "SELECT d.decision_id, d.court, d.canton, d.docket_number, d.decision_date, \
         ({rank_expr}) AS docket_rank \
         FROM decisions d \
         WHERE d.docket_number IN ({placeholders}){where_clause} \
         ORDER BY docket_rank ASC, d.decision_date DESC \
         LIMIT ?"
    );

    let sql_limit = (limit * 4).max(limit) as i64;
    let mut stmt = conn.prepare(&sql)?;
    let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::new();
    for v in &exact_variants {
        bound.push(*v as &dyn rusqlite::ToSql);
    }
    for v in &exact_variants {
        bound.push(*v as &dyn rusqlite::ToSql);
    }
    bound.extend_from_slice(where_params);
    bound.push(&sql_limit);

    let rows = stmt.query_map(bound.as_slice(), |row| {
        let docket_rank: i64 = row.get("docket_rank")?;
        Ok(DocketHit {
            decision_id: row.get("decision_id")?,
            court: row.get("court")?,
            canton: row.get("canton")?,
            docket_number: row.get("docket_number")?,
            decision_date: row.get("decision_date")?,
            relevance_score: 100.0 - docket_rank as f64,
        })
    })?;

    let mut results: Vec<DocketHit> = rows.collect::<Result<_, _>>()?;

    if !preferred_courts.is_empty() {
        results.sort_by(|a, b| {
            let a_pref = preferred_court_rank(a, &preferred_courts);
            let b_pref = preferred_court_rank(b, &preferred_courts);
            a_pref
                .cmp(&b_pref)
                .then_with(|| b.decision_date.cmp(&a.decision_date))
                .then_with(|| a.decision_id.cmp(&b.decision_id))
        });
    }

    if results.len() < limit {
        let primary_court = results
            .first()
            .and_then(|r| r.court.as_deref())
            .map(|c| c.to_lowercase());
        let existing_ids: BTreeSet<String> =
            results.iter().map(|r| r.decision_id.clone()).collect();
        let related = search_related_docket_family(
            conn,
            &effective_query,
            where_clause,
            where_params,
            &preferred_courts,
            primary_court.as_deref(),
            &existing_ids,
            (limit * 3).max(20),
        )?;
        results.extend(related);
    }

    results.truncate(limit);
    Ok(results)
}

/// Family-neighbor expansion: parse a docket reference into prefix/serial/year,
/// build every candidate within the serial window, and rank by distance from the
/// parsed serial (closer first), then preferred court, then recency.
#[allow(clippy::too_many_arguments)]
fn search_related_docket_family(
    conn: &Connection,
    raw_query: &str,
    where_clause: &str,
    where_params: &[&dyn rusqlite::ToSql],
    preferred_courts: &BTreeSet<String>,
    primary_court: Option<&str>,
    existing_ids: &BTreeSet<String>,
    limit: usize,
) -> Result<Vec<DocketHit>, RetrieveError> {
    let Some(family) = parse_docket_family(raw_query) else {
        return Ok(Vec::new());
    };
    let candidates = build_docket_family_candidates(&family);
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat("?")
        .take(candidates.len())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT d.decision_id, d.court, d.canton, d.docket_number, d.decision_date \
         FROM decisions d \
         WHERE d.docket_number IN ({placeholders}){where_clause} \
         LIMIT ?"
    );
    let query_limit = (limit * 12).max(240) as i64;
    let mut stmt = conn.prepare(&sql)?;
    let mut bound: Vec<&dyn rusqlite::ToSql> =
        candidates.iter().map(|c| c as &dyn rusqlite::ToSql).collect();
    bound.extend_from_slice(where_params);
    bound.push(&query_limit);

    let rows = stmt.query_map(bound.as_slice(), |row| {
        Ok(DocketHit {
            decision_id: row.get("decision_id")?,
            court: row.get("court")?,
            canton: row.get("canton")?,
            docket_number: row.get("docket_number")?,
            decision_date: row.get("decision_date")?,
            relevance_score: 96.0,
        })
    })?;

    let mut preferred_rank_courts = preferred_courts.clone();
    if let Some(court) = primary_court {
        preferred_rank_courts.insert(court.to_string());
    }

    let mut ranked: Vec<((u8, i64, std::cmp::Reverse<String>, String), DocketHit)> = Vec::new();
    for row in rows {
        let hit = row?;
        if existing_ids.contains(&hit.decision_id) {
            continue;
        }
        let row_docket = hit.docket_number.clone().unwrap_or_default();
        let row_serial = extract_docket_serial(&row_docket, &family.prefix, &family.year);
        let distance = match row_serial {
            Some(s) => (s - family.serial).abs(),
            None => 10_000_000,
        };
        let preferred_rank = match &hit.court {
            Some(c) if preferred_rank_courts.contains(&c.to_lowercase()) => 0,
            _ => 1,
        };
        let date = hit.decision_date.clone().unwrap_or_default();
        let key = (preferred_rank, distance, std::cmp::Reverse(date), hit.decision_id.clone());
        ranked.push((key, hit));
    }
    ranked.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(ranked.into_iter().map(|(_, hit)| hit).take(limit).collect())
}

fn preferred_court_rank(hit: &DocketHit, preferred: &BTreeSet<String>) -> u8 {
    match &hit.court {
        Some(c) if preferred.contains(&c.to_lowercase()) => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_separator_variants() {
        let variants = build_docket_variants("6B_1234/2025");
        assert!(variants.contains("6B_1234/2025"));
        assert!(variants.contains("6B-1234-2025"));
        assert!(variants.contains("6B.1234.2025"));
    }

    #[test]
    fn detects_docket_like_query() {
        assert!(looks_like_docket_query("6B_1234/2025"));
        assert!(looks_like_docket_query("6B 1234 2025"));
        assert!(!looks_like_docket_query("Kündigung wegen Eigenbedarf"));
    }

    #[test]
    fn spaced_docket_collapses_to_same_variants_as_separated_form() {
        let spaced = collapse_spaced_docket("6B 1234 2025").unwrap();
        let separated_variants = build_docket_variants("6B_1234/2025");
        let spaced_variants = build_docket_variants(&spaced);
        assert_eq!(separated_variants, spaced_variants);
    }

    #[test]
    fn collapses_spaced_docket_with_two_digit_year() {
        assert_eq!(collapse_spaced_docket("6B 1234 25"), Some("6B_1234/2025".to_string()));
    }

    #[test]
    fn parses_docket_family_and_serial() {
        let family = parse_docket_family("6B.1234/2025").expect("should parse");
        assert_eq!(family.prefix, "6B");
        assert_eq!(family.serial, 1234);
        assert_eq!(family.year, "2025");

        let serial = extract_docket_serial("6B.1250/2025", "6B", "2025");
        assert_eq!(serial, Some(1250));
    }

    #[test]
    fn family_candidates_cover_serial_window() {
        let family = DocketFamily { prefix: "6B".into(), serial: 100, year: "2025".into() };
        let candidates = build_docket_family_candidates(&family);
        assert!(candidates.contains(&"6B.60/2025".to_string()));
        assert!(candidates.contains(&"6B.140/2025".to_string()));
        assert!(!candidates.contains(&"6B.59/2025".to_string()));
        assert!(!candidates.contains(&"6B.141/2025".to_string()));
    }

    #[test]
    fn detects_preferred_courts_from_query_text() {
        let preferred = detect_query_preferred_courts("Bundesgericht Entscheid zur Miete");
        assert!(preferred.contains("bger"));
        assert!(preferred.contains("bge"));
    }
}
