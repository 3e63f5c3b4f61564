//! Strategy planner: turns the analyzer's output into an ordered,
//! weighted list of FTS5 sub-queries plus a target candidate pool size.

use crate::analyzer::{self, MAX_NL_TOKENS, NL_AND_TERM_LIMIT};
use lex_retrieve::docket::DOCKET_MIN_CANDIDATE_POOL;
use lex_retrieve::fts::Strategy;

pub const MIN_CANDIDATE_POOL: usize = 60;
pub const TARGET_POOL_MULTIPLIER: usize = 4;
pub const MAX_RERANK_CANDIDATES: usize = 2500;

/// `max(MIN_CANDIDATE_POOL, (offset+limit) * TARGET_POOL_MULTIPLIER)`, with a
/// larger floor for docket-shaped queries, capped at `MAX_RERANK_CANDIDATES`.
/// Explicit FTS syntax doubles the effective page size to compensate for the
/// narrower recall of a literal boolean query.
pub fn target_candidate_pool(offset: usize, limit: usize, is_docket: bool, has_explicit_syntax: bool) -> usize {
    let effective = offset + limit;
    let mut pool = MIN_CANDIDATE_POOL.max(effective * TARGET_POOL_MULTIPLIER);
    if has_explicit_syntax {
        pool = pool.max(effective * 2);
    }
    if is_docket {
        pool = pool.max(DOCKET_MIN_CANDIDATE_POOL);
    }
    pool.min(MAX_RERANK_CANDIDATES)
}

/// Append a `*` to terms of length >= 4 that don't already end in one, to
/// improve recall on German compound nouns (`asyl` -> `asyl*`).
fn fts_prefix_term(term: &str) -> String {
    if term.chars().count() >= 4 && !term.ends_with('*') {
        format!("{term}*")
    } else {
        term.to_string()
    }
}

fn clean_for_phrase(query: &str) -> String {
    analyzer::extract_query_terms(query, MAX_NL_TOKENS, false, false).join(" ")
}

fn build_nl_or_query(query: &str, include_expansions: bool) -> String {
    analyzer::extract_query_terms(query, MAX_NL_TOKENS, true, include_expansions)
        .iter()
        .map(|t| fts_prefix_term(t))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn build_nl_and_query(query: &str) -> String {
    let keep = analyzer::extract_query_terms(query, NL_AND_TERM_LIMIT, false, false);
    if keep.len() < 2 {
        String::new()
    } else {
        keep.join(" AND ")
    }
}

struct Candidate {
    name: String,
    query: String,
    weight: f64,
}

fn build_anchor_pair_strategies(query: &str) -> Vec<Candidate> {
    let terms = analyzer::extract_query_terms(query, MAX_NL_TOKENS, false, false);
    if terms.len() < 2 {
        return Vec::new();
    }
    let pairs = analyzer::pick_anchor_pairs(&terms);
    let mut out = Vec::new();
    for (idx, (left, right)) in pairs.into_iter().enumerate() {
        let n = idx + 1;
        out.push(Candidate {
            name: format!("anchor_pair_{n}"),
            query: format!("{left} AND {right}"),
            weight: if n == 1 { 1.2 } else { 1.0 },
        });
        if left.chars().count() >= 4 && right.chars().count() >= 4 {
            out.push(Candidate {
                name: format!("anchor_phrase_{n}"),
                query: format!("\"{left} {right}\""),
                weight: 0.85,
            });
        }
    }
    out
}

fn build_field_focus_query(query: &str, field: &str) -> String {
    let terms = analyzer::extract_query_terms(query, 6, false, false);
    let safe_terms: Vec<&String> = terms
        .iter()
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') && !t.chars().all(|c| c.is_ascii_digit()))
        .collect();
    if safe_terms.len() < 2 {
        return String::new();
    }
    safe_terms
        .iter()
        .take(2)
        .map(|t| format!("{field}:{}", fts_prefix_term(t)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn build_language_focus_query(query: &str, language: &str, and_mode: bool) -> String {
    let base = if and_mode { build_nl_and_query(query) } else { build_nl_or_query(query, false) };
    if base.is_empty() {
        String::new()
    } else {
        format!("language:{language} AND ({base})")
    }
}

fn build_language_focus_strategies(query: &str, detected_languages: &[String]) -> Vec<Candidate> {
    let mut out = Vec::new();
    for lang in detected_languages.iter().take(2) {
        let and_query = build_language_focus_query(query, lang, true);
        let or_query = build_language_focus_query(query, lang, false);
        if !and_query.is_empty() {
            out.push(Candidate { name: format!("lang_{lang}_and"), query: and_query, weight: 1.1 });
        }
        if !or_query.is_empty() {
            out.push(Candidate { name: format!("lang_{lang}_or"), query: or_query, weight: 0.8 });
        }
    }
    out
}

fn should_try_raw_fallback(query: &str) -> bool {
    !query.is_empty()
        && query.chars().all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || (!c.is_ascii() && c.is_alphabetic()))
}

/// True if every whitespace-separated token is pure digits (`"1234 2025"`). An
/// `nl_or` expansion over tokens like these just ORs bare numbers across every
/// indexed field and returns a flood of irrelevant matches at real cost; the
/// docket fast path already covers genuine docket-shaped queries.
fn has_only_numeric_tokens(query: &str) -> bool {
    let mut saw_token = false;
    for token in query.split_whitespace() {
        saw_token = true;
        if !token.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    saw_token
}

/// Expansion terms returned by an (optional, network-backed) LLM query
/// expander. Implemented outside this crate; the planner only folds whatever
/// terms it's handed into an extra `llm_expanded` strategy.
pub trait QueryExpander {
    fn expand(&self, query: &str) -> Vec<String>;
}

/// Build the ordered, deduplicated, weighted strategy list plus the target
/// candidate pool size for a query: explicit-syntax queries lead with `raw`;
/// natural-language queries lead with anchor pairs and `nl_and`.
pub fn plan_strategies(
    raw_query: &str,
    offset: usize,
    limit: usize,
    is_docket: bool,
    expander: Option<&dyn QueryExpander>,
) -> (Vec<Strategy>, usize) {
    let raw = raw_query.trim();
    let has_explicit_syntax = analyzer::has_explicit_fts_syntax(raw);
    let numeric_only = has_only_numeric_tokens(raw);
    let nl_and = build_nl_and_query(raw);
    let nl_or = build_nl_or_query(raw, false);
    let nl_or_expanded = build_nl_or_query(raw, true);
    let anchor_focus = build_anchor_pair_strategies(raw);
    let regeste_focus = build_field_focus_query(raw, "regeste");
    let title_focus = build_field_focus_query(raw, "title");
    let detected_languages = analyzer::detect_query_languages(raw);
    let language_focus = build_language_focus_strategies(raw, &detected_languages);
    let cleaned = clean_for_phrase(raw);
    let quoted = if cleaned.is_empty() { String::new() } else { format!("\"{cleaned}\"") };

    let mut candidates: Vec<Candidate> = Vec::new();
    if has_explicit_syntax {
        candidates.push(Candidate { name: "raw".into(), query: raw.to_string(), weight: 1.5 });
        candidates.push(Candidate { name: "quoted".into(), query: quoted, weight: 1.1 });
        candidates.push(Candidate { name: "regeste_focus".into(), query: regeste_focus, weight: 0.95 });
        candidates.push(Candidate { name: "title_focus".into(), query: title_focus, weight: 0.85 });
        candidates.extend(anchor_focus);
        candidates.extend(language_focus);
        candidates.push(Candidate { name: "nl_and".into(), query: nl_and, weight: 0.9 });
        if !numeric_only {
            candidates.push(Candidate { name: "nl_or".into(), query: nl_or, weight: 0.7 });
        }
    } else {
        candidates.extend(anchor_focus);
        candidates.push(Candidate { name: "nl_and".into(), query: nl_and, weight: 1.3 });
        candidates.push(Candidate { name: "regeste_focus".into(), query: regeste_focus, weight: 1.05 });
        candidates.push(Candidate { name: "title_focus".into(), query: title_focus, weight: 0.95 });
        candidates.extend(language_focus);
        candidates.push(Candidate { name: "quoted".into(), query: quoted, weight: 1.15 });
        if !numeric_only {
            candidates.push(Candidate { name: "nl_or".into(), query: nl_or, weight: 1.0 });
            candidates.push(Candidate { name: "nl_or_expanded".into(), query: nl_or_expanded, weight: 0.85 });
        }
        if should_try_raw_fallback(raw) {
            candidates.push(Candidate { name: "raw_fallback".into(), query: raw.to_string(), weight: 0.65 });
        }
    }

    if let Some(expander) = expander {
        let llm_terms = expander.expand(raw);
        if !llm_terms.is_empty() {
            let mut parts = Vec::new();
            for term in &llm_terms {
                let words: Vec<&str> = term.split_whitespace().collect();
                if words.len() == 1 {
                    let norm = analyzer::normalize_token(term);
                    if !norm.is_empty() {
                        parts.push(norm);
                    }
                } else {
                    let normed: Vec<String> =
                        words.iter().map(|w| analyzer::normalize_token(w)).filter(|w| !w.is_empty()).collect();
                    if normed.len() >= 2 {
                        parts.push(format!("\"{}\"", normed.join(" ")));
                    } else if let Some(first) = normed.into_iter().next() {
                        parts.push(first);
                    }
                }
            }
            if !parts.is_empty() {
                candidates.push(Candidate {
                    name: "llm_expanded".into(),
                    query: parts.join(" OR "),
                    weight: 0.9,
                });
            }
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    let mut strategies = Vec::new();
    for candidate in candidates {
        let q = candidate.query.trim().to_string();
        if q.is_empty() || seen.contains(&q) {
            continue;
        }
        seen.insert(q.clone());
        strategies.push(Strategy { name: candidate.name, match_query: q, weight: candidate.weight });
    }

    let pool = target_candidate_pool(offset, limit, is_docket, has_explicit_syntax);
    (strategies, pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_pool_respects_docket_floor() {
        assert_eq!(target_candidate_pool(0, 10, true, false), DOCKET_MIN_CANDIDATE_POOL);
    }

    #[test]
    fn target_pool_caps_at_max() {
        assert_eq!(target_candidate_pool(0, 10_000, false, false), MAX_RERANK_CANDIDATES);
    }

    #[test]
    fn explicit_syntax_leads_with_raw_strategy() {
        let (strategies, _) = plan_strategies("title:asyl AND wegweisung", 0, 10, false, None);
        assert_eq!(strategies[0].name, "raw");
    }

    #[test]
    fn natural_language_query_does_not_lead_with_raw() {
        let (strategies, _) = plan_strategies("fristlose kuendigung wegen mobbing", 0, 10, false, None);
        assert!(strategies[0].name != "raw");
        assert!(strategies.iter().any(|s| s.name == "nl_and"));
    }

    #[test]
    fn strategies_are_deduplicated_by_query_text() {
        let (strategies, _) = plan_strategies("asyl", 0, 10, false, None);
        let mut seen = std::collections::BTreeSet::new();
        for s in &strategies {
            assert!(seen.insert(s.match_query.clone()), "duplicate query: {}", s.match_query);
        }
    }

    #[test]
    fn numeric_only_tokens_are_detected() {
        assert!(has_only_numeric_tokens("1234 2025"));
        assert!(has_only_numeric_tokens("1234"));
        assert!(!has_only_numeric_tokens("6B 1234"));
        assert!(!has_only_numeric_tokens(""));
    }

    #[test]
    fn numeric_only_query_skips_nl_or_strategies() {
        let (strategies, _) = plan_strategies("1234 2025", 0, 10, false, None);
        assert!(!strategies.iter().any(|s| s.name == "nl_or" || s.name == "nl_or_expanded"));
    }

    #[test]
    fn mixed_alnum_query_keeps_nl_or_strategies() {
        let (strategies, _) = plan_strategies("fristlose kuendigung mobbing", 0, 10, false, None);
        assert!(strategies.iter().any(|s| s.name == "nl_or"));
    }
}
