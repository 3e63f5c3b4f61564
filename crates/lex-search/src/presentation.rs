//! Presentation: passage-snippet selection, highlighting, and the final
//! per-result projection from a reranked candidate.

use regex::Regex;

use lex_rerank::sort::Scored;

use crate::analyzer;
use crate::candidates::FusedCandidate;

pub const MAX_SNIPPET_LEN: usize = 500;
pub const MAX_REGESTE_LEN: usize = 500;
const PASSAGE_SENTENCE_WINDOW: usize = 4;
const MAX_PASSAGES: usize = 40;

/// Courts, structural legal terms, and roman numerals too common in Swiss
/// legal text to be worth highlighting.
const HIGHLIGHT_STOPWORDS: &[&str] = &[
    "bge", "bger", "bvger", "bstger", "bpatger", "bundesgericht", "tribunal", "obergericht", "gericht",
    "art", "abs", "lit", "ziff", "bgb", "erw", "vol", "urteil", "beschluss", "verfugung", "entscheid",
    "sachverhalt", "arret", "decision", "jugement", "sentenza", "fait", "beschwerde", "berufung",
    "rekurs", "klage", "recours", "antrag", "begrundung", "erwagung", "dispositiv", "i", "ii", "iii",
    "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv", "xv",
];

/// A presentation-ready result: a decision's metadata plus the chosen
/// snippet and final relevance score, rounded to four decimals.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub decision_id: String,
    pub court: Option<String>,
    pub canton: Option<String>,
    pub chamber: Option<String>,
    pub docket_number: Option<String>,
    pub decision_date: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub regeste: Option<String>,
    pub snippet: Option<String>,
    pub source_url: Option<String>,
    pub pdf_url: Option<String>,
    pub relevance_score: f64,
}

/// Split `full_text` into paragraphs (blank-line separated) when at least two
/// exist, otherwise into overlapping `PASSAGE_SENTENCE_WINDOW`-sentence
/// windows (half-window stride), capped at `MAX_PASSAGES`.
fn split_passages(full_text: &str) -> Vec<String> {
    let text = full_text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let paragraphs: Vec<String> = split_on_blank_lines(text);
    if paragraphs.len() >= 2 {
        return paragraphs.into_iter().take(MAX_PASSAGES).collect();
    }

    let sentences = split_sentences(text);
    if sentences.len() <= PASSAGE_SENTENCE_WINDOW {
        return vec![text.to_string()];
    }

    let stride = (PASSAGE_SENTENCE_WINDOW / 2).max(1);
    let mut out = Vec::new();
    let mut i = 0;
    while i < sentences.len() {
        let window = sentences[i..(i + PASSAGE_SENTENCE_WINDOW).min(sentences.len())].join(" ");
        let trimmed = window.trim().to_string();
        if !trimmed.is_empty() {
            out.push(trimmed);
        }
        if out.len() >= MAX_PASSAGES {
            break;
        }
        i += stride;
    }
    out
}

fn split_on_blank_lines(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run >= 1 && !current.trim().is_empty() {
                out.push(current.trim().to_string());
                current.clear();
            }
        } else {
            blank_run = 0;
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            out.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out.into_iter().filter(|s| !s.is_empty()).collect()
}

/// `analyzer::normalize_for_match` strips every non-alphanumeric character,
/// including whitespace, which is right for the single-token comparisons it
/// was built for but destroys word boundaries. Passage scoring needs word
/// counts, so normalize word-by-word and rejoin with single spaces.
fn normalize_text_preserving_words(text: &str) -> String {
    text.split_whitespace()
        .map(analyzer::normalize_for_match)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Choose the best-scoring passage from `full_text`, truncate to
/// `MAX_SNIPPET_LEN`, and highlight it; falls back to `fallback` (the
/// FTS-provided snippet) when there's no full text or no positively-scoring
/// passage. `rank_terms` must already be normalized via
/// [`analyzer::normalize_for_match`]; `phrase` must be normalized via
/// [`normalize_text_preserving_words`] so it lines up with the space-preserving
/// form used for passage scoring.
pub fn select_best_passage_snippet(
    full_text: Option<&str>,
    rank_terms: &[String],
    phrase: &str,
    raw_query: &str,
    fallback: Option<&str>,
) -> Option<String> {
    let Some(full_text) = full_text else { return fallback.map(str::to_string) };
    let passages = split_passages(full_text);
    if passages.is_empty() {
        return fallback.map(str::to_string);
    }

    let mut best_text: Option<&str> = None;
    let mut best_score = -1.0f64;
    for passage in &passages {
        if passage.is_empty() {
            continue;
        }
        let normalized = normalize_text_preserving_words(passage);
        if normalized.is_empty() {
            continue;
        }
        let term_hits = rank_terms.iter().filter(|t| normalized.contains(t.as_str())).count() as f64;
        let phrase_hit = if !phrase.is_empty() && normalized.contains(phrase) { 1.0 } else { 0.0 };
        let word_count = normalized.split_whitespace().count().max(1).min(12) as f64;
        let density = term_hits / word_count;
        let score = 2.4 * phrase_hit + term_hits + 4.0 * density;
        if score > best_score {
            best_score = score;
            best_text = Some(passage);
        }
    }

    if let Some(best) = best_text {
        if best_score > 0.0 {
            let compact = best.split_whitespace().collect::<Vec<_>>().join(" ");
            let truncated = truncate_chars(&compact, MAX_SNIPPET_LEN);
            return Some(highlight_terms(&truncated, rank_terms, phrase, raw_query));
        }
    }
    fallback.map(str::to_string)
}

fn is_trivial_highlight(term: &str) -> bool {
    let t = term.trim_matches('*').to_lowercase();
    if HIGHLIGHT_STOPWORDS.contains(&t.as_str()) {
        return true;
    }
    if t.len() == 4 && t.starts_with(|c: char| c == '1' || c == '2') && t.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = t.parse().unwrap_or(0);
        if (1900..2100).contains(&year) {
            return true;
        }
    }
    if t.chars().all(|c| c.is_ascii_digit()) && t.len() < 5 {
        return true;
    }
    false
}

/// Wrap matches for the cleaned raw-query phrase first, then individual
/// rank terms, in `<mark>` tags, skipping trivial terms and never
/// double-marking text already inside a `<mark>`.
fn highlight_terms(text: &str, rank_terms: &[String], _phrase: &str, raw_query: &str) -> String {
    let mut candidates: Vec<String> = Vec::new();

    let clean_raw = strip_boolean_operators(raw_query);
    let clean_raw = clean_raw.trim_matches(|c: char| c == ' ' || c == '"').to_string();
    let clean_raw = collapse_whitespace(&clean_raw);
    if !clean_raw.is_empty() && clean_raw.split_whitespace().count() > 1 {
        candidates.push(clean_raw);
    }

    for term in rank_terms {
        if !candidates.contains(term) && !is_trivial_highlight(term) {
            candidates.push(term.clone());
        }
    }

    let mut out = text.to_string();
    for term in &candidates {
        let words: Vec<&str> = term.split_whitespace().collect();
        let pattern = if words.len() > 1 {
            format!(r"\b{}\b", words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join(r"[\s,;:.·/\-]+"))
        } else {
            format!(r"\b{}\b", regex::escape(term))
        };
        out = apply_highlight_outside_marks(&out, &pattern);
    }
    out
}

fn strip_boolean_operators(raw_query: &str) -> String {
    let re = Regex::new(r"(?i)\b(AND|OR|NOT)\b").expect("static pattern is valid");
    re.replace_all(raw_query, " ").to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply a highlight pattern only to text segments outside existing `<mark>` spans.
fn apply_highlight_outside_marks(text: &str, pattern: &str) -> String {
    let mark_re = Regex::new(r"(?is)(<mark>.*?</mark>)").expect("static pattern is valid");
    let Ok(term_re) = Regex::new(&format!("(?i)({pattern})")) else {
        return text.to_string();
    };

    let mut out = String::new();
    let mut last_end = 0;
    for m in mark_re.find_iter(text) {
        let before = &text[last_end..m.start()];
        out.push_str(&term_re.replace_all(before, "<mark>$1</mark>"));
        out.push_str(m.as_str());
        last_end = m.end();
    }
    out.push_str(&term_re.replace_all(&text[last_end..], "<mark>$1</mark>"));
    out
}

/// Project a reranked, scored candidate into a presentation-ready `SearchResult`.
pub fn present(
    scored: &Scored<FusedCandidate>,
    rank_terms: &[String],
    phrase: &str,
    raw_query: &str,
) -> SearchResult {
    let row = &scored.item.row;
    let snippet = select_best_passage_snippet(row.full_text.as_deref(), rank_terms, phrase, raw_query, row.snippet.as_deref());
    let regeste = row.regeste.as_deref().map(|r| truncate_chars(r, MAX_REGESTE_LEN));

    SearchResult {
        decision_id: row.decision_id.clone(),
        court: row.court.clone(),
        canton: row.canton.clone(),
        chamber: row.chamber.clone(),
        docket_number: row.docket_number.clone(),
        decision_date: row.decision_date.clone(),
        language: row.language.clone(),
        title: row.title.clone(),
        regeste,
        snippet,
        source_url: row.source_url.clone(),
        pdf_url: row.pdf_url.clone(),
        relevance_score: (scored.score * 10_000.0).round() / 10_000.0,
    }
}

/// The canonical dedup key for final presentation, identical in shape to the
/// candidate-merge key.
pub fn canonical_key(court: Option<&str>, docket_number: Option<&str>, decision_date: Option<&str>) -> Option<String> {
    crate::candidates::canonical_key(court, docket_number, decision_date)
}

/// Deduplicate a result list by `decision_id` and by canonical key,
/// preserving the first (highest-ranked) occurrence of each.
pub fn dedupe_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen_ids = std::collections::BTreeSet::new();
    let mut seen_keys = std::collections::BTreeSet::new();
    let mut out = Vec::with_capacity(results.len());
    for result in results {
        if !seen_ids.insert(result.decision_id.clone()) {
            continue;
        }
        if let Some(key) = canonical_key(result.court.as_deref(), result.docket_number.as_deref(), result.decision_date.as_deref()) {
            if !seen_keys.insert(key) {
                continue;
            }
        }
        out.push(result);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multi_paragraph_text() {
        let text = "Erstes.\n\nZweites.\n\nDrittes.";
        let passages = split_passages(text);
        assert_eq!(passages.len(), 3);
    }

    #[test]
    fn falls_back_to_fts_snippet_when_no_full_text() {
        let snippet = select_best_passage_snippet(None, &[], "", "", Some("fallback"));
        assert_eq!(snippet.as_deref(), Some("fallback"));
    }

    #[test]
    fn trivial_terms_are_not_highlighted() {
        assert!(is_trivial_highlight("2024"));
        assert!(is_trivial_highlight("BGE"));
        assert!(!is_trivial_highlight("mobbing"));
    }

    #[test]
    fn highlight_wraps_term_outside_existing_marks() {
        let out = apply_highlight_outside_marks("foo <mark>bar</mark> baz", r"\bbaz\b");
        assert_eq!(out, "foo <mark>bar</mark> <mark>baz</mark>");
    }

    #[test]
    fn dedupe_drops_repeated_decision_ids() {
        let make = |id: &str| SearchResult {
            decision_id: id.to_string(),
            court: None,
            canton: None,
            chamber: None,
            docket_number: None,
            decision_date: None,
            language: None,
            title: None,
            regeste: None,
            snippet: None,
            source_url: None,
            pdf_url: None,
            relevance_score: 1.0,
        };
        let out = dedupe_results(vec![make("a"), make("a"), make("b")]);
        assert_eq!(out.len(), 2);
    }
}
