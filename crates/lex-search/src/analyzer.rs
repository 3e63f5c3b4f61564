//! Query analysis: tokenization, normalization, language detection, and
//! statute/citation/docket reference extraction.
//!
//! Everything here is pure text processing over the raw query string; no
//! database access happens in this module.

use std::collections::BTreeSet;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use lex_retrieve::docket;

pub const RERANK_TERM_LIMIT: usize = 24;
pub const MAX_NL_TOKENS: usize = 16;
pub const NL_AND_TERM_LIMIT: usize = 8;
pub const MAX_EXPANSIONS_PER_TERM: usize = 2;

const NL_STOPWORDS: &[&str] = &[
    // German
    "ich", "suche", "zur", "der", "die", "das", "und", "in", "zum", "von", "mit", "ohne", "für",
    "was", "sagt", "dem", "den", "des", "ein", "eine", "einer", "einem", "im", "am", "an", "zu",
    "auf", "über", "unter", "als", "oder", "nicht", "art",
    // French
    "je", "cherche", "sur", "le", "la", "les", "de", "du", "des", "un", "une", "et", "ou", "dans",
    "avec", "sans", "pour", "au", "aux", "d",
    // Italian
    "cerco", "una", "uno", "un", "sul", "sulla", "sui", "del", "della", "delle", "di", "e", "o",
    "con", "senza", "per", "nel", "nella", "nei", "agli", "ai", "al",
    // English
    "i", "search", "for", "the", "and", "or", "in", "of", "with", "without", "to", "on", "about",
    "a", "an",
];

const ASYL_QUERY_TERMS: &[&str] = &["asyl", "asile", "asilo", "wegweisung", "renvoi", "allontanamento"];

const DECISION_INTENT_TERMS: &[&str] = &[
    "arret", "entscheid", "jugement", "sentenza", "urteil", "bundesgericht", "tribunal", "gericht",
];

pub const HIGH_COURTS: &[&str] = &["bger", "bge", "bvger", "bstger", "egmr"];

pub const ACCELERATED_PROCEDURE_TERMS: &[&str] = &[
    "beschleunigt", "beschleunigtes", "beschleunigte", "verkurzt", "verkurzte", "schnellverfahren",
    "accelerato", "accelere", "acceleree",
];

const LEGAL_ANCHOR_PAIRS: &[(&str, &str)] = &[
    ("asyl", "wegweisung"),
    ("asile", "renvoi"),
    ("asilo", "allontanamento"),
    ("parc", "eolien"),
    ("permis", "construire"),
    ("baubewilligung", "windpark"),
    ("fristlos", "kuendigung"),
    ("fristlose", "entlassung"),
    ("schadenersatz", "haftung"),
    ("scheidung", "unterhalt"),
    ("diskriminierung", "gleichbehandlung"),
];

/// Multilingual legal-term expansion map, keyed and valued in normalized-for-FTS form.
const LEGAL_QUERY_EXPANSIONS: &[(&str, &[&str])] = &[
    ("asyl", &["asile", "asilo", "schutz", "refugee"]),
    ("asile", &["asyl", "asilo", "protection"]),
    ("asilo", &["asyl", "asile", "protezione"]),
    ("wegweisung", &["renvoi", "allontanamento", "ausweisung"]),
    ("renvoi", &["wegweisung", "expulsion", "allontanamento"]),
    ("allontanamento", &["wegweisung", "renvoi", "espulsione"]),
    ("ausweisung", &["expulsion", "renvoi", "wegweisung"]),
    ("kuendigung", &["resiliation", "disdetta", "termination"]),
    ("kundigung", &["resiliation", "disdetta", "termination"]),
    ("resiliation", &["kuendigung", "kundigung", "termination"]),
    ("disdetta", &["kuendigung", "resiliation", "termination"]),
    ("mietrecht", &["mietzins", "kuendigung", "mietvertrag", "bail", "locazione"]),
    ("mietvertrag", &["bail", "locazione", "mietrecht"]),
    ("permis", &["baubewilligung", "baugesuch", "autorizzazione"]),
    ("construire", &["baubewilligung", "bauen", "construction"]),
    ("construction", &["baubewilligung", "baugesuch", "construire"]),
    ("baubewilligung", &["baugesuch", "autorizzazione"]),
    ("baugesuch", &["baubewilligung", "autorizzazione"]),
    ("eolien", &["windpark", "windenergie", "eolienne"]),
    ("eolienne", &["windpark", "windenergie", "eolien"]),
    ("windpark", &["eolien", "eolienne", "parc"]),
    ("immissionen", &["nuisances", "immissioni", "laerm"]),
    ("laerm", &["laermschutz", "immissionen"]),
    ("beschleunigt", &["verkurzt", "schnellverfahren", "accelerato"]),
    ("beschleunigtes", &["verkurzte", "schnellverfahren", "accelerato"]),
    ("verkurzt", &["beschleunigt", "beschleunigtes"]),
    ("verkurzte", &["beschleunigtes", "beschleunigt"]),
    ("steuer", &["impot", "tax", "imposta"]),
    ("impot", &["steuer", "tax", "imposta"]),
    ("imposta", &["steuer", "impot", "tax"]),
    ("unfallversicherung", &["accident", "assicurazione", "assurance"]),
    ("kausalzusammenhang", &["causalite", "causalita", "causale"]),
    ("verjaehrung", &["prescription", "prescrizione"]),
    ("verfassung", &["constitution", "costituzione", "bv"]),
    ("datenschutz", &["protection", "privacy", "donnees"]),
    ("persoenlichkeitsschutz", &["privacy", "protection", "personalita"]),
    ("diskriminierung", &["gleichbehandlung", "rechtsgleichheit", "discrimination"]),
    ("gleichbehandlung", &["diskriminierung", "rechtsgleichheit", "egalite"]),
    ("rechtsgleichheit", &["gleichbehandlung", "diskriminierung", "egalite"]),
    ("willkuer", &["arbitraire", "arbitrio", "willkuerverbot"]),
    ("willkuerverbot", &["willkuer", "arbitraire", "arbitrio"]),
    ("arbitraire", &["willkuer", "willkuerverbot", "arbitrio"]),
    ("grundrechte", &["droits", "fondamentaux", "diritti", "fondamentali"]),
    ("verhaeltnismaessigkeit", &["proportionnalite", "proporzionalita"]),
    ("proportionnalite", &["verhaeltnismaessigkeit", "proporzionalita"]),
    ("haftung", &["responsabilite", "responsabilita", "liability"]),
    ("responsabilite", &["haftung", "responsabilita", "liability"]),
    ("schadenersatz", &["dommages", "risarcimento", "indemnite"]),
    ("dommages", &["schadenersatz", "risarcimento", "indemnite"]),
    ("vertrag", &["contrat", "contratto", "contract"]),
    ("contrat", &["vertrag", "contratto", "contract"]),
    ("beschwerde", &["recours", "ricorso", "appel"]),
    ("recours", &["beschwerde", "ricorso", "appel"]),
    ("vorsorgliche", &["provisoire", "cautelare", "superprovisorisch"]),
    ("rechtskraft", &["autorite", "giudicato", "chose"]),
    ("freiheitsstrafe", &["peine", "privative", "liberte"]),
    ("betrug", &["escroquerie", "truffa", "fraud"]),
    ("diebstahl", &["vol", "furto", "theft"]),
    ("scheidung", &["divorce", "divorzio", "ehescheidung"]),
    ("unterhalt", &["entretien", "alimenti", "pension"]),
    ("sorgerecht", &["garde", "custodia", "autorite", "parentale"]),
    ("fristlos", &["immediat", "immediato", "fristlose"]),
    ("fristlose", &["fristlos", "immediat", "immediato"]),
    ("arbeitsvertrag", &["contrat", "travail", "contratto", "lavoro"]),
    ("treuepflicht", &["fidelite", "fedelta", "loyaute"]),
    ("kartell", &["cartel", "cartello", "wettbewerb"]),
    ("wettbewerb", &["concurrence", "concorrenza", "competition"]),
    ("hundebiss", &["tierhalterhaftung", "haftpflicht"]),
    ("tierhalterhaftung", &["hundebiss", "haftpflicht"]),
    ("autounfall", &["haftpflicht", "kausalzusammenhang"]),
    ("verkehrsunfall", &["haftpflicht", "kausalzusammenhang"]),
    ("erbschaft", &["erbrecht", "pflichtteil"]),
    ("erbe", &["erbrecht", "pflichtteil"]),
    ("pflichtteil", &["erbschaft", "erbe"]),
    ("geschaeftsfuehrer", &["organverantwortlichkeit", "sorgfaltspflicht"]),
    ("organverantwortlichkeit", &["sorgfaltspflicht", "aktienrecht"]),
    ("steuerbetrug", &["steuerhinterziehung", "steuerpflicht"]),
    ("steuerhinterziehung", &["steuerbetrug", "steuerpflicht"]),
    ("entlassung", &["fristlos", "kuendigung"]),
    ("mobbing", &["persoenlichkeitsschutz", "arbeitsrecht"]),
    ("nachbarrecht", &["immissionen", "grundeigentum"]),
    ("laermschutz", &["immissionen", "laerm"]),
    ("eigentuemer", &["grundeigentum", "sachenrecht"]),
];

fn language_hint_terms(lang: &str) -> &'static [&'static str] {
    match lang {
        "de" => &[
            "und", "wegweisung", "kuendigung", "kundigung", "mietrecht", "bundesgericht", "gericht",
            "baubewilligung", "immissionen", "laerm", "steuer", "asyl",
        ],
        "fr" => &[
            "arrt", "arret", "permis", "construire", "droit", "impot", "impt", "asile", "renvoi",
            "jugement", "tribunal",
        ],
        "it" => &[
            "sentenza", "ricorso", "responsabilita", "danno", "morale", "asilo", "allontanamento",
            "imposta", "diritto", "tribunale",
        ],
        _ => &[],
    }
}

const SUPPORTED_LANGUAGES: &[&str] = &["de", "fr", "it"];

pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in query.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || (!ch.is_ascii() && ch.is_alphabetic()) {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Strip diacritics via NFKD decomposition, collapse a few digraphs, and drop
/// anything outside `[0-9a-z_]`.
pub fn normalize_token(token: &str) -> String {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return String::new();
    }
    let token = token.replace('ß', "ss").replace('æ', "ae").replace('œ', "oe");
    let decomposed: String = token.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    decomposed.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// `normalize_token` plus umlaut-digraph collapsing (ae/oe/ue -> a/o/u), used
/// wherever two spellings of the same German word must compare equal.
pub fn normalize_for_match(token: &str) -> String {
    collapse_umlaut_variants(&normalize_token(token))
}

fn collapse_umlaut_variants(token: &str) -> String {
    token.replace("ae", "a").replace("oe", "o").replace("ue", "u")
}

fn is_stopword(tok: &str) -> bool {
    NL_STOPWORDS.contains(&tok)
}

fn query_expansions(term: &str) -> Vec<&'static str> {
    LEGAL_QUERY_EXPANSIONS
        .iter()
        .find(|(key, _)| *key == term)
        .map(|(_, exps)| exps.iter().take(MAX_EXPANSIONS_PER_TERM).copied().collect())
        .unwrap_or_default()
}

/// Deduplicated, FTS-safe terms extracted from a natural-language query, in
/// first-occurrence order. `include_variants` adds the umlaut-collapsed form
/// alongside the canonical one; `include_expansions` adds legal synonyms.
pub fn extract_query_terms(
    query: &str,
    limit: usize,
    include_variants: bool,
    include_expansions: bool,
) -> Vec<String> {
    let mut keep = Vec::new();
    let mut seen = BTreeSet::new();
    for tok in tokenize(query) {
        if is_stopword(&tok) {
            continue;
        }
        let normalized = normalize_token(&tok);
        if normalized.is_empty() {
            continue;
        }
        if !normalized.chars().all(|c| c.is_ascii_digit()) && normalized.len() < 3 {
            continue;
        }
        let mut variants = vec![normalized.clone()];
        if include_variants {
            let alt = collapse_umlaut_variants(&normalized);
            if alt != normalized {
                variants.push(alt);
            }
        }
        if include_expansions {
            for expansion in query_expansions(&normalized) {
                let normalized_expansion = normalize_token(expansion);
                if !normalized_expansion.is_empty() && !variants.contains(&normalized_expansion) {
                    variants.push(normalized_expansion);
                }
            }
        }
        for term in variants {
            if seen.contains(&term) {
                continue;
            }
            keep.push(term.clone());
            seen.insert(term);
            if keep.len() >= limit {
                return keep;
            }
        }
    }
    keep
}

/// Deduplicated content-bearing terms for second-pass reranking (title/regeste
/// coverage, phrase-hit checks). Unlike `extract_query_terms`, this also drops
/// FTS column names and boolean operator keywords.
pub fn extract_rank_terms(query: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut seen = BTreeSet::new();
    for tok in tokenize(query) {
        if is_stopword(&tok) {
            continue;
        }
        let norm_tok = normalize_for_match(&tok);
        if norm_tok.is_empty() {
            continue;
        }
        if lex_retrieve::schema::FTS_COLUMNS.contains(&norm_tok.as_str()) {
            continue;
        }
        if matches!(norm_tok.as_str(), "and" | "or" | "not" | "near") {
            continue;
        }
        if !norm_tok.chars().all(|c| c.is_ascii_digit()) && norm_tok.len() < 3 {
            continue;
        }
        if seen.contains(&norm_tok) {
            continue;
        }
        terms.push(norm_tok.clone());
        seen.insert(norm_tok);
        if terms.len() >= RERANK_TERM_LIMIT {
            break;
        }
    }
    terms
}

/// Expand an already-extracted rank-term list with curated legal synonyms,
/// capped at `RERANK_TERM_LIMIT` and deduplicated against the input.
pub fn expand_rank_terms(terms: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: BTreeSet<String> = terms.iter().cloned().collect();
    for term in terms {
        for expansion in query_expansions(term) {
            let normalized = normalize_for_match(expansion);
            if normalized.is_empty() || seen.contains(&normalized) {
                continue;
            }
            if !normalized.chars().all(|c| c.is_ascii_digit()) && normalized.len() < 3 {
                continue;
            }
            out.push(normalized.clone());
            seen.insert(normalized);
            if out.len() >= RERANK_TERM_LIMIT {
                return out;
            }
        }
    }
    out
}

/// Score DE/FR/IT hint terms and suffix patterns, returning the top one or two
/// detected languages (empty if no signal at all).
pub fn detect_query_languages(query: &str) -> Vec<String> {
    let normalized: Vec<String> = tokenize(query)
        .iter()
        .map(|t| normalize_token(t))
        .filter(|t| !t.is_empty())
        .collect();
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut scores: Vec<(&str, i32)> = SUPPORTED_LANGUAGES.iter().map(|l| (*l, 0)).collect();
    for tok in &normalized {
        for (lang, score) in scores.iter_mut() {
            if language_hint_terms(lang).contains(&tok.as_str()) {
                *score += 2;
            }
        }
    }
    for tok in &normalized {
        if is_stopword(tok) {
            continue;
        }
        if tok.ends_with("tion") || tok.ends_with("mente") {
            for (lang, score) in scores.iter_mut() {
                if *lang == "fr" || *lang == "it" {
                    *score += 1;
                }
            }
        }
        if tok.ends_with("ung") || tok.ends_with("keit") {
            for (lang, score) in scores.iter_mut() {
                if *lang == "de" {
                    *score += 1;
                }
            }
        }
    }

    scores.sort_by(|a, b| b.1.cmp(&a.1));
    let top_score = scores[0].1;
    if top_score <= 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (lang, score) in scores {
        if score <= 0 {
            break;
        }
        if score >= (top_score - 2).max(1) {
            out.push(lang.to_string());
        }
        if out.len() >= 2 {
            break;
        }
    }
    out
}

fn statute_pattern() -> Regex {
    Regex::new(
        r"(?ix)
        \b(?:Art\.?|Artikel)\s*
        (?P<article>\d+(?:\s*(?:bis|ter|quater|quinquies|sexies)|[a-z](?![a-z]))?)\s*
        (?:(?:Abs\.?|Absatz|al\.?|alin(?:ea)?\.?|cpv\.?|co\.?|para\.?)\s*
           (?P<paragraph>\d+(?:\s*(?:bis|ter|quater|quinquies|sexies)|[a-z](?![a-z]))?))?\s*
        (?P<law>[A-Z][A-Z0-9]{1,11}(?:/[A-Z0-9]{2,6})?)
        \b
        ",
    )
    .expect("static statute pattern is valid")
}

const STATUTE_INVALID_LAWS: &[&str] = &[
    "AL", "ABS", "ABSATZ", "ALIN", "ALINEA", "CPV", "PARA", "BIS", "TER", "QUATER", "QUINQUIES",
    "SEXIES",
];

/// A `Art. X [Abs. Y] LAW` reference found in a query, rendered as
/// `ART.<article>.<LAW>` (and additionally `ART.<article>.ABS.<paragraph>.<LAW>`
/// when a paragraph was present).
pub fn extract_statute_refs(query: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    let pattern = statute_pattern();
    for caps in pattern.captures_iter(query) {
        let article: String = caps
            .name("article")
            .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase())
            .unwrap_or_default();
        if article.is_empty() {
            continue;
        }
        let paragraph: Option<String> = caps.name("paragraph").map(|m| {
            m.as_str().chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
        });
        let law = caps.name("law").map(|m| m.as_str().to_uppercase()).unwrap_or_default();
        if law.is_empty() || STATUTE_INVALID_LAWS.contains(&law.as_str()) {
            continue;
        }
        refs.insert(format!("ART.{article}.{law}"));
        if let Some(paragraph) = paragraph {
            if !paragraph.is_empty() {
                refs.insert(format!("ART.{article}.ABS.{paragraph}.{law}"));
            }
        }
    }
    refs
}

fn bge_pattern() -> Regex {
    Regex::new(r"(?i)\bBGE\s+\d{2,3}\s+[IVX]{1,4}\s+\d{1,4}\b").expect("static BGE pattern is valid")
}

fn normalize_docket_ref(value: &str) -> String {
    let text = value.trim().to_uppercase();
    if text.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(text.len());
    let mut last_was_sep = false;
    for ch in text.chars() {
        let mapped = match ch {
            '-' | '.' | '/' => '_',
            other => other,
        };
        if mapped == '_' {
            if last_was_sep {
                continue;
            }
            last_was_sep = true;
        } else {
            last_was_sep = false;
        }
        out.push(mapped);
    }
    out.trim_matches('_').to_string()
}

/// BGE citations and docket-shaped references found in the query text,
/// including the whole query itself when it already looks like a docket.
pub fn extract_citation_refs(query: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for m in bge_pattern().find_iter(query) {
        let text: String = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        refs.insert(text);
    }
    for pattern in docket::docket_patterns() {
        for m in pattern.find_iter(query) {
            let normalized = normalize_docket_ref(m.as_str());
            if !normalized.is_empty() {
                refs.insert(normalized);
            }
        }
    }
    if docket::looks_like_docket_query(query) {
        let normalized = normalize_docket_ref(query);
        if !normalized.is_empty() {
            refs.insert(normalized);
        }
    }
    refs
}

/// Up to 5 docket-shaped substrings found inside a longer query, in
/// left-to-right order, deduplicated by normalized form.
pub fn extract_inline_dockets(query: &str) -> Vec<String> {
    let mut matches_with_pos: Vec<(usize, String)> = Vec::new();
    let mut seen = BTreeSet::new();
    for pattern in docket::docket_patterns() {
        for m in pattern.find_iter(query) {
            let raw = m.as_str().trim().to_string();
            let norm = normalize_docket_ref(&raw);
            if raw.is_empty() || norm.len() < 5 || seen.contains(&norm) {
                continue;
            }
            seen.insert(norm);
            matches_with_pos.push((m.start(), raw));
        }
    }
    matches_with_pos.sort_by_key(|(pos, _)| *pos);
    matches_with_pos.into_iter().take(5).map(|(_, raw)| raw).collect()
}

/// Detect advanced FTS5 syntax (boolean operators, wildcards, column filters,
/// balanced quotes) where the raw query should be tried before NL fallbacks.
pub fn has_explicit_fts_syntax(query: &str) -> bool {
    let upper_tokens: Vec<String> = query
        .split(|c: char| !c.is_ascii_alphanumeric())
        .map(|t| t.to_uppercase())
        .collect();
    if upper_tokens.iter().any(|t| matches!(t.as_str(), "AND" | "OR" | "NOT" | "NEAR")) {
        return true;
    }
    if query.contains('*') {
        return true;
    }
    let lower = query.to_lowercase();
    for column in lex_retrieve::schema::FTS_COLUMNS {
        if let Some(idx) = lower.find(column) {
            let after = &lower[idx + column.len()..];
            let before_ok = idx == 0 || !lower.as_bytes()[idx - 1].is_ascii_alphanumeric();
            if before_ok && after.trim_start().starts_with(':') {
                return true;
            }
        }
    }
    let quote_count = query.matches('"').count();
    if quote_count >= 2 && quote_count % 2 == 0 {
        return true;
    }
    false
}

/// Delegates to [`lex_retrieve::docket::looks_like_docket_query`]; kept here so
/// callers only need to import this module for every query-analysis operation.
pub fn looks_like_docket(query: &str) -> bool {
    docket::looks_like_docket_query(query)
}

/// True if the query contains any of the asylum/removal-procedure hint terms.
pub fn has_asyl_signal(terms: &[String]) -> bool {
    terms.iter().any(|t| ASYL_QUERY_TERMS.contains(&t.as_str()))
}

/// True if the query contains decision-intent terms ("arret", "urteil", ...).
pub fn has_decision_intent(terms: &[String]) -> bool {
    terms.iter().any(|t| DECISION_INTENT_TERMS.contains(&t.as_str()))
}

/// True if the query mentions an accelerated-procedure term.
pub fn has_accelerated_procedure_signal(terms: &[String]) -> bool {
    terms.iter().any(|t| ACCELERATED_PROCEDURE_TERMS.contains(&t.as_str()))
}

/// Known legal-concept anchor pairs both present in `terms`, preserving the
/// curated pair order, capped at 2.
pub fn pick_anchor_pairs(terms: &[String]) -> Vec<(&'static str, &'static str)> {
    let term_set: BTreeSet<&str> = terms.iter().map(|t| t.as_str()).collect();
    let mut out = Vec::new();
    for (left, right) in LEGAL_ANCHOR_PAIRS {
        if term_set.contains(left) && term_set.contains(right) {
            out.push((*left, *right));
            if out.len() >= 2 {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_umlaut_and_eszett() {
        assert_eq!(normalize_token("Straße"), "strasse");
        assert_eq!(normalize_for_match("Kündigung"), "kundigung");
    }

    #[test]
    fn extracts_rank_terms_dropping_stopwords_and_columns() {
        let terms = extract_rank_terms("ich suche wegweisung title art 5");
        assert!(terms.contains(&"wegweisung".to_string()));
        assert!(!terms.contains(&"title".to_string()));
        assert!(!terms.contains(&"art".to_string()));
    }

    #[test]
    fn expands_rank_terms_via_curated_map() {
        let terms = vec!["asyl".to_string()];
        let expanded = expand_rank_terms(&terms);
        assert!(expanded.contains(&"asile".to_string()));
        assert!(expanded.len() <= MAX_EXPANSIONS_PER_TERM);
    }

    #[test]
    fn detects_german_language_from_hints() {
        let langs = detect_query_languages("Wegweisung nach Kündigung Bundesgericht");
        assert!(langs.contains(&"de".to_string()));
    }

    #[test]
    fn extracts_statute_ref_with_paragraph() {
        let refs = extract_statute_refs("Art. 8 Abs. 2 BV verletzt");
        assert!(refs.contains("ART.8.BV"));
        assert!(refs.contains("ART.8.ABS.2.BV"));
    }

    #[test]
    fn rejects_invalid_law_token_in_statute_ref() {
        let refs = extract_statute_refs("Art. 5 Abs. 2");
        assert!(refs.is_empty());
    }

    #[test]
    fn extracts_bge_citation() {
        let refs = extract_citation_refs("siehe BGE 141 I 60 dazu");
        assert!(refs.contains("BGE 141 I 60"));
    }

    #[test]
    fn detects_explicit_fts_syntax() {
        assert!(has_explicit_fts_syntax("asyl AND wegweisung"));
        assert!(has_explicit_fts_syntax("title:asyl"));
        assert!(has_explicit_fts_syntax("\"fristlose kuendigung\""));
        assert!(!has_explicit_fts_syntax("fristlose kuendigung"));
    }

    #[test]
    fn extracts_inline_dockets_in_order() {
        let found = extract_inline_dockets("vgl. 6B_123/2024 und später 1C.2023.45");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn picks_known_anchor_pairs() {
        let terms = vec!["fristlos".to_string(), "kuendigung".to_string()];
        let pairs = pick_anchor_pairs(&terms);
        assert_eq!(pairs, vec![("fristlos", "kuendigung")]);
    }
}
