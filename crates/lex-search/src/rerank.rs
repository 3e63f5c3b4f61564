//! Rerank orchestration: turns a fused candidate pool into the final,
//! sorted, paginated result order. Assembles each candidate's [`Features`],
//! scores it via `lex_rerank::features::linear_score`, applies the optional
//! cross-encoder boost, then sorts and paginates.

use std::collections::BTreeSet;

use lex_rerank::prelude::*;

use crate::analyzer;
use crate::candidates::FusedCandidate;
use crate::config::Config;

/// Fraction of `terms` present in `text` (already normalized for matching).
fn term_coverage(terms: &[String], text: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
    hits as f64 / terms.len() as f64
}

/// A normalized statute reference split into `(article, paragraph, law)`, the
/// pieces needed to build text hints for `local_ref_signal`.
fn parse_statute_ref(ref_: &str) -> Option<(String, Option<String>, String)> {
    let rest = ref_.strip_prefix("ART.")?;
    let (article_part, rest) = rest.split_once('.')?;
    if let Some(abs_rest) = rest.strip_prefix("ABS.") {
        let (paragraph, law) = abs_rest.split_once('.')?;
        Some((article_part.to_string(), Some(paragraph.to_string()), law.to_string()))
    } else {
        Some((article_part.to_string(), None, rest.to_string()))
    }
}

fn text_matches_any_statute_hint(text: &str, statutes: &BTreeSet<String>) -> bool {
    for ref_ in statutes {
        let Some((article, paragraph, law)) = parse_statute_ref(ref_) else { continue };
        let law_lower = law.to_lowercase();
        let mut hints = vec![format!("art {article} {law_lower}"), format!("{article} {law_lower}")];
        if let Some(paragraph) = &paragraph {
            hints.push(format!("abs {paragraph}"));
            hints.push(format!("al {paragraph}"));
            hints.push(format!("cpv {paragraph}"));
            hints.push(format!("co {paragraph}"));
            hints.push(format!("alin {paragraph}"));
        }
        if hints.iter().any(|h| text.contains(h.as_str())) {
            return true;
        }
    }
    false
}

fn text_matches_any_citation_hint(text: &str, citations: &BTreeSet<String>) -> bool {
    citations.iter().any(|ref_| {
        let ref_text = ref_.to_lowercase().replace('_', " ");
        !ref_text.is_empty() && text.contains(ref_text.as_str())
    })
}

/// Query-level signals computed once per rerank pass, shared across all
/// candidates: rank terms, detected query languages, the cleaned phrase, the
/// normalized docket form, and the statute/citation reference sets.
struct QueryContext {
    rank_terms: Vec<String>,
    expanded_rank_terms: Vec<String>,
    query_has_asyl_signal: bool,
    query_has_decision_intent: bool,
    query_has_accelerated_signal: bool,
    query_languages: BTreeSet<String>,
    cleaned_phrase: String,
    query_norm: String,
    query_statutes: BTreeSet<String>,
    query_citations: BTreeSet<String>,
}

fn build_query_context(raw_query: &str) -> QueryContext {
    let rank_terms = analyzer::extract_rank_terms(raw_query);
    let expanded_rank_terms = analyzer::expand_rank_terms(&rank_terms);
    let all_rank_terms: BTreeSet<String> =
        rank_terms.iter().cloned().chain(expanded_rank_terms.iter().cloned()).collect();

    let query_has_asyl_signal = analyzer::has_asyl_signal(&rank_terms);
    let query_has_decision_intent = analyzer::has_decision_intent(&rank_terms);
    let query_has_accelerated_signal = all_rank_terms
        .iter()
        .any(|t| analyzer::ACCELERATED_PROCEDURE_TERMS.contains(&t.as_str()) || t.starts_with("beschleunig"));

    let query_languages: BTreeSet<String> = analyzer::detect_query_languages(raw_query).into_iter().collect();
    let cleaned_phrase = analyzer::normalize_for_match(&analyzer::tokenize(raw_query).join(" "));
    let query_norm = lex_retrieve::docket::normalize_docket(raw_query);
    let query_statutes = analyzer::extract_statute_refs(raw_query);
    let query_citations = analyzer::extract_citation_refs(raw_query);

    QueryContext {
        rank_terms,
        expanded_rank_terms,
        query_has_asyl_signal,
        query_has_decision_intent,
        query_has_accelerated_signal,
        query_languages,
        cleaned_phrase,
        query_norm,
        query_statutes,
        query_citations,
    }
}

/// Score every candidate with the linear feature combination, apply an
/// optional cross-encoder boost to the top 30, then sort and paginate.
pub fn rerank(
    raw_query: &str,
    candidates: Vec<FusedCandidate>,
    config: &Config,
    cross_encoder: Option<&dyn CrossEncoder>,
    order: SortOrder,
    offset: usize,
    limit: usize,
) -> Vec<Scored<FusedCandidate>> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let ctx = build_query_context(raw_query);

    let mut max_sparse = 0.0f64;
    for c in &candidates {
        if let Some(s) = c.sparse_score {
            if s > max_sparse {
                max_sparse = s;
            }
        }
    }

    let mut scored: Vec<Scored<FusedCandidate>> = Vec::with_capacity(candidates.len());
    let mut documents: Vec<String> = Vec::with_capacity(candidates.len());

    for (idx, candidate) in candidates.into_iter().enumerate() {
        let row = &candidate.row;
        let title_text = analyzer::normalize_for_match(row.title.as_deref().unwrap_or(""));
        let regeste_text = analyzer::normalize_for_match(row.regeste.as_deref().unwrap_or(""));
        let snippet_text = analyzer::normalize_for_match(row.snippet.as_deref().unwrap_or(""));
        let docket_norm = lex_retrieve::docket::normalize_docket(row.docket_number.as_deref().unwrap_or(""));

        let (title_cov, regeste_cov, snippet_cov) = if ctx.rank_terms.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                term_coverage(&ctx.rank_terms, &title_text),
                term_coverage(&ctx.rank_terms, &regeste_text),
                term_coverage(&ctx.rank_terms, &snippet_text),
            )
        };
        let (expanded_title_cov, expanded_regeste_cov) = if ctx.expanded_rank_terms.is_empty() {
            (0.0, 0.0)
        } else {
            (
                term_coverage(&ctx.expanded_rank_terms, &title_text),
                term_coverage(&ctx.expanded_rank_terms, &regeste_text),
            )
        };

        let mut phrase_hit = 0.0;
        if !ctx.cleaned_phrase.is_empty() {
            if title_text.contains(&ctx.cleaned_phrase) || regeste_text.contains(&ctx.cleaned_phrase) {
                phrase_hit += 1.0;
            }
            if snippet_text.contains(&ctx.cleaned_phrase) {
                phrase_hit += 0.5;
            }
        }

        let docket_exact =
            if !ctx.query_norm.is_empty() && !docket_norm.is_empty() && ctx.query_norm == docket_norm { 1.0 } else { 0.0 };
        let docket_partial = if docket_exact == 0.0
            && !ctx.query_norm.is_empty()
            && !docket_norm.is_empty()
            && ctx.query_norm.chars().count() >= 5
            && docket_norm.contains(&ctx.query_norm)
        {
            1.0
        } else {
            0.0
        };

        let statute_mentions = candidate.graph.statute_mentions;
        let query_citation_hits = candidate.graph.query_citation_hits;
        let incoming_citations = candidate.graph.incoming_citations;

        let statute_sig = statute_signal(!ctx.query_statutes.is_empty(), statute_mentions);
        let citation_sig = citation_signal(!ctx.query_citations.is_empty(), query_citation_hits);
        let authority_sig = authority_signal(incoming_citations);

        let local_text = format!("{title_text} {regeste_text} {snippet_text}");
        let mut local_ref_signal = 0.0;
        if !ctx.query_statutes.is_empty() && text_matches_any_statute_hint(&local_text, &ctx.query_statutes) {
            local_ref_signal += 0.8;
        }
        if !ctx.query_citations.is_empty() && text_matches_any_citation_hint(&local_text, &ctx.query_citations) {
            local_ref_signal += 0.8;
        }

        let mut court_prior_signal = 0.0;
        if ctx.query_has_asyl_signal {
            let court = row.court.as_deref().unwrap_or("").to_lowercase();
            let docket = row.docket_number.as_deref().unwrap_or("");
            if court == "bvger" {
                court_prior_signal += 1.7;
            }
            if court == "bger" {
                court_prior_signal -= 0.2;
            }
            if docket.to_uppercase().starts_with("E-") {
                court_prior_signal += 0.45;
            }
        }

        let mut court_intent_signal = 0.0;
        if ctx.query_has_decision_intent {
            let court = row.court.as_deref().unwrap_or("").to_lowercase();
            if analyzer::HIGH_COURTS.contains(&court.as_str()) {
                court_intent_signal += 0.65;
            }
        }

        let mut procedure_signal = 0.0;
        if ctx.query_has_asyl_signal
            && ctx.query_has_accelerated_signal
            && analyzer::ACCELERATED_PROCEDURE_TERMS.iter().any(|term| local_text.contains(*term))
        {
            procedure_signal += 0.9;
        }

        let mut language_signal = 0.0;
        let row_language = row.language.as_deref().unwrap_or("").to_lowercase();
        if !ctx.query_languages.is_empty() && ctx.query_languages.contains(&row_language) {
            language_signal += 0.9;
        }

        let vector_sig = vector_signal(candidate.vector_distance, config.vector_signal_weight);
        let sparse_sig = sparse_signal(candidate.sparse_score, max_sparse, config.sparse_signal_weight);

        let features = Features {
            bm25_score: row.best_bm25,
            docket_exact,
            docket_partial,
            title_coverage: title_cov,
            regeste_coverage: regeste_cov,
            snippet_coverage: snippet_cov,
            expanded_regeste_coverage: expanded_regeste_cov,
            expanded_title_coverage: expanded_title_cov,
            phrase_hit,
            rrf_score: candidate.rrf_score,
            strategy_hits: row.strategy_hits,
            statute_signal: statute_sig,
            citation_signal: citation_sig,
            authority_signal: authority_sig,
            local_ref_signal,
            court_prior_signal,
            court_intent_signal,
            procedure_signal,
            language_signal,
            vector_signal: vector_sig,
            sparse_signal: sparse_sig,
        };

        let final_score = linear_score(&features);
        documents.push(build_document_text(
            row.title.as_deref().unwrap_or(""),
            row.regeste.as_deref().unwrap_or(""),
            row.snippet.as_deref().unwrap_or(""),
            row.full_text.as_deref().unwrap_or(""),
        ));

        scored.push(Scored {
            score: final_score,
            bm25_score: row.best_bm25,
            source_index: idx,
            date: row.decision_date.clone(),
            item: candidate,
        });
    }

    if config.cross_encoder_enabled {
        if let Some(encoder) = cross_encoder {
            let mut raw_scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
            apply_boost(encoder, raw_query, &documents, &mut raw_scores, 30, config.cross_encoder_weight);
            for (s, boosted) in scored.iter_mut().zip(raw_scores) {
                s.score = boosted;
            }
        }
    }

    sort_and_paginate(scored, order, offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_retrieve::fts::CandidateRow;

    fn candidate(id: &str, title: &str, bm25: f64, rrf: f64) -> FusedCandidate {
        FusedCandidate {
            row: CandidateRow {
                decision_id: id.to_string(),
                court: Some("bger".to_string()),
                canton: None,
                chamber: None,
                docket_number: None,
                decision_date: Some("2024-01-01".to_string()),
                language: Some("de".to_string()),
                title: Some(title.to_string()),
                regeste: None,
                full_text: None,
                snippet: None,
                source_url: None,
                pdf_url: None,
                best_bm25: bm25,
                rrf_score: rrf,
                strategy_hits: 2,
            },
            rrf_score: rrf,
            vector_distance: None,
            sparse_score: None,
            graph: crate::graph::GraphSignals::default(),
        }
    }

    #[test]
    fn empty_pool_reranks_to_empty() {
        let cfg = Config::from_env().unwrap();
        let out = rerank("asyl", Vec::new(), &cfg, None, SortOrder::Relevance, 0, 10);
        assert!(out.is_empty());
    }

    #[test]
    fn higher_title_coverage_ranks_first() {
        let cfg = Config::from_env().unwrap();
        let candidates = vec![
            candidate("a", "irrelevant text about tax law", 5.0, 0.01),
            candidate("b", "fristlose kuendigung wegen mobbing", 5.0, 0.01),
        ];
        let out = rerank("fristlose kuendigung mobbing", candidates, &cfg, None, SortOrder::Relevance, 0, 10);
        assert_eq!(out[0].item.row.decision_id, "b");
    }

    #[test]
    fn docket_exact_match_dominates_score() {
        let cfg = Config::from_env().unwrap();
        let mut exact = candidate("exact", "unrelated", 5.0, 0.0);
        exact.row.docket_number = Some("6B_1/2025".to_string());
        let other = candidate("other", "unrelated", 1.0, 0.0);
        let out = rerank("6B_1/2025", vec![exact, other], &cfg, None, SortOrder::Relevance, 0, 10);
        assert_eq!(out[0].item.row.decision_id, "exact");
    }
}
