use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lex_search::engine::{Fields, SearchCore, SearchRequest};
use lex_search::facade::CitationDirection;
use lex_search::prelude::{Config, Filters, SortOrder};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a hybrid search query against the decision index.
    Search {
        query: String,
        #[arg(long)]
        court: Option<String>,
        #[arg(long)]
        canton: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        sort_by_date: bool,
        #[arg(long)]
        compact: bool,
    },
    /// Fetch a single decision by id or docket number.
    GetDecision {
        decision_id: String,
        #[arg(long)]
        full_text: bool,
    },
    /// List citations to and from a decision.
    Citations {
        decision_id: String,
        #[arg(long, default_value = "both")]
        direction: String,
        #[arg(long, default_value_t = 0.0)]
        min_confidence: f64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Walk the prior/subsequent-instance appeal chain for a decision.
    AppealChain { decision_id: String },
    /// Find the most-cited decisions, optionally scoped to a statute or query.
    LeadingCases {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        law_code: Option<String>,
        #[arg(long)]
        article: Option<String>,
        #[arg(long)]
        court: Option<String>,
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Yearly citation-volume trend for a statute or query.
    LegalTrend {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        law_code: Option<String>,
        #[arg(long)]
        article: Option<String>,
        #[arg(long)]
        court: Option<String>,
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
    },
    /// Look up a statute by SR number or abbreviation, optionally one article.
    GetLaw {
        #[arg(long)]
        sr_number: Option<String>,
        #[arg(long)]
        abbreviation: Option<String>,
        #[arg(long)]
        article: Option<String>,
        #[arg(long, default_value = "de")]
        language: String,
    },
    /// Full-text search over statute articles.
    SearchLaws {
        query: String,
        #[arg(long)]
        sr_number: Option<String>,
        #[arg(long, default_value = "de")]
        language: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("loading configuration from environment")?;
    let core = SearchCore::open(config).context("opening search core")?;

    let output = match cli.command {
        Commands::Search {
            query,
            court,
            canton,
            language,
            date_from,
            date_to,
            offset,
            limit,
            sort_by_date,
            compact,
        } => {
            let req = SearchRequest {
                query,
                filters: Filters {
                    court,
                    canton,
                    language,
                    date_from,
                    date_to,
                    chamber: None,
                    decision_type: None,
                },
                offset,
                limit,
                sort: if sort_by_date { SortOrder::DateDesc } else { SortOrder::Relevance },
                fields: if compact { Fields::Compact } else { Fields::Full },
            };
            let (results, total) = core.search(&req)?;
            serde_json::json!({ "total": total, "results": results_to_json(&results) })
        }
        Commands::GetDecision { decision_id, full_text } => {
            let record = core.get_decision(&decision_id, full_text)?;
            serde_json::to_value(&decision_to_json(&record))?
        }
        Commands::Citations { decision_id, direction, min_confidence, limit } => {
            let direction = parse_direction(&direction)?;
            let (outgoing, incoming) = core.find_citations(&decision_id, direction, min_confidence, limit)?;
            serde_json::json!({ "outgoing": outgoing_to_json(&outgoing), "incoming": outgoing_to_json(&incoming) })
        }
        Commands::AppealChain { decision_id } => {
            let chain = core.find_appeal_chain(&decision_id)?;
            serde_json::json!({ "chain": chain.iter().map(appeal_link_to_json).collect::<Vec<_>>() })
        }
        Commands::LeadingCases { query, law_code, article, court, date_from, date_to, limit } => {
            let cases = core.find_leading_cases(
                query.as_deref(),
                law_code.as_deref(),
                article.as_deref(),
                court.as_deref(),
                date_from.as_deref(),
                date_to.as_deref(),
                limit,
            )?;
            serde_json::json!({ "cases": cases.iter().map(leading_case_to_json).collect::<Vec<_>>() })
        }
        Commands::LegalTrend { query, law_code, article, court, date_from, date_to } => {
            let trend = core.analyze_legal_trend(
                query.as_deref(),
                law_code.as_deref(),
                article.as_deref(),
                court.as_deref(),
                date_from.as_deref(),
                date_to.as_deref(),
            )?;
            serde_json::to_value(&trend)?
        }
        Commands::GetLaw { sr_number, abbreviation, article, language } => {
            let law = core.get_law(sr_number.as_deref(), abbreviation.as_deref(), article.as_deref(), &language)?;
            serde_json::to_value(&law_to_json(&law))?
        }
        Commands::SearchLaws { query, sr_number, language, limit } => {
            let hits = core.search_laws(&query, sr_number.as_deref(), &language, limit)?;
            serde_json::json!({ "hits": hits.iter().map(statute_hit_to_json).collect::<Vec<_>>() })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_direction(raw: &str) -> Result<CitationDirection> {
    match raw {
        "outgoing" => Ok(CitationDirection::Outgoing),
        "incoming" => Ok(CitationDirection::Incoming),
        "both" => Ok(CitationDirection::Both),
        other => anyhow::bail!("unknown citation direction: {other}"),
    }
}

fn results_to_json(results: &[lex_search::presentation::SearchResult]) -> Vec<serde_json::Value> {
    results
        .iter()
        .map(|r| {
            serde_json::json!({
                "decision_id": r.decision_id,
                "court": r.court,
                "canton": r.canton,
                "chamber": r.chamber,
                "docket_number": r.docket_number,
                "decision_date": r.decision_date,
                "language": r.language,
                "title": r.title,
                "regeste": r.regeste,
                "snippet": r.snippet,
                "source_url": r.source_url,
                "pdf_url": r.pdf_url,
                "relevance_score": r.relevance_score,
            })
        })
        .collect()
}

fn decision_to_json(record: &lex_search::facade::DecisionRecord) -> serde_json::Value {
    serde_json::json!({
        "decision_id": record.decision_id,
        "court": record.court,
        "canton": record.canton,
        "chamber": record.chamber,
        "docket_number": record.docket_number,
        "decision_date": record.decision_date,
        "language": record.language,
        "title": record.title,
        "regeste": record.regeste,
        "full_text": record.full_text,
        "source_url": record.source_url,
        "pdf_url": record.pdf_url,
    })
}

fn outgoing_to_json(edges: &[lex_search::graph::CitationEdge]) -> Vec<serde_json::Value> {
    edges
        .iter()
        .map(|e| {
            serde_json::json!({
                "decision_id": e.decision_id,
                "target_ref": e.target_ref,
                "mention_count": e.mention_count,
                "confidence_score": e.confidence_score,
            })
        })
        .collect()
}

fn appeal_link_to_json(link: &lex_search::graph::AppealLink) -> serde_json::Value {
    serde_json::json!({
        "decision_id": link.decision_id,
        "relation": format!("{:?}", link.relation),
        "depth": link.depth,
    })
}

fn leading_case_to_json(case: &lex_search::facade::LeadingCaseResult) -> serde_json::Value {
    serde_json::json!({
        "decision_id": case.decision_id,
        "docket_number": case.docket_number,
        "decision_date": case.decision_date,
        "court": case.court,
        "citation_count": case.citation_count,
        "regeste": case.regeste,
        "source_url": case.source_url,
    })
}

fn law_to_json(law: &lex_search::facade::LawRecord) -> serde_json::Value {
    serde_json::json!({
        "sr_number": law.sr_number,
        "title": law.title,
        "abbreviation": law.abbreviation,
        "consolidation_date": law.consolidation_date,
        "article_count": law.article_count,
        "articles": law.articles.iter().map(|a| serde_json::json!({
            "article_num": a.article_num,
            "heading": a.heading,
            "text": a.text,
        })).collect::<Vec<_>>(),
    })
}

fn statute_hit_to_json(hit: &lex_search::facade::StatuteSearchHit) -> serde_json::Value {
    serde_json::json!({
        "sr_number": hit.sr_number,
        "abbreviation": hit.abbreviation,
        "article_num": hit.article_num,
        "heading": hit.heading,
        "snippet": hit.snippet,
    })
}
