//! End-to-end scenarios against an on-disk fixture database, exercising
//! `SearchCore::search` the way a caller actually would: through the
//! engine's public request/response contract rather than any internal
//! retrieval or rerank function directly.

use rusqlite::Connection;
use tempfile::TempDir;

use lex_search::prelude::*;

struct Decision {
    id: &'static str,
    court: &'static str,
    canton: &'static str,
    docket: &'static str,
    date: &'static str,
    language: &'static str,
    title: &'static str,
    regeste: &'static str,
    full_text: &'static str,
}

fn fixture_decisions() -> Vec<Decision> {
    vec![
        Decision {
            id: "bger_2025_6b_1234",
            court: "bger",
            canton: "CH",
            docket: "6B_1234/2025",
            date: "2025-02-10",
            language: "de",
            title: "Betrug und Urkundenfälschung",
            regeste: "Verurteilung wegen gewerbsmässigen Betrugs",
            full_text: "Der Beschwerdeführer wird wegen gewerbsmässigen Betrugs verurteilt.",
        },
        Decision {
            id: "bger_2025_6b_1230",
            court: "bger",
            canton: "CH",
            docket: "6B_1230/2025",
            date: "2025-02-01",
            language: "de",
            title: "Fahrlässige Körperverletzung",
            regeste: "Strafzumessung bei fahrlässiger Körperverletzung",
            full_text: "Der Beschwerdeführer verursachte eine fahrlässige Körperverletzung.",
        },
        Decision {
            id: "bger_2025_6b_1235",
            court: "bger",
            canton: "CH",
            docket: "6B_1235/2025",
            date: "2025-02-05",
            language: "de",
            title: "Hausfriedensbruch",
            regeste: "Verurteilung wegen Hausfriedensbruchs",
            full_text: "Der Beschwerdeführer drang widerrechtlich in ein fremdes Grundstück ein.",
        },
        Decision {
            id: "bger_2024_1c_55",
            court: "bger",
            canton: "VD",
            docket: "1C_55/2024",
            date: "2024-11-20",
            language: "fr",
            title: "Permis de construire un parc éolien",
            regeste: "Le permis de construire pour un parc éolien est annulé pour vice de procédure",
            full_text: "La commune a délivré un permis de construire pour un parc éolien contesté par des riverains.",
        },
        Decision {
            id: "bger_2022_stat_hi",
            court: "bger",
            canton: "CH",
            docket: "1C_10/2022",
            date: "2022-01-01",
            language: "de",
            title: "Diskriminierung am Arbeitsplatz",
            regeste: "Verletzung von Art. 8 EMRK durch Diskriminierung des Arbeitnehmers",
            full_text: "Der Fall betrifft wiederholte Diskriminierung. Diskriminierung wird ausführlich geprüft, Art. 8 EMRK ist einschlägig. Diskriminierung liegt vor.",
        },
        Decision {
            id: "bger_2022_stat_lo",
            court: "bger",
            canton: "CH",
            docket: "1C_11/2022",
            date: "2022-06-01",
            language: "de",
            title: "Diskriminierung im Mietrecht",
            regeste: "Vorwurf der Diskriminierung, Art. 8 EMRK angerufen",
            full_text: "Der Beschwerdeführer rügt Diskriminierung und beruft sich auf Art. 8 EMRK, ohne weitere Vertiefung.",
        },
        Decision {
            id: "bvger_2025_e_100",
            court: "bvger",
            canton: "CH",
            docket: "E-100/2025",
            date: "2025-03-01",
            language: "fr",
            title: "Demande d'asile rejetée",
            regeste: "Renvoi suite à une procédure accélérée",
            full_text: "L'intéressé demande l'asile; le renvoi est ordonné dans le cadre d'une procédure accélérée.",
        },
        Decision {
            id: "bger_2025_asyl_1",
            court: "bger",
            canton: "CH",
            docket: "6B_9999/2025",
            date: "2025-03-01",
            language: "fr",
            title: "Demande d'asile rejetée",
            regeste: "Renvoi suite à une procédure accélérée",
            full_text: "L'intéressé demande l'asile; le renvoi est ordonné dans le cadre d'une procédure accélérée.",
        },
    ]
}

fn build_decisions_db(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE decisions (
            decision_id TEXT, court TEXT, canton TEXT, chamber TEXT, docket_number TEXT,
            decision_date TEXT, language TEXT, title TEXT, regeste TEXT, full_text TEXT,
            source_url TEXT, pdf_url TEXT
        );
        CREATE VIRTUAL TABLE decisions_fts USING fts5(
            decision_id, court, canton, docket_number, language, title, regeste, full_text
        );",
    )
    .unwrap();

    for (idx, d) in fixture_decisions().iter().enumerate() {
        let rowid = (idx + 1) as i64;
        conn.execute(
            "INSERT INTO decisions
             (decision_id, court, canton, chamber, docket_number, decision_date, language, title, regeste, full_text, source_url, pdf_url)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL)",
            rusqlite::params![d.id, d.court, d.canton, d.docket, d.date, d.language, d.title, d.regeste, d.full_text],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO decisions_fts (rowid, decision_id, court, canton, docket_number, language, title, regeste, full_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![rowid, d.id, d.court, d.canton, d.docket, d.language, d.title, d.regeste, d.full_text],
        )
        .unwrap();
    }
}

fn build_graph_db(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE decision_statutes (decision_id TEXT, statute_id TEXT, mention_count INTEGER);
         CREATE TABLE decision_citations (source_decision_id TEXT, target_ref TEXT, mention_count INTEGER);
         CREATE TABLE citation_targets (source_decision_id TEXT, target_ref TEXT, target_decision_id TEXT, confidence_score REAL);
         INSERT INTO decision_statutes VALUES ('bger_2022_stat_hi', 'ART.8.EMRK', 3);",
    )
    .unwrap();
}

struct Fixture {
    _dir: TempDir,
    core: SearchCore,
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    build_decisions_db(&dir.path().join("decisions.db"));
    build_graph_db(&dir.path().join("reference_graph.db"));

    let config = Config {
        index_dir: dir.path().to_path_buf(),
        vector_db_path: dir.path().join("vectors.db"),
        graph_db_path: dir.path().join("reference_graph.db"),
        statutes_db_path: dir.path().join("statutes.db"),
        llm_expansion_enabled: false,
        llm_expansion_timeout_ms: 2000,
        vector_weight: 1.0,
        vector_k: 50,
        vector_signal_weight: 3.0,
        sparse_k: 100,
        sparse_rrf_weight: 1.2,
        sparse_signal_weight: 2.5,
        cross_encoder_enabled: false,
        cross_encoder_weight: 1.4,
        graph_signals_enabled: true,
        auth_token: None,
        cors_origins: None,
    };
    let core = SearchCore::open(config).expect("fixture store should open");
    Fixture { _dir: dir, core }
}

fn request(query: &str) -> SearchRequest {
    SearchRequest { query: query.to_string(), ..SearchRequest::default() }
}

#[test]
fn docket_exact_match_ranks_first() {
    let fx = setup();
    let (results, _total) = fx.core.search(&request("6B_1234/2025")).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].decision_id, "bger_2025_6b_1234");
    assert!(results[0].relevance_score >= 96.0);
}

#[test]
fn space_collapsed_docket_matches_separated_form() {
    let fx = setup();
    let (results, _total) = fx.core.search(&request("6B 1234 2025")).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].decision_id, "bger_2025_6b_1234");
    assert!(results[0].relevance_score >= 96.0);
}

#[test]
fn cross_lingual_concept_query_surfaces_french_result_in_top_three() {
    let fx = setup();
    let (results, _total) = fx.core.search(&request("permis de construire parc éolien")).unwrap();
    assert!(!results.is_empty());
    let position = results.iter().position(|r| r.decision_id == "bger_2024_1c_55");
    assert!(position.is_some(), "expected the wind-farm permit decision to be present");
    assert!(position.unwrap() < 3, "expected it in the top 3, got position {:?}", position);
}

#[test]
fn statute_grounded_query_favors_higher_mention_count() {
    let fx = setup();
    let (results, _total) = fx.core.search(&request("Art. 8 EMRK diskriminierung")).unwrap();
    let hi = results.iter().position(|r| r.decision_id == "bger_2022_stat_hi");
    let lo = results.iter().position(|r| r.decision_id == "bger_2022_stat_lo");
    assert!(hi.is_some() && lo.is_some(), "expected both statute decisions in results");
    assert!(hi.unwrap() < lo.unwrap(), "decision with more statute mentions should outrank the other");
}

#[test]
fn asylum_procedural_query_favors_bvger_over_otherwise_identical_bger_result() {
    let fx = setup();
    let (results, _total) = fx.core.search(&request("asile renvoi procédure accélérée")).unwrap();
    let bvger_pos = results.iter().position(|r| r.decision_id == "bvger_2025_e_100");
    let bger_pos = results.iter().position(|r| r.decision_id == "bger_2025_asyl_1");
    assert!(bvger_pos.is_some() && bger_pos.is_some(), "expected both near-identical decisions in results");
    assert!(bvger_pos.unwrap() < bger_pos.unwrap(), "BVGer decision should outrank the otherwise identical BGer one");
}

#[test]
fn empty_query_with_filters_returns_recent_decisions_with_exact_total() {
    let fx = setup();
    let mut req = request("");
    req.filters.court = Some("bger".to_string());
    req.sort = SortOrder::DateDesc;
    req.limit = 5;
    let (results, total) = fx.core.search(&req).unwrap();

    assert_eq!(total, 7, "7 of the 8 fixture decisions are bger");
    assert_eq!(results.len(), 5);
    let ids: Vec<&str> = results.iter().map(|r| r.decision_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["bger_2025_asyl_1", "bger_2025_6b_1234", "bger_2025_6b_1235", "bger_2025_6b_1230", "bger_2024_1c_55"]
    );
    assert!(results.iter().all(|r| r.court.as_deref() == Some("bger")));
}
