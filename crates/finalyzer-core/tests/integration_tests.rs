//! Integration tests for finalyzer-core
//!
//! These tests run the full query pipeline against the SQLite ledger:
//! date resolution → intent → retrieval → stats → summary.

use std::sync::Arc;

use chrono::NaiveDate;
use finalyzer_core::{
    query::{aggregate, resolve_relative_dates, SummaryComposer, NO_RESULTS},
    test_utils::{MockOllamaServer, StaticIndex},
    AIClient, Database, DateRange, DisabledIndex, MockBackend, NewTransaction, PromptLibrary,
    QueryConfig, QueryEngine, TransactionCategory, TransactionSource,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn entry(
    date: NaiveDate,
    description: &str,
    amount: f64,
    category: Option<TransactionCategory>,
    tags: &[&str],
) -> NewTransaction {
    NewTransaction {
        source: TransactionSource::ChaseCredit,
        date,
        description: description.to_string(),
        amount,
        category,
        raw_category: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn insert_all(db: &Database, entries: &[NewTransaction]) -> Vec<i64> {
    entries
        .iter()
        .map(|e| {
            db.insert_transaction(e)
                .expect("insert failed")
                .expect("unexpected duplicate")
        })
        .collect()
}

fn engine(db: Database, index: Arc<StaticIndex>, ai: Option<AIClient>) -> QueryEngine {
    QueryEngine::new(Arc::new(db), index, ai, QueryConfig::default())
        .with_prompt_library(PromptLibrary::embedded_only())
}

/// Uber rides over two years, filed under whatever category the importer guessed
fn uber_ledger() -> Vec<NewTransaction> {
    let mut entries = Vec::new();
    for month in 1..=5 {
        entries.push(entry(
            d(2024, month, 3),
            "UBER *TRIP HELP.UBER.COM",
            -30.0,
            Some(TransactionCategory::Travel),
            &["rideshare"],
        ));
    }
    for month in 1..=3 {
        entries.push(entry(
            d(2025, month, 8),
            "UBER *TRIP HELP.UBER.COM",
            -25.0,
            Some(TransactionCategory::Transportation),
            &["rideshare"],
        ));
    }
    for month in 1..=2 {
        entries.push(entry(
            d(2025, month, 20),
            "UBER EATS PENDING",
            -20.0,
            Some(TransactionCategory::FoodDining),
            &["delivery"],
        ));
    }
    // Same kind of spend, different brand
    entries.push(entry(
        d(2025, 2, 1),
        "LYFT *RIDE SAT 11PM",
        -18.0,
        Some(TransactionCategory::Transportation),
        &["rideshare"],
    ));
    entries
}

// =============================================================================
// Query Pipeline Integration Tests
// =============================================================================

#[tokio::test]
async fn test_brand_query_spans_categories_and_years() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    insert_all(&db, &uber_ledger());

    let engine = engine(db, Arc::new(StaticIndex::empty()), None);
    let response = engine
        .resolve_query_on("how much did i spend on uber", d(2025, 6, 1))
        .await
        .unwrap();

    assert_eq!(response.transactions.len(), 10);
    assert!(response
        .transactions
        .iter()
        .all(|t| t.description.starts_with("UBER")));
    assert_eq!(response.total_amount, Some(-265.0));
    // No LLM: template over two years
    assert_eq!(
        response.summary,
        "Here's the breakdown: 2025: 5 transactions, $115.00 | 2024: 5 transactions, $150.00"
    );
}

#[tokio::test]
async fn test_airline_query_returns_only_carriers() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let tags = ["travel", "airline", "flight"];
    let genuine = insert_all(
        &db,
        &[
            entry(d(2024, 4, 2), "EMIRATES AI 1762203506740", -950.0, None, &tags),
            entry(d(2024, 5, 9), "DELTA AIR LINES ATLANTA", -420.0, None, &tags),
            entry(d(2024, 6, 1), "BRITISH AIRWAYS 1252", -610.0, None, &tags),
            entry(d(2024, 7, 4), "JETBLUE 2792", -180.0, None, &tags),
        ],
    );
    let impostors = insert_all(
        &db,
        &[
            entry(d(2024, 4, 2), "SSP EMIRATES LLC", -14.0, None, &tags),
            entry(d(2024, 5, 9), "UBER *TRIP TO AIRPORT", -55.0, None, &tags),
            entry(d(2024, 6, 1), "EXPEDIA 7261", -35.0, None, &tags),
            entry(d(2024, 7, 4), "PRIORITY PASS LOUNGE", -40.0, None, &tags),
        ],
    );

    let everything: Vec<i64> = genuine.iter().chain(&impostors).copied().collect();
    let index = Arc::new(StaticIndex::with_ids(&everything));
    let engine = engine(db, index.clone(), None);

    let response = engine
        .resolve_query_on("airlines", d(2024, 12, 31))
        .await
        .unwrap();

    let mut got: Vec<i64> = response.transactions.iter().map(|t| t.id).collect();
    got.sort();
    let mut want = genuine.clone();
    want.sort();
    assert_eq!(got, want);
    assert_eq!(response.total_amount, Some(-2160.0));
    assert_eq!(index.calls(), 1);
}

#[tokio::test]
async fn test_last_month_query_against_ledger() {
    assert_eq!(
        resolve_relative_dates("last month", d(2024, 3, 15)),
        Some(DateRange::new(d(2024, 2, 1), d(2024, 2, 29)))
    );

    let db = Database::in_memory().expect("Failed to create in-memory database");
    insert_all(
        &db,
        &[
            entry(d(2024, 1, 31), "STARBUCKS 1234", -6.0, None, &["coffee"]),
            entry(d(2024, 2, 1), "STARBUCKS 1234", -5.0, None, &["coffee"]),
            entry(d(2024, 2, 29), "STARBUCKS 1234", -7.0, None, &["coffee"]),
            entry(d(2024, 3, 1), "STARBUCKS 1234", -4.0, None, &["coffee"]),
        ],
    );

    let engine = engine(db, Arc::new(StaticIndex::empty()), None);
    let response = engine
        .resolve_query_on("starbucks last month", d(2024, 3, 15))
        .await
        .unwrap();

    let dates: Vec<NaiveDate> = response.transactions.iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 2, 1)]);
    assert_eq!(response.total_amount, Some(-12.0));
    assert_eq!(
        response.summary,
        "Found 2 transactions totaling $12.00 in spending."
    );
}

#[tokio::test]
async fn test_empty_results_make_no_llm_calls() {
    let stats = aggregate(&[]);
    assert_eq!(stats.total_count, 0);
    assert!(stats.by_year.is_empty());

    let mock = MockBackend::new();
    mock.set_fallback_reply("{}");
    let composer = SummaryComposer::new(
        Some(AIClient::Mock(mock.clone())),
        Arc::new(std::sync::RwLock::new(PromptLibrary::embedded_only())),
        QueryConfig::default().llm,
    );
    assert_eq!(composer.compose("anything", &[], &stats).await, NO_RESULTS);
    assert_eq!(mock.calls(), 0);

    // Through the engine: only the intent call happens
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let engine = QueryEngine::new(
        Arc::new(db),
        Arc::new(DisabledIndex),
        Some(AIClient::Mock(mock.clone())),
        QueryConfig::default(),
    )
    .with_prompt_library(PromptLibrary::embedded_only());
    let response = engine
        .resolve_query_on("netflix", d(2024, 3, 15))
        .await
        .unwrap();

    assert_eq!(response.summary, NO_RESULTS);
    assert_eq!(response.total_amount, None);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_end_to_end_with_mock_ollama() {
    let server = MockOllamaServer::start().await;
    let ai = AIClient::ollama(&server.url(), "llama3.2");

    let db = Database::in_memory().expect("Failed to create in-memory database");
    let mut amex = entry(d(2024, 2, 11), "STARBUCKS STORE 0042", -6.5, None, &[]);
    amex.source = TransactionSource::Amex;
    insert_all(
        &db,
        &[
            entry(d(2024, 2, 10), "STARBUCKS STORE 0042", -5.25, None, &[]),
            amex,
            entry(d(2024, 2, 12), "PEETS COFFEE", -4.0, None, &[]),
        ],
    );

    let engine = engine(db, Arc::new(StaticIndex::empty()), Some(ai));
    let response = engine
        .resolve_query_on("How much did I spend at Starbucks?", d(2024, 3, 15))
        .await
        .unwrap();

    assert_eq!(response.transactions.len(), 2);
    assert_eq!(response.total_amount, Some(-11.75));
    assert_eq!(response.summary, "All told: 2 transactions, $11.75 spent.");

    // Second ask is served from the intent cache
    let plan = engine
        .plan("how much did i spend at starbucks?", d(2024, 3, 15))
        .await;
    assert!(plan.intent_cached);
    assert_eq!(plan.intent.search_terms, vec!["starbucks"]);
}

#[tokio::test]
async fn test_unreachable_llm_degrades_gracefully() {
    // Nothing listens on port 9
    let ai = AIClient::ollama("http://127.0.0.1:9", "llama3.2");

    let db = Database::in_memory().expect("Failed to create in-memory database");
    insert_all(&db, &uber_ledger());

    let engine = engine(db, Arc::new(StaticIndex::empty()), Some(ai));
    let response = engine
        .resolve_query_on("lyft", d(2025, 6, 1))
        .await
        .unwrap();

    assert_eq!(response.transactions.len(), 1);
    assert_eq!(
        response.summary,
        "Found 1 transactions totaling $18.00 in spending."
    );
}
