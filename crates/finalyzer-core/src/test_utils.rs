//! Test utilities for finalyzer-core
//!
//! This module provides testing infrastructure: a mock Ollama server that
//! speaks just enough of the API for the query engine's two prompts, plus
//! in-memory `LedgerStore` / `SemanticIndex` collaborators and fixtures.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionCategory, TransactionSource};
use crate::query::brands::extract_brand_keywords;
use crate::store::{LedgerFilter, LedgerStore, SemanticHit, SemanticIndex};

/// Build a Chase transaction with no category or tags
///
/// `date` is `YYYY-MM-DD`.
pub fn make_transaction(id: i64, date: &str, description: &str, amount: f64) -> Transaction {
    Transaction {
        id,
        source: TransactionSource::ChaseCredit,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid fixture date"),
        description: description.to_string(),
        amount,
        category: None,
        raw_category: None,
        tags: Vec::new(),
    }
}

fn newest_first(txns: &mut [Transaction]) {
    txns.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}

/// `LedgerStore` over a fixed list, with call counting and failure injection
#[derive(Default)]
pub struct InMemoryLedger {
    transactions: Vec<Transaction>,
    failure: Mutex<Option<String>>,
    keyword_calls: AtomicUsize,
    filtered_calls: AtomicUsize,
    id_calls: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Self::default()
        }
    }

    /// Make every subsequent call fail
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.to_string());
    }

    pub fn keyword_calls(&self) -> usize {
        self.keyword_calls.load(Ordering::SeqCst)
    }

    pub fn filtered_calls(&self) -> usize {
        self.filtered_calls.load(Ordering::SeqCst)
    }

    pub fn id_calls(&self) -> usize {
        self.id_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(message) => Err(Error::Io(std::io::Error::other(message.clone()))),
            None => Ok(()),
        }
    }

    fn select(&self, limit: usize, keep: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut out: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| keep(*t))
            .cloned()
            .collect();
        newest_first(&mut out);
        out.truncate(limit);
        out
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn search_by_keyword(&self, term: &str, limit: usize) -> Result<Vec<Transaction>> {
        self.keyword_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let term = term.to_lowercase();
        Ok(self.select(limit, |t| {
            t.description.to_lowercase().contains(&term)
                || t.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
        }))
    }

    async fn get_filtered(&self, filter: &LedgerFilter) -> Result<Vec<Transaction>> {
        self.filtered_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        Ok(self.select(filter.limit, |t| {
            filter.start_date.map_or(true, |d| t.date >= d)
                && filter.end_date.map_or(true, |d| t.date <= d)
                && filter.category.map_or(true, |c| t.category == Some(c))
                && filter.source.map_or(true, |s| t.source == s)
        }))
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Transaction>> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(self.select(usize::MAX, |t| wanted.contains(&t.id)))
    }
}

/// `SemanticIndex` returning a fixed id list, closest first
#[derive(Default)]
pub struct StaticIndex {
    ids: Vec<i64>,
    failing: bool,
    calls: AtomicUsize,
    last_category: Mutex<Option<Option<TransactionCategory>>>,
}

impl StaticIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &[i64]) -> Self {
        Self {
            ids: ids.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Category filter of the most recent search (`None` if never searched)
    pub fn last_category(&self) -> Option<Option<TransactionCategory>> {
        *self.last_category.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SemanticIndex for StaticIndex {
    async fn search(
        &self,
        _query: &str,
        top_k: usize,
        category: Option<TransactionCategory>,
    ) -> Result<Vec<SemanticHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_category.lock().unwrap_or_else(|e| e.into_inner()) = Some(category);
        if self.failing {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "vector store unavailable",
            )));
        }

        Ok(self
            .ids
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, &id)| SemanticHit {
                id,
                distance: rank as f32 * 0.1,
                metadata: Default::default(),
            })
            .collect())
    }
}

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 4_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    // These patterns match the prompt files in prompts/*.md
    let response = if request.prompt.contains("EXACT FACTS") {
        summary_mock(&request.prompt)
    } else if request.prompt.contains("extract the intent as JSON") {
        intent_mock(&request.prompt)
    } else {
        "I can only help with ledger questions.".to_string()
    };

    Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    })
}

/// Rough intent from keywords, wrapped in a code fence like real models do
fn intent_mock(prompt: &str) -> String {
    let query = quoted_after(prompt, "Query: \"").to_lowercase();

    let category = if query.contains("grocer") {
        Some(TransactionCategory::Groceries)
    } else if query.contains("food") || query.contains("restaurant") {
        Some(TransactionCategory::FoodDining)
    } else if query.contains("flight") || query.contains("airline") || query.contains("hotel") {
        Some(TransactionCategory::Travel)
    } else {
        None
    };
    let query_type = if query.contains("compare") {
        "compare"
    } else if query.contains("how much") || query.contains("spend") {
        "spending"
    } else {
        "search"
    };

    let intent = serde_json::json!({
        "category": category.map(|c| c.as_str()),
        "start_date": null,
        "end_date": null,
        "search_terms": extract_brand_keywords(&query),
        "calculate_total": query_type == "spending",
        "query_type": query_type,
    });
    format!("```json\n{}\n```", intent)
}

/// Echo the TOTAL fact back as the answer
fn summary_mock(prompt: &str) -> String {
    let total = prompt
        .lines()
        .find_map(|line| line.trim_start_matches("• ").strip_prefix("TOTAL: "))
        .unwrap_or("no total");
    format!("All told: {}.", total)
}

fn quoted_after(prompt: &str, marker: &str) -> String {
    prompt
        .find(marker)
        .map(|start| &prompt[start + marker.len()..])
        .and_then(|rest| rest.find('"').map(|end| rest[..end].to_string()))
        .unwrap_or_default()
}

#[derive(Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}
