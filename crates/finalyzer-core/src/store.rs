//! Collaborator interfaces consumed by the query engine
//!
//! The engine never talks to storage directly. It is handed a `LedgerStore`
//! (keyword and filtered lookups) and a `SemanticIndex` (nearest-neighbour
//! search over transaction descriptions). `Database` implements the former;
//! `DisabledIndex` stands in for the latter when no vector index is wired in.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Transaction, TransactionCategory, TransactionSource};

/// Criteria for `LedgerStore::get_filtered`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<TransactionCategory>,
    pub source: Option<TransactionSource>,
    pub limit: usize,
}

impl LedgerFilter {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn category(mut self, category: Option<TransactionCategory>) -> Self {
        self.category = category;
        self
    }

    pub fn source(mut self, source: Option<TransactionSource>) -> Self {
        self.source = source;
        self
    }
}

/// Read access to the ledger
///
/// Every method returns rows ordered by date, newest first.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Case-insensitive substring match against description or tags
    async fn search_by_keyword(&self, term: &str, limit: usize) -> Result<Vec<Transaction>>;

    /// Date range / category / source filter
    async fn get_filtered(&self, filter: &LedgerFilter) -> Result<Vec<Transaction>>;

    /// Resolve ids; unknown ids are skipped
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Transaction>>;
}

/// A semantic index match
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHit {
    pub id: i64,
    /// Smaller is closer
    pub distance: f32,
    pub metadata: HashMap<String, String>,
}

/// Nearest-neighbour search over transaction text
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<TransactionCategory>,
    ) -> Result<Vec<SemanticHit>>;
}

/// Semantic index that never matches anything
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIndex;

#[async_trait]
impl SemanticIndex for DisabledIndex {
    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _category: Option<TransactionCategory>,
    ) -> Result<Vec<SemanticHit>> {
        Ok(Vec::new())
    }
}
