//! Finalyzer Core Library
//!
//! Natural-language questions over a personal transaction ledger:
//! - Query engine: date phrases, LLM intent extraction with caching,
//!   brand/tag heuristics, candidate retrieval, exact aggregation and
//!   grounded summaries
//! - Pluggable local AI backends (Ollama, OpenAI-compatible servers)
//! - Prompt library for customizable AI prompts
//! - SQLite ledger store

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod prompts;
pub mod query;
pub mod store;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIClient, CompletionOptions, LlmBackend, MockBackend, OllamaBackend, OpenAICompatibleBackend,
};
pub use config::QueryConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use models::{
    DateRange, Intent, NewTransaction, QueryResponse, QueryType, Transaction,
    TransactionCategory, TransactionSource,
};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use query::{IntentCache, QueryEngine, QueryPlan};
pub use store::{DisabledIndex, LedgerFilter, LedgerStore, SemanticHit, SemanticIndex};
