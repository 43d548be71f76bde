//! Natural-language query engine
//!
//! Answers free-text questions about the ledger ("how much did I spend on
//! Uber last year?") in five steps:
//!
//! 1. Resolve relative date phrases deterministically (`dates`)
//! 2. Extract a structured intent with the LLM, through a shared cache
//!    (`intent`, `cache`)
//! 3. Select candidate transactions with brand, term, semantic and category
//!    strategies (`retrieval`)
//! 4. Aggregate exact numbers (`stats`)
//! 5. Have the LLM phrase those numbers, or fall back to a template
//!    (`summary`)
//!
//! Only step 3 can fail; LLM trouble degrades to defaults.

pub mod brands;
pub mod cache;
pub mod dates;
pub mod filter;
pub mod intent;
pub mod required_tags;
pub mod retrieval;
pub mod stats;
pub mod summary;

use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::ai::AIClient;
use crate::config::QueryConfig;
use crate::error::Result;
use crate::models::{DateRange, Intent, QueryResponse};
use crate::prompts::PromptLibrary;
use crate::store::{LedgerStore, SemanticIndex};

pub use cache::{Clock, IntentCache, ManualClock, SystemClock};
pub use dates::resolve_relative_dates;
pub use intent::IntentAnalyzer;
pub use required_tags::RequiredTags;
pub use retrieval::{CandidateRetriever, QuerySignals};
pub use stats::{aggregate, Stats};
pub use summary::{SummaryComposer, NO_RESULTS};

/// How a query would be interpreted, without touching the ledger
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    pub date_range: Option<DateRange>,
    pub intent: Intent,
    /// Intent came from the cache rather than the LLM
    pub intent_cached: bool,
    pub brand_keywords: Vec<&'static str>,
    pub required_tags: Vec<&'static str>,
}

/// Resolves natural-language queries against a ledger
pub struct QueryEngine {
    store: Arc<dyn LedgerStore>,
    index: Arc<dyn SemanticIndex>,
    ai: Option<AIClient>,
    cache: Arc<IntentCache>,
    analyzer: IntentAnalyzer,
    composer: SummaryComposer,
    config: QueryConfig,
}

impl QueryEngine {
    /// Create an engine with its own intent cache and the default prompt library
    ///
    /// `ai: None` runs without an LLM: default intents and template summaries.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        index: Arc<dyn SemanticIndex>,
        ai: Option<AIClient>,
        config: QueryConfig,
    ) -> Self {
        let cache = Arc::new(IntentCache::new(&config.cache));
        let prompts = Arc::new(RwLock::new(PromptLibrary::new()));
        Self {
            store,
            index,
            analyzer: IntentAnalyzer::new(ai.clone(), prompts.clone(), config.llm.clone()),
            composer: SummaryComposer::new(ai.clone(), prompts, config.llm.clone()),
            ai,
            cache,
            config,
        }
    }

    /// Share an intent cache between engines
    pub fn with_cache(mut self, cache: Arc<IntentCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a specific prompt library (e.g. embedded prompts only)
    pub fn with_prompt_library(mut self, prompts: PromptLibrary) -> Self {
        let prompts = Arc::new(RwLock::new(prompts));
        self.analyzer =
            IntentAnalyzer::new(self.ai.clone(), prompts.clone(), self.config.llm.clone());
        self.composer = SummaryComposer::new(self.ai.clone(), prompts, self.config.llm.clone());
        self
    }

    pub fn cache(&self) -> &Arc<IntentCache> {
        &self.cache
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Answer a query relative to the local date
    pub async fn resolve_query(&self, query: &str) -> Result<QueryResponse> {
        self.resolve_query_on(query, chrono::Local::now().date_naive())
            .await
    }

    /// Answer a query relative to `today`
    pub async fn resolve_query_on(&self, query: &str, today: NaiveDate) -> Result<QueryResponse> {
        let date_range = resolve_relative_dates(query, today);
        let (intent, cached) = self.intent_for(query, today, date_range).await;
        debug!(?intent, cached, "Intent resolved");

        let retriever = CandidateRetriever::new(
            self.store.as_ref(),
            self.index.as_ref(),
            &self.config.retrieval,
        );
        let transactions = retriever.retrieve(query, &intent).await?;

        let stats = aggregate(&transactions);
        let summary = self.composer.compose(query, &transactions, &stats).await;

        let total_amount = if transactions.is_empty() {
            None
        } else if stats.total_spending == 0.0 {
            Some(0.0)
        } else {
            Some(-stats.total_spending)
        };

        info!(
            matches = transactions.len(),
            total_spending = stats.total_spending,
            "Query resolved"
        );

        Ok(QueryResponse {
            summary,
            transactions,
            total_amount,
        })
    }

    /// Interpret a query without retrieving anything
    ///
    /// The intent is looked up (and cached) exactly as `resolve_query_on` would.
    pub async fn plan(&self, query: &str, today: NaiveDate) -> QueryPlan {
        let date_range = resolve_relative_dates(query, today);
        let (intent, intent_cached) = self.intent_for(query, today, date_range).await;
        let signals = QuerySignals::from_query(query);

        QueryPlan {
            date_range,
            intent,
            intent_cached,
            brand_keywords: signals.brand_keywords,
            required_tags: signals.required_tags.tags().to_vec(),
        }
    }

    /// Cached or freshly analyzed intent, with resolved dates taking precedence
    async fn intent_for(
        &self,
        query: &str,
        today: NaiveDate,
        date_range: Option<DateRange>,
    ) -> (Intent, bool) {
        if let Some(intent) = self.cache.get(query) {
            return (intent.with_date_range(date_range), true);
        }

        let intent = self
            .analyzer
            .analyze(query, today)
            .await
            .with_date_range(date_range);
        self.cache.put(query, intent.clone());
        (intent, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{QueryType, TransactionCategory};
    use crate::store::DisabledIndex;
    use crate::test_utils::{make_transaction, InMemoryLedger};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn engine(store: InMemoryLedger, mock: Option<&MockBackend>) -> QueryEngine {
        QueryEngine::new(
            Arc::new(store),
            Arc::new(DisabledIndex),
            mock.map(|m| AIClient::Mock(m.clone())),
            QueryConfig::default(),
        )
        .with_prompt_library(PromptLibrary::embedded_only())
    }

    #[tokio::test]
    async fn test_no_matches() {
        let engine = engine(InMemoryLedger::new(vec![]), None);
        let response = engine.resolve_query_on("uber", today()).await.unwrap();

        assert_eq!(response.summary, NO_RESULTS);
        assert!(response.transactions.is_empty());
        assert_eq!(response.total_amount, None);
    }

    #[tokio::test]
    async fn test_relative_dates_override_llm_dates() {
        let store = InMemoryLedger::new(vec![
            make_transaction(1, "2024-02-10", "UBER *TRIP", -20.0),
            make_transaction(2, "2024-01-10", "UBER *TRIP", -30.0),
        ]);
        let mock = MockBackend::new();
        mock.push_reply(
            r#"{"start_date": "2023-01-01", "end_date": "2024-12-31", "search_terms": ["uber"], "query_type": "spending"}"#,
        );
        mock.push_reply("You spent $20.00 on Uber last month.");

        let engine = engine(store, Some(&mock));
        let response = engine
            .resolve_query_on("uber last month", today())
            .await
            .unwrap();

        assert_eq!(response.transactions.len(), 1);
        assert_eq!(response.transactions[0].id, 1);
        assert_eq!(response.total_amount, Some(-20.0));
        assert_eq!(response.summary, "You spent $20.00 on Uber last month.");
    }

    #[tokio::test]
    async fn test_intent_is_cached_across_queries() {
        let store = InMemoryLedger::new(vec![make_transaction(1, "2024-02-10", "LYFT", -9.0)]);
        let mock = MockBackend::new();
        mock.push_reply(r#"{"search_terms": ["lyft"], "query_type": "spending"}"#);

        let engine = engine(store, Some(&mock));
        engine.resolve_query_on("Lyft rides", today()).await.unwrap();
        let calls_after_first = mock.calls();
        engine.resolve_query_on("  lyft rides ", today()).await.unwrap();

        // First query: intent + summary; second: summary only
        assert_eq!(calls_after_first, 2);
        assert_eq!(mock.calls(), 3);
        assert_eq!(engine.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_intent_gets_fresh_dates() {
        let store = InMemoryLedger::new(vec![make_transaction(1, "2024-02-10", "LYFT", -9.0)]);
        let engine = engine(store, None);

        let plan = engine.plan("lyft this month", today()).await;
        assert!(!plan.intent_cached);
        assert_eq!(plan.intent.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));

        let plan = engine
            .plan("lyft this month", NaiveDate::from_ymd_opt(2024, 4, 20).unwrap())
            .await;
        assert!(plan.intent_cached);
        assert_eq!(plan.intent.start_date, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(plan.intent.end_date, NaiveDate::from_ymd_opt(2024, 4, 20));
    }

    #[tokio::test]
    async fn test_plan_reports_signals() {
        let engine = engine(InMemoryLedger::new(vec![]), None);
        let plan = engine.plan("starbucks coffee last year", today()).await;

        assert_eq!(plan.brand_keywords, vec!["starbucks"]);
        assert_eq!(plan.required_tags, vec!["starbucks"]);
        assert_eq!(
            plan.date_range,
            Some(DateRange::new(
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
            ))
        );
        assert_eq!(plan.intent.query_type, QueryType::Search);
    }

    #[tokio::test]
    async fn test_credits_only_total_is_zero() {
        let mut refund = make_transaction(1, "2024-02-10", "AMAZON REFUND", 25.0);
        refund.category = Some(TransactionCategory::Shopping);
        let engine = engine(InMemoryLedger::new(vec![refund]), None);

        let response = engine.resolve_query_on("amazon", today()).await.unwrap();
        assert_eq!(response.transactions.len(), 1);
        assert_eq!(response.total_amount, Some(0.0));
        assert!(response.total_amount.unwrap().is_sign_positive());
    }

    #[tokio::test]
    async fn test_retrieval_error_surfaces() {
        let store = InMemoryLedger::new(vec![]);
        store.fail_with("connection reset");
        let engine = engine(store, None);

        assert!(engine.resolve_query_on("uber", today()).await.is_err());
    }
}
