//! Candidate retrieval
//!
//! Builds the transaction set a query is answered from. Strategies run in
//! order of how much they can be trusted, and the later ones only run when
//! the earlier ones came up empty:
//!
//! - A: brand names in the query, searched directly in descriptions
//! - B: merchant-like search terms from the intent
//! - C: semantic index over the raw query
//! - D: the intent's category, when few candidates were found

use std::collections::HashMap;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::models::{Intent, Transaction};
use crate::store::{LedgerFilter, LedgerStore, SemanticIndex};

use super::brands::extract_brand_keywords;
use super::filter::passes;
use super::required_tags::{required_tags, RequiredTags};

/// Intent search terms too generic to search for literally
const GENERIC_TERMS: &[&str] = &[
    "airline",
    "airlines",
    "flight",
    "flights",
    "restaurant",
    "restaurants",
    "food",
    "dining",
    "hotel",
    "hotels",
    "lodging",
    "accommodation",
    "grocery",
    "groceries",
    "supermarket",
    "gas",
    "fuel",
    "transportation",
    "rideshare",
    "coffee",
    "cafe",
    "subscription",
    "subscriptions",
];

/// The term as given plus its trailing-"s" toggled form
///
/// Short words keep their "s" ("bus" -> "buss").
fn search_variants(term: &str) -> [String; 2] {
    let toggled = match term.strip_suffix('s') {
        Some(stem) if term.chars().count() > 3 => stem.to_string(),
        _ => format!("{}s", term),
    };
    [term.to_string(), toggled]
}

/// Insertion-ordered, id-deduplicated candidate set
#[derive(Default)]
struct CandidateSet {
    order: Vec<i64>,
    by_id: HashMap<i64, Transaction>,
}

impl CandidateSet {
    fn contains(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// First insertion of an id wins
    fn insert(&mut self, txn: Transaction) {
        if self.contains(txn.id) {
            return;
        }
        self.order.push(txn.id);
        self.by_id.insert(txn.id, txn);
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn into_vec(mut self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.remove(id))
            .collect()
    }
}

/// What the retriever saw in the query text, before touching the store
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySignals {
    pub brand_keywords: Vec<&'static str>,
    pub required_tags: RequiredTags,
}

impl QuerySignals {
    pub fn from_query(query: &str) -> Self {
        let query_lower = query.to_lowercase();
        Self {
            brand_keywords: extract_brand_keywords(&query_lower),
            required_tags: required_tags(&query_lower),
        }
    }
}

/// Selects the ledger entries relevant to a query
pub struct CandidateRetriever<'a> {
    store: &'a dyn LedgerStore,
    index: &'a dyn SemanticIndex,
    config: &'a RetrievalConfig,
}

impl<'a> CandidateRetriever<'a> {
    pub fn new(
        store: &'a dyn LedgerStore,
        index: &'a dyn SemanticIndex,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
        }
    }

    /// Run all phases and return candidates newest first
    pub async fn retrieve(&self, query: &str, intent: &Intent) -> Result<Vec<Transaction>> {
        let signals = QuerySignals::from_query(query);
        let required = &signals.required_tags;
        let gate = |txn: &Transaction| passes(txn, required);

        let mut candidates = CandidateSet::default();

        // A: brand keywords, no tag gate
        for keyword in &signals.brand_keywords {
            let hits = self
                .store
                .search_by_keyword(keyword, self.config.brand_search_limit)
                .await
                .map_err(|e| Error::retrieval("brand search", e))?;
            for txn in hits {
                if txn.description.to_lowercase().contains(keyword) {
                    candidates.insert(txn);
                }
            }
        }
        debug!(
            brands = ?signals.brand_keywords,
            candidates = candidates.len(),
            "Brand search done"
        );

        // B: merchant-like search terms
        let mut matched_terms = Vec::new();
        for term in &intent.search_terms {
            if GENERIC_TERMS.contains(&term.to_lowercase().as_str()) {
                continue;
            }

            let mut term_matched = false;
            for variant in search_variants(term) {
                let variant_lower = variant.to_lowercase();
                let hits = self
                    .store
                    .search_by_keyword(&variant, self.config.term_search_limit)
                    .await
                    .map_err(|e| Error::retrieval("term search", e))?;
                for txn in hits {
                    // Only hits not already collected count as a term match
                    if candidates.contains(txn.id)
                        || !txn.description.to_lowercase().contains(&variant_lower)
                    {
                        continue;
                    }
                    term_matched = true;
                    if gate(&txn) {
                        candidates.insert(txn);
                    }
                }
            }
            if term_matched {
                matched_terms.push(term.as_str());
            }
        }
        debug!(
            matched_terms = ?matched_terms,
            candidates = candidates.len(),
            "Term search done"
        );

        // C: semantic fallback
        if signals.brand_keywords.is_empty() && matched_terms.is_empty() {
            let category = if required.is_empty() {
                intent.category
            } else {
                None
            };
            let hits = self
                .index
                .search(query, self.config.semantic_top_k, category)
                .await
                .map_err(|e| Error::retrieval("semantic search", e))?;

            if !hits.is_empty() {
                let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
                let resolved = self
                    .store
                    .get_by_ids(&ids)
                    .await
                    .map_err(|e| Error::retrieval("semantic id lookup", e))?;
                for txn in resolved.into_iter().filter(|t| gate(t)) {
                    candidates.insert(txn);
                }
            }
            debug!(
                hits = hits.len(),
                candidates = candidates.len(),
                "Semantic search done"
            );
        }

        // D: category fallback
        if let Some(category) = intent.category {
            if candidates.len() < self.config.category_fallback_threshold
                && matched_terms.is_empty()
            {
                let filter = LedgerFilter::new(self.config.category_fallback_limit)
                    .dates(intent.start_date, intent.end_date)
                    .category(Some(category));
                let rows = self
                    .store
                    .get_filtered(&filter)
                    .await
                    .map_err(|e| Error::retrieval("category fallback", e))?;
                for txn in rows.into_iter().filter(|t| gate(t)) {
                    candidates.insert(txn);
                }
                debug!(candidates = candidates.len(), "Category fallback done");
            }
        }

        let category_is_hard = signals.brand_keywords.is_empty() && required.is_empty();
        let mut out: Vec<Transaction> = candidates
            .into_vec()
            .into_iter()
            .filter(|t| intent.date_in_range(t.date))
            .filter(|t| match intent.category {
                Some(category) if category_is_hard => t.category == Some(category),
                _ => true,
            })
            .collect();

        // Stable sort keeps discovery order within a day
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out.truncate(self.config.result_limit);
        Ok(out)
    }
}
