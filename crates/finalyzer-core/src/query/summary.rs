//! Grounded answer composition
//!
//! The LLM only phrases the answer. Every number it may use is computed here
//! and handed over as a list of facts it is told to quote verbatim; when the
//! LLM is unavailable a plain template is built from the same numbers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::ai::{complete_within, AIClient, CompletionOptions, LlmBackend};
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionSource};
use crate::prompts::{PromptId, PromptLibrary};

use super::stats::Stats;

/// Answer when retrieval found nothing
pub const NO_RESULTS: &str = "I couldn't find any transactions matching your query.";

const TOP_CATEGORIES: usize = 5;
const TOP_TRANSACTIONS: usize = 5;
const DESCRIPTION_WIDTH: usize = 50;

/// Which breakdown the answer should lead with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// "biggest", "top", "most" ...
    Biggest,
    Category,
    /// Card or statement source
    Source,
    General,
}

#[derive(Debug, Clone, Copy, Default)]
struct QueryShape {
    biggest: bool,
    category: bool,
    source: bool,
}

impl QueryShape {
    fn of(query: &str) -> Self {
        let q = query.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| q.contains(w));
        Self {
            biggest: any(&["biggest", "largest", "top", "most", "highest"]),
            category: any(&["category", "categories"]),
            source: any(&["card", "chase", "amex", "coinbase", "source"]),
        }
    }

    fn focus(&self) -> Focus {
        if self.biggest {
            Focus::Biggest
        } else if self.category {
            Focus::Category
        } else if self.source {
            Focus::Source
        } else {
            Focus::General
        }
    }
}

impl Focus {
    pub fn of(query: &str) -> Self {
        QueryShape::of(query).focus()
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Biggest => "Focus on the CATEGORY breakdown and TOP INDIVIDUAL TRANSACTIONS to answer about biggest/largest expenses.\nList the top spending categories by amount. If individual transactions are provided, mention the largest ones.",
            Self::Category => "Focus on the CATEGORY breakdown to answer the question.",
            Self::Source => "Focus on the CARD breakdown to answer the question.",
            Self::General => "Answer the question using the most relevant facts.",
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn card_label(source: &str) -> &str {
    source
        .parse::<TransactionSource>()
        .map(|s| s.label())
        .unwrap_or(source)
}

/// Ordered fact lines for the summary prompt
pub fn build_facts(query: &str, transactions: &[Transaction], stats: &Stats) -> Vec<String> {
    let shape = QueryShape::of(query);
    let mut facts = vec![format!(
        "TOTAL: {} transactions, ${:.2} spent",
        stats.total_count, stats.total_spending
    )];

    if stats.total_income > 0.0 {
        facts.push(format!(
            "CREDITS: ${:.2} in refunds/credits",
            stats.total_income
        ));
    }

    for (year, bucket) in stats.by_year.iter().rev() {
        facts.push(format!(
            "YEAR {}: {} transactions, ${:.2} spent",
            year, bucket.count, bucket.spending
        ));
    }

    let mut newest = stats.by_year.iter().rev();
    if let (Some((new_year, new)), Some((old_year, old))) = (newest.next(), newest.next()) {
        if old.spending > 0.0 {
            let diff = new.spending - old.spending;
            let pct = diff / old.spending * 100.0;
            if diff > 0.0 {
                facts.push(format!(
                    "CHANGE: +${:.2} (+{:.0}%) from {} to {}",
                    diff, pct, old_year, new_year
                ));
            } else {
                facts.push(format!(
                    "CHANGE: -${:.2} ({:.0}%) from {} to {}",
                    diff.abs(),
                    pct,
                    old_year,
                    new_year
                ));
            }
        }
    }

    if !stats.by_category.is_empty() && (shape.biggest || shape.category || !shape.source) {
        for (name, bucket) in stats.top_categories(TOP_CATEGORIES) {
            if bucket.spending > 0.0 {
                facts.push(format!(
                    "CATEGORY {}: {} transactions, ${:.2}",
                    name, bucket.count, bucket.spending
                ));
            }
        }
    }

    if shape.biggest {
        let mut expenses: Vec<&Transaction> =
            transactions.iter().filter(|t| t.amount < 0.0).collect();
        expenses.sort_by(|a, b| a.amount.total_cmp(&b.amount));
        if !expenses.is_empty() {
            facts.push("TOP INDIVIDUAL TRANSACTIONS:".to_string());
            for txn in expenses.into_iter().take(TOP_TRANSACTIONS) {
                facts.push(format!(
                    "  - ${:.2}: {} ({})",
                    txn.amount.abs(),
                    truncate_chars(&txn.description, DESCRIPTION_WIDTH),
                    txn.date
                ));
            }
        }
    }

    if shape.source || (!shape.biggest && !shape.category) {
        for (source, bucket) in &stats.by_source {
            facts.push(format!(
                "CARD {}: {} transactions, ${:.2}",
                card_label(source),
                bucket.count,
                bucket.spending
            ));
        }
    }

    facts
}

/// Template answer used when the LLM cannot be consulted
pub fn fallback_summary(stats: &Stats) -> String {
    if stats.by_year.len() > 1 {
        let years: Vec<String> = stats
            .by_year
            .iter()
            .rev()
            .map(|(year, b)| format!("{}: {} transactions, ${:.2}", year, b.count, b.spending))
            .collect();
        return format!("Here's the breakdown: {}", years.join(" | "));
    }
    format!(
        "Found {} transactions totaling ${:.2} in spending.",
        stats.total_count, stats.total_spending
    )
}

/// Phrases the final answer from precomputed facts
#[derive(Clone)]
pub struct SummaryComposer {
    ai: Option<AIClient>,
    prompts: Arc<RwLock<PromptLibrary>>,
    llm: LlmConfig,
}

impl SummaryComposer {
    pub fn new(ai: Option<AIClient>, prompts: Arc<RwLock<PromptLibrary>>, llm: LlmConfig) -> Self {
        Self { ai, prompts, llm }
    }

    pub async fn compose(&self, query: &str, transactions: &[Transaction], stats: &Stats) -> String {
        if transactions.is_empty() {
            return NO_RESULTS.to_string();
        }

        let Some(ai) = &self.ai else {
            debug!("No AI backend configured, using template summary");
            return fallback_summary(stats);
        };

        match self.try_compose(ai, query, transactions, stats).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(model = %ai.model(), "Summary generation failed, using template: {}", e);
                fallback_summary(stats)
            }
        }
    }

    async fn try_compose(
        &self,
        ai: &AIClient,
        query: &str,
        transactions: &[Transaction],
        stats: &Stats,
    ) -> Result<String> {
        let facts = build_facts(query, transactions, stats)
            .iter()
            .map(|f| format!("• {}", f))
            .collect::<Vec<_>>()
            .join("\n");

        let rendered = {
            let mut vars = HashMap::new();
            vars.insert("query", query);
            vars.insert("facts", facts.as_str());
            vars.insert("guidance", Focus::of(query).guidance());

            let mut prompts = self
                .prompts
                .write()
                .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
            prompts.get(PromptId::ComposeSummary)?.render(&vars)
        };

        let mut options = CompletionOptions::new(self.llm.summary_temperature);
        if let Some(system) = rendered.system {
            options = options.with_system(system);
        }

        let response =
            complete_within(self.llm.summary_timeout, ai.complete(&rendered.user, &options))
                .await?;
        let summary = response.trim();
        if summary.is_empty() {
            return Err(Error::Llm("Empty summary response".into()));
        }
        Ok(summary.to_string())
    }
}
