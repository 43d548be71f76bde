//! LLM intent extraction

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, warn};

use crate::ai::parsing::parse_intent_response;
use crate::ai::{complete_within, AIClient, CompletionOptions, LlmBackend};
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::models::{Intent, TransactionCategory};
use crate::prompts::{PromptId, PromptLibrary, RenderedPrompt};

/// Turns a free-text question into an [`Intent`]
///
/// Never fails: without a backend, or when the backend errors, times out or
/// replies with garbage, the default intent comes back instead.
#[derive(Clone)]
pub struct IntentAnalyzer {
    ai: Option<AIClient>,
    prompts: Arc<RwLock<PromptLibrary>>,
    llm: LlmConfig,
}

impl IntentAnalyzer {
    pub fn new(ai: Option<AIClient>, prompts: Arc<RwLock<PromptLibrary>>, llm: LlmConfig) -> Self {
        Self { ai, prompts, llm }
    }

    pub async fn analyze(&self, query: &str, today: NaiveDate) -> Intent {
        let Some(ai) = &self.ai else {
            debug!("No AI backend configured, using default intent");
            return Intent::default();
        };

        match self.try_analyze(ai, query, today).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(model = %ai.model(), "Intent analysis failed, using default intent: {}", e);
                Intent::default()
            }
        }
    }

    async fn try_analyze(&self, ai: &AIClient, query: &str, today: NaiveDate) -> Result<Intent> {
        let rendered = self.render_prompt(query, today)?;

        let mut options = CompletionOptions::new(self.llm.intent_temperature);
        if let Some(system) = rendered.system {
            options = options.with_system(system);
        }

        let response =
            complete_within(self.llm.intent_timeout, ai.complete(&rendered.user, &options)).await?;
        debug!(response_len = response.len(), "Intent response received");

        parse_intent_response(&response)
    }

    fn render_prompt(&self, query: &str, today: NaiveDate) -> Result<RenderedPrompt> {
        let categories = TransactionCategory::all()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let today_str = today.to_string();
        let (last_month_start, last_month_end) = last_month(today)
            .map(|(s, e)| (s.to_string(), e.to_string()))
            .unwrap_or_default();
        let thirty_days_ago = today
            .checked_sub_days(Days::new(30))
            .map(|d| d.to_string())
            .unwrap_or_default();

        let mut vars = HashMap::new();
        vars.insert("query", query);
        vars.insert("today", today_str.as_str());
        vars.insert("categories", categories.as_str());
        vars.insert("last_month_start", last_month_start.as_str());
        vars.insert("last_month_end", last_month_end.as_str());
        vars.insert("thirty_days_ago", thirty_days_ago.as_str());

        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        Ok(prompts.get(PromptId::AnalyzeIntent)?.render(&vars))
    }
}

fn last_month(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let end = today.with_day(1)?.pred_opt()?;
    Some((end.with_day(1)?, end))
}
