//! Mock backend for testing
//!
//! Replies are scripted per test and consumed in order. Every call records the
//! prompt it was given, so tests can assert on how often (and with what) the
//! LLM was consulted. Clones share the same script and call log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::{CompletionOptions, LlmBackend};

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Failure(String),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockReply>,
    fallback: Option<String>,
    delay: Option<Duration>,
    prompts: Vec<String>,
}

/// Mock LLM backend for testing
///
/// With an empty script and no fallback reply, `complete` fails, which
/// exercises the callers' fallback paths.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a new instance with a different model name (shares the script)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            healthy: self.healthy,
            model: model.to_string(),
            state: self.state.clone(),
        }
    }

    /// Queue a successful reply
    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        self.lock().script.push_back(MockReply::Text(text.into()));
        self
    }

    /// Queue a failing call
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.lock()
            .script
            .push_back(MockReply::Failure(message.into()));
        self
    }

    /// Reply used once the script is exhausted
    pub fn set_fallback_reply(&self, text: impl Into<String>) -> &Self {
        self.lock().fallback = Some(text.into());
        self
    }

    /// Sleep before answering every call
    pub fn set_delay(&self, delay: Duration) -> &Self {
        self.lock().delay = Some(delay);
        self
    }

    /// Number of `complete` calls received so far
    pub fn calls(&self) -> usize {
        self.lock().prompts.len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String> {
        let (reply, delay) = {
            let mut state = self.lock();
            state.prompts.push(prompt.to_string());
            let reply = state
                .script
                .pop_front()
                .or_else(|| state.fallback.clone().map(MockReply::Text));
            (reply, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Failure(message)) => Err(Error::Llm(message)),
            None => Err(Error::Llm("mock backend has no scripted reply".into())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
