//! Query engine configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/finalyzer/config/query.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/query.toml");

/// Intent cache sizing
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
    pub evict_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_entries: 1000,
            evict_batch: 100,
        }
    }
}

/// Limits used by the candidate retriever
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub result_limit: usize,
    pub brand_search_limit: usize,
    pub term_search_limit: usize,
    pub semantic_top_k: usize,
    pub category_fallback_limit: usize,
    pub category_fallback_threshold: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            result_limit: 200,
            brand_search_limit: 1000,
            term_search_limit: 500,
            semantic_top_k: 200,
            category_fallback_limit: 500,
            category_fallback_threshold: 50,
        }
    }
}

/// Per-call LLM settings
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub intent_timeout: Duration,
    pub intent_temperature: f32,
    pub summary_timeout: Duration,
    pub summary_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            intent_timeout: Duration::from_secs(20),
            intent_temperature: 0.1,
            summary_timeout: Duration::from_secs(15),
            summary_temperature: 0.4,
        }
    }
}

/// Complete query engine configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryConfig {
    pub cache: CacheConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

impl QueryConfig {
    /// Load from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit override path (embedded defaults if it does not exist)
    pub fn load_from(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("finalyzer").join("config").join("query.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<QueryConfig> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let content = match path {
        Some(ref path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    cache: Option<RawCache>,
    retrieval: Option<RawRetrieval>,
    llm: Option<RawLlm>,
}

#[derive(Debug, Deserialize)]
struct RawCache {
    ttl_secs: Option<u64>,
    max_entries: Option<usize>,
    evict_batch: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawRetrieval {
    result_limit: Option<usize>,
    brand_search_limit: Option<usize>,
    term_search_limit: Option<usize>,
    semantic_top_k: Option<usize>,
    category_fallback_limit: Option<usize>,
    category_fallback_threshold: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawLlm {
    intent_timeout_secs: Option<u64>,
    intent_temperature: Option<f32>,
    summary_timeout_secs: Option<u64>,
    summary_temperature: Option<f32>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<QueryConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = QueryConfig::default();

    if let Some(cache) = raw.cache {
        if let Some(ttl) = cache.ttl_secs {
            config.cache.ttl = Duration::from_secs(ttl);
        }
        if let Some(max) = cache.max_entries {
            config.cache.max_entries = max;
        }
        if let Some(batch) = cache.evict_batch {
            config.cache.evict_batch = batch;
        }
    }

    if let Some(retrieval) = raw.retrieval {
        let r = &mut config.retrieval;
        if let Some(v) = retrieval.result_limit {
            r.result_limit = v;
        }
        if let Some(v) = retrieval.brand_search_limit {
            r.brand_search_limit = v;
        }
        if let Some(v) = retrieval.term_search_limit {
            r.term_search_limit = v;
        }
        if let Some(v) = retrieval.semantic_top_k {
            r.semantic_top_k = v;
        }
        if let Some(v) = retrieval.category_fallback_limit {
            r.category_fallback_limit = v;
        }
        if let Some(v) = retrieval.category_fallback_threshold {
            r.category_fallback_threshold = v;
        }
    }

    if let Some(llm) = raw.llm {
        if let Some(secs) = llm.intent_timeout_secs {
            config.llm.intent_timeout = Duration::from_secs(secs);
        }
        if let Some(t) = llm.intent_temperature {
            config.llm.intent_temperature = t;
        }
        if let Some(secs) = llm.summary_timeout_secs {
            config.llm.summary_timeout = Duration::from_secs(secs);
        }
        if let Some(t) = llm.summary_temperature {
            config.llm.summary_temperature = t;
        }
    }

    if config.cache.evict_batch == 0 {
        return Err(Error::Config("cache.evict_batch must be at least 1".into()));
    }

    Ok(config)
}
