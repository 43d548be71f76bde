//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `build_engine` - Query engine wired to the database and configured LLM
//! - `cmd_init` - Initialize the database

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use finalyzer_core::{AIClient, Database, DisabledIndex, QueryConfig, QueryEngine};

/// Open (or create) the ledger database
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Query engine config from an explicit file, else the per-user override, else defaults
pub fn load_config(config_path: Option<&Path>) -> Result<QueryConfig> {
    match config_path {
        Some(path) => QueryConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => QueryConfig::load().context("Failed to load query config"),
    }
}

/// Engine over the ledger, using whichever LLM backend the environment selects
pub fn build_engine(db_path: &Path, config_path: Option<&Path>) -> Result<QueryEngine> {
    let db = open_db(db_path)?;
    let config = load_config(config_path)?;

    let ai = AIClient::from_env();
    if ai.is_none() {
        tracing::info!("No LLM backend configured (set OLLAMA_HOST); using template summaries");
    }

    Ok(QueryEngine::new(
        Arc::new(db),
        Arc::new(DisabledIndex),
        ai,
        config,
    ))
}

pub fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| chrono::Local::now().date_naive())
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let count = db.count_transactions().context("Failed to read ledger")?;
    println!("   Ledger entries: {}", count);

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record entries: finalyzer add --date 2024-03-01 --description \"UBER *TRIP\" --amount -23.50");
    println!("  2. Ask a question: finalyzer query \"how much did I spend on uber last month\"");

    Ok(())
}
