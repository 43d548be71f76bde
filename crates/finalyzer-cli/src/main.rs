//! Finalyzer CLI - Natural-language questions over your ledger
//!
//! Usage:
//!   finalyzer init                               Initialize database
//!   finalyzer add --date 2024-03-01 --description "UBER *TRIP" --amount -23.50
//!   finalyzer query "how much did I spend on uber last month"
//!   finalyzer explain "airlines last year"        Show the query plan

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Add {
            date,
            description,
            amount,
            source,
            category,
            tags,
        } => {
            let db = commands::open_db(&cli.db)?;
            let entry =
                commands::new_entry(date, &description, amount, &source, category.as_deref(), &tags)?;
            commands::cmd_add(&db, &entry)
        }
        Commands::Transactions { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_transactions_list(&db, limit)
        }
        Commands::Query { text, json, today } => {
            let engine = commands::build_engine(&cli.db, cli.config.as_deref())?;
            commands::cmd_query(&engine, &text, json, commands::today_or_local(today)).await
        }
        Commands::Explain { text, today } => {
            let engine = commands::build_engine(&cli.db, cli.config.as_deref())?;
            commands::cmd_explain(&engine, &text, commands::today_or_local(today)).await
        }
        Commands::Dates { text, today } => {
            commands::cmd_dates(&text, commands::today_or_local(today))
        }
    }
}
