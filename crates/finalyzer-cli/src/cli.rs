//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Finalyzer - Ask questions about your spending
#[derive(Parser)]
#[command(name = "finalyzer")]
#[command(about = "Natural-language questions over a personal transaction ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "finalyzer.db", global = true)]
    pub db: PathBuf,

    /// Query engine config file (defaults to the per-user override, then built-in values)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Record a ledger entry by hand
    Add {
        /// Transaction date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Statement description, e.g. "UBER *TRIP HELP.UBER.COM"
        #[arg(long)]
        description: String,

        /// Amount (negative = expense, positive = credit)
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,

        /// Statement source: chase_credit, amex, coinbase
        #[arg(long, default_value = "chase_credit")]
        source: String,

        /// Category display name, e.g. "Food & Dining"
        #[arg(long)]
        category: Option<String>,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List recent transactions
    Transactions {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Ask a question about your spending
    Query {
        /// The question, e.g. "how much did I spend on uber last month"
        text: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,

        /// Resolve relative dates against this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Show how a question would be interpreted, without searching
    Explain {
        text: String,

        /// Resolve relative dates against this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Resolve the relative date phrase in a question
    Dates {
        text: String,

        /// Resolve relative dates against this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}
