//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, build_engine)
//! - `query` - Query, explain and dates commands
//! - `transactions` - Ledger entry commands (add, list)

pub mod core;
pub mod query;
pub mod transactions;

// Re-export command functions for main.rs
pub use core::*;
pub use query::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Colored amount: red for expenses, green for credits
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m${:.2}\x1b[0m", amount.abs())
    } else {
        format!("\x1b[32m+${:.2}\x1b[0m", amount)
    }
}
