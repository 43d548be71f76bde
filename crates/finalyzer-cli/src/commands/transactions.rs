//! Transaction command implementations

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use finalyzer_core::{Database, NewTransaction, TransactionCategory, TransactionSource};

use super::{format_amount, truncate};

/// Build a ledger entry from command-line values
pub fn new_entry(
    date: NaiveDate,
    description: &str,
    amount: f64,
    source: &str,
    category: Option<&str>,
    tags: &[String],
) -> Result<NewTransaction> {
    let description = description.trim();
    if description.is_empty() {
        return Err(anyhow!("Description must not be empty"));
    }

    let source: TransactionSource = source.parse().map_err(|e: String| anyhow!(e))?;
    let category = category
        .map(|c| c.parse::<TransactionCategory>())
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let tags = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(NewTransaction {
        source,
        date,
        description: description.to_string(),
        amount,
        category,
        raw_category: None,
        tags,
    })
}

pub fn cmd_add(db: &Database, entry: &NewTransaction) -> Result<()> {
    match db
        .insert_transaction(entry)
        .context("Failed to insert transaction")?
    {
        Some(id) => {
            println!("✅ Added transaction {}:", id);
            println!(
                "   {} │ {:>10} │ {}",
                entry.date,
                format_amount(entry.amount),
                truncate(&entry.description, 40)
            );
        }
        None => {
            println!("Skipped: an identical transaction is already in the ledger.");
        }
    }
    Ok(())
}

pub fn cmd_transactions_list(db: &Database, limit: usize) -> Result<()> {
    let transactions = db.list_transactions(limit)?;

    if transactions.is_empty() {
        println!("No transactions found. Add some with:");
        println!("  finalyzer add --date 2024-03-01 --description \"UBER *TRIP\" --amount -23.50");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let category = tx.category.map_or("", |c| c.as_str());
        println!(
            "   {} │ {:>10} │ {:<40} │ {}",
            tx.date,
            format_amount(tx.amount),
            truncate(&tx.description, 40),
            category
        );
    }

    Ok(())
}
