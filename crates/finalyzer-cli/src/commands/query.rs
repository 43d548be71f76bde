//! Query command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use finalyzer_core::query::resolve_relative_dates;
use finalyzer_core::QueryEngine;

use super::{format_amount, truncate};

/// Most matches printed below a summary
const MAX_LISTED: usize = 15;

pub async fn cmd_query(engine: &QueryEngine, text: &str, json: bool, today: NaiveDate) -> Result<()> {
    let response = engine
        .resolve_query_on(text, today)
        .await
        .context("Query failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!();
    println!("💬 {}", response.summary);

    if let Some(total) = response.total_amount {
        println!();
        println!(
            "   Total: {} across {} transactions",
            format_amount(total),
            response.transactions.len()
        );
    }

    if !response.transactions.is_empty() {
        println!("   ─────────────────────────────────────────────────────────────");
        for tx in response.transactions.iter().take(MAX_LISTED) {
            println!(
                "   {} │ {:>10} │ {:<40} │ {}",
                tx.date,
                format_amount(tx.amount),
                truncate(&tx.description, 40),
                tx.source.label()
            );
        }
        if response.transactions.len() > MAX_LISTED {
            println!(
                "   ... and {} more (use --json for all)",
                response.transactions.len() - MAX_LISTED
            );
        }
    }

    Ok(())
}

pub async fn cmd_explain(engine: &QueryEngine, text: &str, today: NaiveDate) -> Result<()> {
    let plan = engine.plan(text, today).await;
    let intent = &plan.intent;

    println!();
    println!("🔎 Query plan for \"{}\"", text);
    println!("   ─────────────────────────────");
    match plan.date_range {
        Some(range) => println!("   Date phrase:    {}", range),
        None => println!("   Date phrase:    (none)"),
    }
    println!(
        "   Intent:         {}{}",
        intent.query_type,
        if plan.intent_cached { " (cached)" } else { "" }
    );
    println!(
        "   Category:       {}",
        intent.category.map_or("(any)", |c| c.as_str())
    );
    println!(
        "   Dates:          {} → {}",
        intent
            .start_date
            .map_or_else(|| "…".to_string(), |d| d.to_string()),
        intent
            .end_date
            .map_or_else(|| "…".to_string(), |d| d.to_string())
    );
    println!("   Search terms:   {}", list_or_none(&intent.search_terms));
    println!("   Brands:         {}", list_or_none(&plan.brand_keywords));
    println!("   Required tags:  {}", list_or_none(&plan.required_tags));

    Ok(())
}

pub fn cmd_dates(text: &str, today: NaiveDate) -> Result<()> {
    match resolve_relative_dates(text, today) {
        Some(range) => println!("{}", range),
        None => println!("No relative date phrase found (relative to {}).", today),
    }
    Ok(())
}

fn list_or_none<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
