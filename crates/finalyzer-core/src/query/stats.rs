//! Exact aggregate facts over a candidate set
//!
//! All arithmetic happens here rather than in the LLM, so the numbers in a
//! summary are always the numbers in the ledger.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::models::Transaction;

/// Sentinel key for transactions without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub count: usize,
    pub spending: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct YearBucket {
    pub count: usize,
    pub spending: f64,
    pub income: f64,
}

/// Aggregates over a list of transactions
///
/// Spending is the absolute value of negative amounts; income is the sum of
/// positive amounts. Map keys: calendar year, source wire name (`amex`),
/// `YYYY-MM`, and category display name or [`UNCATEGORIZED`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_count: usize,
    pub total_spending: f64,
    pub total_income: f64,
    pub by_year: BTreeMap<i32, YearBucket>,
    pub by_source: BTreeMap<String, Bucket>,
    pub by_month: BTreeMap<String, Bucket>,
    pub by_category: BTreeMap<String, Bucket>,
}

impl Stats {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Categories by spending, highest first
    pub fn top_categories(&self, n: usize) -> Vec<(&str, &Bucket)> {
        let mut categories: Vec<_> = self
            .by_category
            .iter()
            .map(|(name, bucket)| (name.as_str(), bucket))
            .collect();
        categories.sort_by(|a, b| b.1.spending.total_cmp(&a.1.spending));
        categories.truncate(n);
        categories
    }
}

fn add(bucket: &mut Bucket, amount: f64) {
    bucket.count += 1;
    if amount < 0.0 {
        bucket.spending += amount.abs();
    }
}

/// Compute [`Stats`] for `transactions`
pub fn aggregate(transactions: &[Transaction]) -> Stats {
    let mut stats = Stats {
        total_count: transactions.len(),
        ..Stats::default()
    };

    for txn in transactions {
        let amount = txn.amount;
        if amount < 0.0 {
            stats.total_spending += amount.abs();
        } else if amount > 0.0 {
            stats.total_income += amount;
        }

        let year = stats.by_year.entry(txn.date.year()).or_default();
        year.count += 1;
        if amount < 0.0 {
            year.spending += amount.abs();
        } else {
            year.income += amount;
        }

        add(
            stats.by_source.entry(txn.source.as_str().to_string()).or_default(),
            amount,
        );
        add(
            stats
                .by_month
                .entry(txn.date.format("%Y-%m").to_string())
                .or_default(),
            amount,
        );
        let category = txn.category.map_or(UNCATEGORIZED, |c| c.as_str());
        add(stats.by_category.entry(category.to_string()).or_default(), amount);
    }

    stats
}
