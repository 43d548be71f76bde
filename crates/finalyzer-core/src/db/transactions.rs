//! Transaction operations

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};

use super::transaction_filter::TransactionFilter;
use super::Database;
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};
use crate::store::{LedgerFilter, LedgerStore};

/// Dedup key for a ledger entry
///
/// The same statement line imported twice hashes identically.
pub fn transaction_hash(tx: &NewTransaction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tx.source.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(tx.date.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(tx.description.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(format!("{:.2}", tx.amount).as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize tags to the stored form: lowercase, trimmed, unique, non-empty
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

impl Database {
    /// Insert a transaction (skips duplicates based on transaction_hash)
    ///
    /// Returns the new id, or `None` when the entry already exists.
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let hash = transaction_hash(tx);

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE transaction_hash = ?",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None);
        }

        let tags = serde_json::to_string(&normalize_tags(&tx.tags))?;

        conn.execute(
            r#"
            INSERT INTO transactions (source, date, description, amount, category, raw_category, tags, transaction_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.source.as_str(),
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.category.map(|c| c.as_str()),
                tx.raw_category,
                tags,
                hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Replace a transaction's tags
    pub fn update_tags(&self, id: i64, tags: &[String]) -> Result<()> {
        let conn = self.conn()?;
        let tags = serde_json::to_string(&normalize_tags(tags))?;
        let updated = conn.execute(
            "UPDATE transactions SET tags = ? WHERE id = ?",
            params![tags, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self.get_transactions_by_ids(&[id])?.into_iter().next())
    }

    /// Count total transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Most recent transactions first
    pub fn list_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        self.query_transactions(TransactionFilter::new().limit(Some(limit)))
    }

    /// Case-insensitive substring search over description and tags
    pub fn search_transactions(&self, keyword: &str, limit: usize) -> Result<Vec<Transaction>> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.query_transactions(
            TransactionFilter::new()
                .keyword(Some(keyword))
                .limit(Some(limit)),
        )
    }

    /// Date range / category / source listing
    pub fn filter_transactions(&self, filter: &LedgerFilter) -> Result<Vec<Transaction>> {
        self.query_transactions(
            TransactionFilter::new()
                .dates(filter.start_date, filter.end_date)
                .category(filter.category)
                .source(filter.source)
                .limit(Some(filter.limit)),
        )
    }

    /// Resolve a batch of ids; unknown ids are skipped
    pub fn get_transactions_by_ids(&self, ids: &[i64]) -> Result<Vec<Transaction>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Stay well under SQLite's bound-parameter limit
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(500) {
            out.extend(self.query_transactions(TransactionFilter::new().ids(Some(chunk)))?);
        }
        if ids.len() > 500 {
            out.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        }
        Ok(out)
    }

    fn query_transactions(&self, filter: TransactionFilter<'_>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let filter = filter.build();
        let sql = filter.build_select_query();

        let mut stmt = conn.prepare(&sql)?;
        let params_refs = filter.params_refs();
        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(transactions)
    }

    /// Helper to convert a row to Transaction
    /// Column order: see `TRANSACTION_COLUMNS`
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let source_str: String = row.get(1)?;
        let date_str: String = row.get(2)?;
        let category_str: Option<String> = row.get(5)?;
        let tags_str: String = row.get(7)?;

        let source = source_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;
        let date = chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Transaction {
            id: row.get(0)?,
            source,
            date,
            description: row.get(3)?,
            amount: row.get(4)?,
            category: category_str.and_then(|s| s.parse().ok()),
            raw_category: row.get(6)?,
            tags: serde_json::from_str(&tags_str).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn search_by_keyword(&self, term: &str, limit: usize) -> Result<Vec<Transaction>> {
        self.search_transactions(term, limit)
    }

    async fn get_filtered(&self, filter: &LedgerFilter) -> Result<Vec<Transaction>> {
        self.filter_transactions(filter)
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Transaction>> {
        self.get_transactions_by_ids(ids)
    }
}
