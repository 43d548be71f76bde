//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Produces the WHERE / ORDER BY / LIMIT pieces shared by keyword search,
//! filtered listing and id lookups, so every ledger read orders rows the
//! same way (newest first).

use chrono::NaiveDate;

use crate::models::{TransactionCategory, TransactionSource};

/// Columns selected by every transaction query, in `row_to_transaction` order
pub const TRANSACTION_COLUMNS: &str =
    "t.id, t.source, t.date, t.description, t.amount, t.category, t.raw_category, t.tags";

/// Builder for constructing transaction query filters
///
/// The lifetime `'query` is how long borrowed parameters (keyword, id list)
/// must remain valid.
#[derive(Default)]
pub struct TransactionFilter<'query> {
    pub keyword: Option<&'query str>,
    pub ids: Option<&'query [i64]>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<TransactionCategory>,
    pub source: Option<TransactionSource>,
    pub limit: Option<usize>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: &'static str,
    /// LIMIT clause (empty if unlimited)
    pub limit_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> TransactionFilter<'query> {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match on description or tags
    pub fn keyword(mut self, keyword: Option<&'query str>) -> Self {
        self.keyword = keyword;
        self
    }

    /// Restrict to a set of ids
    pub fn ids(mut self, ids: Option<&'query [i64]>) -> Self {
        self.ids = ids;
        self
    }

    /// Inclusive date bounds; either side may be open
    pub fn dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn category(mut self, category: Option<TransactionCategory>) -> Self {
        self.category = category;
        self
    }

    pub fn source(mut self, source: Option<TransactionSource>) -> Self {
        self.source = source;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Build the filter components
    pub fn build(self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(keyword) = self.keyword {
            let keyword = keyword.trim();
            if !keyword.is_empty() {
                // SQLite LIKE is case-insensitive for ASCII
                conditions.push(
                    "(t.description LIKE ? ESCAPE '\\' OR t.tags LIKE ? ESCAPE '\\')".to_string(),
                );
                let pattern = format!("%{}%", escape_like(keyword));
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        if let Some(ids) = self.ids {
            if ids.is_empty() {
                // No ids means no rows, not "all rows"
                conditions.push("0".to_string());
            } else {
                let placeholders: Vec<&str> = ids.iter().map(|_| "?").collect();
                conditions.push(format!("t.id IN ({})", placeholders.join(", ")));
                for id in ids {
                    params.push(Box::new(*id));
                }
            }
        }

        if let Some(start) = self.start_date {
            conditions.push("t.date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }

        if let Some(end) = self.end_date {
            conditions.push("t.date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }

        if let Some(category) = self.category {
            conditions.push("t.category = ?".to_string());
            params.push(Box::new(category.as_str()));
        }

        if let Some(source) = self.source {
            conditions.push("t.source = ?".to_string());
            params.push(Box::new(source.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit_clause = match self.limit {
            Some(limit) => format!("LIMIT {}", limit),
            None => String::new(),
        };

        FilterResult {
            where_clause,
            order_clause: "ORDER BY t.date DESC, t.id DESC",
            limit_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Build the full SELECT statement
    pub fn build_select_query(&self) -> String {
        format!(
            "SELECT {} FROM transactions t {} {} {}",
            TRANSACTION_COLUMNS, self.where_clause, self.order_clause, self.limit_clause
        )
    }

    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// Escape LIKE wildcards so keywords match literally
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
