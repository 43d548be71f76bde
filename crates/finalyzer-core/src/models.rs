//! Domain models for Finalyzer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Statement source a transaction was imported from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    ChaseCredit,
    Amex,
    Coinbase,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChaseCredit => "chase_credit",
            Self::Amex => "amex",
            Self::Coinbase => "coinbase",
        }
    }

    /// Human-readable card label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChaseCredit => "Chase",
            Self::Amex => "Amex",
            Self::Coinbase => "Coinbase",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chase_credit" | "chase" => Ok(Self::ChaseCredit),
            "amex" | "americanexpress" => Ok(Self::Amex),
            "coinbase" => Ok(Self::Coinbase),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed set of spending categories
///
/// Serialized with the display names ("Food & Dining", ...) since that is
/// also the vocabulary the LLM is asked to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    #[serde(rename = "Food & Dining")]
    FoodDining,
    Shopping,
    Transportation,
    Entertainment,
    #[serde(rename = "Bills & Utilities")]
    BillsUtilities,
    Travel,
    Health,
    Groceries,
    Gas,
    Subscriptions,
    Income,
    Transfer,
    Other,
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodDining => "Food & Dining",
            Self::Shopping => "Shopping",
            Self::Transportation => "Transportation",
            Self::Entertainment => "Entertainment",
            Self::BillsUtilities => "Bills & Utilities",
            Self::Travel => "Travel",
            Self::Health => "Health",
            Self::Groceries => "Groceries",
            Self::Gas => "Gas",
            Self::Subscriptions => "Subscriptions",
            Self::Income => "Income",
            Self::Transfer => "Transfer",
            Self::Other => "Other",
        }
    }

    /// All categories in prompt order
    pub fn all() -> &'static [TransactionCategory] {
        &[
            Self::FoodDining,
            Self::Shopping,
            Self::Transportation,
            Self::Entertainment,
            Self::BillsUtilities,
            Self::Travel,
            Self::Health,
            Self::Groceries,
            Self::Gas,
            Self::Subscriptions,
            Self::Income,
            Self::Transfer,
            Self::Other,
        ]
    }
}

impl std::str::FromStr for TransactionCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub source: TransactionSource,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = expense, positive = credit/income
    pub amount: f64,
    pub category: Option<TransactionCategory>,
    /// Category string from the original statement, if any
    pub raw_category: Option<String>,
    /// Lowercase tags assigned by the tagger
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A ledger entry before DB insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub source: TransactionSource,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: Option<TransactionCategory>,
    pub raw_category: Option<String>,
    pub tags: Vec<String>,
}

/// What kind of answer the user is after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Spending,
    #[default]
    Search,
    Summary,
    List,
    Compare,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spending => "spending",
            Self::Search => "search",
            Self::Summary => "summary",
            Self::List => "list",
            Self::Compare => "compare",
        }
    }
}

impl std::str::FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spending" => Ok(Self::Spending),
            "search" => Ok(Self::Search),
            "summary" => Ok(Self::Summary),
            "list" => Ok(Self::List),
            "compare" => Ok(Self::Compare),
            _ => Err(format!("Unknown query type: {}", s)),
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured interpretation of a natural-language query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub category: Option<TransactionCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search_terms: Vec<String>,
    pub calculate_total: bool,
    pub query_type: QueryType,
}

impl Default for Intent {
    /// The intent used whenever the LLM cannot be consulted
    fn default() -> Self {
        Self {
            category: None,
            start_date: None,
            end_date: None,
            search_terms: Vec::new(),
            calculate_total: true,
            query_type: QueryType::Search,
        }
    }
}

impl Intent {
    /// Replace the intent's dates with an authoritative range
    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        if let Some(range) = range {
            self.start_date = Some(range.start);
            self.end_date = Some(range.end);
        }
        self
    }

    /// Whether a transaction date falls inside the intent's (possibly open) range
    pub fn date_in_range(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Answer to a natural-language query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub summary: String,
    pub transactions: Vec<Transaction>,
    /// Negated total spending; `None` when nothing matched
    pub total_amount: Option<f64>,
}
