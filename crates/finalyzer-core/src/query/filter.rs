//! Required-tag gate for retrieval candidates

use crate::models::Transaction;

use super::required_tags::RequiredTags;

/// Words that mark a description as an airline charge
const AIRLINE_SUFFIXES: &[&str] = &["airline", "airways", " air lines"];

/// Carriers written as "<name> air..." on statements
const CARRIER_AIR_FRAGMENTS: &[&str] = &[
    "delta air",
    "united air",
    "american air",
    "southwest air",
    "alaska air",
    "emirates ai",
    "etihad air",
    "qatar air",
    "air canada",
    "air france",
    "air india",
    "air-india",
    "air china",
    "british air",
    "virgin air",
    "hawaiian air",
    "spirit air",
    "frontier air",
    "norwegian air",
];

const BUDGET_CARRIERS: &[&str] = &["jetblue", "ryanair", "easyjet", "airasia"];

/// Whether a transaction satisfies the required tags
///
/// Airline requirements ignore stored tags entirely, since taggers routinely
/// label rideshare and travel-agency charges as "airline".
pub fn passes(txn: &Transaction, required: &RequiredTags) -> bool {
    if required.is_empty() {
        return true;
    }

    let description = txn.description.to_lowercase();

    if required.is_airline() {
        return looks_like_airline(&description);
    }

    required.tags().iter().any(|tag| {
        description.contains(tag) || txn.tags.iter().any(|t| t.to_lowercase() == *tag)
    })
}

fn looks_like_airline(description: &str) -> bool {
    AIRLINE_SUFFIXES
        .iter()
        .chain(CARRIER_AIR_FRAGMENTS)
        .chain(BUDGET_CARRIERS)
        .any(|needle| description.contains(needle))
}
