//! Brand names recognized in query text
//!
//! A brand found in the query is searched for directly in transaction
//! descriptions, which beats both the LLM's search terms and semantic search
//! for recall on a named merchant.

/// Known brands, grouped loosely by kind; scan order is lexicon order
pub const BRAND_LEXICON: &[&str] = &[
    // Rideshare
    "uber", "lyft", "grab", "bolt", "gojek",
    // Food delivery
    "doordash", "grubhub", "postmates", "ubereats", "instacart",
    // Coffee & food
    "starbucks", "dunkin", "chipotle", "mcdonald", "chick-fil-a", "sweetgreen",
    "panera", "subway", "wendy", "taco bell", "panda express",
    // Retail
    "amazon", "target", "walmart", "costco", "whole foods", "trader joe",
    "best buy", "home depot", "lowes", "ikea", "nordstrom", "macys",
    "sephora", "ulta", "cvs", "walgreens",
    // Streaming
    "netflix", "spotify", "hulu", "disney", "hbo", "apple tv", "peacock",
    "youtube", "audible", "kindle",
    // Travel & lodging
    "airbnb", "vrbo", "marriott", "hilton", "hyatt", "expedia", "booking.com",
    // Airlines
    "emirates", "alaska", "delta", "united", "southwest", "american airlines",
    "jetblue", "spirit", "frontier", "hawaiian", "air canada", "british airways",
    // Gas
    "shell", "chevron", "exxon", "tesla", "bp", "arco",
    // Tech & software
    "apple", "google", "microsoft", "adobe", "github", "openai", "chatgpt",
    "dropbox", "zoom", "slack",
    // Health
    "peloton", "planet fitness", "equinox",
    // Telecom
    "at&t", "verizon", "t-mobile", "comcast", "xfinity",
];

/// Every lexicon brand that occurs as a substring of the lowercased query
///
/// Overlapping entries are all reported ("uber eats" yields "uber";
/// "ubereats" yields both "uber" and "ubereats").
pub fn extract_brand_keywords(query_lower: &str) -> Vec<&'static str> {
    BRAND_LEXICON
        .iter()
        .copied()
        .filter(|brand| query_lower.contains(brand))
        .collect()
}
