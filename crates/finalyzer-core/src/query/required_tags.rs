//! Tag constraints implied by the query wording
//!
//! "airlines" should not return Uber rides just because both are travel, so
//! queries that name a brand or a narrow kind of spend carry a tag
//! requirement that candidates must satisfy (see `filter::passes`).

/// Set of tags a candidate must match; empty means unconstrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequiredTags(&'static [&'static str]);

/// Tags signalling the airline description check instead of tag matching
pub(crate) const AIRLINE_TAGS: &[&str] = &["airline", "flight"];

impl RequiredTags {
    pub const NONE: RequiredTags = RequiredTags(&[]);

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> &'static [&'static str] {
        self.0
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&tag)
    }

    /// Airline/flight queries are checked against the description only
    pub fn is_airline(&self) -> bool {
        AIRLINE_TAGS.iter().all(|t| self.contains(t))
    }
}

/// Brand tier: checked first, in order; narrow sets naming only the brand
const BRAND_TAGS: &[(&str, &[&str])] = &[
    ("uber eats", &["uber"]),
    ("uber", &["uber"]),
    ("lyft", &["lyft"]),
    ("grab", &["grab"]),
    ("emirates", &["airline"]),
    ("alaska air", &["airline"]),
    ("delta", &["airline"]),
    ("united", &["airline"]),
    ("southwest", &["airline"]),
    ("american airlines", &["airline"]),
    ("jetblue", &["airline"]),
    ("starbucks", &["starbucks"]),
    ("dunkin", &["dunkin"]),
    ("peets", &["peets"]),
    ("amazon", &["amazon"]),
    ("target", &["target"]),
    ("walmart", &["walmart"]),
    ("costco", &["costco"]),
];

/// Category tier: only consulted when no brand phrase matched
const CATEGORY_TAGS: &[(&str, &[&str])] = &[
    ("airline", AIRLINE_TAGS),
    ("airlines", AIRLINE_TAGS),
    ("flight", AIRLINE_TAGS),
    ("flights", AIRLINE_TAGS),
    ("plane", AIRLINE_TAGS),
    ("rideshare", &["rideshare"]),
    ("ride share", &["rideshare"]),
    ("taxi", &["rideshare"]),
    ("hotel", &["hotel", "lodging", "accommodation"]),
    ("hotels", &["hotel", "lodging", "accommodation"]),
    ("lodging", &["hotel", "lodging", "accommodation"]),
    ("accommodation", &["hotel", "lodging", "accommodation"]),
    ("airbnb", &["airbnb", "accommodation"]),
    ("coffee", &["coffee"]),
    ("subscription", &["subscription"]),
    ("subscriptions", &["subscription"]),
    ("streaming", &["streaming"]),
    ("grocery", &["groceries"]),
    ("groceries", &["groceries"]),
    ("supermarket", &["groceries", "supermarket"]),
    ("food delivery", &["delivery"]),
    ("delivery", &["delivery"]),
    ("doordash", &["doordash", "delivery"]),
    ("grubhub", &["grubhub", "delivery"]),
];

/// Resolve the tag requirement for a lowercased query
///
/// The first phrase found (substring match) decides; brand phrases win over
/// category phrases.
pub fn required_tags(query_lower: &str) -> RequiredTags {
    BRAND_TAGS
        .iter()
        .chain(CATEGORY_TAGS)
        .find(|(phrase, _)| query_lower.contains(phrase))
        .map(|(_, tags)| RequiredTags(tags))
        .unwrap_or(RequiredTags::NONE)
}
