//! JSON parsing helpers for LLM responses
//!
//! Models often wrap the JSON payload in markdown code fences or surround it
//! with prose, so the object is located before it is parsed.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Intent, QueryType, TransactionCategory};

/// Remove a surrounding markdown code fence (```json ... ```), if any
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json", "JSON", ...) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Locate the outermost `{ ... }` span in a response
pub fn extract_json_object(response: &str) -> Result<&str> {
    let response = strip_code_fences(response);
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            truncate(response, 200)
        ))),
    }
}

/// Parse an intent from an LLM response
///
/// Only a missing or non-object payload is an error. Each field is read on
/// its own: a field with the wrong type, an unknown category or an
/// unparseable date falls back to that field's default.
pub fn parse_intent_response(response: &str) -> Result<Intent> {
    let json_str = extract_json_object(response)?;
    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid intent JSON from AI: {} | Raw: {}",
            e,
            truncate(json_str, 200)
        ))
    })?;

    let Value::Object(fields) = value else {
        return Err(Error::InvalidData("Intent JSON is not an object".into()));
    };

    Ok(intent_from_fields(&fields))
}

fn intent_from_fields(fields: &Map<String, Value>) -> Intent {
    let defaults = Intent::default();

    let category = match fields.get("category") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => match s.parse::<TransactionCategory>() {
            Ok(category) => Some(category),
            Err(e) => {
                debug!("Dropping intent category: {}", e);
                None
            }
        },
        Some(other) => {
            debug!("Dropping non-string intent category: {}", other);
            None
        }
    };

    let search_terms = match fields.get("search_terms") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            debug!("Dropping intent search_terms: {}", other);
            Vec::new()
        }
    };

    let calculate_total = match fields.get("calculate_total") {
        Some(Value::Bool(b)) => *b,
        None | Some(Value::Null) => defaults.calculate_total,
        Some(other) => {
            debug!("Dropping intent calculate_total: {}", other);
            defaults.calculate_total
        }
    };

    let query_type = fields
        .get("query_type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<QueryType>().ok())
        .unwrap_or(defaults.query_type);

    Intent {
        category,
        start_date: parse_date_field(fields, "start_date"),
        end_date: parse_date_field(fields, "end_date"),
        search_terms,
        calculate_total,
        query_type,
    }
}

fn parse_date_field(fields: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    let raw = fields.get(key)?.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("Dropping intent {} {:?}: {}", key, raw, e);
            None
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_plain_intent() {
        let intent = parse_intent_response(
            r#"{"category": "Food & Dining", "start_date": "2024-12-01", "end_date": "2024-12-31",
                "search_terms": [], "calculate_total": true, "query_type": "spending"}"#,
        )
        .unwrap();

        assert_eq!(intent.category, Some(TransactionCategory::FoodDining));
        assert_eq!(intent.start_date, Some(d(2024, 12, 1)));
        assert_eq!(intent.end_date, Some(d(2024, 12, 31)));
        assert_eq!(intent.query_type, QueryType::Spending);
        assert!(intent.calculate_total);
    }

    #[test]
    fn test_parse_fenced_intent() {
        let response = "```json\n{\"search_terms\": [\"amazon\"], \"calculate_total\": false, \"query_type\": \"search\"}\n```";
        let intent = parse_intent_response(response).unwrap();
        assert_eq!(intent.search_terms, vec!["amazon"]);
        assert!(!intent.calculate_total);
    }

    #[test]
    fn test_parse_intent_with_surrounding_prose() {
        let response = "Sure! Here is the intent:\n{\"search_terms\": [\"uber\"]}\nHope that helps.";
        let intent = parse_intent_response(response).unwrap();
        assert_eq!(intent.search_terms, vec!["uber"]);
        assert!(intent.calculate_total);
        assert_eq!(intent.query_type, QueryType::Search);
    }

    #[test]
    fn test_bad_fields_are_dropped_individually() {
        let intent = parse_intent_response(
            r#"{"category": "Rideshare", "start_date": "last tuesday", "end_date": "2024-03-31",
                "search_terms": ["lyft", 7, ""], "calculate_total": "yes", "query_type": "chart"}"#,
        )
        .unwrap();

        assert_eq!(intent.category, None);
        assert_eq!(intent.start_date, None);
        assert_eq!(intent.end_date, Some(d(2024, 3, 31)));
        assert_eq!(intent.search_terms, vec!["lyft"]);
        assert!(intent.calculate_total);
        assert_eq!(intent.query_type, QueryType::Search);
    }

    #[test]
    fn test_no_json_is_error() {
        let err = parse_intent_response("I cannot help with that.").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_intent_response("{category: Travel}").is_err());
    }

    #[test]
    fn test_strip_code_fences_without_fence() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
    }
}
