//! Relative date phrases ("last month", "past 30 days", "in March 2024")
//!
//! Phrases are checked in a fixed order and the first hit wins, so a query
//! like "yesterday vs last month" resolves to yesterday.

use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

use crate::models::DateRange;

#[derive(Clone, Copy)]
enum Unit {
    Days,
    Weeks,
    /// Approximated as 30 days
    Months,
}

static LAST_N_PATTERNS: LazyLock<Vec<(Regex, Unit)>> = LazyLock::new(|| {
    [
        (r"(?:last|past)\s+(\d+)\s+days?", Unit::Days),
        (r"(?:last|past)\s+(\d+)\s+weeks?", Unit::Weeks),
        (r"(?:last|past)\s+(\d+)\s+months?", Unit::Months),
    ]
    .into_iter()
    .map(|(pattern, unit)| (Regex::new(pattern).expect("valid regex"), unit))
    .collect()
});

/// Longer names first so "march" is never read as "mar" and "sept 2022" keeps its year
const MONTH_NAMES: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sept", 9),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

static MONTH_PATTERNS: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    MONTH_NAMES
        .iter()
        .map(|(name, month)| {
            let pattern = format!(r"(?:in|during|for)\s+{}(?:\s+(\d{{4}}))?", name);
            (Regex::new(&pattern).expect("valid regex"), *month)
        })
        .collect()
});

/// Resolve a relative date phrase in `query` against `today`
///
/// Returns `None` when the query has no recognizable phrase.
pub fn resolve_relative_dates(query: &str, today: NaiveDate) -> Option<DateRange> {
    let q = query.to_lowercase();

    if q.contains("yesterday") {
        let yesterday = today.checked_sub_days(Days::new(1))?;
        return Some(DateRange::new(yesterday, yesterday));
    }
    if q.contains("today") && !q.contains("to date") {
        return Some(DateRange::new(today, today));
    }

    let days_since_monday = u64::from(today.weekday().num_days_from_monday());
    if q.contains("this week") {
        let monday = today.checked_sub_days(Days::new(days_since_monday))?;
        return Some(DateRange::new(monday, today));
    }
    if q.contains("last week") {
        let start = today.checked_sub_days(Days::new(days_since_monday + 7))?;
        let end = start.checked_add_days(Days::new(6))?;
        return Some(DateRange::new(start, end));
    }

    if q.contains("this month") {
        return Some(DateRange::new(today.with_day(1)?, today));
    }
    if q.contains("last month") {
        let last_of_prev = today.with_day(1)?.pred_opt()?;
        return Some(DateRange::new(last_of_prev.with_day(1)?, last_of_prev));
    }

    if q.contains("this year") {
        return Some(DateRange::new(
            NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
            today,
        ));
    }
    if q.contains("last year") {
        let year = today.year() - 1;
        return Some(DateRange::new(
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ));
    }

    if q.contains("year to date") || q.contains("ytd") {
        return Some(DateRange::new(
            NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
            today,
        ));
    }

    for (re, unit) in LAST_N_PATTERNS.iter() {
        if let Some(caps) = re.captures(&q) {
            let n: u64 = caps[1].parse().ok()?;
            let days = match unit {
                Unit::Days => n,
                Unit::Weeks => n.checked_mul(7)?,
                Unit::Months => n.checked_mul(30)?,
            };
            return Some(DateRange::new(today.checked_sub_days(Days::new(days))?, today));
        }
    }

    for (re, month) in MONTH_PATTERNS.iter() {
        if let Some(caps) = re.captures(&q) {
            let year = match caps.get(1) {
                Some(y) => y.as_str().parse().ok()?,
                // A month that hasn't happened yet this year means last year's
                None if *month > today.month() => today.year() - 1,
                None => today.year(),
            };
            return month_range(year, *month);
        }
    }

    None
}

/// First and last day of a calendar month
pub(crate) fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(DateRange::new(start, next.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> Option<DateRange> {
        Some(DateRange::new(start, end))
    }

    // 2024-03-15 is a Friday
    const TODAY: (i32, u32, u32) = (2024, 3, 15);

    fn today() -> NaiveDate {
        d(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn test_last_month_across_leap_february() {
        assert_eq!(
            resolve_relative_dates("What did I spend last month?", today()),
            range(d(2024, 2, 1), d(2024, 2, 29))
        );
    }

    #[test]
    fn test_last_month_in_january() {
        assert_eq!(
            resolve_relative_dates("last month", d(2025, 1, 10)),
            range(d(2024, 12, 1), d(2024, 12, 31))
        );
    }

    #[test]
    fn test_yesterday_and_today() {
        assert_eq!(
            resolve_relative_dates("coffee yesterday", today()),
            range(d(2024, 3, 14), d(2024, 3, 14))
        );
        assert_eq!(
            resolve_relative_dates("Spending TODAY", today()),
            range(today(), today())
        );
    }

    #[test]
    fn test_year_to_date_is_not_today() {
        assert_eq!(
            resolve_relative_dates("spending year to date", today()),
            range(d(2024, 1, 1), today())
        );
        assert_eq!(
            resolve_relative_dates("ytd uber", today()),
            range(d(2024, 1, 1), today())
        );
    }

    #[test]
    fn test_weeks_are_monday_anchored() {
        assert_eq!(
            resolve_relative_dates("this week", today()),
            range(d(2024, 3, 11), today())
        );
        assert_eq!(
            resolve_relative_dates("last week", today()),
            range(d(2024, 3, 4), d(2024, 3, 10))
        );
        // On a Monday "this week" is just today
        assert_eq!(
            resolve_relative_dates("this week", d(2024, 3, 11)),
            range(d(2024, 3, 11), d(2024, 3, 11))
        );
    }

    #[test]
    fn test_this_month_and_years() {
        assert_eq!(
            resolve_relative_dates("this month", today()),
            range(d(2024, 3, 1), today())
        );
        assert_eq!(
            resolve_relative_dates("this year", today()),
            range(d(2024, 1, 1), today())
        );
        assert_eq!(
            resolve_relative_dates("groceries last year", today()),
            range(d(2023, 1, 1), d(2023, 12, 31))
        );
    }

    #[test]
    fn test_last_n_units() {
        assert_eq!(
            resolve_relative_dates("past 30 days", today()),
            range(d(2024, 2, 14), today())
        );
        assert_eq!(
            resolve_relative_dates("last 2 weeks", today()),
            range(d(2024, 3, 1), today())
        );
        assert_eq!(
            resolve_relative_dates("last 3 months", today()),
            range(d(2023, 12, 16), today())
        );
        assert_eq!(
            resolve_relative_dates("past 1 day", today()),
            range(d(2024, 3, 14), today())
        );
    }

    #[test]
    fn test_named_months() {
        assert_eq!(
            resolve_relative_dates("food in December 2024", today()),
            range(d(2024, 12, 1), d(2024, 12, 31))
        );
        // Past month this year
        assert_eq!(
            resolve_relative_dates("uber during feb", today()),
            range(d(2024, 2, 1), d(2024, 2, 29))
        );
        // Future month without a year means last year
        assert_eq!(
            resolve_relative_dates("hotels in june", today()),
            range(d(2023, 6, 1), d(2023, 6, 30))
        );
        // Current month stays this year
        assert_eq!(
            resolve_relative_dates("for march", today()),
            range(d(2024, 3, 1), d(2024, 3, 31))
        );
        assert_eq!(
            resolve_relative_dates("for sept 2022", today()),
            range(d(2022, 9, 1), d(2022, 9, 30))
        );
    }

    #[test]
    fn test_precedence_first_match_wins() {
        assert_eq!(
            resolve_relative_dates("yesterday vs last month", today()),
            range(d(2024, 3, 14), d(2024, 3, 14))
        );
        assert_eq!(
            resolve_relative_dates("last month, not last 7 days", today()),
            range(d(2024, 2, 1), d(2024, 2, 29))
        );
    }

    #[test]
    fn test_no_phrase() {
        assert_eq!(resolve_relative_dates("how much on uber", today()), None);
        assert_eq!(resolve_relative_dates("", today()), None);
    }

    #[test]
    fn test_deterministic() {
        let a = resolve_relative_dates("last 10 days", today());
        let b = resolve_relative_dates("last 10 days", today());
        assert_eq!(a, b);
    }

    #[test]
    fn test_absurd_count_does_not_panic() {
        assert_eq!(
            resolve_relative_dates("last 99999999999999999999 days", today()),
            None
        );
        assert_eq!(
            resolve_relative_dates("last 9999999999 months", today()),
            None
        );
    }

    #[test]
    fn test_month_range() {
        assert_eq!(month_range(2023, 2), range(d(2023, 2, 1), d(2023, 2, 28)));
        assert_eq!(month_range(2024, 12), range(d(2024, 12, 1), d(2024, 12, 31)));
        assert_eq!(month_range(2024, 13), None);
    }
}
