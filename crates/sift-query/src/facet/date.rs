//! Permissive date parsing for facet options.
//!
//! Accepts the spellings people type into a query string: ISO dates and datetimes, RFC 3339,
//! `Jan 1 2020`, `1 January 2020`, `01/31/2020`, with optional ordinal suffixes (`Jan 1st 2020`).
//! Dates without a time resolve to midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Datetime layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
];

/// Date layouts, tried in order after the datetime layouts.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

/// Parses `input` as a date or datetime.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let cleaned = strip_ordinals(input.trim());
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(cleaned) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Removes English ordinal suffixes directly following a digit (`1st`, `2nd`, `3rd`, `10th`).
fn strip_ordinals(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let mut prev_digit = false;
    while let Some((i, c)) = chars.next() {
        if prev_digit && c.is_ascii_alphabetic() {
            let rest = &input[i..];
            let is_ordinal = rest.get(..2).is_some_and(|suffix| {
                matches!(
                    suffix.to_ascii_lowercase().as_str(),
                    "st" | "nd" | "rd" | "th"
                ) && !rest[2..].chars().next().is_some_and(char::is_alphabetic)
            });
            if is_ordinal {
                chars.next();
                prev_digit = false;
                continue;
            }
        }
        prev_digit = c.is_ascii_digit();
        out.push(c);
    }
    out
}
