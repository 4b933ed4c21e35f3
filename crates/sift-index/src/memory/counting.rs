//! Facet counting over matched documents.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDateTime, TimeDelta};
use serde_json::Value;
use sift_query::{DateFacet, FacetOptionValue, FacetOptions, GapUnit};

use super::matching::field_values;
use crate::{
    backend::{FacetBuckets, FacetValue},
    document::Document,
    error::BackendError,
    schema::{display_value, parse_stored_datetime},
};

/// Upper bound on the number of date buckets one facet may produce.
const MAX_DATE_BUCKETS: usize = 10_000;

/// Reads an integer option given either as an integer or as text.
fn integer_option(options: &FacetOptions, key: &str) -> Option<i64> {
    match options.get(key)? {
        FacetOptionValue::Integer(n) => Some(*n),
        FacetOptionValue::Text(s) => s.trim().parse().ok(),
        FacetOptionValue::DateTime(_) => None,
    }
}

/// Counts the distinct values of `field`.
///
/// Honours the `mincount` (default 1), `limit` (negative for all) and `sort` (`count` or
/// `index`) options.
pub fn count_field(documents: &[Document], field: &str, options: &FacetOptions) -> FacetBuckets {
    let mut counts: BTreeMap<String, (FacetValue, u64)> = BTreeMap::new();
    for document in documents {
        let mut seen: Vec<String> = Vec::new();
        for value in field_values(document, field) {
            let key = display_value(&value);
            if seen.contains(&key) {
                continue;
            }
            let entry = counts
                .entry(key.clone())
                .or_insert_with(|| (facet_value(&value), 0));
            entry.1 += 1;
            seen.push(key);
        }
    }

    let mincount = integer_option(options, "mincount").unwrap_or(1);
    let mut buckets: FacetBuckets = counts
        .into_values()
        .filter(|(_, count)| i64::try_from(*count).is_ok_and(|c| c >= mincount))
        .collect();
    let by_index = options
        .get("sort")
        .and_then(FacetOptionValue::as_text)
        .is_some_and(|sort| sort == "index");
    if !by_index {
        buckets.sort_by(|a, b| b.1.cmp(&a.1));
    }
    if let Some(limit) = integer_option(options, "limit")
        && let Ok(limit) = usize::try_from(limit)
    {
        buckets.truncate(limit);
    }
    buckets
}

/// Bucket key for a stored value.
fn facet_value(value: &Value) -> FacetValue {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(FacetValue::Integer)
            .or_else(|| n.as_f64().map(FacetValue::Float))
            .unwrap_or_else(|| FacetValue::Text(n.to_string())),
        other => FacetValue::Text(display_value(other)),
    }
}

/// Advances `from` by `amount` units.
fn step(from: NaiveDateTime, unit: GapUnit, amount: i64) -> Option<NaiveDateTime> {
    match unit {
        GapUnit::Year => {
            from.checked_add_months(Months::new(u32::try_from(amount.checked_mul(12)?).ok()?))
        }
        GapUnit::Month => from.checked_add_months(Months::new(u32::try_from(amount).ok()?)),
        GapUnit::Day => from.checked_add_signed(TimeDelta::try_days(amount)?),
        GapUnit::Hour => from.checked_add_signed(TimeDelta::try_hours(amount)?),
        GapUnit::Minute => from.checked_add_signed(TimeDelta::try_minutes(amount)?),
        GapUnit::Second => from.checked_add_signed(TimeDelta::try_seconds(amount)?),
    }
}

/// Counts `field` datetimes per bucket of `facet`. Empty buckets are omitted.
pub fn count_dates(
    documents: &[Document],
    field: &str,
    facet: &DateFacet,
) -> Result<FacetBuckets, BackendError> {
    if facet.gap_amount < 1 {
        return Err(BackendError::Execute(format!(
            "date facet {field} needs a positive gap_amount, got {}",
            facet.gap_amount
        )));
    }
    let stamps: Vec<NaiveDateTime> = documents
        .iter()
        .flat_map(|document| field_values(document, field))
        .filter_map(|value| value.as_str().and_then(parse_stored_datetime))
        .collect();

    let mut buckets = FacetBuckets::new();
    let mut start = facet.start_date;
    let mut produced = 0usize;
    while start < facet.end_date {
        produced += 1;
        if produced > MAX_DATE_BUCKETS {
            return Err(BackendError::Execute(format!(
                "date facet {field} spans more than {MAX_DATE_BUCKETS} buckets"
            )));
        }
        let Some(next) = step(start, facet.gap_by, facet.gap_amount) else {
            break;
        };
        let end = next.min(facet.end_date);
        let count = stamps.iter().filter(|t| **t >= start && **t < end).count() as u64;
        if count > 0 {
            buckets.push((FacetValue::DateTime(start), count));
        }
        start = next;
    }
    Ok(buckets)
}
