//! Facet option values and the `option:value` parser.

use std::{
    collections::{BTreeMap, btree_map},
    fmt,
    str::FromStr,
};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use super::date::parse_datetime;
use crate::{
    diagnostic::{Diagnostic, Parsed},
    error::QueryError,
    tokenizer::tokenize,
};

/// Delimiter between an option name and its value.
pub const OPTION_DELIMITER: char = ':';

/// Option holding the first date of a date facet.
pub const START_DATE: &str = "start_date";
/// Option holding the last date of a date facet.
pub const END_DATE: &str = "end_date";
/// Option holding the bucket unit of a date facet.
pub const GAP_BY: &str = "gap_by";
/// Option holding the bucket width of a date facet.
pub const GAP_AMOUNT: &str = "gap_amount";

/// Options whose presence marks a facet as a date facet.
pub const DATE_OPTIONS: [&str; 4] = [START_DATE, END_DATE, GAP_BY, GAP_AMOUNT];

/// Bucket unit of a date facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapUnit {
    /// Calendar years.
    Year,
    /// Calendar months.
    Month,
    /// Days.
    Day,
    /// Hours.
    Hour,
    /// Minutes.
    Minute,
    /// Seconds.
    Second,
}

impl GapUnit {
    /// Lowercase name as used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for GapUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GapUnit {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "hour" => Self::Hour,
            "minute" => Self::Minute,
            "second" => Self::Second,
            _ => {
                return Err(QueryError::InvalidGapUnit {
                    value: s.to_string(),
                });
            }
        })
    }
}

/// A typed facet option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FacetOptionValue {
    /// Anything without a dedicated type.
    Text(String),
    /// `start_date` and `end_date`.
    DateTime(NaiveDateTime),
    /// `gap_amount`, and integer options declared in code.
    Integer(i64),
}

impl FacetOptionValue {
    /// Returns the text value, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the datetime value, if this is one.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Returns the integer value, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FacetOptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FacetOptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FacetOptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for FacetOptionValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<i64> for FacetOptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Options for one facet field, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FacetOptions(BTreeMap<String, FacetOptionValue>);

impl FacetOptions {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FacetOptionValue>,
    ) -> Option<FacetOptionValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FacetOptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns an option.
    pub fn get(&self, key: &str) -> Option<&FacetOptionValue> {
        self.0.get(key)
    }

    /// Removes an option.
    pub fn remove(&mut self, key: &str) -> Option<FacetOptionValue> {
        self.0.remove(key)
    }

    /// Returns true if `key` is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Overlays `other` onto `self`; keys in `other` win.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Returns true if any date facet option is set.
    pub fn has_date_options(&self) -> bool {
        DATE_OPTIONS.iter().any(|key| self.0.contains_key(*key))
    }

    /// Iterates over options in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FacetOptionValue> {
        self.0.iter()
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for FacetOptions {
    type Item = (String, FacetOptionValue);
    type IntoIter = btree_map::IntoIter<String, FacetOptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FacetOptions {
    type Item = (&'a String, &'a FacetOptionValue);
    type IntoIter = btree_map::Iter<'a, String, FacetOptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parses `option:value` tokens from the raw values of one facet parameter.
///
/// Tokens are split on `pair_separator`. A token that is not exactly one `option:value` pair
/// is skipped and reported as a diagnostic. `start_date` and `end_date` are parsed as dates and
/// `gap_amount` as an integer; failures there are errors. Later tokens override earlier ones.
pub fn parse_field_options(
    values: &[String],
    pair_separator: &str,
) -> Result<Parsed<FacetOptions>, QueryError> {
    let mut options = FacetOptions::new();
    let mut diagnostics = Vec::new();

    for token in tokenize(values, pair_separator) {
        let mut pieces = token.split(OPTION_DELIMITER);
        let (Some(key), Some(value), None) = (pieces.next(), pieces.next(), pieces.next()) else {
            warn!(token, "skipping malformed facet option");
            diagnostics.push(Diagnostic::new(
                token,
                format!(
                    "The {token} token is not properly formatted. Tokens need to be formatted \
                     as 'token:value' pairs."
                ),
            ));
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let parsed = match key {
            START_DATE | END_DATE => {
                FacetOptionValue::DateTime(parse_datetime(value).ok_or_else(|| {
                    QueryError::InvalidDate {
                        option: key.to_string(),
                        value: value.to_string(),
                    }
                })?)
            }
            GAP_AMOUNT => FacetOptionValue::Integer(value.parse().map_err(|_| {
                QueryError::InvalidInteger {
                    option: key.to_string(),
                    value: value.to_string(),
                }
            })?),
            _ => FacetOptionValue::Text(value.to_string()),
        };
        options.insert(key, parsed);
    }

    Ok(Parsed {
        value: options,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn parse(raw: &str) -> Result<Parsed<FacetOptions>, QueryError> {
        parse_field_options(&[raw.to_string()], ",")
    }

    #[test]
    fn parses_typed_options() {
        let parsed = parse("start_date:Jan 1 2020,end_date:Dec 31 2020,gap_by:month,gap_amount:3")
            .unwrap();
        assert!(parsed.is_clean());
        let options = parsed.value;
        assert_eq!(
            options.get(START_DATE).and_then(FacetOptionValue::as_datetime),
            NaiveDate::from_ymd_opt(2020, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(options.get(GAP_BY).and_then(FacetOptionValue::as_text), Some("month"));
        assert_eq!(options.get(GAP_AMOUNT).and_then(FacetOptionValue::as_integer), Some(3));
        assert!(options.has_date_options());
    }

    #[test]
    fn malformed_token_is_skipped() {
        let parsed = parse("token,limit:10,a:b:c").unwrap();
        assert_eq!(parsed.diagnostics.len(), 2);
        assert_eq!(parsed.diagnostics[0].input, "token");
        assert!(parsed.diagnostics[0].message.contains("'token:value'"));
        assert_eq!(parsed.value.get("limit"), Some(&FacetOptionValue::from("10")));
        assert_eq!(parsed.value.len(), 1);
    }

    #[test]
    fn bad_date_is_error() {
        assert_eq!(
            parse("start_date:someday").unwrap_err(),
            QueryError::InvalidDate {
                option: START_DATE.into(),
                value: "someday".into()
            }
        );
    }

    #[test]
    fn bad_integer_is_error() {
        assert!(matches!(
            parse("gap_amount:ten"),
            Err(QueryError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn merge_prefers_overlay() {
        let mut base = FacetOptions::new().with(GAP_BY, "day").with("limit", "5");
        base.merge(FacetOptions::new().with(GAP_BY, "month"));
        assert_eq!(base.get(GAP_BY), Some(&FacetOptionValue::from("month")));
        assert_eq!(base.get("limit"), Some(&FacetOptionValue::from("5")));
    }

    #[test]
    fn gap_unit_parse() {
        assert_eq!("month".parse::<GapUnit>().unwrap(), GapUnit::Month);
        assert!(matches!(
            "century".parse::<GapUnit>(),
            Err(QueryError::InvalidGapUnit { .. })
        ));
    }
}
