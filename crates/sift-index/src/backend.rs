//! The search backend seam.
//!
//! Everything engine-specific sits behind [`SearchBackend`]. Query builders take a queryset by
//! value and return the refined queryset; execution methods run it. Terms are produced through
//! the [`TermFactory`] supertrait so compiled filters arrive in the backend's own term type.

use std::{collections::BTreeMap, fmt, sync::Arc};

use chrono::NaiveDateTime;
use serde::Serialize;
use sift_query::{Boost, DateFacet, FacetOptions, GeoFilter, Point, QueryExpr, TermFactory};

use crate::{document::Document, error::BackendError, schema::SchemaDescriptor};

/// Words a query parser treats as operators.
const RESERVED_WORDS: [&str; 4] = ["AND", "NOT", "OR", "TO"];

/// Characters a query parser treats as syntax. Longer sequences first.
const RESERVED_CHARACTERS: [&str; 19] = [
    "\\", "&&", "||", "+", "-", "!", "(", ")", "{", "}", "[", "]", "^", "\"", "~", "*", "?", ":",
    "/",
];

/// A search engine queried through lazily refined querysets.
pub trait SearchBackend: TermFactory {
    /// A lazily evaluated query.
    type QuerySet: Clone + fmt::Debug;

    /// A queryset matching every indexed document.
    fn all(&self) -> Self::QuerySet;

    /// Restricts `qs` to documents of `schemas`.
    fn models(&self, qs: Self::QuerySet, schemas: &[Arc<SchemaDescriptor>]) -> Self::QuerySet;

    /// Every schema the backend has documents for.
    fn indexed_schemas(&self) -> Vec<Arc<SchemaDescriptor>>;

    /// Keeps documents matching `expr`.
    fn filter(&self, qs: Self::QuerySet, expr: &QueryExpr<Self::Term>) -> Self::QuerySet;

    /// Drops documents matching `expr`.
    fn exclude(&self, qs: Self::QuerySet, expr: &QueryExpr<Self::Term>) -> Self::QuerySet;

    /// Narrows to documents whose `field` holds exactly `value`. `value` is already cleaned.
    fn narrow(&self, qs: Self::QuerySet, field: &str, value: &str) -> Self::QuerySet;

    /// Requests value counts for `field`.
    fn facet(&self, qs: Self::QuerySet, field: &str, options: &FacetOptions) -> Self::QuerySet;

    /// Requests date bucket counts for `field`.
    fn date_facet(&self, qs: Self::QuerySet, field: &str, facet: &DateFacet) -> Self::QuerySet;

    /// Scales the score of documents containing the boosted term.
    fn boost(&self, qs: Self::QuerySet, boost: &Boost) -> Self::QuerySet;

    /// Attaches highlighted fragments to results.
    fn highlight(&self, qs: Self::QuerySet) -> Self::QuerySet;

    /// Keeps documents within the filter's distance of its point.
    fn dwithin(&self, qs: Self::QuerySet, filter: &GeoFilter) -> Self::QuerySet;

    /// Annotates results with their distance from `point`.
    fn distance(&self, qs: Self::QuerySet, field: &str, point: &Point) -> Self::QuerySet;

    /// Reorders `qs` by similarity to `document`, excluding the document itself.
    fn more_like_this(&self, qs: Self::QuerySet, document: &Document) -> Self::QuerySet;

    /// Runs the facet requests of `qs`.
    fn facet_counts(&self, qs: &Self::QuerySet) -> Result<FacetCounts, BackendError>;

    /// Runs `qs` and returns the matching documents.
    fn results(&self, qs: &Self::QuerySet) -> Result<Vec<Document>, BackendError>;

    /// Counts the documents matching `qs`.
    fn count(&self, qs: &Self::QuerySet) -> Result<usize, BackendError> {
        Ok(self.results(qs)?.len())
    }

    /// Escapes query syntax in a user-supplied value.
    fn clean(&self, raw: &str) -> String {
        clean_query_fragment(raw)
    }

    /// True for engines that read distances in the wrong unit and need them scaled.
    fn requires_legacy_unit_correction(&self) -> bool {
        false
    }
}

/// Escapes reserved words and characters so `raw` is matched literally.
///
/// Reserved words are lowercased; reserved characters are prefixed with a backslash.
pub fn clean_query_fragment(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            if RESERVED_WORDS.contains(&word) {
                return word.to_lowercase();
            }
            let mut cleaned = word.to_string();
            for reserved in RESERVED_CHARACTERS {
                cleaned = cleaned.replace(reserved, &format!("\\{reserved}"));
            }
            cleaned
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A facet bucket key as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FacetValue {
    /// A text value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A floating point value.
    Float(f64),
    /// A date bucket start.
    DateTime(NaiveDateTime),
}

impl FacetValue {
    /// Renders the value as used in a `selected_facets` narrow.
    ///
    /// Datetimes use a space between date and time, which is what engines accept for exact
    /// matches on date fields.
    pub fn narrow_value(&self) -> String {
        match self {
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FacetValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<NaiveDateTime> for FacetValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Raw `(value, count)` pairs for one faceted field.
pub type FacetBuckets = Vec<(FacetValue, u64)>;

/// Raw facet counts returned by a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetCounts {
    /// Field facets.
    pub fields: BTreeMap<String, FacetBuckets>,
    /// Date facets.
    pub dates: BTreeMap<String, FacetBuckets>,
    /// Query facets.
    pub queries: BTreeMap<String, FacetBuckets>,
}

impl FacetCounts {
    /// Returns true if no facet produced buckets.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.dates.is_empty() && self.queries.is_empty()
    }
}
