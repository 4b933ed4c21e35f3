//! Facet requests.
//!
//! A facet declaration ([`FacetPolicy`]) names the fields that may be faceted and their default
//! options. Query parameters named after those fields carry `option:value` lists that override
//! the defaults per option. Every field that ends up with options is classified as either a
//! plain field facet or a date facet.

mod date;
mod options;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

pub use self::{
    date::parse_datetime,
    options::{
        DATE_OPTIONS, END_DATE, FacetOptionValue, FacetOptions, GAP_AMOUNT, GAP_BY, GapUnit,
        OPTION_DELIMITER, START_DATE, parse_field_options,
    },
};
use crate::{
    diagnostic::Parsed,
    error::QueryError,
    params::QueryParams,
};

/// Accepted values of the `gap_by` option.
pub const VALID_GAP_UNITS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

/// Bucket width used when `gap_amount` is not given.
pub const DEFAULT_GAP_AMOUNT: i64 = 1;

/// A validated date facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFacet {
    /// First bucket start.
    pub start_date: NaiveDateTime,
    /// Last bucket end.
    pub end_date: NaiveDateTime,
    /// Bucket unit.
    pub gap_by: GapUnit,
    /// Bucket width in `gap_by` units.
    pub gap_amount: i64,
    /// Options other than the four date options, passed to the backend untouched.
    #[serde(skip_serializing_if = "FacetOptions::is_empty")]
    pub extra: FacetOptions,
}

impl DateFacet {
    /// Validates a date facet from its options.
    fn from_options(field: &str, mut options: FacetOptions) -> Result<Self, QueryError> {
        let (Some(start), Some(end), Some(gap_by)) = (
            options.remove(START_DATE),
            options.remove(END_DATE),
            options.remove(GAP_BY),
        ) else {
            return Err(QueryError::IncompleteDateFacet {
                field: field.to_string(),
            });
        };
        let gap_by = match gap_by {
            FacetOptionValue::Text(unit) => unit.parse::<GapUnit>()?,
            other => {
                return Err(QueryError::InvalidGapUnit {
                    value: other.to_string(),
                });
            }
        };
        let gap_amount = match options.remove(GAP_AMOUNT) {
            None => DEFAULT_GAP_AMOUNT,
            Some(FacetOptionValue::Integer(n)) => n,
            Some(FacetOptionValue::Text(raw)) => {
                raw.trim()
                    .parse()
                    .map_err(|_| QueryError::InvalidInteger {
                        option: GAP_AMOUNT.to_string(),
                        value: raw.clone(),
                    })?
            }
            Some(other) => {
                return Err(QueryError::InvalidInteger {
                    option: GAP_AMOUNT.to_string(),
                    value: other.to_string(),
                });
            }
        };
        Ok(Self {
            start_date: option_datetime(START_DATE, start)?,
            end_date: option_datetime(END_DATE, end)?,
            gap_by,
            gap_amount,
            extra: options,
        })
    }
}

/// Reads a datetime from a declared or parsed option value.
fn option_datetime(option: &str, value: FacetOptionValue) -> Result<NaiveDateTime, QueryError> {
    match value {
        FacetOptionValue::DateTime(dt) => Ok(dt),
        FacetOptionValue::Text(raw) => parse_datetime(&raw).ok_or(QueryError::InvalidDate {
            option: option.to_string(),
            value: raw,
        }),
        FacetOptionValue::Integer(n) => Err(QueryError::InvalidDate {
            option: option.to_string(),
            value: n.to_string(),
        }),
    }
}

/// The facets to request from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetQuery {
    /// Plain value facets.
    pub field_facets: BTreeMap<String, FacetOptions>,
    /// Date range facets.
    pub date_facets: BTreeMap<String, DateFacet>,
    /// Query facets. Never populated by [`build_facet_query`].
    pub query_facets: BTreeMap<String, FacetOptions>,
}

impl FacetQuery {
    /// Returns true if no facet is requested.
    pub fn is_empty(&self) -> bool {
        self.field_facets.is_empty() && self.date_facets.is_empty() && self.query_facets.is_empty()
    }
}

/// Declaration of the facetable fields and their default options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetPolicy {
    /// Name used in configuration errors.
    owner: String,
    /// Facetable fields.
    fields: BTreeSet<String>,
    /// Fields never faceted, even when declared.
    exclude: BTreeSet<String>,
    /// Default options per field. A field listed here is faceted on every request.
    field_options: BTreeMap<String, FacetOptions>,
}

impl FacetPolicy {
    /// Starts a declaration. `owner` names the declaring serializer in errors.
    pub fn builder(owner: impl Into<String>) -> FacetPolicyBuilder {
        FacetPolicyBuilder {
            policy: Self {
                owner: owner.into(),
                fields: BTreeSet::new(),
                exclude: BTreeSet::new(),
                field_options: BTreeMap::new(),
            },
        }
    }

    /// Name of the declaration.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Facetable fields.
    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    /// Excluded fields.
    pub fn exclude(&self) -> &BTreeSet<String> {
        &self.exclude
    }

    /// Declared default options.
    pub fn field_options(&self) -> &BTreeMap<String, FacetOptions> {
        &self.field_options
    }

    /// Returns true if `field` may be faceted.
    pub fn admits(&self, field: &str) -> bool {
        self.fields.contains(field) && !self.exclude.contains(field)
    }
}

/// Builder for [`FacetPolicy`].
#[derive(Debug, Clone)]
pub struct FacetPolicyBuilder {
    /// Policy under construction.
    policy: FacetPolicy,
}

impl FacetPolicyBuilder {
    /// Adds facetable fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds excluded fields.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declares default options for `field`. Empty options facet the field with backend defaults.
    pub fn field_options(mut self, field: impl Into<String>, options: FacetOptions) -> Self {
        self.policy
            .field_options
            .entry(field.into())
            .or_default()
            .merge(options);
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> Result<FacetPolicy, QueryError> {
        if self.policy.fields.is_empty() {
            return Err(QueryError::MissingFacetFields {
                owner: self.policy.owner,
            });
        }
        Ok(self.policy)
    }
}

/// Builds the facet request for `params`.
///
/// `lookup_sep` separates `option:value` pairs and must not be `:`. Options from the query
/// string override declared defaults per option. Malformed pairs are reported as diagnostics;
/// incomplete or invalid date facets are errors.
pub fn build_facet_query(
    params: &QueryParams,
    policy: &FacetPolicy,
    lookup_sep: &str,
) -> Result<Parsed<FacetQuery>, QueryError> {
    if lookup_sep == ":" {
        return Err(QueryError::SeparatorConflict {
            owner: policy.owner.clone(),
            separator: lookup_sep.to_string(),
        });
    }

    let mut field_options = policy.field_options.clone();
    let mut diagnostics = Vec::new();
    for (field, values) in params.iter() {
        if !policy.admits(field) {
            continue;
        }
        let parsed = parse_field_options(values, lookup_sep)?;
        diagnostics.extend(parsed.diagnostics.into_iter().map(|d| d.in_param(field)));
        field_options
            .entry(field.to_string())
            .or_default()
            .merge(parsed.value);
    }

    let mut query = FacetQuery::default();
    for (field, options) in field_options {
        if policy.exclude.contains(&field) {
            continue;
        }
        if options.has_date_options() {
            let facet = DateFacet::from_options(&field, options)?;
            query.date_facets.insert(field, facet);
        } else {
            query.field_facets.insert(field, options);
        }
    }

    debug!(
        field_facets = query.field_facets.len(),
        date_facets = query.date_facets.len(),
        diagnostics = diagnostics.len(),
        "built facet query"
    );
    Ok(Parsed {
        value: query,
        diagnostics,
    })
}
