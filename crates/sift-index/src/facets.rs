//! Facet result formatting.
//!
//! Turns raw `(value, count)` buckets into records carrying a display text and a narrow URL.
//! Narrow URLs are built so that selecting a facet is idempotent and independent of the order
//! facets were selected in: the selector set is deduplicated, sorted and always rendered last.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sift_config::FacetSettings;
use sift_query::QueryParams;

use crate::backend::{FacetBuckets, FacetCounts, FacetValue};

/// Suffix of the exact-match field used in narrow selectors.
pub const EXACT_SUFFIX: &str = "_exact";

/// One formatted facet bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetRecord {
    /// Bucket value rendered for display.
    pub text: String,
    /// Number of matching documents.
    pub count: u64,
    /// URL narrowing the current search to this bucket.
    pub narrow_url: String,
}

/// Formatted facets, grouped like the raw counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetResults {
    /// Field facets.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<FacetRecord>>,
    /// Date facets.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dates: BTreeMap<String, Vec<FacetRecord>>,
    /// Query facets.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub queries: BTreeMap<String, Vec<FacetRecord>>,
}

impl FacetResults {
    /// Returns true if there are no facets.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.dates.is_empty() && self.queries.is_empty()
    }
}

/// The request a facet response is built for.
#[derive(Debug, Clone)]
pub struct NarrowContext {
    /// Request path, without query string.
    path: String,
    /// Request parameters with pagination removed.
    params: QueryParams,
    /// Name of the facet selection parameter.
    selected_param: String,
}

impl NarrowContext {
    /// Creates a context for a request to `path` with `params`.
    pub fn new(path: impl Into<String>, params: &QueryParams, settings: &FacetSettings) -> Self {
        Self {
            path: path.into(),
            params: params.without(&settings.page_params),
            selected_param: settings.selected_param.clone(),
        }
    }

    /// URL selecting `value` of `field` on top of the current selection.
    pub fn narrow_url(&self, field: &str, value: &FacetValue) -> String {
        let mut params = self.params.clone();
        let mut selected: BTreeSet<String> = params
            .remove(&self.selected_param)
            .unwrap_or_default()
            .into_iter()
            .collect();
        selected.insert(format!("{field}{EXACT_SUFFIX}:{}", value.narrow_value()));
        params.set_list(self.selected_param.clone(), selected.into_iter().collect());
        format!("{}?{}", self.path, params.to_query_string())
    }

    /// Formats one group of facets.
    fn format_group(
        &self,
        group: &BTreeMap<String, FacetBuckets>,
    ) -> BTreeMap<String, Vec<FacetRecord>> {
        group
            .iter()
            .map(|(field, buckets)| {
                let records = buckets
                    .iter()
                    .map(|(value, count)| FacetRecord {
                        text: value.to_string(),
                        count: *count,
                        narrow_url: self.narrow_url(field, value),
                    })
                    .collect();
                (field.clone(), records)
            })
            .collect()
    }
}

/// Formats raw facet counts for a response.
pub fn format_facets(raw: &FacetCounts, ctx: &NarrowContext) -> FacetResults {
    FacetResults {
        fields: ctx.format_group(&raw.fields),
        dates: ctx.format_group(&raw.dates),
        queries: ctx.format_group(&raw.queries),
    }
}
