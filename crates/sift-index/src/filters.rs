//! Filter capabilities.
//!
//! Each capability reads the request's parameters and refines a backend queryset. An endpoint
//! runs its capabilities in order; capabilities never see each other's state.

use sift_config::Config;
use sift_query::{
    CompiledQuery, DistanceUnit, FacetPolicy, FieldPolicy, FieldTerm, FieldTerms, Parsed,
    QueryExpr, QueryParams, build_facet_query, build_geo_filter, parse_boost,
};
use tracing::debug;

use crate::{
    backend::SearchBackend, error::IndexError, request::SearchRequest, serializer::Serializer,
};

/// Query parameter restricting retrieval to one model.
pub const MODEL_PARAM: &str = "model";

/// Endpoint state visible to filter capabilities.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Name of the endpoint, used in errors.
    pub name: &'a str,
    /// Serializer whose field policy governs filtering.
    pub serializer: Option<&'a Serializer>,
    /// Facet declaration, for facet requests.
    pub facet_policy: Option<&'a FacetPolicy>,
    /// Effective settings.
    pub config: &'a Config,
}

impl FilterContext<'_> {
    /// The field policy filtering runs under.
    pub fn field_policy(&self) -> FieldPolicy {
        self.serializer
            .map_or_else(FieldPolicy::allow_all, |s| s.field_policy().clone())
    }

    /// Request parameters that are field filters.
    ///
    /// Parameters consumed by other capabilities (boost, geo, facet selection, paging, model,
    /// distance units) are removed unless the field policy lists them explicitly.
    pub fn filter_params(&self, params: &QueryParams, policy: &FieldPolicy) -> QueryParams {
        let mut reserved = self.config.reserved_params();
        reserved.push(MODEL_PARAM.to_string());
        reserved.extend(DistanceUnit::ALL.iter().map(|u| u.as_str().to_string()));
        reserved.retain(|name| {
            !policy.allowed_fields().contains(name) && !policy.search_fields().contains(name)
        });
        params.without(&reserved)
    }

    /// Compiles the request's field filters into plain field terms.
    fn compile(&self, params: &QueryParams) -> CompiledQuery<FieldTerm> {
        let policy = self.field_policy();
        let params = self.filter_params(params, &policy);
        self.config.compiler().compile(&params, &policy, &FieldTerms)
    }
}

/// A capability refining a queryset from request parameters.
pub trait SearchFilter<B: SearchBackend>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns false when the request carries nothing this capability reads.
    fn applies_to(&self, _request: &SearchRequest) -> bool {
        true
    }

    /// Refines `qs`. Tolerated malformed input is returned as diagnostics.
    fn apply(
        &self,
        backend: &B,
        qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError>;
}

/// Runs `filters` over `qs` in order, collecting diagnostics.
pub fn apply_filters<B: SearchBackend>(
    filters: &[Box<dyn SearchFilter<B>>],
    backend: &B,
    mut qs: B::QuerySet,
    request: &SearchRequest,
    ctx: &FilterContext<'_>,
) -> Result<Parsed<B::QuerySet>, IndexError> {
    let mut diagnostics = Vec::new();
    for filter in filters {
        if !filter.applies_to(request) {
            continue;
        }
        let (refined, found) = filter.apply(backend, qs, request, ctx)?.into_parts();
        debug!(filter = filter.name(), diagnostics = found.len(), "applied filter");
        qs = refined;
        diagnostics.extend(found);
    }
    Ok(Parsed {
        value: qs,
        diagnostics,
    })
}

/// Rebuilds plain field terms as backend terms.
fn to_backend<B: SearchBackend>(backend: &B, expr: QueryExpr<FieldTerm>) -> QueryExpr<B::Term> {
    expr.flat_map_terms(&mut |t: FieldTerm| QueryExpr::Term(backend.term(&t.field, &t.value)))
}

/// Applies a compiled query as filter and exclusion.
fn apply_compiled<B: SearchBackend>(
    backend: &B,
    mut qs: B::QuerySet,
    compiled: CompiledQuery<B::Term>,
) -> B::QuerySet {
    if let Some(include) = &compiled.include {
        qs = backend.filter(qs, include);
    }
    if let Some(exclude) = &compiled.exclude {
        qs = backend.exclude(qs, exclude);
    }
    qs
}

/// Filters on serializer fields: tokens of a parameter are ORed, parameters are ANDed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldFilter;

impl<B: SearchBackend> SearchFilter<B> for FieldFilter {
    fn name(&self) -> &'static str {
        "field"
    }

    fn apply(
        &self,
        backend: &B,
        qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError> {
        let compiled = ctx.compile(&request.params);
        let compiled = CompiledQuery {
            include: compiled.include.map(|e| to_backend(backend, e)),
            exclude: compiled.exclude.map(|e| to_backend(backend, e)),
        };
        Ok(Parsed::clean(apply_compiled(backend, qs, compiled)))
    }
}

/// Field filtering for n-gram fields: every word of a token must match.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutocompleteFilter;

impl<B: SearchBackend> SearchFilter<B> for AutocompleteFilter {
    fn name(&self) -> &'static str {
        "autocomplete"
    }

    fn apply(
        &self,
        backend: &B,
        qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError> {
        let mut per_word = |t: FieldTerm| {
            let words: Vec<QueryExpr<B::Term>> = t
                .value
                .split(' ')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(|w| QueryExpr::Term(backend.term(&t.field, &backend.clean(w))))
                .collect();
            QueryExpr::and(words)
        };
        let compiled = ctx.compile(&request.params);
        let compiled = CompiledQuery {
            include: compiled.include.map(|e| e.flat_map_terms(&mut per_word)),
            exclude: compiled.exclude.map(|e| e.flat_map_terms(&mut per_word)),
        };
        Ok(Parsed::clean(apply_compiled(backend, qs, compiled)))
    }
}

/// Field filtering plus backend highlighting whenever the request has parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighlightFilter;

impl<B: SearchBackend> SearchFilter<B> for HighlightFilter {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn apply(
        &self,
        backend: &B,
        qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError> {
        let filtered = SearchFilter::<B>::apply(&FieldFilter, backend, qs, request, ctx)?;
        if request.params.is_empty() {
            return Ok(filtered);
        }
        Ok(filtered.map(|qs| backend.highlight(qs)))
    }
}

/// Applies `boost=term,factor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoostFilter;

impl<B: SearchBackend> SearchFilter<B> for BoostFilter {
    fn name(&self) -> &'static str {
        "boost"
    }

    fn apply(
        &self,
        backend: &B,
        qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError> {
        let boost = parse_boost(
            &request.params,
            &ctx.config.boost.param,
            &ctx.config.query.lookup_sep,
        )?;
        Ok(Parsed::clean(match boost {
            Some(boost) => backend.boost(qs, &boost),
            None => qs,
        }))
    }
}

/// Keeps documents within a radius of `from=lat,lon` and annotates their distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoSpatialFilter;

impl<B: SearchBackend> SearchFilter<B> for GeoSpatialFilter {
    fn name(&self) -> &'static str {
        "geo"
    }

    fn apply(
        &self,
        backend: &B,
        qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError> {
        let filter = build_geo_filter(
            &request.params,
            &ctx.config.geo_settings(),
            &ctx.config.query.lookup_sep,
            backend.requires_legacy_unit_correction(),
        )?;
        let Some(filter) = filter else {
            return Ok(Parsed::clean(qs));
        };
        let qs = backend.dwithin(qs, &filter);
        Ok(Parsed::clean(backend.distance(qs, &filter.field, &filter.point)))
    }
}

/// Requests the facets declared by the endpoint's facet policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetFilter;

impl<B: SearchBackend> SearchFilter<B> for FacetFilter {
    fn name(&self) -> &'static str {
        "facet"
    }

    fn apply(
        &self,
        backend: &B,
        mut qs: B::QuerySet,
        request: &SearchRequest,
        ctx: &FilterContext<'_>,
    ) -> Result<Parsed<B::QuerySet>, IndexError> {
        let Some(policy) = ctx.facet_policy else {
            return Err(IndexError::MissingFacetPolicy {
                owner: ctx.name.to_string(),
            });
        };
        let (query, diagnostics) =
            build_facet_query(&request.params, policy, &ctx.config.query.lookup_sep)?
                .into_parts();
        for (field, options) in &query.field_facets {
            qs = backend.facet(qs, field, options);
        }
        for (field, facet) in &query.date_facets {
            qs = backend.date_facet(qs, field, facet);
        }
        Ok(Parsed {
            value: qs,
            diagnostics,
        })
    }
}
