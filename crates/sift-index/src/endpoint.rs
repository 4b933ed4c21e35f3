//! Search endpoints.
//!
//! A [`SearchEndpoint`] ties a backend, a serializer and a list of filter capabilities together
//! and serves the four request operations: list, retrieve, more-like-this and facets.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use sift_config::Config;
use sift_query::{Diagnostic, FacetPolicy, QueryExpr};
use tracing::{debug, warn};

use crate::{
    backend::SearchBackend,
    document::Document,
    error::IndexError,
    facets::{FacetResults, NarrowContext, format_facets},
    filters::{FacetFilter, FieldFilter, FilterContext, MODEL_PARAM, SearchFilter, apply_filters},
    request::SearchRequest,
    schema::SchemaDescriptor,
    serializer::Serializer,
};

/// A serialized search result.
pub type Record = Map<String, Value>;

/// Response of a facet request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetResponse {
    /// Formatted facets.
    #[serde(flatten)]
    pub facets: FacetResults,
    /// Documents matching the narrowed query, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Record>>,
    /// Tolerated problems in the facet parameters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// A search endpoint over one backend.
pub struct SearchEndpoint<B: SearchBackend> {
    /// Endpoint name, used in errors and logs.
    name: String,
    /// Search engine.
    backend: B,
    /// Schemas searched; empty means all.
    schemas: Vec<Arc<SchemaDescriptor>>,
    /// Projects results.
    serializer: Serializer,
    /// Capabilities applied to list, retrieve and more-like-this requests.
    filters: Vec<Box<dyn SearchFilter<B>>>,
    /// Facet declaration.
    facet_policy: Option<FacetPolicy>,
    /// Capabilities applied to facet requests.
    facet_filters: Vec<Box<dyn SearchFilter<B>>>,
    /// Projects facet objects; defaults to `serializer`.
    facet_objects_serializer: Option<Serializer>,
    /// Effective settings.
    config: Config,
}

impl<B: SearchBackend> SearchEndpoint<B> {
    /// Starts building an endpoint.
    pub fn builder(
        name: impl Into<String>,
        backend: B,
        serializer: Serializer,
    ) -> SearchEndpointBuilder<B> {
        SearchEndpointBuilder {
            name: name.into(),
            backend,
            serializer,
            schemas: Vec::new(),
            filters: Vec::new(),
            facet_policy: None,
            facet_filters: Vec::new(),
            facet_objects_serializer: None,
            config: Config::default(),
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The effective settings.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists documents matching the request.
    pub fn list(&self, request: &SearchRequest) -> Result<Vec<Record>, IndexError> {
        let qs = self.filter_queryset(self.queryset(&self.schemas), request)?;
        self.serialize_all(&self.serializer, &qs, request)
    }

    /// Fetches the single document whose uid field equals `id`.
    ///
    /// A `model=app_label.model_name` parameter restricts the lookup to that schema.
    pub fn retrieve(&self, request: &SearchRequest, id: &str) -> Result<Record, IndexError> {
        let document = self.get_object(request, id)?;
        self.serializer.serialize(&document, &request.params)
    }

    /// Lists documents similar to the one whose uid field equals `id`.
    pub fn more_like_this(
        &self,
        request: &SearchRequest,
        id: &str,
    ) -> Result<Vec<Record>, IndexError> {
        let document = self.get_object(request, id)?;
        let qs = self.filter_queryset(self.queryset(&self.schemas), request)?;
        let qs = self.backend.more_like_this(qs, &document);
        self.serialize_all(&self.serializer, &qs, request)
    }

    /// Computes facet counts for the request.
    ///
    /// Every `selected_facets=field:value` narrows the query first; selectors without a colon
    /// or with an empty value are skipped.
    pub fn facets(&self, request: &SearchRequest) -> Result<FacetResponse, IndexError> {
        let ctx = self.context();
        let (mut qs, diagnostics) = apply_filters(
            &self.facet_filters,
            &self.backend,
            self.queryset(&self.schemas),
            request,
            &ctx,
        )?
        .into_parts();

        let selected = request
            .params
            .get(&self.config.facets.selected_param)
            .unwrap_or_default();
        for selector in selected {
            let Some((field, value)) = selector.split_once(':') else {
                warn!(selector = %selector, "ignoring facet selector without a colon");
                continue;
            };
            if value.is_empty() {
                continue;
            }
            qs = self.backend.narrow(qs, field, &self.backend.clean(value));
        }

        let counts = self.backend.facet_counts(&qs)?;
        let narrow = NarrowContext::new(&request.path, &request.params, &self.config.facets);
        let facets = format_facets(&counts, &narrow);
        let objects = if self.config.facets.serialize_objects {
            let serializer = self
                .facet_objects_serializer
                .as_ref()
                .unwrap_or(&self.serializer);
            Some(self.serialize_all(serializer, &qs, request)?)
        } else {
            None
        };
        Ok(FacetResponse {
            facets,
            objects,
            diagnostics,
        })
    }

    /// Filter context for this endpoint.
    fn context(&self) -> FilterContext<'_> {
        FilterContext {
            name: &self.name,
            serializer: Some(&self.serializer),
            facet_policy: self.facet_policy.as_ref(),
            config: &self.config,
        }
    }

    /// A fresh queryset restricted to `schemas`.
    fn queryset(&self, schemas: &[Arc<SchemaDescriptor>]) -> B::QuerySet {
        let qs = self.backend.all();
        if schemas.is_empty() {
            qs
        } else {
            self.backend.models(qs, schemas)
        }
    }

    /// Runs the list filters over `qs`.
    fn filter_queryset(
        &self,
        qs: B::QuerySet,
        request: &SearchRequest,
    ) -> Result<B::QuerySet, IndexError> {
        let parsed = apply_filters(&self.filters, &self.backend, qs, request, &self.context())?;
        for diagnostic in &parsed.diagnostics {
            warn!(endpoint = %self.name, "{diagnostic}");
        }
        Ok(parsed.value)
    }

    /// Looks up one document by uid.
    fn get_object(&self, request: &SearchRequest, id: &str) -> Result<Document, IndexError> {
        let qs = match request.params.last(MODEL_PARAM) {
            Some(model) => {
                let schema = self.find_model(model)?;
                self.queryset(&[schema])
            }
            None => self.queryset(&self.schemas),
        };
        let uid = QueryExpr::Term(
            self.backend
                .term(&self.config.query.document_uid_field, id),
        );
        let qs = self.backend.filter(qs, &uid);
        let count = self.backend.count(&qs)?;
        debug!(endpoint = %self.name, id, count, "looked up document");
        match count {
            0 => Err(IndexError::NotFound),
            1 => self
                .backend
                .results(&qs)?
                .into_iter()
                .next()
                .ok_or(IndexError::NotFound),
            count => Err(IndexError::Ambiguous { count }),
        }
    }

    /// Resolves an `app_label.model_name` label to one of the endpoint's schemas, or to any
    /// indexed schema when the endpoint searches all of them.
    fn find_model(&self, model: &str) -> Result<Arc<SchemaDescriptor>, IndexError> {
        let unknown = || IndexError::UnknownModel {
            model: model.to_string(),
        };
        let label = model.to_lowercase();
        let Some((app_label, model_name)) = label.split_once('.') else {
            return Err(unknown());
        };
        if app_label.is_empty() || model_name.is_empty() {
            return Err(unknown());
        }
        let candidates = if self.schemas.is_empty() {
            self.backend.indexed_schemas()
        } else {
            self.schemas.clone()
        };
        candidates
            .into_iter()
            .find(|schema| schema.model() == label)
            .ok_or_else(unknown)
    }

    /// Runs `qs` and projects every result.
    fn serialize_all(
        &self,
        serializer: &Serializer,
        qs: &B::QuerySet,
        request: &SearchRequest,
    ) -> Result<Vec<Record>, IndexError> {
        self.backend
            .results(qs)?
            .iter()
            .map(|document| serializer.serialize(document, &request.params))
            .collect()
    }
}

/// Builder for [`SearchEndpoint`].
pub struct SearchEndpointBuilder<B: SearchBackend> {
    /// Endpoint name.
    name: String,
    /// Search engine.
    backend: B,
    /// Result serializer.
    serializer: Serializer,
    /// Searched schemas.
    schemas: Vec<Arc<SchemaDescriptor>>,
    /// List filters.
    filters: Vec<Box<dyn SearchFilter<B>>>,
    /// Facet declaration.
    facet_policy: Option<FacetPolicy>,
    /// Facet filters.
    facet_filters: Vec<Box<dyn SearchFilter<B>>>,
    /// Facet objects serializer.
    facet_objects_serializer: Option<Serializer>,
    /// Effective settings.
    config: Config,
}

impl<B: SearchBackend> SearchEndpointBuilder<B> {
    /// Restricts searches to these schemas and makes them addressable by `model=`.
    pub fn schemas<I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = Arc<SchemaDescriptor>>,
    {
        self.schemas.extend(schemas);
        self
    }

    /// Appends a list filter. Without any, [`FieldFilter`] is used.
    pub fn filter(mut self, filter: impl SearchFilter<B> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Enables faceting with `policy`.
    pub fn facet_policy(mut self, policy: FacetPolicy) -> Self {
        self.facet_policy = Some(policy);
        self
    }

    /// Appends a facet filter. Without any, [`FacetFilter`] is used.
    pub fn facet_filter(mut self, filter: impl SearchFilter<B> + 'static) -> Self {
        self.facet_filters.push(Box::new(filter));
        self
    }

    /// Serializes facet objects with `serializer` instead of the result serializer.
    pub fn facet_objects_serializer(mut self, serializer: Serializer) -> Self {
        self.facet_objects_serializer = Some(serializer);
        self
    }

    /// Uses `config` instead of the defaults.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Finishes the endpoint.
    pub fn build(mut self) -> SearchEndpoint<B> {
        if self.filters.is_empty() {
            self.filters.push(Box::new(FieldFilter));
        }
        if self.facet_filters.is_empty() {
            self.facet_filters.push(Box::new(FacetFilter));
        }
        SearchEndpoint {
            name: self.name,
            backend: self.backend,
            schemas: self.schemas,
            serializer: self.serializer,
            filters: self.filters,
            facet_policy: self.facet_policy,
            facet_filters: self.facet_filters,
            facet_objects_serializer: self.facet_objects_serializer,
            config: self.config,
        }
    }
}
