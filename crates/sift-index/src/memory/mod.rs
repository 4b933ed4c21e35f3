//! An in-memory search backend.
//!
//! [`MemoryBackend`] evaluates querysets against a fixed list of documents. It is the
//! reference implementation of [`SearchBackend`]: small enough to reason about, complete enough
//! to drive every endpoint operation in tests and from the command line.
//!
//! Matching rules:
//!
//! - Plain terms match whole words of text fields, case-insensitively. Edge n-gram fields match
//!   word prefixes and n-gram fields match any fragment.
//! - `exact`, `contains`, `startswith`, `endswith`, `gt`, `gte`, `lt` and `lte` lookups are
//!   supported; numbers and dates compare by value.
//! - `content` addresses a schema's document field, `id` falls back to the document id.

mod counting;
mod dataset;
mod matching;
mod similar;

use std::{
    cmp::{Ordering, Reverse},
    collections::BTreeMap,
    fs,
    path::Path,
    sync::Arc,
};

use serde_json::Value;
use sift_query::{
    Boost, DateFacet, FacetOptions, FieldTerm, GeoFilter, LEGACY_UNIT_CORRECTION, Point,
    QueryExpr, TermFactory,
};
use tracing::debug;

pub use self::{
    dataset::{Dataset, DatasetDocument, DatasetSchema, DocumentId},
    similar::MoreLikeThisParams,
};
use self::{
    counting::{count_dates, count_field},
    matching::{expr_matches, field_values, narrow_matches, unescape, words},
    similar::shared_terms,
};
use crate::{
    backend::{FacetCounts, SearchBackend},
    document::Document,
    error::BackendError,
    highlight::emphasize,
    schema::{SchemaDescriptor, display_value, parse_location},
};

/// A queryset of the in-memory backend: every refinement requested so far.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    /// Schema names searched; `None` means all.
    models: Option<Vec<String>>,
    /// Expressions every result must match.
    filters: Vec<QueryExpr<FieldTerm>>,
    /// Expressions no result may match.
    excludes: Vec<QueryExpr<FieldTerm>>,
    /// Exact `(field, value)` narrows.
    narrows: Vec<(String, String)>,
    /// Requested field facets.
    field_facets: BTreeMap<String, FacetOptions>,
    /// Requested date facets.
    date_facets: BTreeMap<String, DateFacet>,
    /// Score boosts.
    boosts: Vec<Boost>,
    /// Whether results carry highlights.
    highlight: bool,
    /// Radius filters.
    within: Vec<GeoFilter>,
    /// Field and point distances are measured from.
    distance_from: Option<(String, Point)>,
    /// Source document of a more-like-this query.
    similar_to: Option<Document>,
}

/// A search backend over documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    /// Declared schemas.
    schemas: Vec<Arc<SchemaDescriptor>>,
    /// Indexed documents, in insertion order.
    documents: Vec<Document>,
    /// Emulate engines that read radii in kilometres when given metres.
    legacy_units: bool,
    /// More-like-this term selection.
    mlt: MoreLikeThisParams,
}

impl MemoryBackend {
    /// Creates a backend over `documents`.
    pub fn new(schemas: Vec<Arc<SchemaDescriptor>>, documents: Vec<Document>) -> Self {
        Self {
            schemas,
            documents,
            ..Self::default()
        }
    }

    /// Creates a backend from a decoded dataset.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, BackendError> {
        let (schemas, documents) = dataset.into_parts()?;
        Ok(Self::new(schemas, documents))
    }

    /// Creates a backend from dataset JSON.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        Self::from_dataset(serde_json::from_str(json)?)
    }

    /// Loads a dataset file.
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let backend = Self::from_json(&fs::read_to_string(path)?)?;
        debug!(
            path = %path.display(),
            schemas = backend.schemas.len(),
            documents = backend.documents.len(),
            "loaded dataset"
        );
        Ok(backend)
    }

    /// Emulates an engine that misreads distance units, so radii must be corrected upstream.
    pub fn with_legacy_units(mut self, legacy: bool) -> Self {
        self.legacy_units = legacy;
        self
    }

    /// Uses `params` for more-like-this queries.
    pub fn with_more_like_this(mut self, params: MoreLikeThisParams) -> Self {
        self.mlt = params;
        self
    }

    /// Declared schemas.
    pub fn schemas(&self) -> &[Arc<SchemaDescriptor>] {
        &self.schemas
    }

    /// Looks up a schema by name.
    pub fn schema(&self, name: &str) -> Option<&Arc<SchemaDescriptor>> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    /// Indexed documents.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Documents passing every filter of `qs`, unscored.
    fn matching(&self, qs: &MemoryQuery) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|doc| {
                qs.models
                    .as_ref()
                    .is_none_or(|names| names.iter().any(|n| n == doc.schema.name()))
            })
            .filter(|doc| qs.filters.iter().all(|e| expr_matches(doc, e)))
            .filter(|doc| !qs.excludes.iter().any(|e| expr_matches(doc, e)))
            .filter(|doc| {
                qs.narrows
                    .iter()
                    .all(|(field, value)| narrow_matches(doc, field, value))
            })
            .filter(|doc| qs.within.iter().all(|f| self.is_within(doc, f)))
            .cloned()
            .collect()
    }

    /// True if the document's location lies inside the filter's radius.
    fn is_within(&self, document: &Document, filter: &GeoFilter) -> bool {
        let radius = if self.legacy_units {
            filter.distance.scaled(1.0 / LEGACY_UNIT_CORRECTION)
        } else {
            filter.distance
        };
        location(document, &filter.field, filter.point.srid)
            .is_some_and(|at| filter.point.distance_to(&at).metres() <= radius.metres())
    }

    /// Words the filters searched for, used for highlighting.
    fn searched_text(qs: &MemoryQuery) -> String {
        qs.filters
            .iter()
            .flat_map(QueryExpr::terms)
            .map(|term| unescape(&term.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reads the point stored in `field`.
fn location(document: &Document, field: &str, srid: u32) -> Option<Point> {
    let value = document.get(field)?;
    let (latitude, longitude) = parse_location(value)?;
    Some(Point {
        latitude,
        longitude,
        srid,
    })
}

/// True if any text value of the document contains `word`.
fn mentions(document: &Document, word: &str) -> bool {
    let word = word.to_lowercase();
    document.fields.keys().any(|field| {
        field_values(document, field)
            .iter()
            .filter(|v| matches!(v, Value::String(_)))
            .any(|v| words(&display_value(v)).any(|w| w == word))
    })
}

impl TermFactory for MemoryBackend {
    type Term = FieldTerm;

    fn term(&self, field: &str, token: &str) -> FieldTerm {
        FieldTerm::new(field, token)
    }
}

impl SearchBackend for MemoryBackend {
    type QuerySet = MemoryQuery;

    fn all(&self) -> MemoryQuery {
        MemoryQuery::default()
    }

    fn indexed_schemas(&self) -> Vec<Arc<SchemaDescriptor>> {
        self.schemas.clone()
    }

    fn models(&self, mut qs: MemoryQuery, schemas: &[Arc<SchemaDescriptor>]) -> MemoryQuery {
        let names: Vec<String> = schemas.iter().map(|s| s.name().to_string()).collect();
        qs.models = Some(match qs.models {
            Some(existing) => existing.into_iter().filter(|n| names.contains(n)).collect(),
            None => names,
        });
        qs
    }

    fn filter(&self, mut qs: MemoryQuery, expr: &QueryExpr<FieldTerm>) -> MemoryQuery {
        if !expr.is_empty() {
            qs.filters.push(expr.clone());
        }
        qs
    }

    fn exclude(&self, mut qs: MemoryQuery, expr: &QueryExpr<FieldTerm>) -> MemoryQuery {
        if !expr.is_empty() {
            qs.excludes.push(expr.clone());
        }
        qs
    }

    fn narrow(&self, mut qs: MemoryQuery, field: &str, value: &str) -> MemoryQuery {
        qs.narrows.push((field.to_string(), value.to_string()));
        qs
    }

    fn facet(&self, mut qs: MemoryQuery, field: &str, options: &FacetOptions) -> MemoryQuery {
        qs.field_facets.insert(field.to_string(), options.clone());
        qs
    }

    fn date_facet(&self, mut qs: MemoryQuery, field: &str, facet: &DateFacet) -> MemoryQuery {
        qs.date_facets.insert(field.to_string(), facet.clone());
        qs
    }

    fn boost(&self, mut qs: MemoryQuery, boost: &Boost) -> MemoryQuery {
        qs.boosts.push(boost.clone());
        qs
    }

    fn highlight(&self, mut qs: MemoryQuery) -> MemoryQuery {
        qs.highlight = true;
        qs
    }

    fn dwithin(&self, mut qs: MemoryQuery, filter: &GeoFilter) -> MemoryQuery {
        qs.within.push(filter.clone());
        qs
    }

    fn distance(&self, mut qs: MemoryQuery, field: &str, point: &Point) -> MemoryQuery {
        qs.distance_from = Some((field.to_string(), *point));
        qs
    }

    fn more_like_this(&self, mut qs: MemoryQuery, document: &Document) -> MemoryQuery {
        qs.similar_to = Some(document.clone());
        qs
    }

    fn facet_counts(&self, qs: &MemoryQuery) -> Result<FacetCounts, BackendError> {
        let matched = self.matching(qs);
        let mut counts = FacetCounts::default();
        for (field, options) in &qs.field_facets {
            counts
                .fields
                .insert(field.clone(), count_field(&matched, field, options));
        }
        for (field, facet) in &qs.date_facets {
            counts
                .dates
                .insert(field.clone(), count_dates(&matched, field, facet)?);
        }
        Ok(counts)
    }

    fn results(&self, qs: &MemoryQuery) -> Result<Vec<Document>, BackendError> {
        let mut matched = self.matching(qs);

        if let Some(source) = &qs.similar_to {
            let terms = self.mlt.query_terms(source);
            matched.retain(|doc| {
                !(doc.id == source.id && doc.schema.name() == source.schema.name())
            });
            matched.retain_mut(|doc| {
                let shared = shared_terms(doc, &terms);
                doc.score *= shared as f32;
                shared > 0
            });
        }

        if qs.highlight {
            let searched = Self::searched_text(qs);
            for doc in &mut matched {
                let Some(field) = doc.schema.document_field() else {
                    continue;
                };
                let Some(text) = doc.text(field) else {
                    continue;
                };
                let emphasized = emphasize(text, &searched);
                if emphasized != text {
                    doc.highlighted = Some(Value::Array(vec![Value::String(emphasized)]));
                }
            }
        }

        for doc in &mut matched {
            for boost in &qs.boosts {
                if mentions(doc, &boost.term) {
                    doc.score *= boost.factor;
                }
            }
            if let Some((field, point)) = &qs.distance_from {
                doc.distance =
                    location(doc, field, point.srid).map(|at| point.distance_to(&at));
            }
        }

        matched.sort_by_key(|doc| Reverse(OrderedScore(doc.score)));
        Ok(matched)
    }

    fn count(&self, qs: &MemoryQuery) -> Result<usize, BackendError> {
        Ok(self.matching(qs).len())
    }

    fn requires_legacy_unit_correction(&self) -> bool {
        self.legacy_units
    }
}

/// Total order over scores for sorting.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedScore(f32);

impl Eq for OrderedScore {}

impl PartialOrd for OrderedScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sift_query::{Distance, DistanceUnit};

    use super::*;
    use crate::backend::FacetValue;

    const DATASET: &str = r#"{
        "schemas": [
            {"name": "PersonIndex", "model": "mockapp.mockperson", "document_field": "text",
             "fields": [{"name": "firstname", "type": "char"},
                        {"name": "lastname", "type": "char"},
                        {"name": "coordinates", "type": "location"}]},
            {"name": "PetIndex", "model": "mockapp.mockpet", "document_field": "text",
             "fields": [{"name": "name", "type": "char"}]}
        ],
        "documents": [
            {"schema": "PersonIndex", "id": 1, "fields": {"firstname": "Abel",
             "lastname": "Foreman", "text": "Abel Foreman lives in Oslo",
             "coordinates": "59.744076,10.152045"}},
            {"schema": "PersonIndex", "id": 2, "fields": {"firstname": "John",
             "lastname": "Hood", "text": "John Hood lives in Oslo by the fjord",
             "coordinates": "59.9127300,10.7460900"}},
            {"schema": "PersonIndex", "id": 3, "fields": {"firstname": "Jane",
             "lastname": "Hood", "text": "Jane Hood lives in Bergen",
             "coordinates": "60.39299,5.32415"}},
            {"schema": "PetIndex", "id": 1, "fields": {"name": "Zeus",
             "text": "Zeus the dog lives in Oslo by the fjord"}}
        ]
    }"#;

    fn backend() -> MemoryBackend {
        MemoryBackend::from_json(DATASET).unwrap()
    }

    fn ids(docs: &[Document]) -> Vec<String> {
        docs.iter()
            .map(|d| format!("{}:{}", d.schema.name(), d.id))
            .collect()
    }

    fn term(field: &str, value: &str) -> QueryExpr<FieldTerm> {
        QueryExpr::Term(FieldTerm::new(field, value))
    }

    #[test]
    fn filter_exclude_and_models_compose() {
        let backend = backend();
        let person = backend.schema("PersonIndex").cloned().unwrap();
        let qs = backend.models(backend.all(), &[person]);
        let qs = backend.filter(qs, &term("lastname", "Hood"));
        let qs = backend.exclude(qs, &term("firstname", "Jane"));
        assert_eq!(ids(&backend.results(&qs).unwrap()), vec!["PersonIndex:2"]);
        assert_eq!(backend.count(&qs).unwrap(), 1);
    }

    #[test]
    fn dwithin_keeps_nearby_documents_and_annotates_distance() {
        let backend = backend();
        let oslo = Point {
            latitude: 59.9127300,
            longitude: 10.7460900,
            srid: 4326,
        };
        let filter = GeoFilter {
            field: "coordinates".into(),
            point: oslo,
            distance: Distance::new(40.0, DistanceUnit::Km),
        };
        let qs = backend.dwithin(backend.all(), &filter);
        let qs = backend.distance(qs, "coordinates", &oslo);
        let results = backend.results(&qs).unwrap();
        assert_eq!(ids(&results), vec!["PersonIndex:1", "PersonIndex:2"]);
        let far = results[0].distance.unwrap().km();
        assert!(far > 30.0 && far < 40.0, "{far}");
        assert!(results[1].distance.unwrap().metres() < 1.0);
    }

    #[test]
    fn legacy_units_shrink_uncorrected_radii() {
        let backend = backend().with_legacy_units(true);
        assert!(backend.requires_legacy_unit_correction());
        let filter = GeoFilter {
            field: "coordinates".into(),
            point: Point {
                latitude: 59.9127300,
                longitude: 10.7460900,
                srid: 4326,
            },
            distance: Distance::new(40.0, DistanceUnit::Km),
        };
        let qs = backend.dwithin(backend.all(), &filter);
        assert_eq!(ids(&backend.results(&qs).unwrap()), vec!["PersonIndex:2"]);
    }

    #[test]
    fn boost_reorders_results() {
        let backend = backend();
        let qs = backend.filter(backend.all(), &term("content", "oslo"));
        let qs = backend.boost(
            qs,
            &Boost {
                term: "fjord".into(),
                factor: 2.0,
            },
        );
        let results = backend.results(&qs).unwrap();
        assert_eq!(
            ids(&results),
            vec!["PersonIndex:2", "PetIndex:1", "PersonIndex:1"]
        );
        assert!((results[0].score - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn highlight_emphasizes_searched_words() {
        let backend = backend();
        let qs = backend.filter(backend.all(), &term("content", "bergen"));
        let qs = backend.highlight(qs);
        let results = backend.results(&qs).unwrap();
        assert_eq!(
            results[0].highlighted,
            Some(json!(["Jane Hood lives in <em>Bergen</em>"]))
        );
    }

    #[test]
    fn more_like_this_excludes_source_and_ranks_by_overlap() {
        let backend = backend();
        let source = backend.documents()[1].clone();
        let qs = backend.more_like_this(backend.all(), &source);
        let results = backend.results(&qs).unwrap();
        assert!(!ids(&results).contains(&"PersonIndex:2".to_string()));
        assert_eq!(ids(&results)[0], "PetIndex:1");
    }

    #[test]
    fn facet_counts_follow_narrowing() {
        let backend = backend();
        let qs = backend.facet(backend.all(), "lastname", &FacetOptions::new());
        let qs = backend.narrow(qs, "firstname_exact", "Jane");
        let counts = backend.facet_counts(&qs).unwrap();
        assert_eq!(counts.fields["lastname"], vec![(FacetValue::from("Hood"), 1)]);
        assert!(counts.dates.is_empty());
    }
}
