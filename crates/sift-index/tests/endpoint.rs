//! Integration tests for sift-index.
//!
//! Drives the endpoint operations end to end against the in-memory backend.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{fs, sync::Arc};

use serde_json::Value;
use sift_config::Config;
use sift_index::{
    AutocompleteFilter, BackendError, BoostFilter, ErrorKind, FieldFilter, GeoSpatialFilter,
    HighlightFilter, Highlighter, IndexError, MemoryBackend, Record, SchemaDescriptor,
    SearchEndpoint, SearchRequest, Serializer,
};
use sift_query::FacetPolicy;

const PEOPLE: &str = include_str!("fixtures/people.json");

fn backend() -> MemoryBackend {
    MemoryBackend::from_json(PEOPLE).unwrap()
}

fn schema(backend: &MemoryBackend, name: &str) -> Arc<SchemaDescriptor> {
    backend.schema(name).cloned().unwrap()
}

fn person_serializer(backend: &MemoryBackend) -> Serializer {
    Serializer::builder("PersonSerializer")
        .schemas([schema(backend, "PersonIndex")])
        .fields(["firstname", "lastname", "birthdate", "autocomplete"])
        .build()
        .unwrap()
}

fn open_serializer(backend: &MemoryBackend) -> Serializer {
    Serializer::builder("OpenPersonSerializer")
        .schemas([schema(backend, "PersonIndex")])
        .build()
        .unwrap()
}

fn person_endpoint() -> SearchEndpoint<MemoryBackend> {
    let backend = backend();
    let serializer = person_serializer(&backend);
    let person = schema(&backend, "PersonIndex");
    SearchEndpoint::builder("PersonSearch", backend, serializer)
        .schemas([person])
        .build()
}

fn mixed_endpoint() -> SearchEndpoint<MemoryBackend> {
    let backend = backend();
    let schemas = vec![schema(&backend, "PersonIndex"), schema(&backend, "PetIndex")];
    let serializer = Serializer::builder("AggregateSerializer")
        .schemas(schemas.clone())
        .build()
        .unwrap();
    SearchEndpoint::builder("AggregateSearch", backend, serializer)
        .schemas(schemas)
        .build()
}

fn firstnames(records: &[Record]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r["firstname"].as_str().unwrap_or_default())
        .collect()
}

fn list(endpoint: &SearchEndpoint<MemoryBackend>, url: &str) -> Vec<Record> {
    endpoint.list(&SearchRequest::from_url(url)).unwrap()
}

#[test]
fn tokens_of_one_parameter_are_ored() {
    let records = list(&person_endpoint(), "/search/?lastname=Hickman,Hood");
    assert_eq!(firstnames(&records), vec!["John", "Jane", "John", "Bruno"]);
}

#[test]
fn parameters_are_anded() {
    let records = list(&person_endpoint(), "/search/?lastname=Hood&firstname=Bruno");
    assert_eq!(firstnames(&records), vec!["Bruno"]);
}

#[test]
fn negated_parameters_exclude() {
    let records = list(&person_endpoint(), "/search/?lastname=Hood&firstname__not=Jane");
    assert_eq!(firstnames(&records), vec!["John", "Bruno"]);
}

#[test]
fn lookups_reach_the_backend() {
    let records = list(&person_endpoint(), "/search/?birthdate__gte=1985-01-01");
    assert_eq!(firstnames(&records), vec!["Jane", "John", "Bruno"]);
    assert_eq!(records[0]["birthdate"], "1985-06-01");
}

#[test]
fn fields_outside_the_serializer_are_ignored() {
    let records = list(&person_endpoint(), "/search/?species=dog&page=2");
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| !r.contains_key("text")));
}

#[test]
fn mixed_schemas_never_leak_fields() {
    let records = list(&mixed_endpoint(), "/search/");
    assert_eq!(records.len(), 8);
    for record in &records {
        assert!(record.keys().all(|k| !k.starts_with('_')), "{record:?}");
        assert!(record.contains_key("text"));
        if record.contains_key("firstname") {
            assert!(!record.contains_key("name") && !record.contains_key("species"));
        } else {
            assert!(record.contains_key("name"));
        }
    }
}

#[test]
fn retrieve_is_ambiguous_without_a_model() {
    let err = mixed_endpoint()
        .retrieve(&SearchRequest::from_url("/search/1/"), "1")
        .unwrap_err();
    assert!(matches!(err, IndexError::Ambiguous { count: 2 }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn retrieve_with_model_picks_one_schema() {
    let endpoint = mixed_endpoint();
    let person = endpoint
        .retrieve(
            &SearchRequest::from_url("/search/1/?model=mockapp.mockperson"),
            "1",
        )
        .unwrap();
    assert_eq!(person["firstname"], "John");

    let pet = endpoint
        .retrieve(&SearchRequest::from_url("/search/1/?model=MockApp.MockPet"), "1")
        .unwrap();
    assert_eq!(pet["name"], "Zeus");
}

#[test]
fn model_lookup_covers_every_schema_when_none_are_set() {
    let backend = backend();
    let serializer = Serializer::builder("AggregateSerializer")
        .schemas([schema(&backend, "PersonIndex"), schema(&backend, "PetIndex")])
        .build()
        .unwrap();
    let endpoint = SearchEndpoint::builder("OpenSearch", backend, serializer).build();

    let pet = endpoint
        .retrieve(&SearchRequest::from_url("/search/1/?model=mockapp.mockpet"), "1")
        .unwrap();
    assert_eq!(pet["name"], "Zeus");

    let err = endpoint
        .retrieve(&SearchRequest::from_url("/search/1/?model=mockapp.nope"), "1")
        .unwrap_err();
    assert!(matches!(err, IndexError::UnknownModel { .. }));
}

#[test]
fn retrieve_reports_unknown_models_and_ids() {
    let endpoint = mixed_endpoint();
    for model in ["mockapp.nope", "mockperson", ".mockperson"] {
        let url = format!("/search/1/?model={model}");
        let err = endpoint
            .retrieve(&SearchRequest::from_url(&url), "1")
            .unwrap_err();
        assert!(matches!(err, IndexError::UnknownModel { .. }), "{model}");
    }
    let err = person_endpoint()
        .retrieve(&SearchRequest::from_url("/search/99/"), "99")
        .unwrap_err();
    assert!(matches!(err, IndexError::NotFound));
}

#[test]
fn more_like_this_ranks_by_shared_words() {
    let records = mixed_endpoint()
        .more_like_this(
            &SearchRequest::from_url("/search/6/more-like-this/?model=mockapp.mockperson"),
            "6",
        )
        .unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(records[0]["name"], "Zeus");
    assert_eq!(records[1]["firstname"], "John");
    assert!(records.iter().all(|r| r.get("firstname") != Some(&Value::from("Bruno"))));
}

fn facet_endpoint(config: Config) -> SearchEndpoint<MemoryBackend> {
    let backend = backend();
    let serializer = person_serializer(&backend);
    let person = schema(&backend, "PersonIndex");
    SearchEndpoint::builder("PersonSearch", backend, serializer)
        .schemas([person])
        .facet_policy(
            FacetPolicy::builder("PersonFacetSerializer")
                .fields(["firstname", "lastname", "created"])
                .build()
                .unwrap(),
        )
        .config(config)
        .build()
}

const FACET_URL: &str = "/search/facets/?firstname=limit:2\
    &created=start_date:Jan+1+2015,end_date:Dec+31+2016,gap_by:month\
    &selected_facets=lastname_exact:Hood&page=2";

#[test]
fn facets_count_the_narrowed_results() {
    let response = facet_endpoint(Config::default())
        .facets(&SearchRequest::from_url(FACET_URL))
        .unwrap();

    let firstname = &response.facets.fields["firstname"];
    let texts: Vec<&str> = firstname.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["Bruno", "Jane"]);
    assert!(firstname.iter().all(|r| r.count == 1));

    let created: Vec<(&str, u64)> = response.facets.dates["created"]
        .iter()
        .map(|r| (r.text.as_str(), r.count))
        .collect();
    assert_eq!(
        created,
        vec![("2015-10-01T00:00:00", 2), ("2016-03-01T00:00:00", 1)]
    );
    assert!(response.objects.is_none());
    assert!(response.diagnostics.is_empty());

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("fields").is_some());
    assert!(json.get("queries").is_none());
}

#[test]
fn narrow_urls_select_and_can_be_followed() {
    let endpoint = facet_endpoint(Config::default());
    let response = endpoint
        .facets(&SearchRequest::from_url(FACET_URL))
        .unwrap();
    let bruno = &response.facets.fields["firstname"][0];
    assert!(!bruno.narrow_url.contains("page="));
    assert!(bruno.narrow_url.ends_with(
        "selected_facets=firstname_exact%3ABruno&selected_facets=lastname_exact%3AHood"
    ));

    let narrowed = endpoint
        .facets(&SearchRequest::from_url(&bruno.narrow_url))
        .unwrap();
    let texts: Vec<&str> = narrowed.facets.fields["firstname"]
        .iter()
        .map(|r| r.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Bruno"]);
}

#[test]
fn facet_objects_follow_the_narrowed_query() {
    let mut config = Config::default();
    config.facets.serialize_objects = true;
    let response = facet_endpoint(config)
        .facets(&SearchRequest::from_url(FACET_URL))
        .unwrap();
    let objects = response.objects.unwrap();
    assert_eq!(firstnames(&objects), vec!["John", "Jane", "Bruno"]);
}

#[test]
fn malformed_facet_input_is_tolerated() {
    let response = facet_endpoint(Config::default())
        .facets(&SearchRequest::from_url(
            "/search/facets/?firstname=limit:2,bogus&selected_facets=nocolon\
             &selected_facets=lastname_exact:",
        ))
        .unwrap();
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.facets.fields["firstname"].len(), 2);
    assert_eq!(response.facets.fields["firstname"][0].text, "John");
}

#[test]
fn facets_need_a_policy() {
    let err = person_endpoint()
        .facets(&SearchRequest::from_url("/search/facets/"))
        .unwrap_err();
    assert!(
        matches!(err, IndexError::MissingFacetPolicy { ref owner } if owner == "PersonSearch")
    );
}

fn geo_endpoint(backend: MemoryBackend) -> SearchEndpoint<MemoryBackend> {
    let serializer = person_serializer(&backend);
    let person = schema(&backend, "PersonIndex");
    SearchEndpoint::builder("PersonGeoSearch", backend, serializer)
        .schemas([person])
        .filter(FieldFilter)
        .filter(GeoSpatialFilter)
        .build()
}

#[test]
fn geo_filter_keeps_nearby_people() {
    let url = "/search/?from=59.9127300,10.7460900&km=10";
    let records = list(&geo_endpoint(backend()), url);
    assert_eq!(firstnames(&records), vec!["John", "Bruno"]);

    let legacy = list(&geo_endpoint(backend().with_legacy_units(true)), url);
    assert_eq!(records, legacy);

    let unbounded = list(&geo_endpoint(backend()), "/search/?from=59.9127300,10.7460900");
    assert_eq!(unbounded.len(), 6);
}

#[test]
fn geo_filter_rejects_bad_points() {
    let err = geo_endpoint(backend())
        .list(&SearchRequest::from_url("/search/?from=north,east&km=1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn boost_reorders_results() {
    let backend = backend();
    let serializer = open_serializer(&backend);
    let person = schema(&backend, "PersonIndex");
    let endpoint = SearchEndpoint::builder("PersonSearch", backend, serializer)
        .schemas([person])
        .filter(FieldFilter)
        .filter(BoostFilter)
        .build();
    let records = list(&endpoint, "/search/?content=oslo&boost=river,2");
    assert_eq!(firstnames(&records), vec!["Bruno", "John"]);

    let err = endpoint
        .list(&SearchRequest::from_url("/search/?boost=river"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn autocomplete_requires_every_word() {
    let backend = backend();
    let serializer = person_serializer(&backend);
    let person = schema(&backend, "PersonIndex");
    let endpoint = SearchEndpoint::builder("PersonSearch", backend, serializer)
        .schemas([person])
        .filter(AutocompleteFilter)
        .build();
    let records = list(&endpoint, "/search/?autocomplete=jo+hoo");
    assert_eq!(firstnames(&records), vec!["John"]);
    assert_eq!(records[0]["lastname"], "Hood");

    assert!(list(&person_endpoint(), "/search/?autocomplete=jo+hoo").is_empty());
}

#[test]
fn backend_highlights_are_injected() {
    let backend = backend();
    let serializer = open_serializer(&backend);
    let person = schema(&backend, "PersonIndex");
    let endpoint = SearchEndpoint::builder("PersonSearch", backend, serializer)
        .schemas([person])
        .filter(HighlightFilter)
        .build();
    let records = list(&endpoint, "/search/?content=bergen");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["highlighted"], "Jane Hood lives in <em>Bergen</em>");
}

#[test]
fn portable_highlighter_marks_parameter_words() {
    let backend = backend();
    let serializer = Serializer::builder("HighlightedPersonSerializer")
        .schemas([schema(&backend, "PersonIndex")])
        .highlighter(Highlighter::default())
        .build()
        .unwrap();
    let person = schema(&backend, "PersonIndex");
    let endpoint = SearchEndpoint::builder("PersonSearch", backend, serializer)
        .schemas([person])
        .build();
    let records = list(&endpoint, "/search/?firstname=Jane");
    assert_eq!(
        records[0]["highlighted"],
        "<span class=\"highlighted\">Jane</span> Hood lives in Bergen"
    );
}

#[test]
fn datasets_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.json");
    fs::write(&path, PEOPLE).unwrap();
    let loaded = MemoryBackend::load(&path).unwrap();
    assert_eq!(loaded.documents().len(), 8);
    assert_eq!(loaded.schemas().len(), 2);

    let missing = MemoryBackend::load(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(missing, BackendError::Io(_)));
}
