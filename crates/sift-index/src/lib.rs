//! Search endpoints, result shaping and faceting for sift.
//!
//! This crate connects compiled query-string filters to a search engine and turns what the
//! engine returns into flat JSON records. It handles:
//! - The [`SearchBackend`] seam every engine implements
//! - Schema descriptors and the documents indexed with them
//! - Projecting documents of one or many schemas onto one field set ([`Serializer`])
//! - Facet formatting with idempotent narrow URLs
//! - Filter capabilities and the list / retrieve / more-like-this / facets operations
//! - An in-memory reference backend
//!
//! # Example
//!
//! ```
//! use sift_index::{
//!     FieldType, MemoryBackend, SchemaDescriptor, SearchEndpoint, SearchRequest, Serializer,
//! };
//! use serde_json::{Map, json};
//!
//! let schema = SchemaDescriptor::builder("PersonIndex", "mockapp.mockperson")
//!     .document("text")
//!     .field("firstname", FieldType::Char)
//!     .field("lastname", FieldType::Char)
//!     .build();
//! let mut fields = Map::new();
//! fields.insert("firstname".into(), json!("John"));
//! fields.insert("lastname".into(), json!("Hood"));
//! let documents = vec![sift_index::Document::new(schema.clone(), "1", fields)];
//! let backend = MemoryBackend::new(vec![schema.clone()], documents);
//!
//! let serializer = Serializer::builder("PersonSerializer")
//!     .schemas([schema])
//!     .fields(["firstname", "lastname"])
//!     .build()
//!     .unwrap();
//! let endpoint = SearchEndpoint::builder("PersonSearch", backend, serializer).build();
//!
//! let records = endpoint
//!     .list(&SearchRequest::from_url("/search/?lastname=Hickman,Hood"))
//!     .unwrap();
//! assert_eq!(records[0]["firstname"], "John");
//! ```

#![warn(missing_docs)]

mod backend;
mod document;
mod endpoint;
mod error;
mod facets;
mod filters;
mod highlight;
mod memory;
mod request;
mod schema;
mod serializer;

pub use backend::{FacetBuckets, FacetCounts, FacetValue, SearchBackend, clean_query_fragment};
pub use document::Document;
pub use endpoint::{FacetResponse, Record, SearchEndpoint, SearchEndpointBuilder};
pub use error::{BackendError, ErrorKind, IndexError};
pub use facets::{EXACT_SUFFIX, FacetRecord, FacetResults, NarrowContext, format_facets};
pub use filters::{
    AutocompleteFilter, BoostFilter, FacetFilter, FieldFilter, FilterContext, GeoSpatialFilter,
    HighlightFilter, MODEL_PARAM, SearchFilter, apply_filters,
};
pub use highlight::{
    DEFAULT_CSS_CLASS, DEFAULT_HTML_TAG, DEFAULT_MAX_LENGTH, Highlighter, emphasize,
};
pub use memory::{
    Dataset, DatasetDocument, DatasetSchema, DocumentId, MemoryBackend, MemoryQuery,
    MoreLikeThisParams,
};
pub use request::SearchRequest;
pub use schema::{FieldType, SchemaBuilder, SchemaDescriptor, SchemaField};
pub use serializer::{ComputedField, HIGHLIGHTED_KEY, Serializer, SerializerBuilder};
