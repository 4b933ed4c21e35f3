//! Query-string compilation for sift search endpoints.
//!
//! This crate turns HTTP query parameters into backend-agnostic search requests:
//!
//! - **Filters**: `lastname=Hickman,Hood&firstname=Bruno` - tokens of one parameter are ORed,
//!   parameters are ANDed
//! - **Lookups**: `birthdate__gt=1980-01-01` - passed through to the backend term
//! - **Negation**: `firstname__not=John` - moves the condition to the exclude side
//! - **Boosting**: `boost=hood,1.5` - raise the score of documents matching a term
//! - **Facets**: `created=start_date:Jan 1 2020,end_date:Dec 31 2020,gap_by:month`
//! - **Geo**: `from=59.92,10.73&km=10` - restrict to a radius around a point
//!
//! # Example
//!
//! ```
//! use sift_query::{FieldPolicy, FieldTerms, QueryCompiler, QueryParams};
//!
//! let params = QueryParams::parse("lastname=Hickman,Hood&firstname__not=John");
//! let compiled = QueryCompiler::default().compile(&params, &FieldPolicy::allow_all(), &FieldTerms);
//! assert_eq!(
//!     compiled.include.unwrap().to_query_string(),
//!     "lastname=Hickman OR lastname=Hood"
//! );
//! assert_eq!(compiled.exclude.unwrap().to_query_string(), "firstname=John");
//! ```

#![warn(missing_docs)]

mod ast;
mod boost;
mod compile;
mod diagnostic;
mod error;
pub mod facet;
mod geo;
mod params;
mod policy;
mod term;
mod tokenizer;

pub use ast::QueryExpr;
pub use boost::{Boost, DEFAULT_BOOST_PARAM, parse_boost};
pub use compile::{
    CompiledQuery, DEFAULT_LOOKUP_SEP, DEFAULT_NEGATION_KEYWORD, Operator, QueryCompiler,
    ResolvedParam,
};
pub use diagnostic::{Diagnostic, Parsed};
pub use error::{ErrorKind, QueryError};
pub use facet::{
    DateFacet, FacetOptionValue, FacetOptions, FacetPolicy, FacetPolicyBuilder, FacetQuery,
    GapUnit, build_facet_query,
};
pub use geo::{
    DEFAULT_POINT_FIELD, DEFAULT_POINT_PARAM, DEFAULT_SRID, Distance, DistanceUnit, GeoFilter,
    GeoSettings, LEGACY_UNIT_CORRECTION, Point, build_geo_filter,
};
pub use params::QueryParams;
pub use policy::{FieldPolicy, FieldPolicyBuilder};
pub use term::{FieldTerm, FieldTerms, LOOKUP_SEPARATOR, TermFactory};
pub use tokenizer::{Tokens, tokenize};
