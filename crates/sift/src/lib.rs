//! sift: query-string search compiler.
//!
//! The `sift` binary exposes the query compiler, facet and geo parsers, and the full
//! search pipeline over a JSON dataset, so query strings can be inspected and tried
//! without standing up a search engine.

#![warn(missing_docs)]

pub mod cli;
