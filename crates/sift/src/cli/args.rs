//! Clap argument definitions for the `sift` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sift_query::{FieldPolicy, QueryError};

/// Parse an `ALIAS=FIELD` pair.
fn parse_alias(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((alias, field)) if !alias.is_empty() && !field.is_empty() => {
            Ok((alias.to_string(), field.to_string()))
        }
        _ => Err(format!("expected ALIAS=FIELD, got '{s}'")),
    }
}

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Compile query strings into search filters, facets and geo queries")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared output mode flags.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Shared flags restricting which parameters become filters.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Only filter on these fields (can be specified multiple times)
    #[arg(short = 'f', long = "field")]
    pub fields: Vec<String>,

    /// Never filter on these fields (can be specified multiple times)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Accept parameter ALIAS as a name for FIELD, written ALIAS=FIELD
    #[arg(long = "alias", value_parser = parse_alias)]
    pub aliases: Vec<(String, String)>,
}

impl FieldArgs {
    /// Builds the field policy these flags describe.
    pub fn policy(&self, owner: &str) -> Result<FieldPolicy, QueryError> {
        let mut builder = FieldPolicy::builder(owner)
            .fields(self.fields.iter().cloned())
            .exclude(self.exclude.iter().cloned());
        for (alias, field) in &self.aliases {
            builder = builder.alias(alias.as_str(), field.as_str());
        }
        builder.build()
    }
}

/// Arguments for `sift query`.
#[derive(Args, Debug, Clone)]
pub struct QueryCommand {
    /// Query string, e.g. `lastname=Hickman,Hood&firstname__not=John`
    pub query: String,

    /// Field restrictions.
    #[command(flatten)]
    pub fields: FieldArgs,

    /// Output options.
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `sift facets`.
#[derive(Args, Debug, Clone)]
pub struct FacetsCommand {
    /// Query string, e.g. `created=start_date:Jan 1 2015,end_date:Dec 31 2016,gap_by:month`
    pub query: String,

    /// Facetable field (can be specified multiple times)
    #[arg(short = 'f', long = "field", required = true)]
    pub fields: Vec<String>,

    /// Field never faceted (can be specified multiple times)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Output options.
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `sift geo`.
#[derive(Args, Debug, Clone)]
pub struct GeoCommand {
    /// Query string, e.g. `from=59.92,10.73&km=10`
    pub query: String,

    /// Multiply the radius for backends that misread distance units
    #[arg(long)]
    pub legacy_units: bool,

    /// Output options.
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `sift search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Request URL or query string, e.g. `/search/?lastname=Hood`
    pub query: String,

    /// JSON dataset of schemas and documents to search
    #[arg(short = 'd', long)]
    pub data: PathBuf,

    /// Only search these schemas (can be specified multiple times)
    #[arg(short = 's', long = "schema")]
    pub schemas: Vec<String>,

    /// Field restrictions for filtering and output.
    #[command(flatten)]
    pub fields: FieldArgs,

    /// Serve a facet request over these fields instead of listing results
    #[arg(long = "facet")]
    pub facets: Vec<String>,

    /// Retrieve the single document with this id
    #[arg(long, conflicts_with_all = ["facets", "like"])]
    pub retrieve: Option<String>,

    /// List documents similar to the one with this id
    #[arg(long, conflicts_with = "facets")]
    pub like: Option<String>,

    /// Match autocomplete fields by prefix instead of filtering fields
    #[arg(long)]
    pub autocomplete: bool,

    /// Highlight matched terms in the document field
    #[arg(long)]
    pub highlight: bool,

    /// Multiply geo radii for backends that misread distance units
    #[arg(long)]
    pub legacy_units: bool,

    /// Output options.
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `sift init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.sift.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Supported `sift` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Compile a query string into include and exclude filters
    Query(QueryCommand),

    /// Parse facet options from a query string
    Facets(FacetsCommand),

    /// Build the geo-spatial filter of a query string
    Geo(GeoCommand),

    /// Run a query string against a JSON dataset
    Search(SearchCommand),

    /// Show effective configuration settings
    Config,

    /// Validate configuration and diagnose issues
    Check,

    /// Initialize sift configuration in current directory
    Init(InitCommand),
}
