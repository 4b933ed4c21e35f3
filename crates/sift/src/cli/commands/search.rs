//! Implementation of `sift search`.

use std::{collections::BTreeMap, fmt::Display, process::ExitCode, sync::Arc};

use sift_index::{
    AutocompleteFilter, BoostFilter, FacetRecord, FacetResponse, FieldFilter, GeoSpatialFilter,
    HighlightFilter, MemoryBackend, Record, SchemaDescriptor, SearchEndpoint, Serializer,
};
use sift_query::{FacetOptions, FacetPolicy};
use tracing::debug;

use crate::cli::{
    args::SearchCommand,
    context::{CommandContext, parse_request},
    output::{dim, header, print_diagnostics, print_json, records_table, subheader},
};

/// Name of the endpoint assembled for a search.
const ENDPOINT_NAME: &str = "SearchEndpoint";

/// Loads the dataset, serves the request and prints the records or facets.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    let endpoint = match build_endpoint(ctx, cmd) {
        Ok(endpoint) => endpoint,
        Err(code) => return code,
    };
    let request = parse_request(&cmd.query);

    if !cmd.facets.is_empty() {
        return match endpoint.facets(&request) {
            Ok(response) if cmd.output.json => print_json(&response),
            Ok(response) => {
                print_facets(&response);
                ExitCode::SUCCESS
            }
            Err(e) => failure(&e),
        };
    }

    let records = if let Some(id) = &cmd.retrieve {
        endpoint.retrieve(&request, id).map(|record| vec![record])
    } else if let Some(id) = &cmd.like {
        endpoint.more_like_this(&request, id)
    } else {
        endpoint.list(&request)
    };
    match records {
        Ok(records) if cmd.output.json => print_json(&records),
        Ok(records) => {
            print_records(&records);
            ExitCode::SUCCESS
        }
        Err(e) => failure(&e),
    }
}

/// Reports `error` and returns a failing exit code.
fn failure(error: &dyn Display) -> ExitCode {
    eprintln!("error: {error}");
    ExitCode::FAILURE
}

/// Assembles an endpoint over the dataset named by `cmd`.
fn build_endpoint(
    ctx: &CommandContext,
    cmd: &SearchCommand,
) -> Result<SearchEndpoint<MemoryBackend>, ExitCode> {
    let backend = MemoryBackend::load(&cmd.data)
        .map_err(|e| {
            eprintln!("error: failed to load {}: {e}", cmd.data.display());
            ExitCode::FAILURE
        })?
        .with_legacy_units(cmd.legacy_units);
    let schemas = select_schemas(&backend, &cmd.schemas)?;

    let mut serializer = Serializer::builder("SearchSerializer")
        .schemas(schemas.iter().cloned())
        .fields(cmd.fields.fields.iter().cloned())
        .exclude(cmd.fields.exclude.iter().cloned());
    for (alias, field) in &cmd.fields.aliases {
        serializer = serializer.field_alias(alias.as_str(), field.as_str());
    }
    let serializer = serializer.build().map_err(|e| failure(&e))?;

    let mut builder = SearchEndpoint::builder(ENDPOINT_NAME, backend, serializer)
        .schemas(schemas)
        .config(ctx.config.clone());
    builder = if cmd.autocomplete {
        builder.filter(AutocompleteFilter)
    } else if cmd.highlight {
        builder.filter(HighlightFilter)
    } else {
        builder.filter(FieldFilter)
    };
    builder = builder.filter(BoostFilter).filter(GeoSpatialFilter);
    if !cmd.facets.is_empty() {
        let mut policy = FacetPolicy::builder(ENDPOINT_NAME).fields(cmd.facets.iter().cloned());
        for field in &cmd.facets {
            policy = policy.field_options(field.as_str(), FacetOptions::new());
        }
        let policy = policy.build().map_err(|e| failure(&e))?;
        builder = builder.facet_policy(policy);
    }
    debug!(
        data = %cmd.data.display(),
        schemas = cmd.schemas.len(),
        facets = cmd.facets.len(),
        "assembled endpoint"
    );
    Ok(builder.build())
}

/// Resolves schema names, defaulting to every schema of the dataset.
fn select_schemas(
    backend: &MemoryBackend,
    names: &[String],
) -> Result<Vec<Arc<SchemaDescriptor>>, ExitCode> {
    if names.is_empty() {
        return Ok(backend.schemas().to_vec());
    }
    names
        .iter()
        .map(|name| {
            backend.schema(name).cloned().ok_or_else(|| {
                let known: Vec<&str> = backend.schemas().iter().map(|s| s.name()).collect();
                eprintln!("error: unknown schema '{name}'");
                eprintln!("available schemas: {}", known.join(", "));
                ExitCode::FAILURE
            })
        })
        .collect()
}

/// Prints records as a table.
fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("{}", dim("No results found."));
        return;
    }
    println!("{}", records_table(records));
    let noun = if records.len() == 1 { "result" } else { "results" };
    println!("{}", dim(&format!("{} {noun}", records.len())));
}

/// Prints one facet group.
fn print_facet_group(title: &str, group: &BTreeMap<String, Vec<FacetRecord>>) {
    if group.is_empty() {
        return;
    }
    println!("{}", header(title));
    for (field, buckets) in group {
        println!("{}", subheader(field));
        for bucket in buckets {
            println!(
                "   {} ({}) {}",
                bucket.text,
                bucket.count,
                dim(&bucket.narrow_url)
            );
        }
    }
    println!();
}

/// Prints formatted facets, then any objects and diagnostics.
fn print_facets(response: &FacetResponse) {
    if response.facets.is_empty() {
        println!("{}", dim("No facets."));
    }
    print_facet_group("Fields", &response.facets.fields);
    print_facet_group("Dates", &response.facets.dates);
    print_facet_group("Queries", &response.facets.queries);
    if let Some(objects) = &response.objects {
        print_records(objects);
    }
    print_diagnostics(&response.diagnostics);
}
