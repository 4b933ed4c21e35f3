//! Implementation of `sift facets`.

use std::process::ExitCode;

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use sift_query::{Diagnostic, FacetOptions, FacetPolicy, FacetQuery, build_facet_query};

use crate::cli::{
    args::FacetsCommand,
    context::{CLI_OWNER, CommandContext, parse_request},
    output::{dim, print_diagnostics, print_json},
};

/// JSON output for `sift facets`.
#[derive(Serialize)]
struct JsonFacetsOutput<'a> {
    /// Facets to request.
    #[serde(flatten)]
    query: &'a FacetQuery,
    /// Tolerated problems in the facet parameters.
    diagnostics: &'a [Diagnostic],
}

/// Parses facet options from a query string and prints the resulting facet query.
pub fn run(ctx: &CommandContext, cmd: &FacetsCommand) -> ExitCode {
    let parsed = FacetPolicy::builder(CLI_OWNER)
        .fields(cmd.fields.iter().cloned())
        .exclude(cmd.exclude.iter().cloned())
        .build()
        .and_then(|policy| {
            build_facet_query(
                &parse_request(&cmd.query).params,
                &policy,
                &ctx.config.query.lookup_sep,
            )
        });
    let (query, diagnostics) = match parsed {
        Ok(parsed) => parsed.into_parts(),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmd.output.json {
        return print_json(&JsonFacetsOutput {
            query: &query,
            diagnostics: &diagnostics,
        });
    }

    if query.is_empty() {
        println!("{}", dim("No facets requested."));
    } else {
        println!("{}", facet_table(&query));
    }
    print_diagnostics(&diagnostics);
    ExitCode::SUCCESS
}

/// Renders options as `name=value` pairs.
fn format_options(options: &FacetOptions) -> String {
    options
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One row per requested facet.
fn facet_table(query: &FacetQuery) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Field", "Kind", "Options"]);
    for (field, options) in &query.field_facets {
        table.add_row(vec![
            Cell::new(field),
            Cell::new("field"),
            Cell::new(format_options(options)),
        ]);
    }
    for (field, facet) in &query.date_facets {
        let mut options = format!(
            "{} .. {}, every {} {}",
            facet.start_date, facet.end_date, facet.gap_amount, facet.gap_by
        );
        if !facet.extra.is_empty() {
            options.push_str(", ");
            options.push_str(&format_options(&facet.extra));
        }
        table.add_row(vec![Cell::new(field), Cell::new("date"), Cell::new(options)]);
    }
    table
}
