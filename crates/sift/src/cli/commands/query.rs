//! Implementation of `sift query`.

use std::process::ExitCode;

use serde::Serialize;
use sift_query::{Boost, CompiledQuery, FieldTerm, FieldTerms, QueryExpr, parse_boost};

use crate::cli::{
    args::QueryCommand,
    context::{CLI_OWNER, CommandContext, parse_request},
    output::{dim, indent, print_json, subheader},
};

/// JSON output for `sift query`.
#[derive(Serialize)]
struct JsonQueryOutput<'a> {
    /// One-line form of the include side.
    include_query: Option<String>,
    /// One-line form of the exclude side.
    exclude_query: Option<String>,
    /// Expression trees.
    compiled: &'a CompiledQuery<FieldTerm>,
    /// Parsed boost parameter.
    boost: Option<&'a Boost>,
}

/// Compiles a query string and prints the include and exclude filters.
pub fn run(ctx: &CommandContext, cmd: &QueryCommand) -> ExitCode {
    let policy = match cmd.fields.policy(CLI_OWNER) {
        Ok(policy) => policy,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = &ctx.config;
    let params = ctx.filter_params(&cmd.query, &policy);
    let compiled = config.compiler().compile(&params, &policy, &FieldTerms);

    let boost = match parse_boost(
        &parse_request(&cmd.query).params,
        &config.boost.param,
        &config.query.lookup_sep,
    ) {
        Ok(boost) => boost,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmd.output.json {
        return print_json(&JsonQueryOutput {
            include_query: compiled.include.as_ref().map(QueryExpr::to_query_string),
            exclude_query: compiled.exclude.as_ref().map(QueryExpr::to_query_string),
            compiled: &compiled,
            boost: boost.as_ref(),
        });
    }

    print_side("Include:", compiled.include.as_ref());
    print_side("Exclude:", compiled.exclude.as_ref());
    if let Some(boost) = &boost {
        println!("{}", subheader("Boost:"));
        println!("   {boost}");
        println!();
    }
    if compiled.is_empty() {
        println!("{}", dim("No filters: every document matches."));
    }
    ExitCode::SUCCESS
}

/// Prints one side of a compiled query as a one-line summary and a tree.
fn print_side(title: &str, expr: Option<&QueryExpr<FieldTerm>>) {
    let Some(expr) = expr else {
        return;
    };
    println!("{}", subheader(title));
    println!("   {}", dim(&expr.to_query_string()));
    println!("{}", indent(&expr.to_string()));
    println!();
}
