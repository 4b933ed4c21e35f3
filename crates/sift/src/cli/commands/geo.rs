//! Implementation of `sift geo`.

use std::process::ExitCode;

use sift_query::build_geo_filter;

use crate::cli::{
    args::GeoCommand,
    context::{CommandContext, parse_request},
    output::{dim, print_json, subheader},
};

/// Builds the geo-spatial filter of a query string and prints it.
pub fn run(ctx: &CommandContext, cmd: &GeoCommand) -> ExitCode {
    let config = &ctx.config;
    let filter = match build_geo_filter(
        &parse_request(&cmd.query).params,
        &config.geo_settings(),
        &config.query.lookup_sep,
        cmd.legacy_units,
    ) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmd.output.json {
        return print_json(&filter);
    }

    let Some(filter) = filter else {
        println!(
            "{}",
            dim(&format!(
                "No geo filter: '{}' and a distance unit are both required.",
                config.geo.param
            ))
        );
        return ExitCode::SUCCESS;
    };
    println!("{}", subheader("Geo filter:"));
    println!("   field:    {}", filter.field);
    println!("   point:    {}", filter.point);
    println!(
        "   distance: {} {}",
        filter.distance,
        dim(&format!("({:.3} km)", filter.distance.km()))
    );
    ExitCode::SUCCESS
}
