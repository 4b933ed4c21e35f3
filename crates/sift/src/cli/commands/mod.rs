//! Command implementations and dispatch.

pub mod check;
pub mod config;
pub mod facets;
pub mod geo;
pub mod init;
pub mod query;
pub mod search;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Query(cmd) => query::run(ctx, &cmd),
        Commands::Facets(cmd) => facets::run(ctx, &cmd),
        Commands::Geo(cmd) => geo::run(ctx, &cmd),
        Commands::Search(cmd) => search::run(ctx, &cmd),
        Commands::Config => config::run(ctx),
        Commands::Check => check::run(ctx),
        Commands::Init(cmd) => init::run(ctx, &cmd),
    }
}
