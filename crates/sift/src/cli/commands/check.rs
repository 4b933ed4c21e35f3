//! Implementation of `sift check`.

use std::process::ExitCode;

use sift_config::{ConfigWarning, discover_config_files, is_global_config};

use crate::cli::{
    context::CommandContext,
    output::{dim, subheader, warning},
};

/// Shows configuration files and validation warnings.
///
/// Exits with failure when any warning is found.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config_files = discover_config_files(&ctx.cwd);
    if config_files.is_empty() {
        println!("{}", dim("No configuration files found, using defaults."));
        println!(
            "Run {} to create a configuration file.",
            subheader("sift init")
        );
    } else {
        println!("{}", subheader("Config files:"));
        for path in &config_files {
            let display_path = path.strip_prefix(&ctx.cwd).unwrap_or(path);
            if is_global_config(path) {
                println!("   {} {}", display_path.display(), dim("(global)"));
            } else {
                println!("   {}", display_path.display());
            }
        }
    }
    println!();

    let warnings = ctx.config.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return ExitCode::SUCCESS;
    }

    println!("{}", subheader(&format!("Warnings ({}):", warnings.len())));
    for w in &warnings {
        println!("   {}", warning(&w.to_string()));
    }
    println!();

    print_hints(&warnings);

    ExitCode::FAILURE
}

/// Prints hints for resolving common warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    for w in warnings {
        match w {
            ConfigWarning::LookupSepConflictsWithFacets { .. } | ConfigWarning::EmptyLookupSep => {
                println!("{}", dim("Hint: set query.lookup_sep to \",\""));
            }
            ConfigWarning::DuplicateParam { .. } => {
                println!("{}", dim("Hint: give each feature its own parameter name"));
            }
            _ => {}
        }
    }
}
