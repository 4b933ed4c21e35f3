//! Implementation of `sift init`.

use std::{fs, path::PathBuf, process::ExitCode};

use sift_config::{CONFIG_FILENAME, global_config_path, global_template, local_template};

use crate::cli::{
    args::InitCommand,
    context::CommandContext,
    output::{dim, indent, subheader},
};

/// Where `init` writes, and which template it writes there.
struct Target {
    /// File to create.
    path: PathBuf,
    /// Whether this is `~/.sift.toml`.
    global: bool,
}

/// Picks the file to write. Running in the home directory implies `--global`.
fn target(ctx: &CommandContext, cmd: &InitCommand) -> Result<Target, ExitCode> {
    let global_path = global_config_path();
    let in_home = global_path
        .as_deref()
        .and_then(|p| p.parent())
        .is_some_and(|home| home == ctx.cwd);

    if !(cmd.global || in_home) {
        return Ok(Target {
            path: ctx.cwd.join(CONFIG_FILENAME),
            global: false,
        });
    }
    global_path
        .map(|path| Target { path, global: true })
        .ok_or_else(|| {
            eprintln!("error: could not determine home directory");
            ExitCode::FAILURE
        })
}

/// Writes a commented `.sift.toml` template.
pub fn run(ctx: &CommandContext, cmd: &InitCommand) -> ExitCode {
    let target = match target(ctx, cmd) {
        Ok(target) => target,
        Err(code) => return code,
    };

    if target.path.exists() && !cmd.force {
        eprintln!(
            "error: configuration file already exists: {}",
            target.path.display()
        );
        eprintln!("use --force to overwrite");
        return ExitCode::FAILURE;
    }

    let template = if target.global {
        global_template()
    } else {
        local_template()
    };
    if let Err(e) = fs::write(&target.path, &template) {
        eprintln!("error: failed to write {}: {e}", target.path.display());
        return ExitCode::FAILURE;
    }

    println!("Created {}", target.path.display());
    println!();
    println!("{}", subheader("Configuration written:"));
    println!("{}", indent(&template));
    println!();
    println!(
        "{}",
        dim("Uncomment settings to change them, then run 'sift check'.")
    );
    ExitCode::SUCCESS
}
