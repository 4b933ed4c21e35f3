//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use sift_config::Config;
use sift_index::{FilterContext, SearchRequest};
use sift_query::{FieldPolicy, QueryParams};

/// Owner name reported in errors raised by CLI-built policies.
pub const CLI_OWNER: &str = "sift";

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (may be default if no config files found).
    pub config: Config,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    pub fn load() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let config = load_config_or_failure(&cwd)?;
        Ok(Self { cwd, config })
    }

    /// Loads only the current directory, skipping configuration parsing.
    ///
    /// Used for `init`, which should work even when an existing config file is invalid.
    pub fn load_cwd_only() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self {
            cwd,
            config: Config::default(),
        })
    }

    /// Filter context for commands that compile without an endpoint.
    pub fn filter_context(&self) -> FilterContext<'_> {
        FilterContext {
            name: CLI_OWNER,
            serializer: None,
            facet_policy: None,
            config: &self.config,
        }
    }

    /// Parameters of `query` that are field filters under `policy`.
    pub fn filter_params(&self, query: &str, policy: &FieldPolicy) -> QueryParams {
        self.filter_context()
            .filter_params(&parse_request(query).params, policy)
    }
}

/// Reads a query argument: a full URL, a `path?query` reference or a bare query string.
pub fn parse_request(query: &str) -> SearchRequest {
    if query.contains('?') {
        SearchRequest::from_url(query)
    } else {
        SearchRequest::new("/", QueryParams::parse(query))
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Loads configuration from the provided directory or exits with an error.
fn load_config_or_failure(cwd: &Path) -> Result<Config, ExitCode> {
    Config::load(cwd).map_err(|e| {
        eprintln!("error: failed to load configuration: {e}");
        ExitCode::FAILURE
    })
}
