//! Configuration system for sift.
//!
//! sift uses TOML configuration files named `.sift.toml`. Configuration is resolved by walking
//! up the directory tree from the current working directory, collecting any `.sift.toml` files
//! found, then loading `~/.sift.toml` as the global config with lowest precedence.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod templates;
mod validate;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawBoostSettings, RawConfig, RawFacetSettings, RawGeoSettings, RawQuerySettings,
    parse_config_file, parse_config_str,
};
use serde::{Deserialize, Serialize};
use sift_query::{
    DEFAULT_BOOST_PARAM, DEFAULT_LOOKUP_SEP, DEFAULT_NEGATION_KEYWORD, DEFAULT_POINT_FIELD,
    DEFAULT_POINT_PARAM, DEFAULT_SRID, GeoSettings, Operator, QueryCompiler,
};
pub use templates::{global_template, local_template};
pub use validate::ConfigWarning;
use validate::validate_config;

/// Default name of the facet selection parameter.
pub const DEFAULT_SELECTED_PARAM: &str = "selected_facets";

/// Default pagination parameter stripped from narrow URLs.
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Default field holding the unique document id.
pub const DEFAULT_DOCUMENT_UID_FIELD: &str = "id";

/// Top-level merged configuration for sift.
///
/// This represents the fully resolved configuration after merging all discovered `.sift.toml`
/// files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Filter compilation settings.
    pub query: QuerySettings,
    /// Boost settings.
    pub boost: BoostSettings,
    /// Geo-spatial settings.
    pub geo: GeoConfig,
    /// Facet settings.
    pub facets: FacetSettings,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
    /// Files the configuration was merged from, highest precedence first.
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.sift.toml` files.
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        if files.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(merge_configs(&parsed))
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Builds the filter compiler described by the `[query]` section.
    pub fn compiler(&self) -> QueryCompiler {
        QueryCompiler::new(&self.query.lookup_sep, &self.query.negation_keyword)
            .with_operator(self.query.default_operator)
    }

    /// Returns the geo parameter names described by the `[geo]` section.
    pub fn geo_settings(&self) -> GeoSettings {
        GeoSettings {
            param: self.geo.param.clone(),
            point_field: self.geo.point_field.clone(),
            srid: self.geo.srid,
        }
    }

    /// Query parameters consumed by boost, geo and facet selection rather than filtering.
    pub fn reserved_params(&self) -> Vec<String> {
        let mut reserved = vec![
            self.boost.param.clone(),
            self.geo.param.clone(),
            self.facets.selected_param.clone(),
        ];
        reserved.extend(self.facets.page_params.iter().cloned());
        reserved
    }

    /// Serializes the effective settings to TOML format.
    ///
    /// The output has the same shape as a `.sift.toml` file.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let serializable = SerializableSettings {
            query: self.query.clone(),
            boost: self.boost.clone(),
            geo: self.geo.clone(),
            facets: self.facets.clone(),
        };
        Ok(toml::to_string_pretty(&serializable)?)
    }
}

/// Filter compilation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Separator between tokens of one parameter value.
    pub lookup_sep: String,
    /// Lookup segment that turns a filter into an exclusion.
    pub negation_keyword: String,
    /// Operator joining distinct parameters.
    pub default_operator: Operator,
    /// Field holding the unique document id used by retrieval.
    pub document_uid_field: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            lookup_sep: DEFAULT_LOOKUP_SEP.to_string(),
            negation_keyword: DEFAULT_NEGATION_KEYWORD.to_string(),
            default_operator: Operator::And,
            document_uid_field: DEFAULT_DOCUMENT_UID_FIELD.to_string(),
        }
    }
}

/// Boost settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoostSettings {
    /// Name of the boost query parameter.
    pub param: String,
}

impl Default for BoostSettings {
    fn default() -> Self {
        Self {
            param: DEFAULT_BOOST_PARAM.to_string(),
        }
    }
}

/// Geo-spatial settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Name of the `latitude,longitude` query parameter.
    pub param: String,
    /// Indexed location field.
    pub point_field: String,
    /// Spatial reference system id.
    pub srid: u32,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            param: DEFAULT_POINT_PARAM.to_string(),
            point_field: DEFAULT_POINT_FIELD.to_string(),
            srid: DEFAULT_SRID,
        }
    }
}

/// Facet settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FacetSettings {
    /// Name of the repeated facet selection parameter.
    pub selected_param: String,
    /// Pagination parameters stripped from narrow URLs.
    pub page_params: Vec<String>,
    /// Whether facet responses also carry the matching documents.
    pub serialize_objects: bool,
}

impl Default for FacetSettings {
    fn default() -> Self {
        Self {
            selected_param: DEFAULT_SELECTED_PARAM.to_string(),
            page_params: vec![DEFAULT_PAGE_PARAM.to_string()],
            serialize_objects: false,
        }
    }
}

/// Internal struct for TOML serialization of settings.
#[derive(Serialize)]
struct SerializableSettings {
    /// Filter compilation settings.
    query: QuerySettings,
    /// Boost settings.
    boost: BoostSettings,
    /// Geo-spatial settings.
    geo: GeoConfig,
    /// Facet settings.
    facets: FacetSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_settings_defaults() {
        let query = QuerySettings::default();
        assert_eq!(query.lookup_sep, ",");
        assert_eq!(query.negation_keyword, "not");
        assert_eq!(query.default_operator, Operator::And);
        assert_eq!(query.document_uid_field, "id");
    }

    #[test]
    fn test_geo_and_facet_defaults() {
        let config = Config::default();
        assert_eq!(config.boost.param, "boost");
        assert_eq!(config.geo.param, "from");
        assert_eq!(config.geo.point_field, "coordinates");
        assert_eq!(config.geo.srid, 4326);
        assert_eq!(config.facets.selected_param, "selected_facets");
        assert_eq!(config.facets.page_params, vec!["page"]);
        assert!(!config.facets.serialize_objects);
    }

    #[test]
    fn test_reserved_params() {
        let reserved = Config::default().reserved_params();
        for name in ["boost", "from", "selected_facets", "page"] {
            assert!(reserved.iter().any(|r| r == name), "missing {name}");
        }
    }

    #[test]
    fn test_compiler_follows_settings() {
        let mut config = Config::default();
        config.query.lookup_sep = ";".into();
        config.query.default_operator = Operator::Or;
        let compiler = config.compiler();
        assert_eq!(compiler.lookup_sep(), ";");
        assert_eq!(compiler.operator(), Operator::Or);
    }

    #[test]
    fn test_settings_to_toml() {
        let toml = Config::default().settings_to_toml().unwrap();

        assert!(toml.contains("[query]"));
        assert!(toml.contains("[boost]"));
        assert!(toml.contains("[geo]"));
        assert!(toml.contains("[facets]"));
        assert!(toml.contains("negation_keyword = \"not\""));
        assert!(toml.contains("default_operator = \"and\""));
        assert!(toml.contains("srid = 4326"));

        // The rendered settings must load back as a config file.
        let reparsed = parse_config_str(&toml, Path::new("rendered.toml")).unwrap();
        assert_eq!(reparsed.query.unwrap().lookup_sep.as_deref(), Some(","));
    }
}
