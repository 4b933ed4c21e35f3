//! Configuration file parsing.
//!
//! Parses individual `.sift.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_with::{OneOrMany, serde_as};
use sift_query::Operator;
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Filter compilation section.
    pub query: Option<RawQuerySettings>,
    /// Boost section.
    pub boost: Option<RawBoostSettings>,
    /// Geo-spatial section.
    pub geo: Option<RawGeoSettings>,
    /// Facet section.
    pub facets: Option<RawFacetSettings>,
}

/// Raw filter compilation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawQuerySettings {
    /// Separator between tokens of one parameter value.
    pub lookup_sep: Option<String>,
    /// Lookup segment that turns a filter into an exclusion.
    pub negation_keyword: Option<String>,
    /// Operator joining distinct parameters.
    pub default_operator: Option<Operator>,
    /// Field holding the unique document id used by retrieval.
    pub document_uid_field: Option<String>,
}

/// Raw boost settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawBoostSettings {
    /// Name of the boost query parameter.
    pub param: Option<String>,
}

/// Raw geo-spatial settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawGeoSettings {
    /// Name of the `latitude,longitude` query parameter.
    pub param: Option<String>,
    /// Indexed location field.
    pub point_field: Option<String>,
    /// Spatial reference system id.
    pub srid: Option<u32>,
}

/// Raw facet settings.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawFacetSettings {
    /// Name of the repeated facet selection parameter.
    pub selected_param: Option<String>,
    /// Pagination parameters stripped from narrow URLs.
    /// Accepts either a single string or an array of strings.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub page_params: Option<Vec<String>>,
    /// Whether facet responses also carry the matching documents.
    pub serialize_objects: Option<bool>,
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
///
/// Useful for validating template content (tests only).
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config_str("", Path::new("test.toml")).unwrap();
        assert!(config.root.is_none());
        assert!(config.query.is_none());
        assert!(config.boost.is_none());
        assert!(config.geo.is_none());
        assert!(config.facets.is_none());
    }

    #[test]
    fn test_parse_query_section() {
        let toml = r#"
[query]
lookup_sep = ";"
negation_keyword = "exclude"
default_operator = "or"
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        let query = config.query.unwrap();
        assert_eq!(query.lookup_sep.as_deref(), Some(";"));
        assert_eq!(query.negation_keyword.as_deref(), Some("exclude"));
        assert_eq!(query.default_operator, Some(Operator::Or));
        assert!(query.document_uid_field.is_none());
    }

    #[test]
    fn test_parse_page_params_single_string() {
        let toml = r#"
[facets]
page_params = "p"
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.facets.unwrap().page_params, Some(vec!["p".to_string()]));
    }

    #[test]
    fn test_parse_page_params_list() {
        let toml = r#"
[facets]
page_params = ["page", "offset"]
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(
            config.facets.unwrap().page_params,
            Some(vec!["page".to_string(), "offset".to_string()])
        );
    }

    #[test]
    fn test_parse_geo_section() {
        let toml = r#"
[geo]
point_field = "location"
srid = 3857
"#;
        let geo = parse_config_str(toml, Path::new("test.toml"))
            .unwrap()
            .geo
            .unwrap();
        assert_eq!(geo.point_field.as_deref(), Some("location"));
        assert_eq!(geo.srid, Some(3857));
        assert!(geo.param.is_none());
    }

    #[test]
    fn test_parse_bad_operator_fails() {
        let toml = r#"
[query]
default_operator = "xor"
"#;
        let err = parse_config_str(toml, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_parse_unknown_key_fails() {
        let err = parse_config_str("[query]\nlookup = \",\"\n", Path::new("t.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn test_parse_root() {
        let config = parse_config_str("root = true\n", Path::new("t.toml")).unwrap();
        assert_eq!(config.root, Some(true));
    }
}
