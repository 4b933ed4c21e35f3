//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`, applying precedence
//! rules.

use std::path::PathBuf;

use crate::{
    BoostSettings, Config, FacetSettings, GeoConfig, QuerySettings,
    parse::{RawBoostSettings, RawConfig, RawFacetSettings, RawGeoSettings, RawQuerySettings},
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config). For every key the first defined value wins; lists
/// such as `page_params` are replaced whole, not concatenated.
pub fn merge_configs(configs: &[ParsedConfig]) -> Config {
    let mut config = Config::default();

    // Iterate in reverse (lowest precedence first) so higher precedence overwrites
    for parsed in configs.iter().rev() {
        let raw = &parsed.config;
        if let Some(ref query) = raw.query {
            apply_raw_query(&mut config.query, query);
        }
        if let Some(ref boost) = raw.boost {
            apply_raw_boost(&mut config.boost, boost);
        }
        if let Some(ref geo) = raw.geo {
            apply_raw_geo(&mut config.geo, geo);
        }
        if let Some(ref facets) = raw.facets {
            apply_raw_facets(&mut config.facets, facets);
        }
    }

    config.config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(PathBuf::from);
    config.sources = configs.iter().map(|c| c.path.clone()).collect();
    config
}

/// Applies raw query settings to result, overwriting any present values.
fn apply_raw_query(result: &mut QuerySettings, raw: &RawQuerySettings) {
    if let Some(ref v) = raw.lookup_sep {
        result.lookup_sep = v.clone();
    }
    if let Some(ref v) = raw.negation_keyword {
        result.negation_keyword = v.clone();
    }
    if let Some(v) = raw.default_operator {
        result.default_operator = v;
    }
    if let Some(ref v) = raw.document_uid_field {
        result.document_uid_field = v.clone();
    }
}

/// Applies raw boost settings to result.
fn apply_raw_boost(result: &mut BoostSettings, raw: &RawBoostSettings) {
    if let Some(ref v) = raw.param {
        result.param = v.clone();
    }
}

/// Applies raw geo settings to result.
fn apply_raw_geo(result: &mut GeoConfig, raw: &RawGeoSettings) {
    if let Some(ref v) = raw.param {
        result.param = v.clone();
    }
    if let Some(ref v) = raw.point_field {
        result.point_field = v.clone();
    }
    if let Some(v) = raw.srid {
        result.srid = v;
    }
}

/// Applies raw facet settings to result.
fn apply_raw_facets(result: &mut FacetSettings, raw: &RawFacetSettings) {
    if let Some(ref v) = raw.selected_param {
        result.selected_param = v.clone();
    }
    if let Some(ref v) = raw.page_params {
        result.page_params = v.clone();
    }
    if let Some(v) = raw.serialize_objects {
        result.serialize_objects = v;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use sift_query::Operator;

    use super::*;
    use crate::parse::parse_config_str;

    fn parsed(path: &str, toml: &str) -> ParsedConfig {
        ParsedConfig {
            path: PathBuf::from(path),
            config: parse_config_str(toml, Path::new(path)).unwrap(),
        }
    }

    #[test]
    fn test_merge_empty() {
        let config = merge_configs(&[]);
        assert_eq!(config.query, QuerySettings::default());
        assert!(config.config_root.is_none());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_closest_wins_per_key() {
        let configs = [
            parsed("/project/.sift.toml", "[query]\nlookup_sep = \";\"\n"),
            parsed(
                "/home/u/.sift.toml",
                "[query]\nlookup_sep = \"|\"\ndefault_operator = \"or\"\n",
            ),
        ];
        let config = merge_configs(&configs);
        assert_eq!(config.query.lookup_sep, ";");
        assert_eq!(config.query.default_operator, Operator::Or);
        assert_eq!(config.query.negation_keyword, "not");
        assert_eq!(config.config_root, Some(PathBuf::from("/project")));
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn test_page_params_replaced_not_concatenated() {
        let configs = [
            parsed("/a/.sift.toml", "[facets]\npage_params = \"p\"\n"),
            parsed("/.sift.toml", "[facets]\npage_params = [\"page\", \"offset\"]\n"),
        ];
        let config = merge_configs(&configs);
        assert_eq!(config.facets.page_params, vec!["p"]);
    }

    #[test]
    fn test_sections_merge_independently() {
        let configs = [
            parsed("/a/.sift.toml", "[geo]\npoint_field = \"location\"\n"),
            parsed("/.sift.toml", "[geo]\nsrid = 3857\n[boost]\nparam = \"b\"\n"),
        ];
        let config = merge_configs(&configs);
        assert_eq!(config.geo.point_field, "location");
        assert_eq!(config.geo.srid, 3857);
        assert_eq!(config.geo.param, "from");
        assert_eq!(config.boost.param, "b");
    }
}
