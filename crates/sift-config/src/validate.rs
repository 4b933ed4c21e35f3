//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for settings that would make
//! requests misparse.

use std::{collections::BTreeMap, fmt};

use sift_query::{LOOKUP_SEPARATOR, facet::OPTION_DELIMITER};

use crate::Config;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The lookup separator is the facet option delimiter; facet requests will fail.
    LookupSepConflictsWithFacets {
        /// The configured separator.
        separator: String,
    },
    /// The lookup separator is empty, so values are never split into tokens.
    EmptyLookupSep,
    /// The negation keyword is empty, so no parameter is ever treated as an exclusion.
    EmptyNegationKeyword,
    /// The negation keyword contains the lookup separator and can never match a segment.
    NegationKeywordContainsSeparator {
        /// The configured keyword.
        keyword: String,
    },
    /// Two features read the same query parameter.
    DuplicateParam {
        /// The shared parameter name.
        param: String,
        /// Settings that use it.
        settings: Vec<String>,
    },
    /// The geo point field is empty; geo filtering will fail.
    EmptyPointField,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookupSepConflictsWithFacets { separator } => write!(
                f,
                "query.lookup_sep {separator:?} conflicts with the facet option delimiter"
            ),
            Self::EmptyLookupSep => {
                write!(f, "query.lookup_sep is empty, values will not be split")
            }
            Self::EmptyNegationKeyword => {
                write!(f, "query.negation_keyword is empty, exclusions are disabled")
            }
            Self::NegationKeywordContainsSeparator { keyword } => write!(
                f,
                "query.negation_keyword {keyword:?} contains \"{LOOKUP_SEPARATOR}\" and can never match"
            ),
            Self::DuplicateParam { param, settings } => write!(
                f,
                "query parameter '{param}' is used by {}",
                settings.join(" and ")
            ),
            Self::EmptyPointField => write!(f, "geo.point_field is empty"),
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let sep = &config.query.lookup_sep;
    if sep.is_empty() {
        warnings.push(ConfigWarning::EmptyLookupSep);
    } else if sep.len() == OPTION_DELIMITER.len_utf8() && sep.starts_with(OPTION_DELIMITER) {
        warnings.push(ConfigWarning::LookupSepConflictsWithFacets {
            separator: sep.clone(),
        });
    }

    let keyword = &config.query.negation_keyword;
    if keyword.is_empty() {
        warnings.push(ConfigWarning::EmptyNegationKeyword);
    } else if keyword.contains(LOOKUP_SEPARATOR) {
        warnings.push(ConfigWarning::NegationKeywordContainsSeparator {
            keyword: keyword.clone(),
        });
    }

    if config.geo.point_field.is_empty() {
        warnings.push(ConfigWarning::EmptyPointField);
    }

    warnings.extend(duplicate_params(config));
    warnings
}

/// Reports query parameters claimed by more than one setting.
fn duplicate_params(config: &Config) -> Vec<ConfigWarning> {
    let mut users: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    users
        .entry(config.boost.param.as_str())
        .or_default()
        .push("boost.param".into());
    users
        .entry(config.geo.param.as_str())
        .or_default()
        .push("geo.param".into());
    users
        .entry(config.facets.selected_param.as_str())
        .or_default()
        .push("facets.selected_param".into());
    for page in &config.facets.page_params {
        users
            .entry(page.as_str())
            .or_default()
            .push("facets.page_params".into());
    }

    users
        .into_iter()
        .filter(|(_, settings)| settings.len() > 1)
        .map(|(param, settings)| ConfigWarning::DuplicateParam {
            param: param.to_string(),
            settings,
        })
        .collect()
}
