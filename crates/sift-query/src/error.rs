//! Error types for query compilation.
//!
//! Every error is either a wiring mistake on the server side ([`ErrorKind::Configuration`])
//! or a malformed request ([`ErrorKind::Validation`]). Callers translate the former into a
//! server error and the latter into a client error.

use thiserror::Error;

use crate::facet::VALID_GAP_UNITS;

/// Broad classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A declaration is missing or contradictory. Not recoverable at request time.
    Configuration,
    /// The request carried a value that cannot be interpreted.
    Validation,
}

/// Errors raised while turning query parameters into backend queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A field policy declared both an allow list and an exclude list.
    #[error("cannot set both `fields` and `exclude` on {owner}")]
    FieldsAndExclude {
        /// Name of the declaring serializer or policy.
        owner: String,
    },

    /// The lookup separator collides with the facet option delimiter.
    #[error(
        "the lookup separator {separator:?} on {owner} conflicts with the facet option parser, \
         choose another separator"
    )]
    SeparatorConflict {
        /// Name of the endpoint owning the separator.
        owner: String,
        /// The offending separator.
        separator: String,
    },

    /// A facet declaration lists no fields.
    #[error("{owner} must declare at least one facet field")]
    MissingFacetFields {
        /// Name of the facet declaration.
        owner: String,
    },

    /// A geo filter was configured without a point field.
    #[error("{owner} has no point field, set it to the name of the location field to filter on")]
    MissingPointField {
        /// Name of the geo filter owner.
        owner: String,
    },

    /// The boost parameter did not contain exactly a term and a factor.
    #[error("Cannot convert the '{param}' query parameter to a valid boost filter.")]
    MalformedBoost {
        /// Name of the boost query parameter.
        param: String,
    },

    /// The boost factor was not a number.
    #[error(
        "Cannot convert boost to float value. Make sure to provide a numerical boost value."
    )]
    BoostNotNumeric {
        /// The rejected factor.
        value: String,
    },

    /// The `from` parameter was not a `latitude,longitude` pair of floats.
    #[error(
        "Cannot convert `{param}=latitude,longitude` query parameter to float values. \
         Make sure to provide numerical values only!"
    )]
    InvalidCoordinates {
        /// Name of the point query parameter.
        param: String,
    },

    /// A distance unit was supplied more than once.
    #[error("Each unit must have exactly one value.")]
    UnitValueCount {
        /// The repeated unit.
        unit: String,
    },

    /// A distance value was not a number.
    #[error("Cannot convert distance {value:?} for unit '{unit}' to a float value.")]
    InvalidDistance {
        /// Unit the value was supplied for.
        unit: String,
        /// The rejected value.
        value: String,
    },

    /// A date facet lacks one of its required options.
    #[error("Date faceting requires at least 'start_date', 'end_date' and 'gap_by' to be set.")]
    IncompleteDateFacet {
        /// Field the facet was requested for.
        field: String,
    },

    /// A date facet used an unknown gap unit.
    #[error("The 'gap_by' parameter must be one of {}.", VALID_GAP_UNITS.join(", "))]
    InvalidGapUnit {
        /// The rejected unit.
        value: String,
    },

    /// A date option could not be parsed.
    #[error("Cannot parse {value:?} for option '{option}' as a date.")]
    InvalidDate {
        /// Option name (`start_date` or `end_date`).
        option: String,
        /// The rejected value.
        value: String,
    },

    /// An integer option could not be parsed.
    #[error("Cannot convert {value:?} for option '{option}' to an integer.")]
    InvalidInteger {
        /// Option name.
        option: String,
        /// The rejected value.
        value: String,
    },
}

impl QueryError {
    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FieldsAndExclude { .. }
            | Self::SeparatorConflict { .. }
            | Self::MissingFacetFields { .. }
            | Self::MissingPointField { .. } => ErrorKind::Configuration,
            Self::MalformedBoost { .. }
            | Self::BoostNotNumeric { .. }
            | Self::InvalidCoordinates { .. }
            | Self::UnitValueCount { .. }
            | Self::InvalidDistance { .. }
            | Self::IncompleteDateFacet { .. }
            | Self::InvalidGapUnit { .. }
            | Self::InvalidDate { .. }
            | Self::InvalidInteger { .. } => ErrorKind::Validation,
        }
    }

    /// Returns true if the error was caused by the request rather than the server setup.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_unit_message_lists_valid_units() {
        let err = QueryError::InvalidGapUnit {
            value: "century".into(),
        };
        let message = err.to_string();
        assert!(message.contains("year, month, day, hour, minute, second"));
        assert!(err.is_client_error());
    }

    #[test]
    fn configuration_errors_are_not_client_errors() {
        let err = QueryError::FieldsAndExclude {
            owner: "PersonSerializer".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("PersonSerializer"));
    }

    #[test]
    fn separator_conflict_names_owner() {
        let err = QueryError::SeparatorConflict {
            owner: "PersonEndpoint".into(),
            separator: ":".into(),
        };
        let message = err.to_string();
        assert!(message.contains("PersonEndpoint"));
        assert!(message.contains("\":\""));
    }
}
