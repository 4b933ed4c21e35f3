//! Error types for the sift-index crate.

use std::io;

use sift_query::QueryError;
use thiserror::Error;

/// Broad classification of an [`IndexError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A serializer, endpoint or filter was wired up incorrectly.
    Configuration,
    /// The request carried a value that cannot be interpreted.
    Validation,
    /// The requested document or model does not exist.
    NotFound,
}

/// A failure reported by a search backend while executing a query.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not execute the query.
    #[error("search backend failed: {0}")]
    Execute(String),

    /// A dataset could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A dataset could not be decoded.
    #[error("invalid dataset: {0}")]
    Dataset(#[from] serde_json::Error),

    /// A dataset document names a schema the dataset does not declare.
    #[error("document {id} uses unknown schema {schema}")]
    UnknownSchema {
        /// Document id.
        id: String,
        /// The undeclared schema name.
        schema: String,
    },
}

/// Errors raised while serving a search request.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Query compilation or parameter parsing failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A serializer was built with neither schemas nor delegate serializers.
    #[error("{owner} must declare either schemas or a serializer per schema")]
    MissingSchemas {
        /// Name of the serializer.
        owner: String,
    },

    /// A delegating serializer has no entry for a document's schema.
    #[error("could not find a serializer for {schema} in {owner}")]
    MissingSerializer {
        /// Name of the delegating serializer.
        owner: String,
        /// Schema name without an entry.
        schema: String,
    },

    /// The `model` parameter named no known schema.
    #[error(
        "Could not find any models matching '{model}'. Make sure to use a valid \
         'app_label.model' name for the 'model' query parameter."
    )]
    UnknownModel {
        /// The requested model label.
        model: String,
    },

    /// No document matched a retrieval.
    #[error("No result matches the given query.")]
    NotFound,

    /// More than one document matched a retrieval.
    #[error("Multiple results matches the given query. Expected a single result.")]
    Ambiguous {
        /// Number of matching documents.
        count: usize,
    },

    /// A facet request reached an endpoint without a facet declaration.
    #[error("{owner} has no facet serializer, faceting is not available")]
    MissingFacetPolicy {
        /// Name of the endpoint.
        owner: String,
    },

    /// Highlighting was requested but neither a field nor a document field is known.
    #[error("cannot highlight {schema}: no highlight field and no document field")]
    MissingDocumentField {
        /// Schema being highlighted.
        schema: String,
    },
}

impl IndexError {
    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Query(err) => match err.kind() {
                sift_query::ErrorKind::Configuration => ErrorKind::Configuration,
                sift_query::ErrorKind::Validation => ErrorKind::Validation,
            },
            Self::Backend(_)
            | Self::MissingSchemas { .. }
            | Self::MissingSerializer { .. }
            | Self::MissingFacetPolicy { .. }
            | Self::MissingDocumentField { .. } => ErrorKind::Configuration,
            Self::UnknownModel { .. } | Self::NotFound | Self::Ambiguous { .. } => {
                ErrorKind::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_keep_their_kind() {
        let err = IndexError::from(QueryError::MalformedBoost {
            param: "boost".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Cannot convert the 'boost' query parameter to a valid boost filter."
        );
    }

    #[test]
    fn retrieval_errors_are_not_found() {
        assert_eq!(IndexError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(IndexError::Ambiguous { count: 2 }.kind(), ErrorKind::NotFound);
        let err = IndexError::UnknownModel {
            model: "mockapp.nope".into(),
        };
        assert!(err.to_string().contains("'mockapp.nope'"));
    }
}
