//! Incoming search requests.

use sift_query::QueryParams;
use url::Url;

/// A search request: the path it was made to and its query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Request path without the query string.
    pub path: String,
    /// Decoded query parameters.
    pub params: QueryParams,
}

impl SearchRequest {
    /// Creates a request.
    pub fn new(path: impl Into<String>, params: QueryParams) -> Self {
        Self {
            path: path.into(),
            params,
        }
    }

    /// Splits an absolute URL or a `path?query` reference into a request.
    pub fn from_url(url: &str) -> Self {
        if let Ok(parsed) = Url::parse(url) {
            return Self::new(
                parsed.path(),
                QueryParams::parse(parsed.query().unwrap_or_default()),
            );
        }
        match url.split_once('?') {
            Some((path, query)) => Self::new(path, QueryParams::parse(query)),
            None => Self::new(url, QueryParams::new()),
        }
    }
}
