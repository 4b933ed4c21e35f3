//! Search result documents.

use std::sync::Arc;

use serde_json::{Map, Value};
use sift_query::Distance;

use crate::schema::SchemaDescriptor;

/// A document returned by a search backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Schema the document was indexed with.
    pub schema: Arc<SchemaDescriptor>,
    /// Unique document id.
    pub id: String,
    /// Stored attributes, keyed by field name.
    pub fields: Map<String, Value>,
    /// Highlighted fragments attached by the backend, a string or a list of strings.
    pub highlighted: Option<Value>,
    /// Distance to the geo filter's point, when a distance was requested.
    pub distance: Option<Distance>,
    /// Relevance score.
    pub score: f32,
}

impl Document {
    /// Creates a document with a neutral score.
    pub fn new(
        schema: Arc<SchemaDescriptor>,
        id: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            schema,
            id: id.into(),
            fields,
            highlighted: None,
            distance: None,
            score: 1.0,
        }
    }

    /// Returns a stored attribute.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a stored attribute as text, if it is a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Returns the first highlighted fragment, if any is non-empty.
    pub fn first_highlight(&self) -> Option<&Value> {
        let value = match self.highlighted.as_ref()? {
            Value::Array(items) => items.first()?,
            other => other,
        };
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            other => Some(other),
        }
    }
}
