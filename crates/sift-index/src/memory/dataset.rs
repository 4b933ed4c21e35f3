//! JSON datasets for the in-memory backend.
//!
//! ```json
//! {
//!   "schemas": [
//!     {"name": "PersonIndex", "model": "mockapp.mockperson", "document_field": "text",
//!      "fields": [{"name": "firstname", "type": "char"}]}
//!   ],
//!   "documents": [
//!     {"schema": "PersonIndex", "id": 1, "fields": {"firstname": "Abel", "text": "Abel"}}
//!   ]
//! }
//! ```

use std::{collections::BTreeMap, sync::Arc};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    document::Document,
    error::BackendError,
    schema::{SchemaDescriptor, SchemaField},
};

/// A set of schemas and the documents indexed with them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    /// Declared schemas.
    pub schemas: Vec<DatasetSchema>,
    /// Indexed documents.
    #[serde(default)]
    pub documents: Vec<DatasetDocument>,
}

/// A schema declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSchema {
    /// Type name.
    pub name: String,
    /// Model label, `app_label.model_name`.
    pub model: String,
    /// Main full-text field.
    #[serde(default)]
    pub document_field: Option<String>,
    /// Typed fields.
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// A document id, written as a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    /// Textual id.
    Text(String),
    /// Numeric id.
    Number(i64),
}

impl DocumentId {
    /// The id as text.
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// One indexed document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDocument {
    /// Name of the schema it was indexed with.
    pub schema: String,
    /// Unique id.
    pub id: DocumentId,
    /// Stored attributes.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Dataset {
    /// Builds descriptors and documents, checking every document names a declared schema.
    pub fn into_parts(
        self,
    ) -> Result<(Vec<Arc<SchemaDescriptor>>, Vec<Document>), BackendError> {
        let schemas: Vec<Arc<SchemaDescriptor>> = self
            .schemas
            .into_iter()
            .map(|declared| {
                let mut builder = SchemaDescriptor::builder(declared.name, declared.model);
                if let Some(document) = declared.document_field {
                    builder = builder.document(document);
                }
                for field in declared.fields {
                    builder = builder.field(field.name, field.field_type);
                }
                builder.build()
            })
            .collect();
        let by_name: BTreeMap<&str, &Arc<SchemaDescriptor>> =
            schemas.iter().map(|s| (s.name(), s)).collect();

        let documents = self
            .documents
            .into_iter()
            .map(|doc| {
                let id = doc.id.into_string();
                let schema = by_name
                    .get(doc.schema.as_str())
                    .ok_or_else(|| BackendError::UnknownSchema {
                        id: id.clone(),
                        schema: doc.schema.clone(),
                    })?;
                Ok(Document::new(Arc::clone(schema), id, doc.fields))
            })
            .collect::<Result<Vec<_>, BackendError>>()?;
        Ok((schemas, documents))
    }
}
