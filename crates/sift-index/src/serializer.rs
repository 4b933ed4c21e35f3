//! Result field resolution.
//!
//! A [`Serializer`] projects documents from one or more schemas onto a flat JSON record. With a
//! single schema the schema's fields are used as-is. With several schemas every schema field is
//! keyed `_<alias>__<field>` internally and only the keys of the document's own schema survive
//! projection, re-keyed to the bare field name. A serializer may instead delegate whole
//! documents to a per-schema serializer.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use serde_json::{Map, Value};
use sift_query::{FieldPolicy, LOOKUP_SEPARATOR, QueryParams};
use tracing::warn;

use crate::{
    document::Document,
    error::IndexError,
    highlight::Highlighter,
    schema::{FieldType, SchemaDescriptor, display_value},
};

/// Output key for highlighted fragments.
pub const HIGHLIGHTED_KEY: &str = "highlighted";

/// A field computed from the whole document.
pub type ComputedField = Arc<dyn Fn(&Document) -> Value + Send + Sync>;

/// A schema field selected for output.
#[derive(Debug, Clone)]
struct SelectedField {
    /// Key the field is stored under, prefixed in multi-schema mode.
    key: String,
    /// Alias of the schema the field comes from.
    alias: String,
    /// Field name on the document.
    name: String,
    /// Converter for the stored value.
    field_type: FieldType,
}

/// How documents are projected.
#[derive(Clone)]
enum Mode {
    /// Project through the serializer's own schema fields.
    Schemas {
        /// Alias per schema name.
        aliases: BTreeMap<String, String>,
        /// True when keys carry a schema prefix.
        prefixed: bool,
        /// Selected schema fields in declaration order.
        fields: Vec<SelectedField>,
    },
    /// Hand each document to the serializer registered for its schema.
    Delegated(BTreeMap<String, Arc<Serializer>>),
}

/// Projects search results to JSON records.
#[derive(Clone)]
pub struct Serializer {
    /// Serializer name, used in errors.
    name: String,
    /// Projection mode.
    mode: Mode,
    /// Computed fields in declaration order.
    declared: Vec<(String, ComputedField)>,
    /// Policy consumed by the filter compiler.
    policy: FieldPolicy,
    /// Portable highlighter, if enabled.
    highlighter: Option<Highlighter>,
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.mode {
            Mode::Schemas { prefixed: false, .. } => "flat",
            Mode::Schemas { prefixed: true, .. } => "prefixed",
            Mode::Delegated(_) => "delegated",
        };
        f.debug_struct("Serializer")
            .field("name", &self.name)
            .field("mode", &mode)
            .field("fields", &self.field_names())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Serializer {
    /// Starts building a serializer.
    pub fn builder(name: impl Into<String>) -> SerializerBuilder {
        SerializerBuilder {
            name: name.into(),
            schemas: Vec::new(),
            serializers: BTreeMap::new(),
            fields: Vec::new(),
            exclude: Vec::new(),
            ignore_fields: Vec::new(),
            declared: Vec::new(),
            search_fields: Vec::new(),
            field_aliases: Vec::new(),
            schema_aliases: BTreeMap::new(),
            highlighter: None,
        }
    }

    /// Serializer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The visibility policy the filter compiler applies on behalf of this serializer.
    pub fn field_policy(&self) -> &FieldPolicy {
        &self.policy
    }

    /// Schemas whose documents this serializer can project, by name.
    pub fn schema_names(&self) -> Vec<String> {
        match &self.mode {
            Mode::Schemas { aliases, .. } => aliases.keys().cloned().collect(),
            Mode::Delegated(map) => map.keys().cloned().collect(),
        }
    }

    /// Internal output keys, prefixed where the mode prefixes them.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match &self.mode {
            Mode::Schemas { fields, .. } => fields.iter().map(|f| f.key.clone()).collect(),
            Mode::Delegated(_) => Vec::new(),
        };
        for (name, _) in &self.declared {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Projects `document` to a JSON record.
    ///
    /// `params` are the request's query parameters; the highlighter marks their words.
    pub fn serialize(
        &self,
        document: &Document,
        params: &QueryParams,
    ) -> Result<Map<String, Value>, IndexError> {
        let Mode::Schemas {
            aliases,
            prefixed,
            fields,
        } = &self.mode
        else {
            return self.delegate(document, params);
        };

        let schema_name = document.schema.name();
        let own_alias = aliases.get(schema_name).map_or(schema_name, String::as_str);
        let mut record = Map::new();

        for field in fields {
            // Flat keys belong to whichever schema has the field.
            if (*prefixed && field.alias != own_alias) || !document.schema.has_field(&field.name) {
                continue;
            }
            let value = document.get(&field.name).unwrap_or(&Value::Null);
            record.insert(field.name.clone(), field.field_type.convert(value));
        }

        for (name, compute) in &self.declared {
            match strip_schema_prefix(name, aliases) {
                Some((alias, bare)) if alias == own_alias => {
                    record.insert(bare.to_string(), compute(document));
                }
                Some(_) => {}
                None => {
                    record.insert(name.clone(), compute(document));
                }
            }
        }

        if let Some(highlighted) = document.first_highlight() {
            record.insert(HIGHLIGHTED_KEY.to_string(), highlighted.clone());
        }
        if let Some(highlighter) = &self.highlighter
            && let Some(field) = highlighter.field().or(document.schema.document_field())
        {
            let text = document.get(field).map(display_value).unwrap_or_default();
            record.insert(
                HIGHLIGHTED_KEY.to_string(),
                Value::String(highlighter.highlight_params(&text, params)),
            );
        }
        Ok(record)
    }

    /// Projects through the serializer registered for the document's schema.
    fn delegate(
        &self,
        document: &Document,
        params: &QueryParams,
    ) -> Result<Map<String, Value>, IndexError> {
        let Mode::Delegated(serializers) = &self.mode else {
            return Ok(Map::new());
        };
        let schema = document.schema.name();
        let Some(serializer) = serializers.get(schema) else {
            return Err(IndexError::MissingSerializer {
                owner: self.name.clone(),
                schema: schema.to_string(),
            });
        };
        let mut record = serializer.serialize(document, params)?;
        for (name, compute) in &self.declared {
            record.insert(name.clone(), compute(document));
        }
        Ok(record)
    }
}

/// Splits `_<alias>__<field>` when `<alias>` is a known schema alias.
fn strip_schema_prefix<'a>(
    name: &'a str,
    aliases: &BTreeMap<String, String>,
) -> Option<(&'a str, &'a str)> {
    let (alias, field) = name.strip_prefix('_')?.split_once(LOOKUP_SEPARATOR)?;
    aliases
        .values()
        .any(|known| known == alias)
        .then_some((alias, field))
}

/// Builder for [`Serializer`].
pub struct SerializerBuilder {
    /// Serializer name.
    name: String,
    /// Schemas projected by this serializer.
    schemas: Vec<Arc<SchemaDescriptor>>,
    /// Per-schema serializers for delegated mode.
    serializers: BTreeMap<String, Arc<Serializer>>,
    /// Allow list of field names.
    fields: Vec<String>,
    /// Deny list of field names.
    exclude: Vec<String>,
    /// Fields never serialized, but still filterable.
    ignore_fields: Vec<String>,
    /// Computed fields.
    declared: Vec<(String, ComputedField)>,
    /// Extra filterable names.
    search_fields: Vec<String>,
    /// External to internal field names.
    field_aliases: Vec<(String, String)>,
    /// Alias per schema name.
    schema_aliases: BTreeMap<String, String>,
    /// Portable highlighter.
    highlighter: Option<Highlighter>,
}

impl SerializerBuilder {
    /// Adds schemas to project.
    pub fn schemas<I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = Arc<SchemaDescriptor>>,
    {
        self.schemas.extend(schemas);
        self
    }

    /// Delegates documents of `schema` to `serializer`.
    pub fn serializer(mut self, schema: impl Into<String>, serializer: Serializer) -> Self {
        self.serializers.insert(schema.into(), Arc::new(serializer));
        self
    }

    /// Restricts output and filtering to these fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Hides these fields from output and filtering.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Leaves these fields out of the output only.
    pub fn ignore_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds a computed field. A computed field overrides a schema field of the same name.
    ///
    /// A delegating serializer adds its computed fields to every delegated record.
    pub fn declared(
        mut self,
        name: impl Into<String>,
        compute: impl Fn(&Document) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.declared.push((name.into(), Arc::new(compute)));
        self
    }

    /// Allows filtering on names that are not output fields.
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Accepts `alias` in the query string as a name for `field`.
    pub fn field_alias(mut self, alias: impl Into<String>, field: impl Into<String>) -> Self {
        self.field_aliases.push((alias.into(), field.into()));
        self
    }

    /// Uses `alias` instead of the schema name in field prefixes.
    pub fn schema_alias(mut self, schema: impl Into<String>, alias: impl Into<String>) -> Self {
        self.schema_aliases.insert(schema.into(), alias.into());
        self
    }

    /// Enables the portable highlighter.
    pub fn highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// Validates the declaration and builds the serializer.
    pub fn build(self) -> Result<Serializer, IndexError> {
        let policy = self.build_policy()?;

        if self.schemas.is_empty() {
            if self.serializers.is_empty() {
                return Err(IndexError::MissingSchemas { owner: self.name });
            }
            return Ok(Serializer {
                name: self.name,
                mode: Mode::Delegated(self.serializers),
                declared: self.declared,
                policy,
                highlighter: None,
            });
        }

        if let Some(highlighter) = &self.highlighter
            && highlighter.field().is_none()
            && let Some(schema) = self.schemas.iter().find(|s| s.document_field().is_none())
        {
            return Err(IndexError::MissingDocumentField {
                schema: schema.name().to_string(),
            });
        }

        let prefixed = self.schemas.len() > 1;
        let aliases: BTreeMap<String, String> = self
            .schemas
            .iter()
            .map(|schema| {
                let alias = self
                    .schema_aliases
                    .get(schema.name())
                    .cloned()
                    .unwrap_or_else(|| schema.name().to_string());
                (schema.name().to_string(), alias)
            })
            .collect();

        let mut fields: Vec<SelectedField> = Vec::new();
        for schema in &self.schemas {
            let alias = &aliases[schema.name()];
            for field in schema.fields() {
                let key = if prefixed {
                    format!("_{alias}{LOOKUP_SEPARATOR}{}", field.name)
                } else {
                    field.name.clone()
                };
                if !self.selects(&field.name, &key) {
                    continue;
                }
                if fields.iter().any(|f| f.key == key) {
                    warn!(
                        serializer = %self.name,
                        field = %key,
                        "field is already in the field list, not adding it again"
                    );
                    continue;
                }
                fields.push(SelectedField {
                    key,
                    alias: alias.clone(),
                    name: field.name.clone(),
                    field_type: field.field_type,
                });
            }
        }

        for (name, _) in &self.declared {
            let overridden = fields.iter().position(|f| &f.key == name);
            if let Some(index) = overridden {
                warn!(
                    serializer = %self.name,
                    field = %name,
                    "declared field overrides the schema field of the same name"
                );
                fields.remove(index);
            }
        }

        Ok(Serializer {
            name: self.name,
            mode: Mode::Schemas {
                aliases,
                prefixed,
                fields,
            },
            declared: self.declared,
            policy,
            highlighter: self.highlighter,
        })
    }

    /// True if a schema field known as `name` (or `key` when prefixed) is serialized.
    fn selects(&self, name: &str, key: &str) -> bool {
        let listed = |list: &[String]| list.iter().any(|f| f == name || f == key);
        if listed(&self.ignore_fields) || listed(&self.exclude) {
            return false;
        }
        self.fields.is_empty() || listed(&self.fields)
    }

    /// Builds the compiler's visibility policy from the field declaration.
    fn build_policy(&self) -> Result<FieldPolicy, IndexError> {
        let mut allowed: BTreeSet<&str> = self.fields.iter().map(String::as_str).collect();
        if !allowed.is_empty() {
            allowed.extend(self.declared.iter().map(|(name, _)| name.as_str()));
        }
        let mut builder = FieldPolicy::builder(&self.name)
            .fields(allowed)
            .exclude(&self.exclude)
            .search_fields(&self.search_fields);
        for (alias, field) in &self.field_aliases {
            builder = builder.alias(alias, field);
        }
        Ok(builder.build()?)
    }
}
