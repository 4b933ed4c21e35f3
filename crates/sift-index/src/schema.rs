//! Schema descriptors.
//!
//! A schema describes one indexed document type: its name, the model it was built from and
//! its ordered, typed fields. Serializers and backends share descriptors through `Arc`.

use std::{fmt, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Type of an indexed field, deciding how stored values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Plain text.
    Char,
    /// Edge n-gram text, rendered like `Char`.
    EdgeNgram,
    /// N-gram text, rendered like `Char`.
    Ngram,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Float,
    /// Decimal, rendered as a string to keep precision.
    Decimal,
    /// Boolean.
    Boolean,
    /// Calendar date, rendered `YYYY-MM-DD`.
    Date,
    /// Date and time, rendered `YYYY-MM-DDTHH:MM:SS`.
    DateTime,
    /// List of values.
    MultiValue,
    /// Geographic point, rendered as `{"latitude", "longitude"}`.
    Location,
}

impl FieldType {
    /// Renders a stored value for output.
    ///
    /// Values that cannot be converted are passed through unchanged; `null` stays `null`.
    pub fn convert(self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            Self::Char | Self::EdgeNgram | Self::Ngram => match value {
                Value::String(_) => value.clone(),
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(display_value)
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                other => Value::String(display_value(other)),
            },
            Self::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
                Value::Number(n) => n
                    .as_f64()
                    .map_or_else(|| value.clone(), |f| Value::from(f.trunc() as i64)),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_or_else(|_| value.clone(), Value::from),
                Value::Bool(b) => Value::from(i64::from(*b)),
                _ => value.clone(),
            },
            Self::Float => match value {
                Value::Number(n) => n
                    .as_f64()
                    .and_then(Number::from_f64)
                    .map_or_else(|| value.clone(), Value::Number),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or_else(|| value.clone(), Value::Number),
                _ => value.clone(),
            },
            Self::Decimal => Value::String(display_value(value)),
            Self::Boolean => match value {
                Value::Bool(_) => value.clone(),
                Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Value::Bool(true),
                    "false" | "0" | "no" | "" => Value::Bool(false),
                    _ => value.clone(),
                },
                _ => value.clone(),
            },
            Self::Date => match value.as_str().and_then(parse_stored_datetime) {
                Some(dt) => Value::String(dt.date().format("%Y-%m-%d").to_string()),
                None => value.clone(),
            },
            Self::DateTime => match value.as_str().and_then(parse_stored_datetime) {
                Some(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
                None => value.clone(),
            },
            Self::MultiValue => match value {
                Value::Array(_) => value.clone(),
                other => Value::Array(vec![other.clone()]),
            },
            Self::Location => parse_location(value).map_or_else(
                || value.clone(),
                |(latitude, longitude)| {
                    let mut point = Map::new();
                    point.insert("latitude".into(), Value::from(latitude));
                    point.insert("longitude".into(), Value::from(longitude));
                    Value::Object(point)
                },
            ),
        }
    }
}

/// Renders a scalar for display, without JSON quoting for strings.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses the datetime layouts a backend stores.
pub fn parse_stored_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads a `(latitude, longitude)` pair from an object, a `[lat, lon]` array or a
/// `"lat,lon"` string.
pub fn parse_location(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Object(map) => {
            let lat = map.get("latitude").or_else(|| map.get("lat"))?.as_f64()?;
            let lon = map
                .get("longitude")
                .or_else(|| map.get("lon"))
                .or_else(|| map.get("lng"))?
                .as_f64()?;
            Some((lat, lon))
        }
        Value::Array(items) => match items.as_slice() {
            [lat, lon] => Some((lat.as_f64()?, lon.as_f64()?)),
            _ => None,
        },
        Value::String(s) => {
            let (lat, lon) = s.split_once(',')?;
            Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
        }
        _ => None,
    }
}

/// A declared field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Describes one indexed document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Type name, e.g. `PersonIndex`.
    name: String,
    /// Model label, `app_label.model_name`.
    model: String,
    /// Fields in declaration order.
    fields: Vec<SchemaField>,
    /// The main full-text field, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document_field: Option<String>,
}

impl SchemaDescriptor {
    /// Starts building a schema.
    pub fn builder(name: impl Into<String>, model: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Self {
                name: name.into(),
                model: model.into().to_ascii_lowercase(),
                fields: Vec::new(),
                document_field: None,
            },
        }
    }

    /// Type name of the schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model label, lowercase `app_label.model_name`.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Looks up the type of a field.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Returns true if the schema declares `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    /// The main full-text field.
    pub fn document_field(&self) -> Option<&str> {
        self.document_field.as_deref()
    }
}

impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

/// Builder for [`SchemaDescriptor`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    /// Schema under construction.
    schema: SchemaDescriptor,
}

impl SchemaBuilder {
    /// Adds a field. Redeclaring a name replaces its type in place.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        if let Some(existing) = self.schema.fields.iter_mut().find(|f| f.name == name) {
            existing.field_type = field_type;
        } else {
            self.schema.fields.push(SchemaField { name, field_type });
        }
        self
    }

    /// Adds the main full-text field.
    pub fn document(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self = self.field(name.clone(), FieldType::Char);
        self.schema.document_field = Some(name);
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> Arc<SchemaDescriptor> {
        Arc::new(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builder_keeps_declaration_order() {
        let schema = SchemaDescriptor::builder("PersonIndex", "MockApp.MockPerson")
            .document("text")
            .field("firstname", FieldType::Char)
            .field("birthdate", FieldType::Date)
            .build();
        assert_eq!(schema.model(), "mockapp.mockperson");
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["text", "firstname", "birthdate"]
        );
        assert_eq!(schema.document_field(), Some("text"));
        assert_eq!(schema.field_type("birthdate"), Some(FieldType::Date));
        assert!(!schema.has_field("lastname"));
    }

    #[test]
    fn converts_scalars() {
        assert_eq!(FieldType::Integer.convert(&json!("42")), json!(42));
        assert_eq!(FieldType::Float.convert(&json!("1.5")), json!(1.5));
        assert_eq!(FieldType::Decimal.convert(&json!(1.25)), json!("1.25"));
        assert_eq!(FieldType::Boolean.convert(&json!("yes")), json!(true));
        assert_eq!(FieldType::Char.convert(&json!(7)), json!("7"));
        assert_eq!(FieldType::Char.convert(&Value::Null), Value::Null);
    }

    #[test]
    fn converts_dates() {
        assert_eq!(
            FieldType::Date.convert(&json!("1980-03-04T10:00:00Z")),
            json!("1980-03-04")
        );
        assert_eq!(
            FieldType::DateTime.convert(&json!("2015-10-03 12:30:00")),
            json!("2015-10-03T12:30:00")
        );
        assert_eq!(FieldType::Date.convert(&json!("soon")), json!("soon"));
    }

    #[test]
    fn converts_locations_and_lists() {
        assert_eq!(
            FieldType::Location.convert(&json!("59.9,10.7")),
            json!({"latitude": 59.9, "longitude": 10.7})
        );
        assert_eq!(FieldType::MultiValue.convert(&json!("a")), json!(["a"]));
    }
}
