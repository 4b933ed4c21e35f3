//! Term evaluation against stored documents.

use std::cmp::Ordering;

use serde_json::Value;
use sift_query::{FieldTerm, QueryExpr, facet::parse_datetime};
use tracing::debug;

use crate::{
    document::Document,
    schema::{FieldType, display_value, parse_stored_datetime},
};

/// Pseudo field holding the main full-text field.
pub const CONTENT_FIELD: &str = "content";

/// Pseudo field holding the document id.
pub const ID_FIELD: &str = "id";

/// Values stored under `field`, with lists expanded.
pub fn field_values(document: &Document, field: &str) -> Vec<Value> {
    let stored = document.get(field).cloned().or_else(|| match field {
        ID_FIELD => Some(Value::String(document.id.clone())),
        CONTENT_FIELD => document
            .schema
            .document_field()
            .and_then(|name| document.get(name))
            .cloned(),
        _ => None,
    });
    match stored {
        Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

/// Lowercased alphanumeric words of `text`.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Removes the backslashes a query cleaner put in front of syntax characters.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Evaluates a boolean expression of terms.
pub fn expr_matches(document: &Document, expr: &QueryExpr<FieldTerm>) -> bool {
    match expr {
        QueryExpr::Term(term) => term_matches(document, term),
        QueryExpr::And(exprs) => exprs.iter().all(|e| expr_matches(document, e)),
        QueryExpr::Or(exprs) => exprs.iter().any(|e| expr_matches(document, e)),
    }
}

/// Evaluates a single `field[__lookup] = token` condition.
pub fn term_matches(document: &Document, term: &FieldTerm) -> bool {
    let field = term.base_field();
    let token = unescape(&term.value);
    let field_type = document.schema.field_type(field);
    let values = field_values(document, field);
    values.iter().any(|value| match term.lookup() {
        None => text_matches(value, &token, field_type),
        Some("exact") => equals(value, &token),
        Some("contains") => lower(value).contains(&token.to_lowercase()),
        Some("startswith") => lower(value).starts_with(&token.to_lowercase()),
        Some("endswith") => lower(value).ends_with(&token.to_lowercase()),
        Some("gt") => compare(value, &token) == Some(Ordering::Greater),
        Some("gte") => matches!(
            compare(value, &token),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Some("lt") => compare(value, &token) == Some(Ordering::Less),
        Some("lte") => matches!(
            compare(value, &token),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Some(other) => {
            debug!(lookup = other, field, "unsupported lookup never matches");
            false
        }
    })
}

/// Exact-value match used by facet narrowing. `field` may carry the `_exact` suffix.
pub fn narrow_matches(document: &Document, field: &str, token: &str) -> bool {
    let field = field.strip_suffix("_exact").unwrap_or(field);
    let token = unescape(token);
    field_values(document, field)
        .iter()
        .any(|value| equals(value, &token))
}

/// Lowercased display text of a value.
fn lower(value: &Value) -> String {
    display_value(value).to_lowercase()
}

/// Default match: n-gram fields match fragments, text matches whole words or phrases, other
/// types match by value.
fn text_matches(value: &Value, token: &str, field_type: Option<FieldType>) -> bool {
    let text = lower(value);
    let token = token.to_lowercase();
    match field_type {
        Some(FieldType::EdgeNgram) => {
            text.starts_with(&token) || words(&text).any(|w| w.starts_with(&token))
        }
        Some(FieldType::Ngram) => text.contains(&token),
        Some(FieldType::Char) | None => {
            if text == token {
                return true;
            }
            if token.contains(char::is_whitespace) {
                return text.contains(&token);
            }
            words(&text).any(|w| w == token)
        }
        Some(_) => equals(value, &token),
    }
}

/// Value equality: numeric, then temporal, then case-insensitive text.
fn equals(value: &Value, token: &str) -> bool {
    compare(value, token) == Some(Ordering::Equal)
}

/// Orders a stored value against a query token.
fn compare(value: &Value, token: &str) -> Option<Ordering> {
    let text = display_value(value);
    if let (Ok(a), Ok(b)) = (text.trim().parse::<f64>(), token.trim().parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (parse_stored_datetime(&text), parse_datetime(token)) {
        return Some(a.cmp(&b));
    }
    Some(text.to_lowercase().cmp(&token.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::schema::SchemaDescriptor;

    fn person() -> Document {
        let schema = SchemaDescriptor::builder("PersonIndex", "mockapp.mockperson")
            .document("text")
            .field("firstname", FieldType::Char)
            .field("lastname", FieldType::Char)
            .field("autocomplete", FieldType::EdgeNgram)
            .field("birthdate", FieldType::Date)
            .field("age", FieldType::Integer)
            .field("tags", FieldType::MultiValue)
            .build();
        let mut fields = Map::new();
        fields.insert("text".into(), json!("Abel Foreman, a person from Oslo"));
        fields.insert("firstname".into(), json!("Abel"));
        fields.insert("lastname".into(), json!("Foreman"));
        fields.insert("autocomplete".into(), json!("Abel Foreman"));
        fields.insert("birthdate".into(), json!("1980-04-12"));
        fields.insert("age".into(), json!(44));
        fields.insert("tags".into(), json!(["red", "blue"]));
        Document::new(schema, "7", fields)
    }

    fn term(field: &str, value: &str) -> FieldTerm {
        FieldTerm::new(field, value)
    }

    #[test]
    fn plain_terms_match_words_case_insensitively() {
        let doc = person();
        assert!(term_matches(&doc, &term("firstname", "abel")));
        assert!(term_matches(&doc, &term("content", "oslo")));
        assert!(!term_matches(&doc, &term("content", "osl")));
        assert!(term_matches(&doc, &term("tags", "blue")));
        assert!(term_matches(&doc, &term("id", "7")));
    }

    #[test]
    fn edge_ngrams_match_prefixes() {
        let doc = person();
        assert!(term_matches(&doc, &term("autocomplete", "fore")));
        assert!(!term_matches(&doc, &term("autocomplete", "reman")));
    }

    #[test]
    fn lookups_compare_numbers_and_dates() {
        let doc = person();
        assert!(term_matches(&doc, &term("age__gt", "40")));
        assert!(!term_matches(&doc, &term("age__lt", "40")));
        assert!(term_matches(&doc, &term("birthdate__gte", "1980-04-12")));
        assert!(term_matches(&doc, &term("birthdate__lt", "Jan 1 1990")));
        assert!(term_matches(&doc, &term("lastname__startswith", "For")));
        assert!(!term_matches(&doc, &term("lastname__fuzzy", "Foreman")));
    }

    #[test]
    fn expressions_combine_terms() {
        let doc = person();
        let expr = QueryExpr::and(vec![
            QueryExpr::Term(term("firstname", "Abel")),
            QueryExpr::or(vec![
                QueryExpr::Term(term("lastname", "Hood")),
                QueryExpr::Term(term("lastname", "Foreman")),
            ]),
        ]);
        assert!(expr_matches(&doc, &expr));
    }

    #[test]
    fn narrowing_strips_exact_suffix_and_escapes() {
        let doc = person();
        assert!(narrow_matches(&doc, "birthdate_exact", "1980-04-12 00\\:00\\:00"));
        assert!(narrow_matches(&doc, "lastname_exact", "foreman"));
        assert!(!narrow_matches(&doc, "lastname_exact", "Fore"));
    }

    #[test]
    fn unescape_drops_cleaner_backslashes() {
        assert_eq!(unescape("a\\:b"), "a:b");
        assert_eq!(unescape("c\\\\tmp"), "c\\tmp");
    }
}
