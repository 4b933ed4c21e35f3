//! More-like-this scoring by shared terms.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::matching::words;
use crate::{document::Document, schema::display_value};

/// Parameters for more-like-this queries.
///
/// Controls which words of the source document become query terms.
#[derive(Debug, Clone)]
pub struct MoreLikeThisParams {
    /// Minimum term frequency in the source document. Terms appearing fewer times are ignored.
    pub min_term_frequency: usize,
    /// Maximum number of query terms to use.
    pub max_query_terms: usize,
    /// Minimum word length. Shorter words are ignored.
    pub min_word_length: usize,
    /// Maximum word length. Longer words are ignored.
    pub max_word_length: usize,
}

impl Default for MoreLikeThisParams {
    fn default() -> Self {
        Self {
            min_term_frequency: 1,
            max_query_terms: 25,
            min_word_length: 3,
            max_word_length: 40,
        }
    }
}

impl MoreLikeThisParams {
    /// Picks the query terms of `source`: its most frequent eligible words.
    pub fn query_terms(&self, source: &Document) -> BTreeSet<String> {
        let mut frequencies: BTreeMap<String, usize> = BTreeMap::new();
        for word in document_words(source) {
            let len = word.chars().count();
            if len < self.min_word_length || len > self.max_word_length {
                continue;
            }
            *frequencies.entry(word).or_default() += 1;
        }
        let mut ranked: Vec<(String, usize)> = frequencies
            .into_iter()
            .filter(|(_, freq)| *freq >= self.min_term_frequency)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(self.max_query_terms)
            .map(|(word, _)| word)
            .collect()
    }
}

/// Number of `terms` occurring in `document`.
pub fn shared_terms(document: &Document, terms: &BTreeSet<String>) -> usize {
    let own: BTreeSet<String> = document_words(document).collect();
    terms.intersection(&own).count()
}

/// Words of the document's main text, or of all its text fields without one.
fn document_words(document: &Document) -> impl Iterator<Item = String> {
    let text = match document
        .schema
        .document_field()
        .and_then(|name| document.text(name))
    {
        Some(text) => text.to_string(),
        None => document
            .fields
            .values()
            .filter(|v| matches!(v, Value::String(_) | Value::Array(_)))
            .map(display_value)
            .collect::<Vec<_>>()
            .join(" "),
    };
    words(&text).collect::<Vec<_>>().into_iter()
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::schema::SchemaDescriptor;

    fn doc(id: &str, text: &str) -> Document {
        let schema = SchemaDescriptor::builder("PersonIndex", "mockapp.mockperson")
            .document("text")
            .build();
        let mut fields = Map::new();
        fields.insert("text".into(), json!(text));
        Document::new(schema, id, fields)
    }

    #[test]
    fn query_terms_skip_short_words_and_rank_by_frequency() {
        let params = MoreLikeThisParams {
            max_query_terms: 2,
            ..MoreLikeThisParams::default()
        };
        let terms = params.query_terms(&doc("1", "a fox in a den with a fox near a box box box"));
        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec!["box".to_string(), "fox".to_string()]
        );
    }

    #[test]
    fn shared_terms_counts_overlap() {
        let source = doc("1", "Abel lives in Oslo near the fjord");
        let terms = MoreLikeThisParams::default().query_terms(&source);
        assert_eq!(shared_terms(&doc("2", "Oslo fjord cruise"), &terms), 2);
        assert_eq!(shared_terms(&doc("3", "Bergen rain"), &terms), 0);
    }
}
