//! Request query parameters.

use url::form_urlencoded;

/// Ordered multimap of query-string parameters.
///
/// Keys keep the order in which they were first seen; repeated keys collect their values in
/// order, mirroring how `a=1&b=2&a=3` is read by web frameworks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Entries in first-insertion order.
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.append(key.into_owned(), value.into_owned());
        }
        params
    }

    /// Appends a value to `key`, creating the key if needed.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Builder-style [`append`](Self::append).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    /// Replaces all values of `key`. The key keeps its position if present, otherwise it is
    /// appended.
    pub fn set_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((key, values)),
        }
    }

    /// Returns all values of `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the last value of `key`, matching single-value access in web frameworks.
    pub fn last(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Removes `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns a copy without the given keys.
    pub fn without<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !keys.iter().any(|drop| drop.as_ref() == k))
                .cloned()
                .collect(),
        }
    }

    /// Iterates over `(key, values)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over every value of every key, in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the parameters as a form-urlencoded query string.
    ///
    /// Spaces become `+` and reserved characters are percent-encoded, so `a:b c` renders as
    /// `a%3Ab+c`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_order_and_repeats() {
        let params = QueryParams::parse("b=2&a=1&b=3");
        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(params.get("b").unwrap(), ["2", "3"]);
        assert_eq!(params.last("b"), Some("3"));
    }

    #[test]
    fn parse_decodes_values() {
        let params = QueryParams::parse("?selected_facets=firstname_exact%3AJohn&name=John+McClane");
        assert_eq!(params.last("selected_facets"), Some("firstname_exact:John"));
        assert_eq!(params.last("name"), Some("John McClane"));
    }

    #[test]
    fn query_string_encodes_reserved_characters() {
        let params = QueryParams::new().with("selected_facets", "created_exact:2015-05-01 00:00:00");
        assert_eq!(
            params.to_query_string(),
            "selected_facets=created_exact%3A2015-05-01+00%3A00%3A00"
        );
    }

    #[test]
    fn without_drops_keys() {
        let params = QueryParams::parse("page=2&q=x");
        let trimmed = params.without(&["page"]);
        assert_eq!(trimmed.to_query_string(), "q=x");
        assert!(params.contains_key("page"));
    }

    #[test]
    fn set_list_replaces_in_place() {
        let mut params = QueryParams::parse("a=1&b=2");
        params.set_list("a", vec!["9".into(), "8".into()]);
        assert_eq!(params.to_query_string(), "a=9&a=8&b=2");
    }

    #[test]
    fn remove_returns_values() {
        let mut params = QueryParams::parse("a=1&a=2&b=3");
        assert_eq!(params.remove("a"), Some(vec!["1".to_string(), "2".to_string()]));
        assert_eq!(params.len(), 1);
        assert_eq!(params.remove("missing"), None);
    }
}
