//! Portable result highlighting.
//!
//! Wraps the words of a query in HTML tags inside the densest window of a text block. Works
//! on stored field values, so it needs no backend support.

use std::{cmp::Reverse, collections::BTreeSet, ops::Range};

use serde::Serialize;
use sift_query::QueryParams;

/// Default wrapping tag.
pub const DEFAULT_HTML_TAG: &str = "span";

/// Default CSS class of the wrapping tag.
pub const DEFAULT_CSS_CLASS: &str = "highlighted";

/// Default window length in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 200;

/// Marker added where the window cuts the text.
const ELLIPSIS: &str = "...";

/// Highlights query words in stored text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlighter {
    /// Wrapping tag name.
    html_tag: String,
    /// CSS class set on the wrapping tag.
    css_class: String,
    /// Window length in bytes.
    max_length: usize,
    /// Field to highlight. Falls back to the schema's document field.
    field: Option<String>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self {
            html_tag: DEFAULT_HTML_TAG.to_string(),
            css_class: DEFAULT_CSS_CLASS.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            field: None,
        }
    }
}

impl Highlighter {
    /// Sets the wrapping tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.html_tag = tag.into();
        self
    }

    /// Sets the CSS class.
    pub fn with_css_class(mut self, class: impl Into<String>) -> Self {
        self.css_class = class.into();
        self
    }

    /// Sets the window length.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(1);
        self
    }

    /// Highlights `field` instead of the document field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// The explicitly configured field.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Highlights the words of every parameter value in `params`.
    pub fn highlight_params(&self, text: &str, params: &QueryParams) -> String {
        let query = params.values().collect::<Vec<_>>().join(" ");
        self.highlight(text, &query)
    }

    /// Highlights the words of `query` in `text`.
    ///
    /// Markup in `text` is stripped first. Words prefixed with `-` are ignored. Matching is
    /// ASCII case-insensitive.
    pub fn highlight(&self, text: &str, query: &str) -> String {
        let text = strip_tags(text);
        let words = query_words(query);
        let found = find_words(&text, &words);
        let window = self.find_window(&found, text.len());
        let window = snap(&text, window.start)..snap(&text, window.end.min(text.len()));

        let ranges: Vec<Range<usize>> = found
            .into_iter()
            .filter(|r| r.start >= window.start && r.end <= window.end)
            .map(|r| (r.start - window.start)..(r.end - window.start))
            .collect();

        let mut output = String::new();
        if window.start > 0 {
            output.push_str(ELLIPSIS);
        }
        output.push_str(&self.wrap(&text[window.clone()], &ranges));
        if window.end < text.len() {
            output.push_str(ELLIPSIS);
        }
        output
    }

    /// Picks the `max_length` window holding the most matches.
    fn find_window(&self, found: &[Range<usize>], text_len: usize) -> Range<usize> {
        let starts: Vec<usize> = found.iter().map(|r| r.start).collect();
        let Some(&first) = starts.first() else {
            return 0..self.max_length.min(text_len);
        };
        let mut best = (0, first);
        for (i, &start) in starts.iter().enumerate() {
            let density = starts[i..]
                .iter()
                .take_while(|&&end| end - start < self.max_length)
                .count();
            if density > best.0 {
                best = (density, start);
            }
        }
        best.1..best.1 + self.max_length
    }

    /// Wraps `ranges` of `text` in the configured tag.
    fn wrap(&self, text: &str, ranges: &[Range<usize>]) -> String {
        let open = format!("<{} class=\"{}\">", self.html_tag, self.css_class);
        let close = format!("</{}>", self.html_tag);
        wrap_ranges(text, ranges, &open, &close)
    }
}

/// Wraps every occurrence of the words of `query` in `<em>` tags, without windowing.
///
/// This is the markup search engines return for backend-side highlighting.
pub fn emphasize(text: &str, query: &str) -> String {
    let ranges = find_words(text, &query_words(query));
    wrap_ranges(text, &ranges, "<em>", "</em>")
}

/// Surrounds each of the sorted, disjoint `ranges` of `text` with `open` and `close`.
fn wrap_ranges(text: &str, ranges: &[Range<usize>], open: &str, close: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for range in ranges {
        if range.start > cursor {
            output.push_str(&text[cursor..range.start]);
        }
        output.push_str(open);
        output.push_str(&text[range.clone()]);
        output.push_str(close);
        cursor = range.end;
    }
    if cursor < text.len() {
        output.push_str(&text[cursor..]);
    }
    output
}

/// Lowercased query words, skipping negated ones.
fn query_words(query: &str) -> BTreeSet<String> {
    query
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty() && !w.starts_with('-'))
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Byte ranges of every occurrence of `words`, sorted and without overlaps.
fn find_words(text: &str, words: &BTreeSet<String>) -> Vec<Range<usize>> {
    let lower = text.to_ascii_lowercase();
    let mut found: Vec<Range<usize>> = words
        .iter()
        .flat_map(|word| {
            lower
                .match_indices(word.as_str())
                .map(|(start, m)| start..start + m.len())
        })
        .collect();
    found.sort_by_key(|r| (r.start, Reverse(r.end)));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(found.len());
    for range in found {
        match merged.last_mut() {
            Some(last) if range.start < last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Moves `index` back to the nearest character boundary.
fn snap(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Removes `<...>` markup.
fn strip_tags(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => output.push(c),
            _ => {}
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_matches_case_insensitively() {
        let highlighter = Highlighter::default();
        assert_eq!(
            highlighter.highlight("Jeremy Hood lives here", "hood"),
            "Jeremy <span class=\"highlighted\">Hood</span> lives here"
        );
    }

    #[test]
    fn custom_tag_and_class() {
        let highlighter = Highlighter::default().with_tag("em").with_css_class("hit");
        assert_eq!(highlighter.highlight("a b", "b"), "a <em class=\"hit\">b</em>");
    }

    #[test]
    fn negated_words_are_ignored() {
        let highlighter = Highlighter::default().with_tag("b").with_css_class("x");
        assert_eq!(
            highlighter.highlight("red blue", "-red blue"),
            "red <b class=\"x\">blue</b>"
        );
    }

    #[test]
    fn long_text_gets_window_and_ellipses() {
        let text = format!("{} needle tail", "x".repeat(50));
        let highlighter = Highlighter::default()
            .with_max_length(10)
            .with_tag("b")
            .with_css_class("h");
        assert_eq!(
            highlighter.highlight(&text, "needle"),
            "...<b class=\"h\">needle</b> tai..."
        );
    }

    #[test]
    fn no_match_truncates_from_start() {
        let highlighter = Highlighter::default().with_max_length(5);
        assert_eq!(highlighter.highlight("abcdefgh", "zzz"), "abcde...");
    }

    #[test]
    fn markup_is_stripped() {
        let highlighter = Highlighter::default().with_tag("b").with_css_class("h");
        assert_eq!(
            highlighter.highlight("<p>hello world</p>", "world"),
            "hello <b class=\"h\">world</b>"
        );
    }

    #[test]
    fn emphasize_marks_every_match() {
        assert_eq!(
            emphasize("Hood and hood", "HOOD"),
            "<em>Hood</em> and <em>hood</em>"
        );
        assert_eq!(emphasize("plain", ""), "plain");
    }

    #[test]
    fn params_values_are_the_query() {
        let params = QueryParams::parse("firstname=Jeremy&lastname=Hickman,Hood");
        let highlighter = Highlighter::default().with_tag("b").with_css_class("h");
        assert_eq!(
            highlighter.highlight_params("Jeremy Hood", &params),
            "<b class=\"h\">Jeremy</b> <b class=\"h\">Hood</b>"
        );
    }
}
