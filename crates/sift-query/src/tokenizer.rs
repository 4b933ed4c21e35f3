//! Query parameter value tokenizer.
//!
//! Splits raw parameter values into search tokens on a configurable separator.

use std::slice;

/// Lazy iterator over the tokens of a sequence of raw parameter values.
///
/// Created by [`tokenize`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    /// Values not yet started.
    values: slice::Iter<'a, String>,
    /// Unconsumed remainder of the current value.
    rest: Option<&'a str>,
    /// Token separator. Empty means "do not split".
    separator: &'a str,
}

impl<'a> Tokens<'a> {
    /// Splits the next raw piece off the current value, advancing to the next value as needed.
    fn next_piece(&mut self) -> Option<&'a str> {
        loop {
            if let Some(rest) = self.rest {
                if self.separator.is_empty() {
                    self.rest = None;
                    return Some(rest);
                }
                return Some(match rest.split_once(self.separator) {
                    Some((head, tail)) => {
                        self.rest = Some(tail);
                        head
                    }
                    None => {
                        self.rest = None;
                        rest
                    }
                });
            }
            self.rest = Some(self.values.next()?.as_str());
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token = self.next_piece()?.trim();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
}

/// Tokenizes query parameter values.
///
/// Each value is split on `separator`, every piece is trimmed, and empty pieces are dropped.
/// Tokens are yielded in input order. An empty separator yields each trimmed value whole.
///
/// ```
/// use sift_query::tokenize;
///
/// let values = vec!["Hickman, Hood".to_string(), ",Porter,".to_string()];
/// let tokens: Vec<&str> = tokenize(&values, ",").collect();
/// assert_eq!(tokens, ["Hickman", "Hood", "Porter"]);
/// ```
pub fn tokenize<'a>(values: &'a [String], separator: &'a str) -> Tokens<'a> {
    Tokens {
        values: values.iter(),
        rest: None,
        separator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn splits_on_separator() {
        let input = values(&["Hickman,Hood"]);
        assert_eq!(tokenize(&input, ",").collect::<Vec<_>>(), ["Hickman", "Hood"]);
    }

    #[test]
    fn trims_and_drops_empty_tokens() {
        let input = values(&[" a , ,b,, ", "   "]);
        assert_eq!(tokenize(&input, ",").collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn custom_separator() {
        let input = values(&["Hickman;Hood", "a,b"]);
        assert_eq!(
            tokenize(&input, ";").collect::<Vec<_>>(),
            ["Hickman", "Hood", "a,b"]
        );
    }

    #[test]
    fn multi_character_separator() {
        let input = values(&["one||two||three"]);
        assert_eq!(
            tokenize(&input, "||").collect::<Vec<_>>(),
            ["one", "two", "three"]
        );
    }

    #[test]
    fn empty_separator_does_not_split() {
        let input = values(&[" John McClane "]);
        assert_eq!(tokenize(&input, "").collect::<Vec<_>>(), ["John McClane"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let input: Vec<String> = Vec::new();
        assert_eq!(tokenize(&input, ",").count(), 0);
    }

    #[test]
    fn restartable_on_same_input() {
        let input = values(&["x,y"]);
        let first: Vec<_> = tokenize(&input, ",").collect();
        let second: Vec<_> = tokenize(&input, ",").collect();
        assert_eq!(first, second);
    }
}
