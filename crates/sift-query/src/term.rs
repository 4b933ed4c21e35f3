//! Backend terms.

use std::fmt;

use serde::Serialize;

/// Separator between a field name and its lookup segments (`birthdate__gt`).
pub const LOOKUP_SEPARATOR: &str = "__";

/// Builds backend terms from a parameter name and a token.
///
/// The compiler never inspects terms; it only combines them with AND and OR.
pub trait TermFactory {
    /// Backend representation of a single `field = token` condition.
    type Term;

    /// Creates a term for `field` (which may carry lookup segments) and `token`.
    fn term(&self, field: &str, token: &str) -> Self::Term;
}

/// A plain `field[__lookup] = value` condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldTerm {
    /// Field name, possibly with lookup segments (`firstname__startswith`).
    pub field: String,
    /// The token to match.
    pub value: String,
}

impl FieldTerm {
    /// Creates a new term.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the field name without lookup segments.
    pub fn base_field(&self) -> &str {
        self.field
            .split_once(LOOKUP_SEPARATOR)
            .map_or(self.field.as_str(), |(base, _)| base)
    }

    /// Returns the lookup (`startswith`, `gt`, ...) or `None` for a plain match.
    pub fn lookup(&self) -> Option<&str> {
        self.field
            .split_once(LOOKUP_SEPARATOR)
            .map(|(_, lookup)| lookup)
    }
}

impl fmt::Display for FieldTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// Term factory producing [`FieldTerm`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTerms;

impl TermFactory for FieldTerms {
    type Term = FieldTerm;

    fn term(&self, field: &str, token: &str) -> FieldTerm {
        FieldTerm::new(field, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lookup() {
        let term = FieldTerm::new("birthdate__gt", "1980-01-01");
        assert_eq!(term.base_field(), "birthdate");
        assert_eq!(term.lookup(), Some("gt"));
        assert_eq!(term.to_string(), "birthdate__gt=1980-01-01");
    }

    #[test]
    fn plain_field_has_no_lookup() {
        let term = FieldTerms.term("lastname", "Hood");
        assert_eq!(term.base_field(), "lastname");
        assert_eq!(term.lookup(), None);
    }
}
