//! Boolean query expressions.
//!
//! Compiled filters are trees of backend terms joined by AND and OR. The term type is opaque
//! to the compiler; it is produced by the backend's [`TermFactory`](crate::TermFactory).

use std::fmt;

use serde::Serialize;

/// A boolean expression over backend terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryExpr<T> {
    /// A single backend term.
    Term(T),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),
}

impl<T> QueryExpr<T> {
    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        let flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();
        Self::collapse(flattened, Self::And)
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        let flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();
        Self::collapse(flattened, Self::Or)
    }

    /// Unwraps a single-element list, otherwise wraps the list with `wrap`.
    fn collapse(mut exprs: Vec<Self>, wrap: fn(Vec<Self>) -> Self) -> Self {
        if exprs.len() == 1
            && let Some(only) = exprs.pop()
        {
            return only;
        }
        wrap(exprs)
    }

    /// Returns true if the expression contains no terms.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Term(_) => false,
            Self::And(exprs) | Self::Or(exprs) => exprs.iter().all(Self::is_empty),
        }
    }

    /// Returns every term in the expression, depth first.
    pub fn terms(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    /// Pushes the terms of this expression onto `out`.
    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Term(term) => out.push(term),
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_terms(out);
                }
            }
        }
    }

    /// Returns the number of terms in the expression.
    pub fn term_count(&self) -> usize {
        match self {
            Self::Term(_) => 1,
            Self::And(exprs) | Self::Or(exprs) => exprs.iter().map(Self::term_count).sum(),
        }
    }

    /// Rewrites every term, keeping the tree shape.
    ///
    /// The closure may expand a term into a whole sub-expression.
    pub fn flat_map_terms<U>(self, f: &mut impl FnMut(T) -> QueryExpr<U>) -> QueryExpr<U> {
        match self {
            Self::Term(term) => f(term),
            Self::And(exprs) => {
                QueryExpr::and(exprs.into_iter().map(|e| e.flat_map_terms(f)).collect())
            }
            Self::Or(exprs) => {
                QueryExpr::or(exprs.into_iter().map(|e| e.flat_map_terms(f)).collect())
            }
        }
    }
}

impl<T: fmt::Display> QueryExpr<T> {
    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term(term) => writeln!(f, "{prefix}Term({term})"),
            Self::And(exprs) => {
                writeln!(f, "{prefix}And")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(exprs) => {
                writeln!(f, "{prefix}Or")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
        }
    }

    /// Formats the expression on one line, e.g. `(lastname=Hickman OR lastname=Hood) AND firstname=Bruno`.
    pub fn to_query_string(&self) -> String {
        self.fmt_query_string(false)
    }

    /// Internal helper for query string formatting.
    fn fmt_query_string(&self, nested: bool) -> String {
        let (parts, joiner) = match self {
            Self::Term(term) => return term.to_string(),
            Self::And(exprs) => (exprs, " AND "),
            Self::Or(exprs) => (exprs, " OR "),
        };
        let rendered: Vec<String> = parts.iter().map(|e| e.fmt_query_string(true)).collect();
        if nested && rendered.len() > 1 {
            format!("({})", rendered.join(joiner))
        } else {
            rendered.join(joiner)
        }
    }
}

impl<T: fmt::Display> fmt::Display for QueryExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
