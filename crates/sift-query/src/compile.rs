//! Filter compiler.
//!
//! Turns query parameters into an include and an exclude expression. Tokens of one parameter
//! are ORed, distinct parameters are joined with the compiler's operator.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    QueryExpr,
    params::QueryParams,
    policy::FieldPolicy,
    term::{LOOKUP_SEPARATOR, TermFactory},
    tokenizer::tokenize,
};

/// Default token separator inside a parameter value.
pub const DEFAULT_LOOKUP_SEP: &str = ",";

/// Default lookup segment that turns a filter into an exclusion.
pub const DEFAULT_NEGATION_KEYWORD: &str = "not";

/// Operator joining the sub-expressions of distinct parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Every parameter must match.
    #[default]
    And,
    /// Any parameter may match.
    Or,
}

impl Operator {
    /// Joins `exprs` with this operator.
    pub fn join<T>(self, exprs: Vec<QueryExpr<T>>) -> QueryExpr<T> {
        match self {
            Self::And => QueryExpr::and(exprs),
            Self::Or => QueryExpr::or(exprs),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(format!("unknown operator '{other}', expected 'and' or 'or'")),
        }
    }
}

/// The output of [`QueryCompiler::compile`].
///
/// `None` on either side means "no filtering" for that side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery<T> {
    /// Terms documents must match.
    pub include: Option<QueryExpr<T>>,
    /// Terms documents must not match.
    pub exclude: Option<QueryExpr<T>>,
}

impl<T> CompiledQuery<T> {
    /// Returns true if neither side filters anything.
    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// Total number of terms on both sides.
    pub fn term_count(&self) -> usize {
        self.include.as_ref().map_or(0, QueryExpr::term_count)
            + self.exclude.as_ref().map_or(0, QueryExpr::term_count)
    }
}

impl<T> Default for CompiledQuery<T> {
    fn default() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }
}

/// A parameter name after negation detection and alias resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParam {
    /// Field name without lookups, after aliasing.
    pub base: String,
    /// Name handed to the term factory: base plus lookups, without the negation segment.
    pub effective: String,
    /// True if the parameter carried the negation segment.
    pub negated: bool,
}

/// Compiles query parameters into boolean expressions.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    /// Separator between tokens of one value.
    lookup_sep: String,
    /// Lookup segment marking an exclusion.
    negation_keyword: String,
    /// Operator between parameters.
    operator: Operator,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_SEP, DEFAULT_NEGATION_KEYWORD)
    }
}

impl QueryCompiler {
    /// Creates a compiler with the given token separator and negation keyword.
    pub fn new(lookup_sep: impl Into<String>, negation_keyword: impl Into<String>) -> Self {
        Self {
            lookup_sep: lookup_sep.into(),
            negation_keyword: negation_keyword.into(),
            operator: Operator::default(),
        }
    }

    /// Sets the operator joining distinct parameters.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Token separator.
    pub fn lookup_sep(&self) -> &str {
        &self.lookup_sep
    }

    /// Negation keyword.
    pub fn negation_keyword(&self) -> &str {
        &self.negation_keyword
    }

    /// Operator between parameters.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Splits a parameter name into base, effective name and negation flag, applying aliases.
    ///
    /// Only the segment directly after the base is checked for the negation keyword, so
    /// `name__not__startswith` negates while `name__startswith__not` does not.
    pub fn resolve_param(&self, param: &str, policy: &FieldPolicy) -> ResolvedParam {
        let mut parts: Vec<&str> = param.split(LOOKUP_SEPARATOR).collect();
        let negated = !self.negation_keyword.is_empty()
            && parts.get(1).is_some_and(|seg| *seg == self.negation_keyword);
        if negated {
            parts.remove(1);
        }
        let base = policy.resolve(parts[0]).to_string();
        let mut effective = base.clone();
        for lookup in &parts[1..] {
            effective.push_str(LOOKUP_SEPARATOR);
            effective.push_str(lookup);
        }
        ResolvedParam {
            base,
            effective,
            negated,
        }
    }

    /// Compiles `params` under `policy`, building terms with `factory`.
    ///
    /// Parameters the policy does not admit, or whose values hold no tokens, are skipped.
    pub fn compile<F: TermFactory>(
        &self,
        params: &QueryParams,
        policy: &FieldPolicy,
        factory: &F,
    ) -> CompiledQuery<F::Term> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for (param, values) in params.iter() {
            let resolved = self.resolve_param(param, policy);
            if !policy.admits(&resolved.base) || values.is_empty() {
                continue;
            }

            let terms: Vec<QueryExpr<F::Term>> = tokenize(values, &self.lookup_sep)
                .map(|token| QueryExpr::Term(factory.term(&resolved.effective, token)))
                .collect();
            if terms.is_empty() {
                continue;
            }

            let expr = QueryExpr::or(terms);
            if resolved.negated {
                exclude.push(expr);
            } else {
                include.push(expr);
            }
        }

        let compiled = CompiledQuery {
            include: (!include.is_empty()).then(|| self.operator.join(include)),
            exclude: (!exclude.is_empty()).then(|| self.operator.join(exclude)),
        };
        debug!(
            terms = compiled.term_count(),
            operator = %self.operator,
            "compiled filter query"
        );
        compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{FieldTerm, FieldTerms};

    fn compile(qs: &str, policy: &FieldPolicy) -> CompiledQuery<FieldTerm> {
        QueryCompiler::default().compile(&QueryParams::parse(qs), policy, &FieldTerms)
    }

    fn render(expr: Option<&QueryExpr<FieldTerm>>) -> Option<String> {
        expr.map(QueryExpr::to_query_string)
    }

    #[test]
    fn tokens_are_ored() {
        let compiled = compile("lastname=Hickman,Hood", &FieldPolicy::allow_all());
        assert_eq!(
            render(compiled.include.as_ref()).as_deref(),
            Some("lastname=Hickman OR lastname=Hood")
        );
        assert!(compiled.exclude.is_none());
    }

    #[test]
    fn parameters_are_anded() {
        let compiled = compile("lastname=Hood&firstname=Bruno", &FieldPolicy::allow_all());
        assert_eq!(
            render(compiled.include.as_ref()).as_deref(),
            Some("lastname=Hood AND firstname=Bruno")
        );
    }

    #[test]
    fn or_operator_joins_parameters() {
        let compiler = QueryCompiler::default().with_operator(Operator::Or);
        let compiled = compiler.compile(
            &QueryParams::parse("lastname=Hood&firstname=Bruno,Jeremy"),
            &FieldPolicy::allow_all(),
            &FieldTerms,
        );
        assert_eq!(
            render(compiled.include.as_ref()).as_deref(),
            Some("lastname=Hood OR firstname=Bruno OR firstname=Jeremy")
        );
    }

    #[test]
    fn negation_goes_to_exclude() {
        let compiled = compile("firstname__not=John&lastname=Hood", &FieldPolicy::allow_all());
        assert_eq!(
            render(compiled.exclude.as_ref()).as_deref(),
            Some("firstname=John")
        );
        assert_eq!(
            render(compiled.include.as_ref()).as_deref(),
            Some("lastname=Hood")
        );
    }

    #[test]
    fn negation_keeps_remaining_lookups() {
        let resolved = QueryCompiler::default()
            .resolve_param("firstname__not__startswith", &FieldPolicy::allow_all());
        assert!(resolved.negated);
        assert_eq!(resolved.effective, "firstname__startswith");
    }

    #[test]
    fn negation_only_in_first_lookup_position() {
        let resolved = QueryCompiler::default()
            .resolve_param("firstname__startswith__not", &FieldPolicy::allow_all());
        assert!(!resolved.negated);
        assert_eq!(resolved.effective, "firstname__startswith__not");
    }

    #[test]
    fn custom_negation_keyword() {
        let compiler = QueryCompiler::new(",", "exclude");
        let compiled = compiler.compile(
            &QueryParams::parse("firstname__exclude=John&firstname__not=Jack"),
            &FieldPolicy::allow_all(),
            &FieldTerms,
        );
        assert_eq!(
            render(compiled.exclude.as_ref()).as_deref(),
            Some("firstname=John")
        );
        assert_eq!(
            render(compiled.include.as_ref()).as_deref(),
            Some("firstname__not=Jack")
        );
    }

    #[test]
    fn alias_is_transparent() {
        let policy = FieldPolicy::builder("P")
            .fields(["lastname"])
            .alias("surname", "lastname")
            .build()
            .unwrap();
        let aliased = compile("surname__startswith=Ho", &policy);
        let direct = compile("lastname__startswith=Ho", &policy);
        assert_eq!(aliased, direct);
        assert_eq!(
            render(aliased.include.as_ref()).as_deref(),
            Some("lastname__startswith=Ho")
        );
    }

    #[test]
    fn disallowed_and_excluded_fields_skipped() {
        let allow = FieldPolicy::builder("P").fields(["lastname"]).build().unwrap();
        assert!(compile("firstname=John", &allow).is_empty());

        let deny = FieldPolicy::builder("P").exclude(["lastname"]).build().unwrap();
        let compiled = compile("lastname=Hood&firstname=John", &deny);
        assert_eq!(
            render(compiled.include.as_ref()).as_deref(),
            Some("firstname=John")
        );
    }

    #[test]
    fn empty_values_skipped() {
        let compiled = compile("lastname=&firstname=,,", &FieldPolicy::allow_all());
        assert!(compiled.is_empty());
    }

    #[test]
    fn custom_separator() {
        let compiler = QueryCompiler::new(";", "not");
        let compiled = compiler.compile(
            &QueryParams::parse("lastname=Hickman;Hood"),
            &FieldPolicy::allow_all(),
            &FieldTerms,
        );
        assert_eq!(compiled.term_count(), 2);
    }

    #[test]
    fn operator_parses() {
        assert_eq!("AND".parse::<Operator>(), Ok(Operator::And));
        assert_eq!("or".parse::<Operator>(), Ok(Operator::Or));
        assert!("xor".parse::<Operator>().is_err());
    }
}
