//! Term boosting.

use std::fmt;

use serde::Serialize;

use crate::{error::QueryError, params::QueryParams, tokenizer::tokenize};

/// Default name of the boost query parameter.
pub const DEFAULT_BOOST_PARAM: &str = "boost";

/// A single-term score boost, from `boost=term,factor`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boost {
    /// The term whose matches get boosted.
    pub term: String,
    /// Score multiplier.
    pub factor: f32,
}

impl fmt::Display for Boost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.term, self.factor)
    }
}

/// Reads the boost parameter `param` from `params`.
///
/// Returns `Ok(None)` when the parameter is absent or blank. The tokens of all values are
/// pooled, and exactly two must remain: the term and a numeric factor.
pub fn parse_boost(
    params: &QueryParams,
    param: &str,
    lookup_sep: &str,
) -> Result<Option<Boost>, QueryError> {
    let Some(values) = params.get(param) else {
        return Ok(None);
    };
    let tokens: Vec<&str> = tokenize(values, lookup_sep).collect();
    if tokens.is_empty() {
        return Ok(None);
    }
    let [term, factor] = tokens[..] else {
        return Err(QueryError::MalformedBoost {
            param: param.to_string(),
        });
    };
    let factor = factor
        .parse::<f32>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| QueryError::BoostNotNumeric {
            value: factor.to_string(),
        })?;
    Ok(Some(Boost {
        term: term.to_string(),
        factor,
    }))
}
