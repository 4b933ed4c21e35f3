//! Non-fatal diagnostics.
//!
//! Tolerant parsers return their value together with the problems they stepped over, so the
//! caller decides whether to surface them.

use std::fmt;

use serde::Serialize;

/// A problem that was tolerated while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Parameter the problem was found in, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// The offending input.
    pub input: String,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic for `input`.
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            param: None,
            input: input.into(),
            message: message.into(),
        }
    }

    /// Attaches the parameter name.
    pub fn in_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{param}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A parsed value plus the diagnostics collected on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parsed<T> {
    /// The parsed value.
    pub value: T,
    /// Tolerated problems, in input order.
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    /// Wraps a value with no diagnostics.
    pub fn clean(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// Returns true if nothing was tolerated.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Transforms the value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// Splits into value and diagnostics.
    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }
}
