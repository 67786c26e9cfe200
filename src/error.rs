//! Error types for filter parsing and registry loading

use std::path::PathBuf;

use thiserror::Error;

use crate::config::TypeTag;

/// Which stage of validation rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Column not declared, or declared inconsistently.
    Configuration,
    /// Unknown comparator or union, missing sub-fields, malformed structure.
    Syntax,
    /// Value does not satisfy the grammar of the column's type.
    Value,
}

/// A single rejected condition or node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Configuration, message: message.into() }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Syntax, message: message.into() }
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Value, message: message.into() }
    }
}

/// Every error found while parsing one input, in discovery order.
///
/// Never empty: a parse either yields a full `FilterExpression` or at least
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_messages(.0))]
pub struct ParseErrors(Vec<ParseError>);

impl ParseErrors {
    /// Returns `None` for an empty list so callers cannot build an empty failure.
    pub(crate) fn from_vec(errors: Vec<ParseError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.0.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.message.as_str()).collect()
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParseErrors {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn join_messages(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Registry loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read filter config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid filter config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("column '{column}' is declared as both {first} and {second}")]
    ConflictingTypes {
        column: String,
        first: TypeTag,
        second: TypeTag,
    },
}
