//! Typed filter parsing and SQL encoding.
//!
//! A [`Registry`] declares which columns may be filtered and how their values
//! are typed. Caller input (a nested JSON filter tree or flat URL-style
//! parameters) is validated against it into a [`FilterExpression`], which is
//! then lowered into a parameterized SQL [`Fragment`] or applied to a
//! sea-query `SelectStatement`.
//!
//! ```text
//! JSON / params ─▶ Parser ─▶ FilterExpression ─▶ encode ─▶ Fragment
//!                                              └▶ query  ─▶ SelectStatement
//! ```

pub mod ast;
pub mod comparator;
pub mod condition;
pub mod config;
pub mod encoder;
pub mod error;
pub mod params;
pub mod parser;

use sea_query::SelectStatement;
use serde_json::{Map, Value};

pub use ast::{Condition, DateValue, FilterExpression, Number, Predicate, Union};
pub use config::{DateOptions, DateTimeOptions, FilterConfig, NumberOptions, Registry, TypeTag};
pub use encoder::Fragment;
pub use error::{ConfigError, ErrorKind, ParseError, ParseErrors};
pub use parser::Parser;

/// Parses a nested filter tree.
pub fn parse(registry: &Registry, input: &Value) -> Result<FilterExpression, ParseErrors> {
    Parser::new(registry).parse(input)
}

/// Parses flat parameters such as `rating_greater_than=3` into a single-level tree.
pub fn parse_params(
    registry: &Registry,
    params: &Map<String, Value>,
) -> Result<FilterExpression, ParseErrors> {
    Parser::new(registry).parse_params(params)
}

pub fn encode(expression: &FilterExpression) -> Fragment {
    let fragment = encoder::encode(expression);
    tracing::debug!(
        expression = %fragment.expression,
        values = fragment.values.len(),
        "Filter encoded"
    );
    fragment
}

pub fn query(select: SelectStatement, expression: &FilterExpression) -> SelectStatement {
    encoder::query(select, expression)
}
