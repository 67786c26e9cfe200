//! Per-type condition parsers.
//!
//! Each parser takes the options of the resolved [`FilterConfig`] plus a
//! [`RawCondition`] and returns either a validated [`Condition`] or a
//! [`ParseError`] naming the column.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::ast::{Condition, DateValue, Number, Predicate};
use crate::comparator::{
    BooleanComparator, Comparator, DateComparator, DateTimeComparator, NumberComparator,
    TextComparator,
};
use crate::config::{DateOptions, DateTimeOptions, FilterConfig, NumberOptions, TypeTag};
use crate::error::ParseError;

/// Loosely-typed condition as it arrives from the caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCondition {
    pub column: String,
    #[serde(default = "default_comparator")]
    pub comparator: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub inverse: bool,
    #[serde(default, rename = "type")]
    pub type_hint: Option<TypeTag>,
}

fn default_comparator() -> String {
    "equals".to_string()
}

impl RawCondition {
    pub fn new(column: impl Into<String>, comparator: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            comparator: comparator.into(),
            value,
            inverse: false,
            type_hint: None,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    pub fn with_type(mut self, tag: TypeTag) -> Self {
        self.type_hint = Some(tag);
        self
    }
}

/// Dispatches to the parser for the config's type.
///
/// Column membership is checked by the caller when resolving `config`.
pub fn parse_condition(config: &FilterConfig, raw: &RawCondition) -> Result<Condition, ParseError> {
    match config {
        FilterConfig::Boolean { .. } => parse_boolean(raw).map(Condition::Boolean),
        FilterConfig::Text { .. } => parse_text(raw).map(Condition::Text),
        FilterConfig::Number { options, .. } => parse_number(options, raw).map(Condition::Number),
        FilterConfig::Date { options, .. } => parse_date(options, raw).map(Condition::Date),
        FilterConfig::DateTime { options, .. } => {
            parse_datetime(options, raw).map(Condition::DateTime)
        }
    }
}

fn comparator<C: Comparator>(raw: &RawCondition, tag: TypeTag) -> Result<C, ParseError> {
    C::parse(&raw.comparator).ok_or_else(|| {
        ParseError::syntax(format!(
            "Invalid comparator '{}' for {} column {}",
            raw.comparator, tag, raw.column
        ))
    })
}

fn parse_boolean(raw: &RawCondition) -> Result<Predicate<BooleanComparator, bool>, ParseError> {
    let comparator = comparator::<BooleanComparator>(raw, TypeTag::Boolean)?;
    let invalid = || ParseError::value(format!("Invalid boolean value for {}", raw.column));

    let value = match &raw.value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => match n.as_i64() {
            Some(1) => true,
            Some(0) => false,
            _ => return Err(invalid()),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "" | "false" | "0" => false,
            _ => return Err(invalid()),
        },
        Value::Array(_) | Value::Object(_) => return Err(invalid()),
    };

    Ok(Predicate::new(&raw.column, comparator, value, raw.inverse))
}

fn parse_text(raw: &RawCondition) -> Result<Predicate<TextComparator, String>, ParseError> {
    let comparator = comparator::<TextComparator>(raw, TypeTag::Text)?;

    let value = match &raw.value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            return Err(ParseError::value(format!(
                "Invalid text value for {}",
                raw.column
            )))
        }
    };

    Ok(Predicate::new(&raw.column, comparator, value, raw.inverse))
}

fn parse_number(
    options: &NumberOptions,
    raw: &RawCondition,
) -> Result<Predicate<NumberComparator, Number>, ParseError> {
    let comparator = comparator::<NumberComparator>(raw, TypeTag::Number)?;

    let number = read_number(&raw.value).ok_or_else(|| {
        ParseError::value(format!("Invalid number value for {}", raw.column))
    })?;

    if matches!(number, Number::Decimal(_)) && !options.allow_decimal {
        return Err(ParseError::value(format!(
            "Decimal values are not allowed for {}",
            raw.column
        )));
    }

    if let Some(allowed) = &options.allowed_values {
        if !allowed.iter().any(|a| a.same_value(number)) {
            return Err(ParseError::value(format!(
                "Value {} is not an allowed value for {}",
                number, raw.column
            )));
        }
    }

    Ok(Predicate::new(&raw.column, comparator, number, raw.inverse))
}

/// Accepts JSON numbers and strings holding a complete numeric literal.
///
/// A literal without `.` or an exponent is an integer and must fit in `i64`.
/// Exponent notation (`1e3`) is a decimal literal, like a JSON float.
fn read_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) if n.is_f64() => n.as_f64().filter(|f| f.is_finite()).map(Number::Decimal),
        Value::Number(n) => n.as_i64().map(Number::Integer),
        Value::String(s) => {
            let s = s.trim();
            // f64 parsing also accepts "inf" and "NaN"
            if s.is_empty()
                || !s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
            {
                return None;
            }
            if s.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
                s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Number::Decimal)
            } else {
                s.parse::<i64>().ok().map(Number::Integer)
            }
        }
        _ => None,
    }
}

fn parse_date(
    options: &DateOptions,
    raw: &RawCondition,
) -> Result<Predicate<DateComparator, DateValue>, ParseError> {
    let comparator = comparator::<DateComparator>(raw, TypeTag::Date)?;

    if !is_valid_format(&options.format) {
        return Err(ParseError::configuration(format!(
            "Invalid date format for {}",
            raw.column
        )));
    }

    let read = |value: &Value| {
        value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), &options.format).ok())
            .ok_or_else(|| ParseError::value(format!("Invalid date value for {}", raw.column)))
    };

    let value = match range_bounds(&raw.value) {
        Some((start, end)) => {
            if !comparator.is_range() {
                return Err(range_not_accepted(raw));
            }
            match (start, end) {
                (Some(start), Some(end)) => DateValue::Range {
                    start: read(start)?,
                    end: read(end)?,
                },
                _ => return Err(range_required(raw, comparator)),
            }
        }
        None => {
            if comparator.is_range() {
                return Err(range_required(raw, comparator));
            }
            DateValue::Single(read(&raw.value)?)
        }
    };

    Ok(Predicate::new(&raw.column, comparator, value, raw.inverse))
}

fn parse_datetime(
    options: &DateTimeOptions,
    raw: &RawCondition,
) -> Result<Predicate<DateTimeComparator, DateTime<Utc>>, ParseError> {
    let comparator = comparator::<DateTimeComparator>(raw, TypeTag::DateTime)?;

    if let Some(format) = &options.format {
        if !is_valid_format(format) {
            return Err(ParseError::configuration(format!(
                "Invalid datetime format for {}",
                raw.column
            )));
        }
    }

    if range_bounds(&raw.value).is_some() {
        return Err(range_not_accepted(raw));
    }

    let value = raw
        .value
        .as_str()
        .and_then(|s| read_datetime(s.trim(), options.format.as_deref()))
        .ok_or_else(|| ParseError::value(format!("Invalid datetime value for {}", raw.column)))?;

    Ok(Predicate::new(&raw.column, comparator, value, raw.inverse))
}

/// RFC 3339 by default; with a format, offset-aware first, then naive as UTC.
fn read_datetime(s: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    match format {
        None => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(format) => DateTime::parse_from_str(s, format)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(s, format).map(|dt| dt.and_utc()))
            .ok(),
    }
}

fn is_valid_format(format: &str) -> bool {
    !format.trim().is_empty()
        && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// `Some` when the value is a `{start, end}` shaped object; null bounds count as missing.
fn range_bounds(value: &Value) -> Option<(Option<&Value>, Option<&Value>)> {
    let object = value.as_object()?;
    let bound = |key: &str| object.get(key).filter(|v| !v.is_null());
    Some((bound("start"), bound("end")))
}

fn range_required(raw: &RawCondition, comparator: DateComparator) -> ParseError {
    ParseError::syntax(format!(
        "{} on {} requires both start and end",
        comparator.name(),
        raw.column
    ))
}

fn range_not_accepted(raw: &RawCondition) -> ParseError {
    ParseError::syntax(format!(
        "Comparator '{}' on {} does not accept a start/end range",
        raw.comparator, raw.column
    ))
}
