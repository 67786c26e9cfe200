//! Flat parameter decoding.
//!
//! Turns URL-style parameters such as `title_contains=rust` or
//! `posted_on_between[start]=2024-01-01` into [`RawCondition`]s. The column
//! is the key prefix, the comparator is inferred from the longest known
//! alias suffix for that column's type, and a bare key means `equals`.

use serde_json::{Map, Value};

use crate::ast::Union;
use crate::comparator::aliases_for;
use crate::condition::RawCondition;
use crate::config::{Registry, TypeTag};
use crate::error::{ParseError, ParseErrors};

/// Key selecting the union of the decoded conditions.
pub const UNION_KEY: &str = "filter_union";

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedParams {
    pub union: Union,
    pub conditions: Vec<RawCondition>,
}

pub fn decode(registry: &Registry, params: &Map<String, Value>) -> Result<DecodedParams, ParseErrors> {
    let mut errors = Vec::new();
    let decoded = decode_into(registry, params, &mut errors);
    match ParseErrors::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(decoded),
    }
}

/// Decodes every key, pushing failures onto `errors` instead of stopping.
pub(crate) fn decode_into(
    registry: &Registry,
    params: &Map<String, Value>,
    errors: &mut Vec<ParseError>,
) -> DecodedParams {
    let params = fold_bracket_keys(params);
    let mut union = Union::All;
    let mut conditions = Vec::new();

    for (key, value) in &params {
        if key == UNION_KEY {
            match value.as_str().and_then(Union::from_name) {
                Some(selected) => union = selected,
                None => errors.push(ParseError::syntax(format!(
                    "Invalid {} value {}, expected all, any or none",
                    UNION_KEY, value
                ))),
            }
            continue;
        }

        let Some((column, alias, tag)) = split_key(registry, key) else {
            errors.push(ParseError::configuration(format!(
                "Column '{}' is not configured",
                key
            )));
            continue;
        };

        let comparator = if is_range_value(value) && alias != "not between" {
            "between"
        } else {
            alias
        };

        tracing::trace!(key = %key, column = %column, comparator, "Decoded filter param");
        conditions.push(RawCondition::new(column, comparator, value.clone()).with_type(tag));
    }

    DecodedParams { union, conditions }
}

/// Splits `key` into a configured column and a comparator alias.
///
/// Longer aliases win, so `posted_on_or_before` prefers `on or before` over
/// `before` when `posted` is configured. Ties keep declaration order.
fn split_key<'k>(registry: &Registry, key: &'k str) -> Option<(&'k str, &'static str, TypeTag)> {
    let mut best: Option<(&'k str, &'static str, TypeTag)> = None;

    for config in registry.configs() {
        let tag = config.type_tag();
        for alias in aliases_for(tag) {
            let suffix = alias.replace(' ', "_");
            let Some(column) = key
                .strip_suffix(suffix.as_str())
                .and_then(|rest| rest.strip_suffix('_'))
            else {
                continue;
            };
            if !config.contains(column) {
                continue;
            }
            if best.map_or(true, |(_, current, _)| alias.len() > current.len()) {
                best = Some((column, alias, tag));
            }
        }
    }

    best.or_else(|| {
        registry
            .resolve(key, None)
            .map(|config| (key, "equals", config.type_tag()))
    })
}

fn is_range_value(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.contains_key("start") || o.contains_key("end"))
}

/// Folds `key[sub]=v` entries into `key: {sub: v}`.
fn fold_bracket_keys(params: &Map<String, Value>) -> Map<String, Value> {
    let mut folded = Map::new();

    for (key, value) in params {
        let bracketed = key
            .strip_suffix(']')
            .and_then(|rest| rest.split_once('['))
            .filter(|(base, sub)| !base.is_empty() && !sub.is_empty());

        match bracketed {
            Some((base, sub)) => {
                let entry = folded
                    .entry(base.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(object) = entry {
                    object.insert(sub.to_string(), value.clone());
                }
            }
            None => {
                folded.insert(key.clone(), value.clone());
            }
        }
    }

    folded
}

/// Decodes a raw `a=1&b%5Bstart%5D=2` query string into a flat parameter map.
///
/// Later duplicates overwrite earlier ones; every value is a JSON string.
/// Decoding is lossy: percent-escapes that do not form valid UTF-8 become
/// U+FFFD, which then fails value validation like any other unexpected text.
pub fn parse_query_string(query: &str) -> Map<String, Value> {
    let mut params = Map::new();

    for pair in query.trim_start_matches('?').split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key), Value::String(decode_component(value)));
    }

    params
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}
