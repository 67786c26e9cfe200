//! 过滤树的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_node(depth = 1)
//!        ├─ 检查深度 (超过 MAX_DEPTH 记录错误, 不再递归)
//!        ├─ 读取 "type" → Union (缺省为 all)
//!        ├─ "conditions" 中的每一项
//!        │    └─ parse_entry()
//!        │         ├─ 反序列化为 RawCondition
//!        │         └─ parse_raw_condition()
//!        │              ├─ 按列名和类型提示在注册表中查找声明
//!        │              └─ condition::parse_condition() (按类型分派)
//!        └─ "sub_filters" 中的每一项
//!             └─ parse_node(depth + 1) (递归)
//! ```
//!
//! ## 错误处理
//!
//! 所有错误都累积到同一个列表中, 单个条件或子过滤器失败不会中断兄弟节点的解析。
//! 只有列表为空时才返回 `FilterExpression`, 否则返回全部错误 (扁平, 按发现顺序)。
//!
//! ## 输入示例
//!
//! ```text
//! {
//!   "type": "any",
//!   "conditions": [
//!     {"column": "flag", "comparator": "equals", "value": "true", "type": "boolean"}
//!   ],
//!   "sub_filters": [
//!     {"type": "none", "conditions": [{"column": "title", "comparator": "contains", "value": "draft"}]}
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::ast::{Condition, FilterExpression, Union};
use crate::condition::{self, RawCondition};
use crate::config::Registry;
use crate::error::{ParseError, ParseErrors};
use crate::params;

/// 允许的最大嵌套层数 (根节点为第 1 层)
pub const MAX_DEPTH: usize = 32;

pub struct Parser<'a> {
    registry: &'a Registry,
    /// 累积的错误
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            errors: Vec::new(),
        }
    }

    /// 解析嵌套结构 `{type, conditions, sub_filters}`
    pub fn parse(mut self, input: &Value) -> Result<FilterExpression, ParseErrors> {
        let expression = self.parse_node(input, 1);
        self.finish(expression)
    }

    /// 解析扁平参数, 结果是只有一层的过滤树
    pub fn parse_params(mut self, input: &Map<String, Value>) -> Result<FilterExpression, ParseErrors> {
        let decoded = params::decode_into(self.registry, input, &mut self.errors);
        let conditions = decoded
            .conditions
            .iter()
            .filter_map(|raw| self.parse_raw_condition(raw))
            .collect();

        let expression = FilterExpression {
            union: decoded.union,
            conditions,
            sub_filters: Vec::new(),
        };
        self.finish(Some(expression))
    }

    fn finish(self, expression: Option<FilterExpression>) -> Result<FilterExpression, ParseErrors> {
        if let Some(errors) = ParseErrors::from_vec(self.errors) {
            tracing::debug!(errors = errors.len(), "Filter rejected");
            return Err(errors);
        }
        // 没有错误时每个节点都会产出结果
        let expression = expression.unwrap_or_else(|| FilterExpression::empty(Union::All));
        tracing::debug!(
            union = %expression.union,
            conditions = expression.condition_count(),
            "Filter parsed"
        );
        Ok(expression)
    }

    /// 解析一个节点; 本节点或其子树有错误时返回 None
    fn parse_node(&mut self, node: &Value, depth: usize) -> Option<FilterExpression> {
        if depth > MAX_DEPTH {
            self.errors.push(ParseError::syntax(format!(
                "Filter nesting exceeds the maximum depth of {}",
                MAX_DEPTH
            )));
            return None;
        }

        let Some(object) = node.as_object() else {
            self.errors.push(ParseError::syntax(format!(
                "Filter must be an object, found {}",
                node
            )));
            return None;
        };

        let errors_before = self.errors.len();

        let union = match object.get("type") {
            None | Some(Value::Null) => Union::All,
            Some(value) => match value.as_str().and_then(Union::from_name) {
                Some(union) => union,
                None => {
                    self.errors.push(ParseError::syntax(format!(
                        "Invalid filter type {}, expected all, any or none",
                        value
                    )));
                    Union::All
                }
            },
        };

        let conditions = self
            .entries(object, "conditions")
            .iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect();

        let sub_filters = self
            .entries(object, "sub_filters")
            .iter()
            .filter_map(|child| self.parse_node(child, depth + 1))
            .collect();

        if self.errors.len() > errors_before {
            return None;
        }

        Some(FilterExpression {
            union,
            conditions,
            sub_filters,
        })
    }

    /// 读取数组字段; 缺省为空, 类型不对时记录错误
    fn entries<'v>(&mut self, object: &'v Map<String, Value>, key: &str) -> &'v [Value] {
        match object.get(key) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.errors.push(ParseError::syntax(format!(
                    "'{}' must be an array, found {}",
                    key, other
                )));
                &[]
            }
        }
    }

    fn parse_entry(&mut self, entry: &Value) -> Option<Condition> {
        match RawCondition::deserialize(entry) {
            Ok(raw) => self.parse_raw_condition(&raw),
            Err(e) => {
                self.errors
                    .push(ParseError::syntax(format!("Malformed condition {}: {}", entry, e)));
                None
            }
        }
    }

    /// 在注册表中查找声明 (第一条匹配), 然后按类型分派给条件解析器
    fn parse_raw_condition(&mut self, raw: &RawCondition) -> Option<Condition> {
        let registry = self.registry;
        let Some(config) = registry.resolve(&raw.column, raw.type_hint) else {
            let message = match raw.type_hint {
                Some(tag) => format!("Column '{}' is not configured as a {} filter", raw.column, tag),
                None => format!("Column '{}' is not configured", raw.column),
            };
            self.errors.push(ParseError::configuration(message));
            return None;
        };

        match condition::parse_condition(config, raw) {
            Ok(condition) => {
                tracing::trace!(
                    column = condition.column(),
                    type_tag = %condition.type_tag(),
                    inverse = condition.inverse(),
                    "Condition accepted"
                );
                Some(condition)
            }
            Err(e) => {
                tracing::trace!(column = %raw.column, error = %e, "Condition rejected");
                self.errors.push(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Number;
    use crate::comparator::{BooleanComparator, NumberComparator};
    use crate::config::{FilterConfig, NumberOptions, TypeTag};
    use crate::error::ErrorKind;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::new(vec![
            FilterConfig::boolean(["flag"]),
            FilterConfig::text(["title"]),
            FilterConfig::number(
                ["rating"],
                NumberOptions { allow_decimal: true, allowed_values: None },
            ),
        ])
        .unwrap()
    }

    fn parse_value(input: Value) -> Result<FilterExpression, ParseErrors> {
        let registry = registry();
        Parser::new(&registry).parse(&input)
    }

    fn nested(depth: usize) -> Value {
        let mut node = json!({"type": "all"});
        for _ in 1..depth {
            node = json!({"type": "all", "sub_filters": [node]});
        }
        node
    }

    #[test]
    fn test_simple_filter() {
        let result = parse_value(json!({
            "type": "all",
            "conditions": [{"column": "flag", "comparator": "equals", "value": "true", "type": "boolean"}]
        }))
        .unwrap();

        assert_eq!(result.union, Union::All);
        assert_eq!(result.conditions.len(), 1);
        assert!(result.sub_filters.is_empty());

        if let Condition::Boolean(p) = &result.conditions[0] {
            assert_eq!(p.column(), "flag");
            assert_eq!(p.comparator(), BooleanComparator::Equals);
            assert!(*p.value());
            assert!(!p.inverse());
        } else {
            panic!("Expected boolean condition");
        }
    }

    #[test]
    fn test_condition_accessors() {
        let result = parse_value(json!({
            "conditions": [{"column": "title", "comparator": "contains", "value": "x", "inverse": true}]
        }))
        .unwrap();

        let condition = &result.conditions[0];
        assert_eq!(condition.column(), "title");
        assert_eq!(condition.type_tag(), TypeTag::Text);
        assert!(condition.inverse());
    }

    #[test]
    fn test_union_defaults_to_all() {
        let result = parse_value(json!({"conditions": [{"column": "title", "value": "x"}]})).unwrap();
        assert_eq!(result.union, Union::All);

        let result = parse_value(json!({})).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_nested_sub_filters_keep_order() {
        let result = parse_value(json!({
            "type": "any",
            "conditions": [{"column": "flag", "value": true}],
            "sub_filters": [
                {"type": "none", "conditions": [{"column": "title", "comparator": "contains", "value": "draft"}]},
                {"type": "all", "conditions": [
                    {"column": "rating", "comparator": "greater_than", "value": 3},
                    {"column": "rating", "comparator": "less than or", "value": "9.5"}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(result.union, Union::Any);
        assert_eq!(result.sub_filters.len(), 2);
        assert_eq!(result.sub_filters[0].union, Union::None);
        assert_eq!(result.sub_filters[1].conditions.len(), 2);
        assert_eq!(result.condition_count(), 4);

        match &result.sub_filters[1].conditions[1] {
            Condition::Number(p) => {
                assert_eq!(p.comparator(), NumberComparator::LessThanOrEqual);
                assert_eq!(*p.value(), Number::Decimal(9.5));
            }
            other => panic!("Expected number condition, got {:?}", other),
        }
    }

    #[test]
    fn test_accumulates_errors_across_branches() {
        let errors = parse_value(json!({
            "type": "all",
            "conditions": [{"column": "flag", "value": "maybe"}],
            "sub_filters": [
                {"type": "any", "conditions": [{"column": "title", "comparator": "starts with", "value": "a"}]},
                {"type": "none", "sub_filters": [
                    {"conditions": [{"column": "author", "value": "me"}, {"column": "rating", "value": 1}]}
                ]}
            ]
        }))
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.messages(),
            vec![
                "Invalid boolean value for flag",
                "Invalid comparator 'starts with' for text column title",
                "Column 'author' is not configured",
            ]
        );
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Value, ErrorKind::Syntax, ErrorKind::Configuration]);
    }

    #[test]
    fn test_type_hint_must_match_declaration() {
        let errors = parse_value(json!({
            "conditions": [{"column": "title", "value": "1", "type": "number"}]
        }))
        .unwrap_err();
        assert_eq!(errors.messages(), vec!["Column 'title' is not configured as a number filter"]);
    }

    #[test]
    fn test_structural_errors() {
        let errors = parse_value(json!({
            "type": "either",
            "conditions": {"column": "flag"},
            "sub_filters": [42, {"conditions": [{"value": true}]}]
        }))
        .unwrap_err();

        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Syntax));
        let messages = errors.messages();
        assert!(messages[0].starts_with("Invalid filter type \"either\""));
        assert!(messages[1].starts_with("'conditions' must be an array"));
        assert!(messages[2].starts_with("Filter must be an object"));
        assert!(messages[3].starts_with("Malformed condition"));
    }

    #[test]
    fn test_depth_limit() {
        assert!(parse_value(nested(MAX_DEPTH)).is_ok());

        let errors = parse_value(nested(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(
            errors.messages(),
            vec!["Filter nesting exceeds the maximum depth of 32"]
        );

        // 深度远超上限时也不会继续递归
        assert_eq!(parse_value(nested(MAX_DEPTH * 4)).unwrap_err().len(), 1);
    }

    #[test]
    fn test_parse_params() {
        let registry = registry();
        let input = json!({"filter_union": "none", "rating_greater_than_or": "90.5", "flag": "1"});
        let result = Parser::new(&registry)
            .parse_params(input.as_object().unwrap())
            .unwrap();

        assert_eq!(result.union, Union::None);
        assert_eq!(result.conditions.len(), 2);
        assert_eq!(result.conditions[0].type_tag(), TypeTag::Number);
        assert_eq!(result.conditions[1].type_tag(), TypeTag::Boolean);
    }

    #[test]
    fn test_parse_params_accumulates_decoder_and_value_errors() {
        let registry = registry();
        let input = json!({"author": "me", "rating_less_than": "ten", "flag": "nope"});
        let errors = Parser::new(&registry)
            .parse_params(input.as_object().unwrap())
            .unwrap_err();

        assert_eq!(
            errors.messages(),
            vec![
                "Column 'author' is not configured",
                "Invalid number value for rating",
                "Invalid boolean value for flag",
            ]
        );
    }
}
