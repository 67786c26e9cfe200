use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::comparator::{
    BooleanComparator, DateComparator, DateTimeComparator, NumberComparator, TextComparator,
};
use crate::config::TypeTag;

/// 过滤表达式树的节点
///
/// 空节点（没有条件也没有子过滤器）也是合法的，编码结果见 `encoder` 模块。
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    /// 子节点之间的组合方式
    pub union: Union,
    /// 本层的条件，按声明顺序
    pub conditions: Vec<Condition>,
    /// 嵌套的子过滤器，按声明顺序
    pub sub_filters: Vec<FilterExpression>,
}

impl FilterExpression {
    pub fn empty(union: Union) -> Self {
        Self {
            union,
            conditions: Vec::new(),
            sub_filters: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.sub_filters.is_empty()
    }

    /// 整棵树中的条件总数
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
            + self
                .sub_filters
                .iter()
                .map(FilterExpression::condition_count)
                .sum::<usize>()
    }
}

/// 布尔组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Union {
    /// 逻辑与 (AND)
    #[default]
    All,
    /// 逻辑或 (OR)
    Any,
    /// 逻辑或非 (NOT (a AND b ...))
    None,
}

impl Union {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Union::All),
            "any" => Some(Union::Any),
            "none" => Some(Union::None),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Union::All => "all",
            Union::Any => "any",
            Union::None => "none",
        }
    }
}

impl fmt::Display for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已校验的单个条件，只能由条件解析器构造
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Boolean(Predicate<BooleanComparator, bool>),
    Text(Predicate<TextComparator, String>),
    Number(Predicate<NumberComparator, Number>),
    Date(Predicate<DateComparator, DateValue>),
    DateTime(Predicate<DateTimeComparator, DateTime<Utc>>),
}

impl Condition {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Condition::Boolean(_) => TypeTag::Boolean,
            Condition::Text(_) => TypeTag::Text,
            Condition::Number(_) => TypeTag::Number,
            Condition::Date(_) => TypeTag::Date,
            Condition::DateTime(_) => TypeTag::DateTime,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Condition::Boolean(p) => p.column(),
            Condition::Text(p) => p.column(),
            Condition::Number(p) => p.column(),
            Condition::Date(p) => p.column(),
            Condition::DateTime(p) => p.column(),
        }
    }

    pub fn inverse(&self) -> bool {
        match self {
            Condition::Boolean(p) => p.inverse(),
            Condition::Text(p) => p.inverse(),
            Condition::Number(p) => p.inverse(),
            Condition::Date(p) => p.inverse(),
            Condition::DateTime(p) => p.inverse(),
        }
    }
}

/// 列、比较符、值与取反标志
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<C, V> {
    pub(crate) column: String,
    pub(crate) comparator: C,
    pub(crate) value: V,
    pub(crate) inverse: bool,
}

impl<C: Copy, V> Predicate<C, V> {
    pub(crate) fn new(column: impl Into<String>, comparator: C, value: V, inverse: bool) -> Self {
        Self {
            column: column.into(),
            comparator,
            value,
            inverse,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn comparator(&self) -> C {
        self.comparator
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn inverse(&self) -> bool {
        self.inverse
    }
}

/// 数字字面量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl Number {
    /// 同值比较：整数之间精确比较，小数只有在恰好是该整数时才相等
    pub fn same_value(self, other: Number) -> bool {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a == b,
            (Number::Decimal(a), Number::Decimal(b)) => a == b,
            (Number::Integer(i), Number::Decimal(d)) | (Number::Decimal(d), Number::Integer(i)) => {
                d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 && d as i64 == i
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{}", n),
            Number::Decimal(n) => write!(f, "{}", n),
        }
    }
}

/// 日期条件的值：单个日期或闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    Single(NaiveDate),
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateValue {
    /// 区间的上下界；单个日期视为退化区间
    pub fn bounds(self) -> (NaiveDate, NaiveDate) {
        match self {
            DateValue::Single(date) => (date, date),
            DateValue::Range { start, end } => (start, end),
        }
    }
}
