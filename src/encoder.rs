//! Lowers a validated filter tree into SQL.
//!
//! Two targets share one per-condition [`Template`]:
//! - [`encode`] produces a [`Fragment`]: an expression with `?` placeholders
//!   and the bound values in placeholder order.
//! - [`query`] applies the same predicate to a sea-query `SelectStatement`,
//!   letting sea-query bind the values for whichever backend renders it.
//!
//! Empty nodes are constants: `all`/`any` encode to `1 = 1`, `none` to `1 = 0`.

use sea_query::{Expr, Func, Iden, LikeExpr, SelectStatement, SimpleExpr, Value};

use crate::ast::{Condition, FilterExpression, Number, Union};
use crate::comparator::{
    BooleanComparator, Comparator, DateComparator, DateTimeComparator, NumberComparator,
    TextComparator,
};

const ALWAYS_TRUE: &str = "1 = 1";
const ALWAYS_FALSE: &str = "1 = 0";

/// LIKE escape character; needs no quoting in any SQL dialect's string literal.
pub const LIKE_ESCAPE: char = '!';

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Parameterized boolean expression plus its bound values.
///
/// The i-th `?` in `expression` binds `values[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub expression: String,
    pub values: Vec<Value>,
}

impl Fragment {
    fn constant(truth: bool) -> Self {
        Self {
            expression: if truth { ALWAYS_TRUE } else { ALWAYS_FALSE }.to_string(),
            values: Vec::new(),
        }
    }
}

/// Encode a whole tree: conditions first, then sub-filters, in declaration order.
pub fn encode(expression: &FilterExpression) -> Fragment {
    if expression.is_empty() {
        return Fragment::constant(expression.union != Union::None);
    }

    let children: Vec<Fragment> = expression
        .conditions
        .iter()
        .map(encode_condition)
        .chain(expression.sub_filters.iter().map(encode))
        .collect();

    let mut parts = Vec::with_capacity(children.len());
    let mut values = Vec::new();
    for child in children {
        parts.push(child.expression);
        values.extend(child.values);
    }

    let expression = match expression.union {
        Union::None => format!("NOT ({})", parts.join(" AND ")),
        Union::All | Union::Any if parts.len() == 1 => parts.concat(),
        Union::All => format!("({})", parts.join(" AND ")),
        Union::Any => format!("({})", parts.join(" OR ")),
    };

    Fragment { expression, values }
}

pub fn encode_condition(condition: &Condition) -> Fragment {
    Template::of(condition).into_fragment()
}

/// Adds the filter to `select` as a WHERE predicate.
pub fn query(mut select: SelectStatement, expression: &FilterExpression) -> SelectStatement {
    tracing::debug!(
        union = %expression.union,
        conditions = expression.condition_count(),
        "Applying filter to query"
    );
    select.and_where(to_simple_expr(expression));
    select
}

/// Same lowering as [`encode`], as a sea-query expression.
pub fn to_simple_expr(expression: &FilterExpression) -> SimpleExpr {
    let mut children = expression
        .conditions
        .iter()
        .map(|c| Template::of(c).into_simple_expr())
        .chain(expression.sub_filters.iter().map(to_simple_expr));

    let Some(first) = children.next() else {
        let constant = if expression.union == Union::None { ALWAYS_FALSE } else { ALWAYS_TRUE };
        return Expr::cust(constant);
    };

    let combined = children.fold(first, |acc, expr| match expression.union {
        Union::Any => acc.or(expr),
        Union::All | Union::None => acc.and(expr),
    });

    match expression.union {
        Union::None => combined.not(),
        Union::All | Union::Any => combined,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Expression shape of one condition after applying `inverse`.
#[derive(Debug, Clone, PartialEq)]
enum Template<'c> {
    Compare {
        column: &'c str,
        op: CompareOp,
        value: Value,
    },
    /// Case-insensitive substring match; `pattern` is already lowercased and escaped.
    Like {
        column: &'c str,
        pattern: String,
        negated: bool,
    },
    /// Inclusive range; negated form matches values outside it.
    Range {
        column: &'c str,
        start: Value,
        end: Value,
        negated: bool,
    },
}

impl<'c> Template<'c> {
    fn of(condition: &'c Condition) -> Self {
        match condition {
            Condition::Boolean(p) => {
                let op = match p.comparator().effective(p.inverse()) {
                    BooleanComparator::Equals => CompareOp::Eq,
                    BooleanComparator::DoesNotEqual => CompareOp::Ne,
                };
                Template::Compare { column: p.column(), op, value: (*p.value()).into() }
            }
            Condition::Text(p) => {
                let column = p.column();
                let text = p.value();
                match p.comparator().effective(p.inverse()) {
                    TextComparator::Equals => Template::Compare {
                        column,
                        op: CompareOp::Eq,
                        value: text.clone().into(),
                    },
                    TextComparator::DoesNotEqual => Template::Compare {
                        column,
                        op: CompareOp::Ne,
                        value: text.clone().into(),
                    },
                    TextComparator::Contains => Template::Like {
                        column,
                        pattern: contains_pattern(text),
                        negated: false,
                    },
                    TextComparator::DoesNotContain => Template::Like {
                        column,
                        pattern: contains_pattern(text),
                        negated: true,
                    },
                }
            }
            Condition::Number(p) => {
                let op = match p.comparator().effective(p.inverse()) {
                    NumberComparator::Equals => CompareOp::Eq,
                    NumberComparator::DoesNotEqual => CompareOp::Ne,
                    NumberComparator::GreaterThan => CompareOp::Gt,
                    NumberComparator::GreaterThanOrEqual => CompareOp::Gte,
                    NumberComparator::LessThan => CompareOp::Lt,
                    NumberComparator::LessThanOrEqual => CompareOp::Lte,
                };
                let value = match *p.value() {
                    Number::Integer(n) => n.into(),
                    Number::Decimal(n) => n.into(),
                };
                Template::Compare { column: p.column(), op, value }
            }
            Condition::Date(p) => {
                let column = p.column();
                let (start, end) = p.value().bounds();
                let compare = |op| Template::Compare { column, op, value: start.into() };
                match p.comparator().effective(p.inverse()) {
                    DateComparator::Equals => compare(CompareOp::Eq),
                    DateComparator::DoesNotEqual => compare(CompareOp::Ne),
                    DateComparator::After => compare(CompareOp::Gt),
                    DateComparator::OnOrAfter => compare(CompareOp::Gte),
                    DateComparator::Before => compare(CompareOp::Lt),
                    DateComparator::OnOrBefore => compare(CompareOp::Lte),
                    DateComparator::Between => Template::Range {
                        column,
                        start: start.into(),
                        end: end.into(),
                        negated: false,
                    },
                    DateComparator::NotBetween => Template::Range {
                        column,
                        start: start.into(),
                        end: end.into(),
                        negated: true,
                    },
                }
            }
            Condition::DateTime(p) => {
                let op = match p.comparator().effective(p.inverse()) {
                    DateTimeComparator::Equals => CompareOp::Eq,
                    DateTimeComparator::DoesNotEqual => CompareOp::Ne,
                    DateTimeComparator::After => CompareOp::Gt,
                    DateTimeComparator::OnOrAfter => CompareOp::Gte,
                    DateTimeComparator::Before => CompareOp::Lt,
                    DateTimeComparator::OnOrBefore => CompareOp::Lte,
                };
                Template::Compare { column: p.column(), op, value: (*p.value()).into() }
            }
        }
    }

    fn into_fragment(self) -> Fragment {
        match self {
            Template::Compare { column, op, value } => Fragment {
                expression: format!("{} {} ?", column, op.symbol()),
                values: vec![value],
            },
            Template::Like { column, pattern, negated } => Fragment {
                expression: format!(
                    "LOWER({}) {} ? ESCAPE '{}'",
                    column,
                    if negated { "NOT LIKE" } else { "LIKE" },
                    LIKE_ESCAPE
                ),
                values: vec![pattern.into()],
            },
            Template::Range { column, start, end, negated } => Fragment {
                expression: if negated {
                    format!("({0} < ? OR {0} > ?)", column)
                } else {
                    format!("({0} >= ? AND {0} <= ?)", column)
                },
                values: vec![start, end],
            },
        }
    }

    fn into_simple_expr(self) -> SimpleExpr {
        match self {
            Template::Compare { column, op, value } => {
                let col = Expr::col(ColumnName(column.to_string()));
                match op {
                    CompareOp::Eq => col.eq(value),
                    CompareOp::Ne => col.ne(value),
                    CompareOp::Gt => col.gt(value),
                    CompareOp::Gte => col.gte(value),
                    CompareOp::Lt => col.lt(value),
                    CompareOp::Lte => col.lte(value),
                }
            }
            Template::Like { column, pattern, negated } => {
                let lowered = Expr::expr(Func::lower(Expr::col(ColumnName(column.to_string()))));
                let like = LikeExpr::new(pattern).escape(LIKE_ESCAPE);
                if negated {
                    lowered.not_like(like)
                } else {
                    lowered.like(like)
                }
            }
            Template::Range { column, start, end, negated } => {
                let col = Expr::col(ColumnName(column.to_string()));
                if negated {
                    col.clone().lt(start).or(col.gt(end))
                } else {
                    col.clone().gte(start).and(col.lte(end))
                }
            }
        }
    }
}

fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like_pattern(&text.to_lowercase()))
}

/// Escapes LIKE wildcards so user text matches literally (escape char [`LIKE_ESCAPE`]).
pub fn escape_like_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, LIKE_ESCAPE | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
