//! Comparators accepted by each condition type.
//!
//! Every comparator has a canonical name plus aliases. Lookup normalizes the
//! input first, so `greater_than_or`, `Greater Than Or` and `gte` all select
//! `NumberComparator::GreaterThanOrEqual`.

use crate::config::TypeTag;

/// Shared behaviour of the per-type comparator enums.
pub trait Comparator: Copy + Eq + std::fmt::Debug + 'static {
    /// Every variant, in a stable order.
    const ALL: &'static [Self];

    /// Canonical name followed by accepted aliases, all in normalized form.
    fn aliases(self) -> &'static [&'static str];

    /// The comparator matching the complement of this one.
    fn negate(self) -> Self;

    fn name(self) -> &'static str {
        self.aliases()[0]
    }

    fn parse(input: &str) -> Option<Self> {
        let normalized = normalize(input);
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.aliases().contains(&normalized.as_str()))
    }

    /// Resolves the negation requested by an `inverse` flag.
    fn effective(self, inverse: bool) -> Self {
        if inverse {
            self.negate()
        } else {
            self
        }
    }
}

/// Lowercases, maps `_` to spaces and collapses whitespace.
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanComparator {
    Equals,
    DoesNotEqual,
}

impl Comparator for BooleanComparator {
    const ALL: &'static [Self] = &[BooleanComparator::Equals, BooleanComparator::DoesNotEqual];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            BooleanComparator::Equals => EQUALS,
            BooleanComparator::DoesNotEqual => DOES_NOT_EQUAL,
        }
    }

    fn negate(self) -> Self {
        match self {
            BooleanComparator::Equals => BooleanComparator::DoesNotEqual,
            BooleanComparator::DoesNotEqual => BooleanComparator::Equals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextComparator {
    Equals,
    DoesNotEqual,
    Contains,
    DoesNotContain,
}

impl Comparator for TextComparator {
    const ALL: &'static [Self] = &[
        TextComparator::Equals,
        TextComparator::DoesNotEqual,
        TextComparator::Contains,
        TextComparator::DoesNotContain,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            TextComparator::Equals => EQUALS,
            TextComparator::DoesNotEqual => DOES_NOT_EQUAL,
            TextComparator::Contains => &["contains"],
            TextComparator::DoesNotContain => &["does not contain", "not contains"],
        }
    }

    fn negate(self) -> Self {
        match self {
            TextComparator::Equals => TextComparator::DoesNotEqual,
            TextComparator::DoesNotEqual => TextComparator::Equals,
            TextComparator::Contains => TextComparator::DoesNotContain,
            TextComparator::DoesNotContain => TextComparator::Contains,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberComparator {
    Equals,
    DoesNotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparator for NumberComparator {
    const ALL: &'static [Self] = &[
        NumberComparator::Equals,
        NumberComparator::DoesNotEqual,
        NumberComparator::GreaterThan,
        NumberComparator::GreaterThanOrEqual,
        NumberComparator::LessThan,
        NumberComparator::LessThanOrEqual,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            NumberComparator::Equals => EQUALS,
            NumberComparator::DoesNotEqual => DOES_NOT_EQUAL,
            NumberComparator::GreaterThan => &["greater than", "gt"],
            NumberComparator::GreaterThanOrEqual => &[
                "greater than or",
                "greater than or equal",
                "greater than or equal to",
                "gte",
            ],
            NumberComparator::LessThan => &["less than", "lt"],
            NumberComparator::LessThanOrEqual => &[
                "less than or",
                "less than or equal",
                "less than or equal to",
                "lte",
            ],
        }
    }

    fn negate(self) -> Self {
        match self {
            NumberComparator::Equals => NumberComparator::DoesNotEqual,
            NumberComparator::DoesNotEqual => NumberComparator::Equals,
            NumberComparator::GreaterThan => NumberComparator::LessThanOrEqual,
            NumberComparator::GreaterThanOrEqual => NumberComparator::LessThan,
            NumberComparator::LessThan => NumberComparator::GreaterThanOrEqual,
            NumberComparator::LessThanOrEqual => NumberComparator::GreaterThan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateComparator {
    Equals,
    DoesNotEqual,
    After,
    OnOrAfter,
    Before,
    OnOrBefore,
    Between,
    NotBetween,
}

impl DateComparator {
    pub fn is_range(self) -> bool {
        matches!(self, DateComparator::Between | DateComparator::NotBetween)
    }
}

impl Comparator for DateComparator {
    const ALL: &'static [Self] = &[
        DateComparator::Equals,
        DateComparator::DoesNotEqual,
        DateComparator::After,
        DateComparator::OnOrAfter,
        DateComparator::Before,
        DateComparator::OnOrBefore,
        DateComparator::Between,
        DateComparator::NotBetween,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            DateComparator::Equals => EQUALS,
            DateComparator::DoesNotEqual => DOES_NOT_EQUAL,
            DateComparator::After => AFTER,
            DateComparator::OnOrAfter => ON_OR_AFTER,
            DateComparator::Before => BEFORE,
            DateComparator::OnOrBefore => ON_OR_BEFORE,
            DateComparator::Between => &["between"],
            DateComparator::NotBetween => &["not between"],
        }
    }

    fn negate(self) -> Self {
        match self {
            DateComparator::Equals => DateComparator::DoesNotEqual,
            DateComparator::DoesNotEqual => DateComparator::Equals,
            DateComparator::After => DateComparator::OnOrBefore,
            DateComparator::OnOrAfter => DateComparator::Before,
            DateComparator::Before => DateComparator::OnOrAfter,
            DateComparator::OnOrBefore => DateComparator::After,
            DateComparator::Between => DateComparator::NotBetween,
            DateComparator::NotBetween => DateComparator::Between,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeComparator {
    Equals,
    DoesNotEqual,
    After,
    OnOrAfter,
    Before,
    OnOrBefore,
}

impl Comparator for DateTimeComparator {
    const ALL: &'static [Self] = &[
        DateTimeComparator::Equals,
        DateTimeComparator::DoesNotEqual,
        DateTimeComparator::After,
        DateTimeComparator::OnOrAfter,
        DateTimeComparator::Before,
        DateTimeComparator::OnOrBefore,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            DateTimeComparator::Equals => EQUALS,
            DateTimeComparator::DoesNotEqual => DOES_NOT_EQUAL,
            DateTimeComparator::After => AFTER,
            DateTimeComparator::OnOrAfter => ON_OR_AFTER,
            DateTimeComparator::Before => BEFORE,
            DateTimeComparator::OnOrBefore => ON_OR_BEFORE,
        }
    }

    fn negate(self) -> Self {
        match self {
            DateTimeComparator::Equals => DateTimeComparator::DoesNotEqual,
            DateTimeComparator::DoesNotEqual => DateTimeComparator::Equals,
            DateTimeComparator::After => DateTimeComparator::OnOrBefore,
            DateTimeComparator::OnOrAfter => DateTimeComparator::Before,
            DateTimeComparator::Before => DateTimeComparator::OnOrAfter,
            DateTimeComparator::OnOrBefore => DateTimeComparator::After,
        }
    }
}

const EQUALS: &[&str] = &["equals", "equal", "eq"];
const DOES_NOT_EQUAL: &[&str] = &["does not equal", "not equal", "not equals", "ne"];
const AFTER: &[&str] = &["after"];
const ON_OR_AFTER: &[&str] = &["on or after"];
const BEFORE: &[&str] = &["before"];
const ON_OR_BEFORE: &[&str] = &["on or before"];

/// Every alias legal for a type, used by the param decoder to strip key suffixes.
pub fn aliases_for(tag: TypeTag) -> Vec<&'static str> {
    fn collect<C: Comparator>() -> Vec<&'static str> {
        C::ALL.iter().flat_map(|c| c.aliases().iter().copied()).collect()
    }

    match tag {
        TypeTag::Boolean => collect::<BooleanComparator>(),
        TypeTag::Text => collect::<TextComparator>(),
        TypeTag::Number => collect::<NumberComparator>(),
        TypeTag::Date => collect::<DateComparator>(),
        TypeTag::DateTime => collect::<DateTimeComparator>(),
    }
}
