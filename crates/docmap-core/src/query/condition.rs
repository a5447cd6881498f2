use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{BitAnd, BitOr},
};

///
/// Condition tree
///
/// Store-agnostic representation of a query filter. Field references are
/// storage-native names; nothing here consults entity metadata, and trees
/// are kept exactly as built (no flattening, no double-negation removal).
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CompareOp {
    Equals,
    GreaterThan,
    GreaterEquals,
    LesserThan,
    LesserEquals,
    Like,
    In,
    Between,
}

impl CompareOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterEquals => "GREATER_EQUALS",
            Self::LesserThan => "LESSER_THAN",
            Self::LesserEquals => "LESSER_EQUALS",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        }
    }

    /// Number of call arguments the operator consumes when bound from a
    /// derived method name.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Between => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// Comparison
///
/// `In` carries a `Value::List` of candidates; `Between` a two-element
/// `Value::List` of inclusive bounds.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Comparison {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Comparison {
    #[must_use]
    pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

///
/// Condition
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Condition {
    Compare(Comparison),
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl Condition {
    #[must_use]
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare(Comparison::new(field, op, value))
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Equals, value)
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::GreaterThan, value)
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::GreaterEquals, value)
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::LesserThan, value)
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::LesserEquals, value)
    }

    /// `%` matches any run of characters, `_` exactly one.
    #[must_use]
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::Like, Value::Text(pattern.into()))
    }

    #[must_use]
    pub fn in_<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();

        Self::compare(field, CompareOp::In, Value::List(values))
    }

    #[must_use]
    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::compare(
            field,
            CompareOp::Between,
            Value::List(vec![low.into(), high.into()]),
        )
    }

    #[must_use]
    pub const fn and(conditions: Vec<Self>) -> Self {
        Self::And(conditions)
    }

    #[must_use]
    pub const fn or(conditions: Vec<Self>) -> Self {
        Self::Or(conditions)
    }

    #[must_use]
    pub fn not(condition: Self) -> Self {
        Self::Not(Box::new(condition))
    }

    /// AND `other` onto an optional condition.
    #[must_use]
    pub fn and_with(base: Option<Self>, other: Self) -> Self {
        match base {
            Some(base) => Self::And(vec![base, other]),
            None => other,
        }
    }
}

impl BitAnd for Condition {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitAnd for &Condition {
    type Output = Condition;

    fn bitand(self, rhs: Self) -> Self::Output {
        Condition::And(vec![self.clone(), rhs.clone()])
    }
}

impl BitOr for Condition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

impl BitOr for &Condition {
    type Output = Condition;

    fn bitor(self, rhs: Self) -> Self::Output {
        Condition::Or(vec![self.clone(), rhs.clone()])
    }
}
