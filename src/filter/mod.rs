//! Filter expressions.
//!
//! ```text
//! filter[book]=genre=='Science Fiction';publishDate=gt=2000
//!        │
//!        ▼ [dialect]
//! And(Predicate(genre IN ['Science Fiction']), Predicate(publishDate GT ['2000']))
//!        │
//!        ▼ [resolver]
//! attached to the projection of `book`
//! ```
//!
//! The tree is a plain sum type. Visitors are ordinary recursive functions in
//! [`visitor`].

pub mod dialect;
pub mod resolver;
pub mod visitor;

pub use dialect::{FilterParseError, RsqlDialect};
pub use resolver::{DefaultFilterResolver, FilterResolver};

use serde::{Serialize, Serializer};
use std::fmt;

use crate::path::Path;

/// Comparison operator of a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    In,
    NotIn,
    Prefix,
    NotPrefix,
    Postfix,
    NotPostfix,
    Infix,
    NotInfix,
    Lt,
    Le,
    Gt,
    Ge,
    IsNull,
    NotNull,
    IsEmpty,
    NotEmpty,
    HasMember,
    HasNoMember,
    Between,
    NotBetween,
}

impl Operator {
    /// The operator matching exactly the rows this one rejects.
    pub fn negate(self) -> Self {
        use Operator::*;
        match self {
            In => NotIn,
            NotIn => In,
            Prefix => NotPrefix,
            NotPrefix => Prefix,
            Postfix => NotPostfix,
            NotPostfix => Postfix,
            Infix => NotInfix,
            NotInfix => Infix,
            Lt => Ge,
            Ge => Lt,
            Le => Gt,
            Gt => Le,
            IsNull => NotNull,
            NotNull => IsNull,
            IsEmpty => NotEmpty,
            NotEmpty => IsEmpty,
            HasMember => HasNoMember,
            HasNoMember => HasMember,
            Between => NotBetween,
            NotBetween => Between,
        }
    }

    /// Whether the operator takes no values.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Operator::IsNull | Operator::NotNull | Operator::IsEmpty | Operator::NotEmpty
        )
    }

    pub fn keyword(self) -> &'static str {
        use Operator::*;
        match self {
            In => "IN",
            NotIn => "NOT",
            Prefix => "PREFIX",
            NotPrefix => "NOTPREFIX",
            Postfix => "POSTFIX",
            NotPostfix => "NOTPOSTFIX",
            Infix => "INFIX",
            NotInfix => "NOTINFIX",
            Lt => "LT",
            Le => "LE",
            Gt => "GT",
            Ge => "GE",
            IsNull => "ISNULL",
            NotNull => "NOTNULL",
            IsEmpty => "ISEMPTY",
            NotEmpty => "NOTEMPTY",
            HasMember => "HASMEMBER",
            HasNoMember => "HASNOMEMBER",
            Between => "BETWEEN",
            NotBetween => "NOTBETWEEN",
        }
    }
}

/// A leaf comparison against one field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterPredicate {
    pub path: Path,
    pub operator: Operator,
    pub values: Vec<String>,
}

impl FilterPredicate {
    pub fn new(path: Path, operator: Operator, values: Vec<String>) -> Self {
        Self {
            path,
            operator,
            values,
        }
    }

    /// Name of the field the predicate compares.
    pub fn field_name(&self) -> &str {
        self.path.last().map(|e| e.field_name.as_str()).unwrap_or_default()
    }

    pub fn negate(&self) -> Self {
        Self {
            path: self.path.clone(),
            operator: self.operator.negate(),
            values: self.values.clone(),
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.operator.keyword())?;
        if self.operator.is_unary() {
            return Ok(());
        }
        let values = self
            .values
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, " [{}]", values)
    }
}

/// Boolean predicate tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterExpression {
    Predicate(FilterPredicate),
    And(Box<FilterExpression>, Box<FilterExpression>),
    Or(Box<FilterExpression>, Box<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    pub fn and(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: FilterExpression) -> Self {
        FilterExpression::Not(Box::new(operand))
    }

    /// AND together whatever expressions are present.
    pub fn and_all<I>(expressions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<FilterExpression>>,
    {
        expressions
            .into_iter()
            .flatten()
            .reduce(FilterExpression::and)
    }

    /// Top-level AND operands, left to right.
    pub fn conjuncts(&self) -> Vec<&FilterExpression> {
        match self {
            FilterExpression::And(left, right) => {
                let mut out = left.conjuncts();
                out.extend(right.conjuncts());
                out
            }
            other => vec![other],
        }
    }
}

impl From<FilterPredicate> for FilterExpression {
    fn from(predicate: FilterPredicate) -> Self {
        FilterExpression::Predicate(predicate)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Predicate(p) => write!(f, "{}", p),
            FilterExpression::And(l, r) => write!(f, "({} AND {})", l, r),
            FilterExpression::Or(l, r) => write!(f, "({} OR {})", l, r),
            FilterExpression::Not(e) => write!(f, "NOT ({})", e),
        }
    }
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
