//! RSQL filter dialect.
//!
//! Parses the value of `filter` and `filter[type]` query parameters:
//!
//! ```text
//! genre=='Science Fiction';(title==Dune*,publishDate=gt=2000)
//! recordedDate[grain:month]=ge=2020-01
//! authors.name=in=(Herbert, Asimov)
//! ```
//!
//! `;` (or ` and `) binds tighter than `,` (or ` or `). Parsing happens in two
//! steps: a chumsky parser produces an untyped tree, then every selector is
//! resolved against the entity dictionary to build [`FilterExpression`]s.

use chumsky::prelude::*;
use indexmap::IndexMap;
use std::collections::BTreeMap;

use super::{FilterExpression, FilterPredicate, Operator};
use crate::dictionary::{EntityMetadata, EntityType, FieldType};
use crate::error::RequestError;
use crate::path::{Path, PathElement};
use crate::projection::Argument;
use crate::request::{bracket_contents, QueryParams, FILTER};

/// Error type for filter parsing.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("Invalid filter format: {0}")]
    Syntax(String),

    #[error("No such association {field} for type {entity}")]
    UnknownAssociation { field: String, entity: String },

    #[error("{0}")]
    InvalidParameter(String),
}

impl From<FilterParseError> for RequestError {
    fn from(err: FilterParseError) -> Self {
        RequestError::BadRequest(err.to_string())
    }
}

// ============================================================================
// Untyped syntax tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    In,
    Out,
    Lt,
    Le,
    Gt,
    Ge,
    IsNull,
    IsEmpty,
    HasMember,
    HasNoMember,
    Between,
    NotBetween,
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    name: String,
    arguments: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Comparison {
        selector: Vec<Segment>,
        comparison: Comparison,
        values: Vec<String>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

fn parser<'src>() -> impl Parser<'src, &'src str, Node, extra::Err<Rich<'src, char>>> {
    let ident = any()
        .filter(|c: &char| c.is_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(str::to_string);

    // field[name:value]
    let argument = ident
        .clone()
        .then_ignore(just(':'))
        .then(none_of(']').repeated().at_least(1).to_slice().map(str::to_string))
        .delimited_by(just('['), just(']'));

    let segment = ident
        .then(argument.repeated().collect::<Vec<_>>())
        .map(|(name, arguments)| Segment { name, arguments });

    let selector = segment
        .separated_by(just('.'))
        .at_least(1)
        .collect::<Vec<_>>()
        .labelled("selector");

    // Multi-character operators first
    let comparison = choice((
        just("=in=").to(Comparison::In),
        just("=out=").to(Comparison::Out),
        just("=lt=").to(Comparison::Lt),
        just("=le=").to(Comparison::Le),
        just("=gt=").to(Comparison::Gt),
        just("=ge=").to(Comparison::Ge),
        just("=isnull=").to(Comparison::IsNull),
        just("=isempty=").to(Comparison::IsEmpty),
        just("=hasmember=").to(Comparison::HasMember),
        just("=hasnomember=").to(Comparison::HasNoMember),
        just("=between=").to(Comparison::Between),
        just("=notbetween=").to(Comparison::NotBetween),
        just("==").to(Comparison::Eq),
        just("!=").to(Comparison::Ne),
        just("<=").to(Comparison::Le),
        just(">=").to(Comparison::Ge),
        just('<').to(Comparison::Lt),
        just('>').to(Comparison::Gt),
    ))
    .labelled("comparison operator");

    let single_quoted = none_of('\'')
        .repeated()
        .to_slice()
        .delimited_by(just('\''), just('\''));
    let double_quoted = none_of('"')
        .repeated()
        .to_slice()
        .delimited_by(just('"'), just('"'));
    let unreserved = none_of("'\"();,=!<> \t\r\n").repeated().at_least(1).to_slice();

    let value = choice((single_quoted, double_quoted, unreserved))
        .map(str::to_string)
        .labelled("value");

    let values = choice((
        value
            .clone()
            .separated_by(just(',').padded())
            .at_least(1)
            .collect::<Vec<_>>()
            .delimited_by(
                just('(').then(text::whitespace()),
                text::whitespace().then(just(')')),
            ),
        value.map(|v| vec![v]),
    ));

    let predicate = selector
        .then(comparison)
        .then(values)
        .map(|((selector, comparison), values)| Node::Comparison {
            selector,
            comparison,
            values,
        });

    let and_op = choice((
        text::whitespace()
            .ignore_then(just(';'))
            .then_ignore(text::whitespace())
            .ignored(),
        text::whitespace()
            .at_least(1)
            .ignore_then(just("and"))
            .then_ignore(text::whitespace().at_least(1))
            .ignored(),
    ));

    let or_op = choice((
        text::whitespace()
            .ignore_then(just(','))
            .then_ignore(text::whitespace())
            .ignored(),
        text::whitespace()
            .at_least(1)
            .ignore_then(just("or"))
            .then_ignore(text::whitespace().at_least(1))
            .ignored(),
    ));

    let expression = recursive(|expression| {
        let group = expression.delimited_by(
            just('(').then(text::whitespace()),
            text::whitespace().then(just(')')),
        );

        let atom = choice((predicate, group));

        let conjunction = atom.clone().foldl(and_op.ignore_then(atom).repeated(), |l, r| {
            Node::And(Box::new(l), Box::new(r))
        });

        conjunction
            .clone()
            .foldl(or_op.ignore_then(conjunction).repeated(), |l, r| {
                Node::Or(Box::new(l), Box::new(r))
            })
    });

    expression.padded().then_ignore(end())
}

fn parse_syntax(text: &str) -> Result<Node, FilterParseError> {
    parser().parse(text).into_result().map_err(|errs| {
        FilterParseError::Syntax(
            errs.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}

// ============================================================================
// Resolution against the dictionary
// ============================================================================

/// RSQL parser bound to an entity dictionary.
pub struct RsqlDialect<'a> {
    dictionary: &'a dyn EntityMetadata,
}

impl<'a> RsqlDialect<'a> {
    pub fn new(dictionary: &'a dyn EntityMetadata) -> Self {
        Self { dictionary }
    }

    /// Parse one RSQL expression whose selectors start at `ty`.
    pub fn parse(&self, ty: &EntityType, text: &str) -> Result<FilterExpression, FilterParseError> {
        let node = parse_syntax(text)?;
        self.resolve(ty, &node)
    }

    /// Parse every `filter[type]` parameter, keyed by the type it applies to.
    pub fn parse_typed_expressions(
        &self,
        params: &QueryParams,
        api_version: &str,
    ) -> Result<IndexMap<EntityType, FilterExpression>, FilterParseError> {
        let mut expressions = IndexMap::new();
        for (key, values) in params.iter() {
            if key == FILTER || !key.starts_with(FILTER) {
                continue;
            }
            let alias = bracket_contents(key, FILTER).ok_or_else(|| {
                FilterParseError::InvalidParameter(format!("Invalid query parameter: {}", key))
            })?;
            let ty = self.dictionary.lookup_alias(alias, api_version).ok_or_else(|| {
                FilterParseError::InvalidParameter(format!("Invalid query parameter: {}", key))
            })?;
            let [text] = values else {
                return Err(FilterParseError::InvalidParameter(format!(
                    "Exactly one RSQL expression must be defined for type : {}",
                    alias
                )));
            };
            let expression = self.parse(&ty, text)?;
            expressions.insert(ty, expression);
        }
        Ok(expressions)
    }

    /// Parse the untyped `filter` parameter against the collection the path addresses.
    pub fn parse_global_expression(
        &self,
        ty: &EntityType,
        params: &QueryParams,
    ) -> Result<Option<FilterExpression>, FilterParseError> {
        match params.get(FILTER) {
            None => Ok(None),
            Some([text]) => self.parse(ty, text).map(Some),
            Some(_) => Err(FilterParseError::InvalidParameter(
                "There can only be a single filter query parameter".to_string(),
            )),
        }
    }

    fn resolve(&self, ty: &EntityType, node: &Node) -> Result<FilterExpression, FilterParseError> {
        match node {
            Node::And(l, r) => Ok(FilterExpression::and(self.resolve(ty, l)?, self.resolve(ty, r)?)),
            Node::Or(l, r) => Ok(FilterExpression::or(self.resolve(ty, l)?, self.resolve(ty, r)?)),
            Node::Comparison {
                selector,
                comparison,
                values,
            } => {
                let path = self.resolve_selector(ty, selector)?;
                comparison_expression(path, *comparison, values)
            }
        }
    }

    fn resolve_selector(&self, root: &EntityType, selector: &[Segment]) -> Result<Path, FilterParseError> {
        let mut elements = Vec::with_capacity(selector.len());
        let mut current = root.clone();

        for (index, segment) in selector.iter().enumerate() {
            let unknown = || FilterParseError::UnknownAssociation {
                field: segment.name.clone(),
                entity: self.dictionary.json_alias(&current),
            };
            let field_type = self
                .dictionary
                .field_type(&current, &segment.name)
                .ok_or_else(unknown)?;

            let is_last = index + 1 == selector.len();
            let next = match &field_type {
                FieldType::Relation(target) => Some(target.clone()),
                FieldType::Attribute(_) if !is_last => return Err(unknown()),
                FieldType::Attribute(_) => None,
            };

            let arguments: BTreeMap<String, Argument> = segment
                .arguments
                .iter()
                .map(|(name, value)| (name.clone(), Argument::new(name.clone(), value.clone())))
                .collect();
            elements.push(
                PathElement::new(current.clone(), field_type, segment.name.clone())
                    .with_arguments(arguments),
            );

            if let Some(next) = next {
                current = next;
            }
        }

        Ok(Path::new(elements))
    }
}

fn comparison_expression(
    path: Path,
    comparison: Comparison,
    values: &[String],
) -> Result<FilterExpression, FilterParseError> {
    let predicate = |operator: Operator, values: Vec<String>| -> FilterExpression {
        FilterPredicate::new(path.clone(), operator, values).into()
    };

    let expression = match comparison {
        Comparison::Eq => wildcard(values).map_or_else(
            || predicate(Operator::In, values.to_vec()),
            |(operator, value)| predicate(operator, vec![value]),
        ),
        Comparison::Ne => wildcard(values).map_or_else(
            || predicate(Operator::NotIn, values.to_vec()),
            |(operator, value)| FilterExpression::not(predicate(operator, vec![value])),
        ),
        Comparison::In => predicate(Operator::In, values.to_vec()),
        Comparison::Out => predicate(Operator::NotIn, values.to_vec()),
        Comparison::Lt => predicate(Operator::Lt, values.to_vec()),
        Comparison::Le => predicate(Operator::Le, values.to_vec()),
        Comparison::Gt => predicate(Operator::Gt, values.to_vec()),
        Comparison::Ge => predicate(Operator::Ge, values.to_vec()),
        Comparison::IsNull => {
            let operator = boolean_flag("=isnull=", values, Operator::IsNull, Operator::NotNull)?;
            predicate(operator, Vec::new())
        }
        Comparison::IsEmpty => {
            let operator = boolean_flag("=isempty=", values, Operator::IsEmpty, Operator::NotEmpty)?;
            predicate(operator, Vec::new())
        }
        Comparison::HasMember => predicate(Operator::HasMember, values.to_vec()),
        Comparison::HasNoMember => predicate(Operator::HasNoMember, values.to_vec()),
        Comparison::Between | Comparison::NotBetween => {
            if values.len() != 2 {
                return Err(FilterParseError::Syntax(
                    "=between= and =notbetween= require exactly two values".to_string(),
                ));
            }
            let operator = if comparison == Comparison::Between {
                Operator::Between
            } else {
                Operator::NotBetween
            };
            predicate(operator, values.to_vec())
        }
    };
    Ok(expression)
}

/// `Dune*`, `*Dune` and `*Dune*` become prefix, postfix and infix matches.
fn wildcard(values: &[String]) -> Option<(Operator, String)> {
    let [value] = values else {
        return None;
    };
    let starts = value.starts_with('*');
    let ends = value.ends_with('*');
    let len = value.len();
    match (starts, ends) {
        (true, true) if len > 2 => Some((Operator::Infix, value[1..len - 1].to_string())),
        (true, false) if len > 1 => Some((Operator::Postfix, value[1..].to_string())),
        (false, true) if len > 1 => Some((Operator::Prefix, value[..len - 1].to_string())),
        _ => None,
    }
}

fn boolean_flag(
    symbol: &str,
    values: &[String],
    when_true: Operator,
    when_false: Operator,
) -> Result<Operator, FilterParseError> {
    match values {
        [v] if v.eq_ignore_ascii_case("true") || v == "1" => Ok(when_true),
        [v] if v.eq_ignore_ascii_case("false") || v == "0" => Ok(when_false),
        _ => Err(FilterParseError::Syntax(format!(
            "Invalid value for operator {}",
            symbol
        ))),
    }
}
