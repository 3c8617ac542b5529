//! Splitting a filter into pre- and post-aggregation parts.
//!
//! Predicates on metrics can only be evaluated after grouping, so they go to
//! HAVING. Everything else goes to WHERE. An OR that mixes the two cannot be
//! split without changing its meaning, so the whole OR is moved to HAVING.

use serde::Serialize;

use super::metadata::Table;
use crate::filter::visitor::normalize;
use crate::filter::{FilterExpression, FilterPredicate};

/// The two halves of a split filter. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSplit {
    pub where_filter: Option<FilterExpression>,
    pub having_filter: Option<FilterExpression>,
}

impl FilterSplit {
    fn pure_where(expression: FilterExpression) -> Self {
        Self {
            where_filter: Some(expression),
            having_filter: None,
        }
    }

    fn pure_having(expression: FilterExpression) -> Self {
        Self {
            where_filter: None,
            having_filter: Some(expression),
        }
    }
}

/// Split `expression` for grouped queries over `table`.
///
/// NOTs are pushed to the leaves first, so AND and OR can be handled without
/// looking at enclosing negations.
pub fn split_filter(expression: &FilterExpression, table: &Table) -> FilterSplit {
    split(&normalize(expression), table)
}

fn split(expression: &FilterExpression, table: &Table) -> FilterSplit {
    match expression {
        FilterExpression::Predicate(predicate) if is_having_predicate(predicate, table) => {
            FilterSplit::pure_having(expression.clone())
        }
        FilterExpression::Predicate(_) => FilterSplit::pure_where(expression.clone()),
        FilterExpression::And(l, r) => {
            let left = split(l, table);
            let right = split(r, table);
            FilterSplit {
                where_filter: FilterExpression::and_all([left.where_filter, right.where_filter]),
                having_filter: FilterExpression::and_all([left.having_filter, right.having_filter]),
            }
        }
        FilterExpression::Or(l, r) => {
            let left = split(l, table);
            let right = split(r, table);
            match (left, right) {
                (
                    FilterSplit {
                        where_filter: Some(lw),
                        having_filter: None,
                    },
                    FilterSplit {
                        where_filter: Some(rw),
                        having_filter: None,
                    },
                ) => FilterSplit::pure_where(FilterExpression::or(lw, rw)),
                _ => FilterSplit::pure_having(expression.clone()),
            }
        }
        FilterExpression::Not(_) => split(&normalize(expression), table),
    }
}

fn is_having_predicate(predicate: &FilterPredicate, table: &Table) -> bool {
    predicate
        .path
        .last()
        .is_some_and(|e| e.entity_type == table.entity_type && table.is_metric(&e.field_name))
}
