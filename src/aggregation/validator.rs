//! Structural checks on analytic queries.

use std::collections::BTreeMap;

use super::metadata::{Column, ValueType};
use super::query::Query;
use crate::error::{RequestError, RequestResult};
use crate::filter::visitor::predicates;
use crate::filter::FilterPredicate;
use crate::path::Path;
use crate::projection::Argument;

const REGULAR_ID_NAME: &str = "id";

/// Rejects queries that cannot be executed.
///
/// Every check is a pure function of the query. [`QueryValidator::validate`]
/// runs them all and stops at the first failure.
pub trait QueryValidator {
    fn validate(&self, query: &Query<'_>) -> RequestResult<()> {
        self.validate_projected_columns(query)?;
        self.validate_where_clause(query)?;
        self.validate_having_clause(query)?;
        self.validate_sorting(query)?;
        self.validate_query_arguments(query)
    }

    fn validate_projected_columns(&self, query: &Query<'_>) -> RequestResult<()>;

    fn validate_where_clause(&self, query: &Query<'_>) -> RequestResult<()>;

    fn validate_having_clause(&self, query: &Query<'_>) -> RequestResult<()>;

    fn validate_sorting(&self, query: &Query<'_>) -> RequestResult<()>;

    fn validate_query_arguments(&self, query: &Query<'_>) -> RequestResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryValidator;

impl QueryValidator for DefaultQueryValidator {
    fn validate_projected_columns(&self, query: &Query<'_>) -> RequestResult<()> {
        let only_id = query
            .column_projections()
            .all(|column| column.value_type == ValueType::Id);
        if only_id {
            return Err(RequestError::invalid_operation("Cannot query a table only by ID"));
        }

        for projection in query.column_projections() {
            if let Some(column) = query.table.column(&projection.name) {
                check_column_arguments(column, &projection.arguments)?;
            }
        }
        Ok(())
    }

    fn validate_where_clause(&self, query: &Query<'_>) -> RequestResult<()> {
        let Some(where_filter) = &query.where_filter else {
            return Ok(());
        };

        for predicate in predicates(where_filter) {
            single_hop(&predicate.path)?;
            let Some(column) = query.table.column(predicate.field_name()) else {
                continue;
            };
            check_column_arguments(column, &last_arguments(predicate))?;
            check_column_values(column, predicate)?;
        }
        Ok(())
    }

    fn validate_having_clause(&self, query: &Query<'_>) -> RequestResult<()> {
        let Some(having_filter) = &query.having_filter else {
            return Ok(());
        };

        for predicate in predicates(having_filter) {
            single_hop(&predicate.path)?;
            let field = predicate.field_name();
            let arguments = last_arguments(predicate);
            let Some(column) = query.table.column(field) else {
                continue;
            };

            if column.is_metric() {
                match query.metric(field) {
                    None => {
                        return Err(RequestError::invalid_operation(format!(
                            "Post aggregation filtering on '{}' requires the field to be projected in the response",
                            field
                        )))
                    }
                    Some(metric) if metric.arguments != arguments => return Err(unmatched_arguments(field)),
                    Some(_) => {}
                }
            } else if column.is_time_dimension() {
                let Some(projected) = query.time_dimension(field) else {
                    return Err(ungrouped(field));
                };
                let grain = projected.grain.as_str();
                if !arguments.values().any(|argument| argument.value == grain) {
                    return Err(RequestError::invalid_operation(format!(
                        "Time Dimension field {} must use the same grain argument in the projection and the having clause.",
                        field
                    )));
                }
            } else {
                match query.dimensions.iter().find(|d| d.alias == field) {
                    None => return Err(ungrouped(field)),
                    Some(dimension) if dimension.arguments != arguments => {
                        return Err(unmatched_arguments(field));
                    }
                    Some(_) => {}
                }
            }

            check_column_arguments(column, &arguments)?;
        }
        Ok(())
    }

    fn validate_sorting(&self, query: &Query<'_>) -> RequestResult<()> {
        let Some(sorting) = &query.sorting else {
            return Ok(());
        };

        let projected: Vec<&str> = query.column_projections().map(|c| c.alias.as_str()).collect();
        for (path, _) in &sorting.rules {
            single_hop(path)?;
            let Some(element) = path.first() else {
                continue;
            };
            let field = element.alias.as_str();
            if !projected.contains(&field) {
                return Err(RequestError::invalid_operation(format!(
                    "Can not sort on {} as it is not present in query",
                    field
                )));
            }
            if query.table.is_id_field(field) || field == REGULAR_ID_NAME {
                return Err(RequestError::invalid_operation("Sorting on id field is not permitted"));
            }
        }
        Ok(())
    }

    fn validate_query_arguments(&self, query: &Query<'_>) -> RequestResult<()> {
        let context = format!("table '{}'", query.table.name());
        for definition in &query.table.arguments {
            definition.check(query.arguments.get(&definition.name), &context)?;
        }
        Ok(())
    }
}

fn single_hop(path: &Path) -> RequestResult<()> {
    if path.len() > 1 {
        return Err(RequestError::invalid_operation(
            "Relationship traversal not supported for analytic queries.",
        ));
    }
    Ok(())
}

fn ungrouped(field: &str) -> RequestError {
    RequestError::invalid_operation(format!(
        "Dimension field {} must be grouped before filtering in having clause.",
        field
    ))
}

fn unmatched_arguments(field: &str) -> RequestError {
    RequestError::invalid_operation(format!(
        "Post aggregation filtering on '{}' requires the field to be projected in the response with matching arguments",
        field
    ))
}

fn last_arguments(predicate: &FilterPredicate) -> BTreeMap<String, Argument> {
    predicate
        .path
        .last()
        .map(|e| e.arguments.clone())
        .unwrap_or_default()
}

fn check_column_arguments(column: &Column, arguments: &BTreeMap<String, Argument>) -> RequestResult<()> {
    let context = format!("column '{}'", column.name);
    for definition in &column.arguments {
        definition.check(arguments.get(&definition.name), &context)?;
    }
    Ok(())
}

/// Columns with an allow-list only accept those values in WHERE.
fn check_column_values(column: &Column, predicate: &FilterPredicate) -> RequestResult<()> {
    if column.values.is_empty() {
        return Ok(());
    }
    if predicate.values.iter().all(|v| column.values.contains(v)) {
        return Ok(());
    }
    Err(RequestError::invalid_operation(format!(
        "Column '{}' values must match one of these values: [{}]",
        column.name,
        column.values.join(", ")
    )))
}
