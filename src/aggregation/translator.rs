//! Entity projection to analytic query translation.

use std::collections::BTreeMap;
use tracing::instrument;

use super::metadata::{Column, RequiredFilter, Table, TimeGrain};
use super::query::{ColumnProjection, Query, TimeDimensionProjection, GRAIN_ARGUMENT};
use super::split::split_filter;
use super::template::match_template;
use super::validator::QueryValidator;
use crate::error::{RequestError, RequestResult};
use crate::filter::visitor::predicates;
use crate::filter::FilterExpression;
use crate::projection::{Argument, EntityProjection};
use crate::request::RequestContext;

/// Turns entity projections over analytic tables into validated queries.
pub struct QueryTranslator<'a> {
    validator: &'a dyn QueryValidator,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(validator: &'a dyn QueryValidator) -> Self {
        Self { validator }
    }

    /// Build and validate the query for `projection` against `table`.
    #[instrument(name = "translate", skip_all, fields(table = %table.name()))]
    pub fn translate<'t>(
        &self,
        table: &'t Table,
        projection: &EntityProjection,
        ctx: &RequestContext,
    ) -> RequestResult<Query<'t>> {
        if projection.entity_type() != &table.entity_type {
            return Err(RequestError::invalid_operation(format!(
                "Queried table is not analyticView: {}",
                projection.entity_type()
            )));
        }

        let mut query = Query::new(table);
        query.time_dimensions = resolve_time_dimensions(table, projection)?;
        query.dimensions = resolve_dimensions(table, projection);
        query.metrics = resolve_metrics(table, projection);

        if let Some(filter) = projection.filter() {
            let split = split_filter(filter, table);
            query.where_filter = split.where_filter;
            query.having_filter = split.having_filter;
        }
        backfill_having_metrics(table, &mut query);

        query.arguments = ctx.table_arguments().clone();
        query.arguments.extend(required_filter_arguments(table, &query)?);

        query.sorting = projection.sorting().cloned();
        query.pagination = projection.pagination().map(|p| p.snapshot());
        query.bypass_cache = ctx.bypass_cache();

        self.validator.validate(&query)?;
        tracing::debug!(
            metrics = query.metrics.len(),
            dimensions = query.dimensions.len(),
            time_dimensions = query.time_dimensions.len(),
            "translated analytic query"
        );
        Ok(query)
    }
}

fn resolve_time_dimensions(table: &Table, projection: &EntityProjection) -> RequestResult<Vec<TimeDimensionProjection>> {
    projection
        .attributes()
        .filter_map(|attribute| table.time_dimension(&attribute.name).map(|column| (attribute, column)))
        .map(|(attribute, column)| {
            let grain = resolve_grain(column, attribute.argument(GRAIN_ARGUMENT))?;
            let arguments = attribute
                .arguments
                .iter()
                .filter(|(name, _)| *name != GRAIN_ARGUMENT)
                .map(|(name, argument)| (name.clone(), argument.clone()))
                .collect();
            let projected =
                ColumnProjection::new(&column.name, &attribute.alias, column.value_type).with_arguments(arguments);
            Ok(TimeDimensionProjection::new(projected, grain))
        })
        .collect()
}

/// The requested grain, or the first one declared.
fn resolve_grain(column: &Column, requested: Option<&Argument>) -> RequestResult<TimeGrain> {
    let grains = column.grains();
    match requested {
        None => grains.first().copied().ok_or_else(|| {
            RequestError::invalid_operation(format!("Requested default grain, no grain defined on {}", column.name))
        }),
        Some(argument) => grains
            .iter()
            .copied()
            .find(|grain| grain.as_str().eq_ignore_ascii_case(&argument.value))
            .ok_or_else(|| {
                RequestError::invalid_operation(format!(
                    "Unsupported grain {} for field {}",
                    argument.value, column.name
                ))
            }),
    }
}

/// Plain dimensions from attributes, then from relationships.
fn resolve_dimensions(table: &Table, projection: &EntityProjection) -> Vec<ColumnProjection> {
    let from_attributes = projection.attributes().filter_map(|attribute| {
        table.dimension(&attribute.name).map(|column| {
            ColumnProjection::new(&column.name, &attribute.alias, column.value_type)
                .with_arguments(attribute.arguments.clone())
        })
    });
    let from_relationships = projection.relationships().filter_map(|relationship| {
        table
            .dimension(&relationship.name)
            .map(|column| ColumnProjection::new(&column.name, &relationship.alias, column.value_type))
    });

    let mut dimensions: Vec<ColumnProjection> = Vec::new();
    for dimension in from_attributes.chain(from_relationships) {
        if !dimensions.iter().any(|d| d.alias == dimension.alias) {
            dimensions.push(dimension);
        }
    }
    dimensions
}

fn resolve_metrics(table: &Table, projection: &EntityProjection) -> Vec<ColumnProjection> {
    projection
        .attributes()
        .filter_map(|attribute| {
            table.metric(&attribute.name).map(|column| {
                ColumnProjection::new(&column.name, &attribute.alias, column.value_type)
                    .with_arguments(attribute.arguments.clone())
            })
        })
        .collect()
}

/// Metrics filtered on in HAVING are computed even when not requested.
fn backfill_having_metrics(table: &Table, query: &mut Query<'_>) {
    let Some(having) = &query.having_filter else {
        return;
    };
    let mut missing: Vec<ColumnProjection> = Vec::new();
    for predicate in predicates(having) {
        let Some(column) = table.metric(predicate.field_name()) else {
            continue;
        };
        // HAVING fields resolve by alias.
        let alias = predicate.field_name();
        let known = query.metrics.iter().chain(missing.iter()).any(|m| m.alias == alias);
        if !known {
            let arguments = predicate.path.last().map(|e| e.arguments.clone()).unwrap_or_default();
            missing.push(ColumnProjection::new(&column.name, alias, column.value_type).with_arguments(arguments));
        }
    }
    if !missing.is_empty() {
        tracing::debug!(metrics = ?missing.iter().map(|m| &m.name).collect::<Vec<_>>(), "adding metrics referenced in HAVING");
    }
    query.metrics.extend(missing);
}

/// Check table and column filter templates against the WHERE clause and
/// collect the template variables they bind.
fn required_filter_arguments(table: &Table, query: &Query<'_>) -> RequestResult<BTreeMap<String, Argument>> {
    let mut arguments = BTreeMap::new();

    if let Some(required) = &table.require_filter {
        arguments.extend(check_template(required, query.where_filter.as_ref(), table.name())?);
    }

    for projected in query.column_projections() {
        let Some(required) = table.column(&projected.name).and_then(|c| c.require_filter.as_ref()) else {
            continue;
        };
        arguments.extend(check_template(required, query.where_filter.as_ref(), &projected.name)?);
    }
    Ok(arguments)
}

fn check_template(
    required: &RequiredFilter,
    filter: Option<&FilterExpression>,
    target: &str,
) -> RequestResult<BTreeMap<String, Argument>> {
    match_template(&required.expression, filter).ok_or_else(|| {
        RequestError::bad_request(format!(
            "Querying {} requires a mandatory filter: {}",
            target, required.template
        ))
    })
}
