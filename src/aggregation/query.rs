//! Analytic query model.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::cache_key;
use super::metadata::{Table, TimeGrain, ValueType};
use crate::filter::FilterExpression;
use crate::pagination::PageSnapshot;
use crate::projection::Argument;
use crate::sorting::Sorting;

pub const GRAIN_ARGUMENT: &str = "grain";

/// A column requested by the client, under the alias it asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProjection {
    pub name: String,
    pub alias: String,
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, Argument>,
}

impl ColumnProjection {
    pub fn new(name: impl Into<String>, alias: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            value_type,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: BTreeMap<String, Argument>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// A time dimension truncated to a grain.
///
/// The resolved grain is also recorded as the `grain` argument of the column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeDimensionProjection {
    #[serde(flatten)]
    pub column: ColumnProjection,
    pub grain: TimeGrain,
}

impl TimeDimensionProjection {
    pub fn new(mut column: ColumnProjection, grain: TimeGrain) -> Self {
        column
            .arguments
            .insert(GRAIN_ARGUMENT.to_string(), Argument::new(GRAIN_ARGUMENT, grain.as_str()));
        Self { column, grain }
    }

    pub fn alias(&self) -> &str {
        &self.column.alias
    }
}

/// A grouped, filtered query over one analytic table.
#[derive(Debug, Clone, Serialize)]
pub struct Query<'a> {
    #[serde(serialize_with = "table_name")]
    pub table: &'a Table,
    pub metrics: Vec<ColumnProjection>,
    pub dimensions: Vec<ColumnProjection>,
    pub time_dimensions: Vec<TimeDimensionProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub having_filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageSnapshot>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, Argument>,
    pub bypass_cache: bool,
}

fn table_name<S: Serializer>(table: &&Table, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(table.name())
}

impl<'a> Query<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            metrics: Vec::new(),
            dimensions: Vec::new(),
            time_dimensions: Vec::new(),
            where_filter: None,
            having_filter: None,
            sorting: None,
            pagination: None,
            arguments: BTreeMap::new(),
            bypass_cache: false,
        }
    }

    /// Every projected column: metrics, then dimensions, then time dimensions.
    pub fn column_projections(&self) -> impl Iterator<Item = &ColumnProjection> {
        self.metrics
            .iter()
            .chain(self.dimensions.iter())
            .chain(self.time_dimensions.iter().map(|t| &t.column))
    }

    /// Grouping columns, plain and time.
    pub fn dimension_projections(&self) -> impl Iterator<Item = &ColumnProjection> {
        self.dimensions
            .iter()
            .chain(self.time_dimensions.iter().map(|t| &t.column))
    }

    pub fn metric(&self, alias: &str) -> Option<&ColumnProjection> {
        self.metrics.iter().find(|m| m.alias == alias)
    }

    pub fn time_dimension(&self, alias: &str) -> Option<&TimeDimensionProjection> {
        self.time_dimensions.iter().find(|t| t.alias() == alias)
    }

    /// Deterministic text identifying the query's result set.
    pub fn cache_key(&self) -> String {
        cache_key::extract_key(self)
    }

    /// SHA-256 of [`Query::cache_key`], hex encoded.
    pub fn cache_key_digest(&self) -> String {
        cache_key::compute_hash(&self.cache_key())
    }
}
