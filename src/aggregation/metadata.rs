//! Analytic table metadata.
//!
//! A [`Table`] declares which of its fields are dimensions, time dimensions and
//! metrics, plus the arguments it and its columns accept. Tables are built
//! once at startup (usually by the catalog) and only read afterwards.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::dictionary::{AttributeType, EntityType};
use crate::error::{RequestError, RequestResult};
use crate::filter::FilterExpression;
use crate::projection::Argument;

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}(-\d{2}(-\d{2}(T\d{2}(:\d{2}(:\d{2}(\.\d+)?)?)?(Z|[+-]\d{2}:?\d{2})?)?)?)?$").unwrap()
});
static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+$").unwrap());
static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap());
static BOOLEAN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(true|false|1|0)$").unwrap());
static TEXT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());
static COORDINATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?(\s*,\s*-?\d+(\.\d+)?)?$").unwrap());
static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

/// Value type of a column or argument, with the format its values must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Time,
    Integer,
    Decimal,
    Money,
    Boolean,
    #[default]
    Text,
    Coordinate,
    Id,
}

impl ValueType {
    /// Whether `value` is a well formed literal of this type.
    ///
    /// None of the accepted formats can carry quotes, semicolons or comment
    /// markers, so matched values are safe to splice into generated SQL.
    pub fn matches(self, value: &str) -> bool {
        let pattern: &Regex = match self {
            ValueType::Time => &TIME_PATTERN,
            ValueType::Integer => &INTEGER_PATTERN,
            ValueType::Decimal | ValueType::Money => &DECIMAL_PATTERN,
            ValueType::Boolean => &BOOLEAN_PATTERN,
            ValueType::Text => &TEXT_PATTERN,
            ValueType::Coordinate => &COORDINATE_PATTERN,
            ValueType::Id => &ID_PATTERN,
        };
        pattern.is_match(value)
    }

    /// The entity attribute type used when a table is exposed as an entity.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            ValueType::Time => AttributeType::Time,
            ValueType::Integer => AttributeType::Integer,
            ValueType::Decimal => AttributeType::Decimal,
            ValueType::Money => AttributeType::Money,
            ValueType::Boolean => AttributeType::Boolean,
            ValueType::Text => AttributeType::Text,
            ValueType::Coordinate => AttributeType::Coordinate,
            ValueType::Id => AttributeType::Id,
        }
    }
}

/// Truncation applied to a time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrain {
    Second,
    Minute,
    Hour,
    Day,
    IsoWeek,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeGrain {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeGrain::Second => "second",
            TimeGrain::Minute => "minute",
            TimeGrain::Hour => "hour",
            TimeGrain::Day => "day",
            TimeGrain::IsoWeek => "isoweek",
            TimeGrain::Week => "week",
            TimeGrain::Month => "month",
            TimeGrain::Quarter => "quarter",
            TimeGrain::Year => "year",
        }
    }
}

impl fmt::Display for TimeGrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared table or column argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    /// Allow-list. When non-empty, it replaces the type format check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            values: Vec::new(),
            default: None,
            required: false,
        }
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Required and nothing to fall back on.
    pub fn is_required(&self) -> bool {
        self.required && self.default.is_none()
    }

    /// Check a client supplied value. `context` reads like `table 'x'` or `column 'y'`.
    pub fn check(&self, client: Option<&Argument>, context: &str) -> RequestResult<()> {
        let Some(client) = client else {
            if self.is_required() {
                return Err(RequestError::invalid_operation(format!(
                    "Argument '{}' for {} is required",
                    self.name, context
                )));
            }
            return Ok(());
        };

        if !self.values.is_empty() {
            if !self.values.contains(&client.value) {
                return Err(RequestError::invalid_operation(format!(
                    "Argument '{}' for {} must match one of these values: [{}]",
                    self.name,
                    context,
                    self.values.join(", ")
                )));
            }
            return Ok(());
        }

        if !self.value_type.matches(&client.value) {
            return Err(RequestError::invalid_operation(format!(
                "Argument '{}' for {} has an invalid value: {}",
                self.name, context, client.value
            )));
        }
        Ok(())
    }
}

/// A filter every query must carry, written as an RSQL template such as
/// `countryIsoCode=={{code}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredFilter {
    pub template: String,
    #[serde(skip)]
    pub expression: FilterExpression,
}

impl RequiredFilter {
    pub fn new(template: impl Into<String>, expression: FilterExpression) -> Self {
        Self {
            template: template.into(),
            expression,
        }
    }
}

/// What a column contributes to a grouped query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Dimension {
        /// Set when the dimension is exposed as a relationship to another type.
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<EntityType>,
    },
    TimeDimension {
        grains: Vec<TimeGrain>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },
    Metric,
}

/// A column of an analytic table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_filter: Option<RequiredFilter>,
}

impl Column {
    fn new(name: impl Into<String>, kind: ColumnKind, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind,
            value_type,
            values: Vec::new(),
            arguments: Vec::new(),
            require_filter: None,
        }
    }

    pub fn dimension(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ColumnKind::Dimension { target: None }, value_type)
    }

    /// A dimension that doubles as a to-one relationship.
    pub fn relationship(name: impl Into<String>, target: EntityType) -> Self {
        Self::new(
            name,
            ColumnKind::Dimension {
                target: Some(target),
            },
            ValueType::Text,
        )
    }

    pub fn time_dimension(name: impl Into<String>, grains: Vec<TimeGrain>) -> Self {
        Self::new(
            name,
            ColumnKind::TimeDimension {
                grains,
                timezone: None,
            },
            ValueType::Time,
        )
    }

    pub fn metric(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ColumnKind::Metric, value_type)
    }

    pub fn with_timezone(mut self, zone: impl Into<String>) -> Self {
        if let ColumnKind::TimeDimension { timezone, .. } = &mut self.kind {
            *timezone = Some(zone.into());
        }
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_require_filter(mut self, filter: RequiredFilter) -> Self {
        self.require_filter = Some(filter);
        self
    }

    pub fn is_metric(&self) -> bool {
        matches!(self.kind, ColumnKind::Metric)
    }

    pub fn is_time_dimension(&self) -> bool {
        matches!(self.kind, ColumnKind::TimeDimension { .. })
    }

    pub fn is_dimension(&self) -> bool {
        matches!(self.kind, ColumnKind::Dimension { .. })
    }

    /// Supported grains, first one is the default. Empty for other kinds.
    pub fn grains(&self) -> &[TimeGrain] {
        match &self.kind {
            ColumnKind::TimeDimension { grains, .. } => grains,
            _ => &[],
        }
    }

    pub fn relationship_target(&self) -> Option<&EntityType> {
        match &self.kind {
            ColumnKind::Dimension { target } => target.as_ref(),
            _ => None,
        }
    }
}

/// An analytic table: the source of grouped queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
    pub columns: IndexMap<String, Column>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_filter: Option<RequiredFilter>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::new(name),
            id_field: None,
            columns: IndexMap::new(),
            arguments: Vec::new(),
            require_filter: None,
        }
    }

    pub fn name(&self) -> &str {
        self.entity_type.name()
    }

    /// Declare an identifier column. It is stored as an `Id` typed dimension.
    pub fn with_id_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.columns
            .insert(name.clone(), Column::dimension(name.clone(), ValueType::Id));
        self.id_field = Some(name);
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_require_filter(mut self, filter: RequiredFilter) -> Self {
        self.require_filter = Some(filter);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// A non-time dimension.
    pub fn dimension(&self, name: &str) -> Option<&Column> {
        self.column(name).filter(|c| c.is_dimension())
    }

    pub fn time_dimension(&self, name: &str) -> Option<&Column> {
        self.column(name).filter(|c| c.is_time_dimension())
    }

    pub fn metric(&self, name: &str) -> Option<&Column> {
        self.column(name).filter(|c| c.is_metric())
    }

    pub fn is_metric(&self, name: &str) -> bool {
        self.metric(name).is_some()
    }

    pub fn is_id_field(&self, name: &str) -> bool {
        self.id_field.as_deref() == Some(name)
    }
}
