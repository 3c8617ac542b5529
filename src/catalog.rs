//! Model file loading.
//!
//! A model file declares plain entities and analytic tables in TOML. Tables
//! are registered in the dictionary as root entities too, so the projection
//! builder can address them like any other collection:
//!
//! ```toml
//! [[entity]]
//! name = "book"
//! root = true
//! load_filter = "deleted==false"
//! attributes = [{ name = "title", type = "text" }]
//! relationships = [{ name = "authors", target = "author", to_many = true }]
//!
//! [[table]]
//! name = "playerStats"
//! require_filter = "countryIsoCode=={{code}}"
//! dimensions = [{ name = "countryIsoCode", type = "text", values = ["HKG", "USA"] }]
//! time_dimensions = [{ name = "recordedDate", grains = ["day", "month"] }]
//! metrics = [{ name = "highScore", type = "integer" }]
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::aggregation::{ArgumentDef, Column, RequiredFilter, Table, TimeGrain, ValueType};
use crate::dictionary::{AttributeType, DictionaryError, EntityBinding, EntityDictionary, EntityType};
use crate::filter::dialect::{FilterParseError, RsqlDialect};
use crate::filter::resolver::DefaultFilterResolver;
use crate::filter::FilterExpression;

/// Error type for model loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read model file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse model file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error("Invalid filter on '{owner}': {source}")]
    Filter {
        owner: String,
        #[source]
        source: FilterParseError,
    },
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelFile {
    #[serde(rename = "entity")]
    entities: Vec<EntityDef>,
    #[serde(rename = "table")]
    tables: Vec<TableDef>,
}

#[derive(Debug, Deserialize)]
struct EntityDef {
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    root: bool,
    #[serde(default = "default_id")]
    id: Option<String>,
    #[serde(default)]
    load_filter: Option<String>,
    #[serde(default)]
    attributes: Vec<AttributeDef>,
    #[serde(default)]
    relationships: Vec<RelationshipDef>,
}

#[derive(Debug, Deserialize)]
struct AttributeDef {
    name: String,
    #[serde(default, rename = "type")]
    attr_type: AttributeType,
}

#[derive(Debug, Deserialize)]
struct RelationshipDef {
    name: String,
    target: String,
    #[serde(default)]
    to_many: bool,
}

#[derive(Debug, Deserialize)]
struct TableDef {
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    require_filter: Option<String>,
    #[serde(default)]
    arguments: Vec<ArgumentDef>,
    #[serde(default)]
    dimensions: Vec<DimensionDef>,
    #[serde(default)]
    time_dimensions: Vec<TimeDimensionDef>,
    #[serde(default)]
    metrics: Vec<MetricDef>,
}

#[derive(Debug, Deserialize)]
struct DimensionDef {
    name: String,
    #[serde(default, rename = "type")]
    value_type: ValueType,
    /// Exposes the dimension as a to-one relationship.
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    arguments: Vec<ArgumentDef>,
    #[serde(default)]
    require_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeDimensionDef {
    name: String,
    grains: Vec<TimeGrain>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    arguments: Vec<ArgumentDef>,
    #[serde(default)]
    require_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetricDef {
    name: String,
    #[serde(default = "default_metric_type", rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    arguments: Vec<ArgumentDef>,
    #[serde(default)]
    require_filter: Option<String>,
}

fn default_id() -> Option<String> {
    Some("id".to_string())
}

fn default_metric_type() -> ValueType {
    ValueType::Decimal
}

// ============================================================================
// Catalog
// ============================================================================

/// Entities and analytic tables loaded from a model file.
#[derive(Debug, Clone)]
pub struct Catalog {
    dictionary: EntityDictionary,
    tables: IndexMap<EntityType, Table>,
    load_filters: IndexMap<EntityType, FilterExpression>,
}

impl Catalog {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            entities = catalog.dictionary.bindings().count(),
            tables = catalog.tables.len(),
            "loaded model"
        );
        Ok(catalog)
    }

    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let model: ModelFile = toml::from_str(content)?;

        let mut builder = EntityDictionary::builder();
        for entity in &model.entities {
            builder = builder.entity(entity_binding(entity));
        }
        for table in &model.tables {
            builder = builder.entity(table_binding(table));
        }
        let dictionary = builder.build()?;

        // Filters can only be resolved once every type is registered.
        let dialect = RsqlDialect::new(&dictionary);
        let mut load_filters = IndexMap::new();
        for entity in &model.entities {
            if let Some(text) = &entity.load_filter {
                let ty = EntityType::new(&entity.name);
                let expression = parse_filter(&dialect, &ty, text, &entity.name)?;
                load_filters.insert(ty, expression);
            }
        }

        let mut tables = IndexMap::new();
        for def in &model.tables {
            let table = build_table(&dialect, def)?;
            tables.insert(table.entity_type.clone(), table);
        }

        Ok(Self {
            dictionary,
            tables,
            load_filters,
        })
    }

    pub fn dictionary(&self) -> &EntityDictionary {
        &self.dictionary
    }

    pub fn table(&self, ty: &EntityType) -> Option<&Table> {
        self.tables.get(ty)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn load_filters(&self) -> &IndexMap<EntityType, FilterExpression> {
        &self.load_filters
    }

    /// A filter resolver over this catalog's dictionary and load filters.
    pub fn filter_resolver(&self) -> DefaultFilterResolver<'_> {
        DefaultFilterResolver::new(&self.dictionary).with_load_filters(self.load_filters.clone())
    }
}

fn entity_binding(def: &EntityDef) -> EntityBinding {
    let mut binding = EntityBinding::new(&def.name).with_id_field(def.id.clone());
    if def.root {
        binding = binding.root();
    }
    if let Some(alias) = &def.alias {
        binding = binding.with_alias(alias);
    }
    if let Some(version) = &def.api_version {
        binding = binding.with_api_version(version);
    }
    for attribute in &def.attributes {
        binding = binding.attribute(&attribute.name, attribute.attr_type);
    }
    for relationship in &def.relationships {
        binding = if relationship.to_many {
            binding.to_many(&relationship.name, &relationship.target)
        } else {
            binding.to_one(&relationship.name, &relationship.target)
        };
    }
    binding
}

/// Tables are root entities whose attributes are their columns.
fn table_binding(def: &TableDef) -> EntityBinding {
    let mut binding = EntityBinding::new(&def.name).root().with_id_field(def.id.clone());
    if let Some(alias) = &def.alias {
        binding = binding.with_alias(alias);
    }
    if let Some(id) = &def.id {
        binding = binding.attribute(id, AttributeType::Id);
    }
    for dimension in &def.dimensions {
        binding = match &dimension.target {
            Some(target) => binding.to_one(&dimension.name, target),
            None => binding.attribute(&dimension.name, dimension.value_type.attribute_type()),
        };
    }
    for time_dimension in &def.time_dimensions {
        binding = binding.attribute(&time_dimension.name, AttributeType::Time);
    }
    for metric in &def.metrics {
        binding = binding.attribute(&metric.name, metric.value_type.attribute_type());
    }
    binding
}

fn build_table(dialect: &RsqlDialect<'_>, def: &TableDef) -> Result<Table, CatalogError> {
    let ty = EntityType::new(&def.name);
    let mut table = Table::new(&def.name);
    if let Some(id) = &def.id {
        table = table.with_id_field(id);
    }
    for argument in &def.arguments {
        table = table.with_argument(argument.clone());
    }
    if let Some(template) = &def.require_filter {
        table = table.with_require_filter(required_filter(dialect, &ty, template, &def.name)?);
    }

    for dimension in &def.dimensions {
        let column = match &dimension.target {
            Some(target) => Column::relationship(&dimension.name, EntityType::new(target)),
            None => Column::dimension(&dimension.name, dimension.value_type).with_values(dimension.values.clone()),
        };
        let column = finish_column(dialect, &ty, column, &dimension.arguments, dimension.require_filter.as_deref())?;
        table = table.with_column(column);
    }

    for time_dimension in &def.time_dimensions {
        let mut column = Column::time_dimension(&time_dimension.name, time_dimension.grains.clone());
        if let Some(zone) = &time_dimension.timezone {
            column = column.with_timezone(zone);
        }
        let column = finish_column(
            dialect,
            &ty,
            column,
            &time_dimension.arguments,
            time_dimension.require_filter.as_deref(),
        )?;
        table = table.with_column(column);
    }

    for metric in &def.metrics {
        let column = Column::metric(&metric.name, metric.value_type);
        let column = finish_column(dialect, &ty, column, &metric.arguments, metric.require_filter.as_deref())?;
        table = table.with_column(column);
    }

    tracing::debug!(table = %def.name, columns = table.columns.len(), "registered analytic table");
    Ok(table)
}

fn finish_column(
    dialect: &RsqlDialect<'_>,
    ty: &EntityType,
    mut column: Column,
    arguments: &[ArgumentDef],
    require_filter: Option<&str>,
) -> Result<Column, CatalogError> {
    for argument in arguments {
        column = column.with_argument(argument.clone());
    }
    if let Some(template) = require_filter {
        let owner = format!("{}.{}", ty, column.name);
        column = column.with_require_filter(required_filter(dialect, ty, template, &owner)?);
    }
    Ok(column)
}

fn required_filter(
    dialect: &RsqlDialect<'_>,
    ty: &EntityType,
    template: &str,
    owner: &str,
) -> Result<RequiredFilter, CatalogError> {
    let expression = parse_filter(dialect, ty, template, owner)?;
    Ok(RequiredFilter::new(template, expression))
}

fn parse_filter(
    dialect: &RsqlDialect<'_>,
    ty: &EntityType,
    text: &str,
    owner: &str,
) -> Result<FilterExpression, CatalogError> {
    dialect.parse(ty, text).map_err(|source| CatalogError::Filter {
        owner: owner.to_string(),
        source,
    })
}
