//! Entity projections.
//!
//! An [`EntityProjection`] says what to fetch for one type at one position in
//! the relationship graph: which attributes, which nested relationships, and
//! the filter, sort and page window scoped to it. Projections are built by
//! value, children first, and never mutated after construction except for the
//! page total count the execution layer reports back.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dictionary::{AttributeType, EntityType};
use crate::filter::FilterExpression;
use crate::pagination::Pagination;
use crate::sorting::Sorting;

/// A named argument bound to an attribute, column or table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Argument {
    pub name: String,
    pub value: String,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A scalar field to materialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub alias: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, Argument>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            attr_type,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let argument = Argument::new(name, value);
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.get(name)
    }
}

/// A nested projection reached through a named relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub name: String,
    pub alias: String,
    pub projection: EntityProjection,
}

impl Relationship {
    pub fn new(name: impl Into<String>, projection: EntityProjection) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            projection,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Same relationship with both projections merged.
    pub fn merge(&self, other: &Relationship) -> Relationship {
        Relationship {
            name: self.name.clone(),
            alias: self.alias.clone(),
            projection: self.projection.merge(&other.projection),
        }
    }
}

/// What to fetch for one type, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityProjection {
    #[serde(rename = "type")]
    entity_type: EntityType,
    attributes: IndexMap<String, Attribute>,
    relationships: IndexMap<String, Relationship>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sorting: Option<Sorting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
}

impl EntityProjection {
    /// An empty projection of `entity_type`.
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
            filter: None,
            sorting: None,
            pagination: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.entry(attribute.name.clone()).or_insert(attribute);
        self
    }

    pub fn with_attributes<I: IntoIterator<Item = Attribute>>(self, attributes: I) -> Self {
        attributes.into_iter().fold(self, Self::with_attribute)
    }

    /// Attach a relationship, merging with one already present under the same alias.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        let merged = match self.relationships.get(&relationship.alias) {
            Some(existing) => existing.merge(&relationship),
            None => relationship,
        };
        self.relationships.insert(merged.alias.clone(), merged);
        self
    }

    pub fn with_relationships<I: IntoIterator<Item = Relationship>>(self, relationships: I) -> Self {
        relationships.into_iter().fold(self, Self::with_relationship)
    }

    pub fn with_filter(mut self, filter: Option<FilterExpression>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sorting(mut self, sorting: Option<Sorting>) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn with_pagination(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    pub fn relationship(&self, alias: &str) -> Option<&Relationship> {
        self.relationships.get(alias)
    }

    pub fn relationship_aliases(&self) -> Vec<&str> {
        self.relationships.keys().map(String::as_str).collect()
    }

    pub fn filter(&self) -> Option<&FilterExpression> {
        self.filter.as_ref()
    }

    pub fn sorting(&self) -> Option<&Sorting> {
        self.sorting.as_ref()
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    /// Report the total record count after execution.
    pub fn set_page_totals(&mut self, totals: u64) {
        if let Some(pagination) = self.pagination.as_mut() {
            pagination.set_page_totals(totals);
        }
    }

    /// Combine two projections of the same type.
    ///
    /// Attributes and relationships are unioned (relationships present on
    /// both sides merge recursively). Differing filters are AND-ed as a
    /// sorted, de-duplicated set of conjuncts, so the result does not depend
    /// on merge order. Sorting and pagination keep the first one present.
    pub fn merge(&self, other: &EntityProjection) -> EntityProjection {
        let mut merged = self.clone();
        for attribute in other.attributes.values() {
            merged = merged.with_attribute(attribute.clone());
        }
        for relationship in other.relationships.values() {
            merged = merged.with_relationship(relationship.clone());
        }
        merged.filter = merge_filters(self.filter.as_ref(), other.filter.as_ref());
        merged.sorting = self.sorting.clone().or_else(|| other.sorting.clone());
        merged.pagination = self.pagination.clone().or_else(|| other.pagination.clone());
        merged
    }
}

fn merge_filters(left: Option<&FilterExpression>, right: Option<&FilterExpression>) -> Option<FilterExpression> {
    match (left, right) {
        (None, None) => None,
        (Some(one), None) | (None, Some(one)) => Some(one.clone()),
        (Some(l), Some(r)) if l == r => Some(l.clone()),
        (Some(l), Some(r)) => {
            let mut conjuncts: Vec<&FilterExpression> = l.conjuncts();
            conjuncts.extend(r.conjuncts());
            conjuncts.sort_by_cached_key(|e| e.to_string());
            conjuncts.dedup();
            FilterExpression::and_all(conjuncts.into_iter().cloned().map(Some))
        }
    }
}

/// A child projection paired with the name its parent should file it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntityProjection {
    pub name: String,
    pub projection: EntityProjection,
}

impl NamedEntityProjection {
    pub fn new(name: impl Into<String>, projection: EntityProjection) -> Self {
        Self {
            name: name.into(),
            projection,
        }
    }

    pub fn into_relationship(self) -> Relationship {
        Relationship::new(self.name, self.projection)
    }
}
