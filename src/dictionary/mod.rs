//! Entity metadata lookups.
//!
//! The projection builder never inspects entity definitions directly. It asks
//! an [`EntityMetadata`] implementation whether a name is a relation, what a
//! relation points at, which attributes a type declares, and so on. The
//! provider is populated once at startup and only read afterwards, so
//! implementations must be safe for concurrent lookups.

mod entity;

pub use entity::{
    DictionaryError, EntityBinding, EntityDictionary, EntityDictionaryBuilder, RelationshipBinding,
};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RequestError, RequestResult};

/// Type token for an entity or analytic table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Value type of a scalar attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    Text,
    Integer,
    Decimal,
    Boolean,
    Time,
    Money,
    Coordinate,
    Id,
    Object,
}

/// What a field name on a type refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
    Attribute(AttributeType),
    Relation(EntityType),
}

/// Read-only metadata lookups over registered entity types.
pub trait EntityMetadata: Send + Sync {
    /// Find a type by its JSON alias.
    fn lookup_alias(&self, alias: &str, api_version: &str) -> Option<EntityType>;

    /// Whether the type may be addressed as a top-level collection.
    fn is_root(&self, ty: &EntityType) -> bool;

    fn is_relation(&self, ty: &EntityType, name: &str) -> bool;

    fn relation_target(&self, ty: &EntityType, name: &str) -> Option<EntityType>;

    fn is_to_many(&self, ty: &EntityType, name: &str) -> bool;

    /// Declared attribute names, in declaration order.
    fn attributes(&self, ty: &EntityType) -> Vec<String>;

    /// Declared relationship names, in declaration order.
    fn relationships(&self, ty: &EntityType) -> Vec<String>;

    /// JSON:API type name of the entity.
    fn json_alias(&self, ty: &EntityType) -> String;

    fn attribute_type(&self, ty: &EntityType, name: &str) -> Option<AttributeType>;

    fn id_field(&self, ty: &EntityType) -> Option<String>;

    fn field_type(&self, ty: &EntityType, name: &str) -> Option<FieldType> {
        if let Some(target) = self.relation_target(ty, name) {
            return Some(FieldType::Relation(target));
        }
        if self.id_field(ty).as_deref() == Some(name) {
            return Some(FieldType::Attribute(AttributeType::Id));
        }
        self.attribute_type(ty, name).map(FieldType::Attribute)
    }

    /// Resolve a path segment to a type.
    ///
    /// With no parent the name must be a root collection alias. Otherwise it
    /// must be a relationship declared on the parent.
    fn resolve_type(
        &self,
        name: &str,
        parent: Option<&EntityType>,
        api_version: &str,
    ) -> RequestResult<EntityType> {
        match parent {
            None => self
                .lookup_alias(name, api_version)
                .filter(|ty| self.is_root(ty))
                .ok_or_else(|| RequestError::invalid_collection(name)),
            Some(parent) => {
                if !self.is_relation(parent, name) {
                    return Err(RequestError::invalid_collection(name));
                }
                self.relation_target(parent, name)
                    .ok_or_else(|| RequestError::invalid_collection(name))
            }
        }
    }

    /// Reject sparse field names the type does not declare.
    ///
    /// Unknown names are reported sorted so the message is stable.
    fn validate_sparse_fields(&self, ty: &EntityType, requested: &[String]) -> RequestResult<()> {
        let attributes = self.attributes(ty);
        let relationships = self.relationships(ty);
        let mut invalid: Vec<&str> = requested
            .iter()
            .filter(|field| !attributes.contains(*field) && !relationships.contains(*field))
            .map(String::as_str)
            .collect();

        if invalid.is_empty() {
            return Ok(());
        }

        invalid.sort_unstable();
        invalid.dedup();
        Err(RequestError::invalid_value(format!(
            "{} does not contain the fields: [{}]",
            self.json_alias(ty),
            invalid.join(", ")
        )))
    }
}
