//! In-memory entity dictionary.

use indexmap::IndexMap;
use inflector::Inflector;
use serde::Serialize;

use super::{AttributeType, EntityMetadata, EntityType};

/// Error type for dictionary construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("Entity '{0}' is declared more than once")]
    Duplicate(String),

    #[error("Relationship '{relationship}' on '{entity}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relationship: String,
        target: String,
    },
}

/// A relationship declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipBinding {
    pub target: EntityType,
    pub to_many: bool,
}

/// Everything the dictionary knows about one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityBinding {
    pub entity_type: EntityType,
    pub alias: String,
    pub api_version: String,
    pub root: bool,
    pub id_field: Option<String>,
    pub attributes: IndexMap<String, AttributeType>,
    pub relationships: IndexMap<String, RelationshipBinding>,
}

impl EntityBinding {
    /// A non-root entity with an `id` field and no declared fields.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.to_camel_case(),
            entity_type: EntityType::new(name),
            api_version: String::new(),
            root: false,
            id_field: Some("id".to_string()),
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_id_field(mut self, id_field: Option<String>) -> Self {
        self.id_field = id_field;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attr_type: AttributeType) -> Self {
        self.attributes.insert(name.into(), attr_type);
        self
    }

    pub fn to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationship(name, target, false)
    }

    pub fn to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationship(name, target, true)
    }

    fn relationship(mut self, name: impl Into<String>, target: impl Into<String>, to_many: bool) -> Self {
        self.relationships.insert(
            name.into(),
            RelationshipBinding {
                target: EntityType::new(target),
                to_many,
            },
        );
        self
    }
}

/// Builder for [`EntityDictionary`].
#[derive(Debug, Default)]
pub struct EntityDictionaryBuilder {
    entities: Vec<EntityBinding>,
}

impl EntityDictionaryBuilder {
    pub fn entity(mut self, binding: EntityBinding) -> Self {
        self.entities.push(binding);
        self
    }

    /// Check relationship targets and freeze the dictionary.
    pub fn build(self) -> Result<EntityDictionary, DictionaryError> {
        let mut entities = IndexMap::new();
        for binding in self.entities {
            let key = binding.entity_type.clone();
            if entities.contains_key(&key) {
                return Err(DictionaryError::Duplicate(key.to_string()));
            }
            entities.insert(key, binding);
        }

        for binding in entities.values() {
            for (name, relationship) in &binding.relationships {
                if !entities.contains_key(&relationship.target) {
                    return Err(DictionaryError::UnknownTarget {
                        entity: binding.entity_type.to_string(),
                        relationship: name.clone(),
                        target: relationship.target.to_string(),
                    });
                }
            }
        }

        tracing::debug!(entities = entities.len(), "entity dictionary built");
        Ok(EntityDictionary { entities })
    }
}

/// Entity metadata held in memory, keyed by type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityDictionary {
    entities: IndexMap<EntityType, EntityBinding>,
}

impl EntityDictionary {
    pub fn builder() -> EntityDictionaryBuilder {
        EntityDictionaryBuilder::default()
    }

    pub fn binding(&self, ty: &EntityType) -> Option<&EntityBinding> {
        self.entities.get(ty)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &EntityBinding> {
        self.entities.values()
    }

    fn relationship(&self, ty: &EntityType, name: &str) -> Option<&RelationshipBinding> {
        self.binding(ty).and_then(|b| b.relationships.get(name))
    }
}

impl EntityMetadata for EntityDictionary {
    fn lookup_alias(&self, alias: &str, api_version: &str) -> Option<EntityType> {
        self.entities
            .values()
            .find(|b| b.alias == alias && b.api_version == api_version)
            .map(|b| b.entity_type.clone())
    }

    fn is_root(&self, ty: &EntityType) -> bool {
        self.binding(ty).is_some_and(|b| b.root)
    }

    fn is_relation(&self, ty: &EntityType, name: &str) -> bool {
        self.relationship(ty, name).is_some()
    }

    fn relation_target(&self, ty: &EntityType, name: &str) -> Option<EntityType> {
        self.relationship(ty, name).map(|r| r.target.clone())
    }

    fn is_to_many(&self, ty: &EntityType, name: &str) -> bool {
        self.relationship(ty, name).is_some_and(|r| r.to_many)
    }

    fn attributes(&self, ty: &EntityType) -> Vec<String> {
        self.binding(ty)
            .map(|b| b.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn relationships(&self, ty: &EntityType) -> Vec<String> {
        self.binding(ty)
            .map(|b| b.relationships.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn json_alias(&self, ty: &EntityType) -> String {
        self.binding(ty)
            .map(|b| b.alias.clone())
            .unwrap_or_else(|| ty.name().to_camel_case())
    }

    fn attribute_type(&self, ty: &EntityType, name: &str) -> Option<AttributeType> {
        self.binding(ty).and_then(|b| b.attributes.get(name).copied())
    }

    fn id_field(&self, ty: &EntityType) -> Option<String> {
        self.binding(ty).and_then(|b| b.id_field.clone())
    }
}
