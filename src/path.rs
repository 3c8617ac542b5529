//! Field paths across entity relationships.
//!
//! A [`Path`] is a chain of [`PathElement`]s starting at some type, e.g.
//! `book.authors.name`. Include parameters, filter selectors and sort rules all
//! resolve to paths before they are used.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::dictionary::{EntityMetadata, EntityType, FieldType};
use crate::error::{RequestError, RequestResult};
use crate::projection::Argument;

/// One hop of a path: a field on a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathElement {
    pub entity_type: EntityType,
    pub field_type: FieldType,
    pub field_name: String,
    pub alias: String,
    pub arguments: BTreeMap<String, Argument>,
}

impl PathElement {
    pub fn new(entity_type: EntityType, field_type: FieldType, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self {
            entity_type,
            field_type,
            alias: field_name.clone(),
            field_name,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: BTreeMap<String, Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Target type when this hop crosses a relationship.
    pub fn relation_target(&self) -> Option<&EntityType> {
        match &self.field_type {
            FieldType::Relation(target) => Some(target),
            FieldType::Attribute(_) => None,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias)?;
        for argument in self.arguments.values() {
            write!(f, "[{}:{}]", argument.name, argument.value)?;
        }
        Ok(())
    }
}

/// A resolved, non-empty chain of path elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// A single-hop path to `field` on `ty`.
    pub fn field(dictionary: &dyn EntityMetadata, ty: &EntityType, field: &str) -> RequestResult<Self> {
        Self::parse(dictionary, ty, field)
    }

    /// Resolve a dot separated field path from `root`.
    ///
    /// Every hop except the last must be a relationship.
    pub fn parse(dictionary: &dyn EntityMetadata, root: &EntityType, dotted: &str) -> RequestResult<Self> {
        let names: Vec<&str> = dotted.split('.').collect();
        let mut elements = Vec::with_capacity(names.len());
        let mut current = root.clone();

        for (index, name) in names.iter().enumerate() {
            let field_type = dictionary.field_type(&current, name).ok_or_else(|| {
                RequestError::invalid_value(format!(
                    "{} does not contain the field {}",
                    dictionary.json_alias(&current),
                    name
                ))
            })?;

            let next = match &field_type {
                FieldType::Relation(target) => Some(target.clone()),
                FieldType::Attribute(_) if index + 1 < names.len() => {
                    return Err(RequestError::invalid_value(format!(
                        "{} is not a relationship of {}",
                        name,
                        dictionary.json_alias(&current)
                    )));
                }
                FieldType::Attribute(_) => None,
            };

            elements.push(PathElement::new(current.clone(), field_type, *name));
            if let Some(next) = next {
                current = next;
            }
        }

        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn first(&self) -> Option<&PathElement> {
        self.elements.first()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// The remaining path after the first hop.
    pub fn tail(&self) -> Option<Path> {
        if self.elements.len() < 2 {
            return None;
        }
        Some(Path::new(self.elements[1..].to_vec()))
    }

    /// Dot separated field names, without arguments.
    pub fn field_path(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.field_name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Attach arguments to the last hop.
    pub fn with_last_arguments(mut self, arguments: BTreeMap<String, Argument>) -> Self {
        if let Some(last) = self.elements.pop() {
            self.elements.push(last.with_arguments(arguments));
        }
        self
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}
