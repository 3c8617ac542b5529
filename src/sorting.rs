//! Sort rules from the `sort` query parameter.

use serde::Serialize;
use std::fmt;

use crate::dictionary::{EntityMetadata, EntityType};
use crate::error::{RequestError, RequestResult};
use crate::path::Path;
use crate::request::{split_list, RequestContext, SORT};

const ID_KEYWORD: &str = "id";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Ordered sort rules for one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Sorting {
    pub entity_type: EntityType,
    pub rules: Vec<(Path, SortOrder)>,
}

impl Sorting {
    pub fn new(entity_type: EntityType, rules: Vec<(Path, SortOrder)>) -> Self {
        Self { entity_type, rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse `-title,publishDate` style rules against `ty`.
    ///
    /// A later rule for the same field replaces an earlier one.
    pub fn parse(dictionary: &dyn EntityMetadata, ty: &EntityType, rules: &[String]) -> RequestResult<Self> {
        let mut parsed: Vec<(String, SortOrder)> = Vec::new();
        for rule in rules {
            let (field, order) = match rule.strip_prefix('-') {
                Some(field) => (field, SortOrder::Desc),
                None => (rule.strip_prefix('+').unwrap_or(rule), SortOrder::Asc),
            };
            let field = if field == ID_KEYWORD {
                dictionary.id_field(ty).unwrap_or_else(|| field.to_string())
            } else {
                field.to_string()
            };
            parsed.retain(|(existing, _)| *existing != field);
            parsed.push((field, order));
        }

        let mut resolved = Vec::with_capacity(parsed.len());
        for (field, order) in parsed {
            let path = Path::parse(dictionary, ty, &field)?;
            if crosses_to_many(dictionary, &path) {
                return Err(RequestError::invalid_value(format!(
                    "Cannot sort across a to-many relationship: {}",
                    path.field_path()
                )));
            }
            resolved.push((path, order));
        }

        Ok(Self::new(ty.clone(), resolved))
    }
}

fn crosses_to_many(dictionary: &dyn EntityMetadata, path: &Path) -> bool {
    path.elements()
        .iter()
        .any(|e| e.relation_target().is_some() && dictionary.is_to_many(&e.entity_type, &e.field_name))
}

impl fmt::Display for Sorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules = self
            .rules
            .iter()
            .map(|(path, order)| format!("{} {}", path, order))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&rules)
    }
}

/// Supplies the sorting attached to a terminal projection.
pub trait SortResolver {
    fn parse_sorting(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Option<Sorting>>;
}

/// Reads the JSON:API `sort` parameter.
pub struct DefaultSortResolver<'a> {
    dictionary: &'a dyn EntityMetadata,
}

impl<'a> DefaultSortResolver<'a> {
    pub fn new(dictionary: &'a dyn EntityMetadata) -> Self {
        Self { dictionary }
    }
}

impl SortResolver for DefaultSortResolver<'_> {
    fn parse_sorting(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Option<Sorting>> {
        let rules = ctx.params().get(SORT).map(split_list).unwrap_or_default();
        if rules.is_empty() {
            return Ok(None);
        }
        let sorting = Sorting::parse(self.dictionary, ty, &rules)?;
        Ok(Some(sorting))
    }
}
