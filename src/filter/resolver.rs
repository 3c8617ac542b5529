//! Filter lookups used by the projection builder.

use indexmap::IndexMap;

use super::{FilterExpression, RsqlDialect};
use crate::dictionary::{EntityMetadata, EntityType};
use crate::error::RequestResult;
use crate::request::RequestContext;

/// Supplies the filter expression scoped to each projection.
pub trait FilterResolver {
    /// The client's `filter[type]` expression for `ty`.
    fn parse_filter_for_type(
        &self,
        ctx: &RequestContext,
        ty: &EntityType,
    ) -> RequestResult<Option<FilterExpression>>;

    /// The client's untyped `filter` expression, read against `ty`.
    fn parse_global_filter(
        &self,
        ctx: &RequestContext,
        ty: &EntityType,
    ) -> RequestResult<Option<FilterExpression>>;

    /// Server-side filter applied whenever `ty` is loaded as a root collection.
    fn load_filter_for(&self, ty: &EntityType) -> Option<FilterExpression>;

    /// Server-side filter applied when reading `relation` off `parent`.
    fn relation_filter_for(&self, parent: &EntityType, relation: &str) -> Option<FilterExpression>;
}

/// RSQL based resolver with per-type load filters.
pub struct DefaultFilterResolver<'a> {
    dictionary: &'a dyn EntityMetadata,
    load_filters: IndexMap<EntityType, FilterExpression>,
}

impl<'a> DefaultFilterResolver<'a> {
    pub fn new(dictionary: &'a dyn EntityMetadata) -> Self {
        Self {
            dictionary,
            load_filters: IndexMap::new(),
        }
    }

    pub fn with_load_filter(mut self, ty: EntityType, filter: FilterExpression) -> Self {
        self.load_filters.insert(ty, filter);
        self
    }

    pub fn with_load_filters(mut self, filters: IndexMap<EntityType, FilterExpression>) -> Self {
        self.load_filters.extend(filters);
        self
    }
}

impl FilterResolver for DefaultFilterResolver<'_> {
    fn parse_filter_for_type(
        &self,
        ctx: &RequestContext,
        ty: &EntityType,
    ) -> RequestResult<Option<FilterExpression>> {
        let mut typed = RsqlDialect::new(self.dictionary)
            .parse_typed_expressions(ctx.params(), ctx.api_version())?;
        Ok(typed.shift_remove(ty))
    }

    fn parse_global_filter(
        &self,
        ctx: &RequestContext,
        ty: &EntityType,
    ) -> RequestResult<Option<FilterExpression>> {
        let expression = RsqlDialect::new(self.dictionary).parse_global_expression(ty, ctx.params())?;
        Ok(expression)
    }

    fn load_filter_for(&self, ty: &EntityType) -> Option<FilterExpression> {
        self.load_filters.get(ty).cloned()
    }

    fn relation_filter_for(&self, parent: &EntityType, relation: &str) -> Option<FilterExpression> {
        let target = self.dictionary.relation_target(parent, relation)?;
        self.load_filters.get(&target).cloned()
    }
}
