//! Builds entity projections from JSON:API requests.

use tracing::instrument;

use super::grammar::{parse_path, ResourcePath};
use crate::dictionary::{EntityMetadata, EntityType};
use crate::error::{RequestError, RequestResult};
use crate::filter::{FilterExpression, FilterResolver};
use crate::pagination::PaginationResolver;
use crate::path::Path;
use crate::projection::{Attribute, EntityProjection, NamedEntityProjection, Relationship};
use crate::request::RequestContext;
use crate::sorting::SortResolver;

/// Turns a resource path plus query parameters into one root projection.
///
/// The builder only holds its collaborators. All request state travels in the
/// [`RequestContext`] passed to each call.
pub struct ProjectionBuilder<'a> {
    dictionary: &'a dyn EntityMetadata,
    filters: &'a dyn FilterResolver,
    sorts: &'a dyn SortResolver,
    pages: &'a dyn PaginationResolver,
    strict_params: bool,
}

impl<'a> ProjectionBuilder<'a> {
    pub fn new(
        dictionary: &'a dyn EntityMetadata,
        filters: &'a dyn FilterResolver,
        sorts: &'a dyn SortResolver,
        pages: &'a dyn PaginationResolver,
    ) -> Self {
        Self {
            dictionary,
            filters,
            sorts,
            pages,
            strict_params: false,
        }
    }

    /// Reject unknown query parameter keys before building.
    pub fn with_strict_params(mut self, strict: bool) -> Self {
        self.strict_params = strict;
        self
    }

    /// Build the projection for a resource path such as `/author/1/books`.
    #[instrument(name = "build_from_path", skip_all, fields(path = %path))]
    pub fn build_from_path(&self, ctx: &RequestContext, path: &str) -> RequestResult<EntityProjection> {
        if self.strict_params {
            ctx.validate_strict()?;
        }
        let tree = parse_path(path)?;
        let named = self.visit(ctx, &tree, None)?;
        tracing::debug!(
            entity = %named.projection.entity_type(),
            relationships = named.projection.relationship_aliases().len(),
            "built projection"
        );
        Ok(named.projection)
    }

    /// A projection of `root` carrying only the relationships named by `include`.
    pub fn build_include_projection(
        &self,
        ctx: &RequestContext,
        root: &EntityType,
    ) -> RequestResult<EntityProjection> {
        Ok(EntityProjection::new(root.clone()).with_relationships(self.included_relationships(ctx, root)?))
    }

    fn visit(
        &self,
        ctx: &RequestContext,
        node: &ResourcePath,
        parent: Option<&EntityType>,
    ) -> RequestResult<NamedEntityProjection> {
        tracing::trace!(segment = node.name(), parent = ?parent, "visiting path segment");
        match node {
            ResourcePath::Collection { name } => self.visit_terminal(ctx, name, parent, true),
            ResourcePath::Entity { name, .. } => self.visit_terminal(ctx, name, parent, false),
            ResourcePath::EntityWithSubCollection { name, child, .. } => {
                let ty = self.resolve(ctx, name, parent)?;
                let child = self.visit(ctx, child, Some(&ty))?;
                let projection = EntityProjection::new(ty).with_relationship(child.into_relationship());
                Ok(NamedEntityProjection::new(name.clone(), projection))
            }
            ResourcePath::EntityWithRelationship {
                name, relationship, ..
            } => {
                let ty = self.resolve(ctx, name, parent)?;
                let linkage = self.visit_relationship(ctx, &ty, relationship)?;
                let filter = FilterExpression::and_all([
                    self.filters.parse_filter_for_type(ctx, &ty)?,
                    self.scoped_filter(&ty, parent, name),
                ]);
                let projection = EntityProjection::new(ty.clone())
                    .with_filter(filter)
                    .with_relationships(self.required_relationships(ctx, &ty)?)
                    .with_relationship(linkage.into_relationship());
                Ok(NamedEntityProjection::new(name.clone(), projection))
            }
        }
    }

    /// A collection (`is_collection`) or single resource at the end of the path.
    fn visit_terminal(
        &self,
        ctx: &RequestContext,
        name: &str,
        parent: Option<&EntityType>,
        is_collection: bool,
    ) -> RequestResult<NamedEntityProjection> {
        let ty = self.resolve(ctx, name, parent)?;

        let filter = FilterExpression::and_all([
            self.filters.parse_filter_for_type(ctx, &ty)?,
            self.filters.parse_global_filter(ctx, &ty)?,
            self.scoped_filter(&ty, parent, name),
        ]);

        let pagination = if is_collection {
            let page = self.pages.parse_pagination(ctx, &ty)?;
            Some(page.unwrap_or_else(|| self.pages.default_pagination(&ty)))
        } else {
            None
        };

        let projection = EntityProjection::new(ty.clone())
            .with_attributes(self.sparse_attributes(ctx, &ty)?)
            .with_relationships(self.required_relationships(ctx, &ty)?)
            .with_filter(filter)
            .with_sorting(self.sorts.parse_sorting(ctx, &ty)?)
            .with_pagination(pagination);

        Ok(NamedEntityProjection::new(name, projection))
    }

    /// The `relationships/<name>` linkage target: no attributes, only the
    /// window over the related collection.
    fn visit_relationship(
        &self,
        ctx: &RequestContext,
        parent: &EntityType,
        name: &str,
    ) -> RequestResult<NamedEntityProjection> {
        let ty = self.resolve(ctx, name, Some(parent))?;
        let filter = FilterExpression::and_all([
            self.filters.parse_filter_for_type(ctx, &ty)?,
            self.filters.parse_global_filter(ctx, &ty)?,
            self.filters.relation_filter_for(parent, name),
        ]);
        let page = self.pages.parse_pagination(ctx, &ty)?;
        let pagination = page.unwrap_or_else(|| self.pages.default_pagination(&ty));

        let projection = EntityProjection::new(ty.clone())
            .with_filter(filter)
            .with_sorting(self.sorts.parse_sorting(ctx, &ty)?)
            .with_pagination(Some(pagination));
        Ok(NamedEntityProjection::new(name, projection))
    }

    fn resolve(&self, ctx: &RequestContext, name: &str, parent: Option<&EntityType>) -> RequestResult<EntityType> {
        self.dictionary.resolve_type(name, parent, ctx.api_version())
    }

    /// Load filter for a root, relationship filter for anything nested.
    fn scoped_filter(&self, ty: &EntityType, parent: Option<&EntityType>, name: &str) -> Option<FilterExpression> {
        match parent {
            None => self.filters.load_filter_for(ty),
            Some(parent) => self.filters.relation_filter_for(parent, name),
        }
    }

    /// Client filter for the target type plus the relationship filter.
    fn relation_filter(
        &self,
        ctx: &RequestContext,
        parent: &EntityType,
        name: &str,
        target: &EntityType,
    ) -> RequestResult<Option<FilterExpression>> {
        Ok(FilterExpression::and_all([
            self.filters.parse_filter_for_type(ctx, target)?,
            self.filters.relation_filter_for(parent, name),
        ]))
    }

    /// Requested field names for `ty`, or `None` when the client sent no `fields[...]`.
    fn sparse_fields<'c>(&self, ctx: &'c RequestContext, ty: &EntityType) -> RequestResult<Option<&'c [String]>> {
        let alias = self.dictionary.json_alias(ty);
        match ctx.sparse_fields(&alias) {
            Some(requested) if !requested.is_empty() => {
                self.dictionary.validate_sparse_fields(ty, requested)?;
                Ok(Some(requested))
            }
            _ => Ok(None),
        }
    }

    fn sparse_attributes(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Vec<Attribute>> {
        let requested = self.sparse_fields(ctx, ty)?;
        Ok(self
            .dictionary
            .attributes(ty)
            .into_iter()
            .filter(|name| requested.is_none_or(|fields| fields.contains(name)))
            .map(|name| {
                let attr_type = self.dictionary.attribute_type(ty, &name).unwrap_or_default();
                Attribute::new(name, attr_type)
            })
            .collect())
    }

    /// Minimal projections for the relationships the client asked for.
    fn sparse_relationships(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Vec<Relationship>> {
        let requested = self.sparse_fields(ctx, ty)?;
        let mut relationships = Vec::new();
        for name in self.dictionary.relationships(ty) {
            if requested.is_some_and(|fields| !fields.contains(&name)) {
                continue;
            }
            let target = self
                .dictionary
                .relation_target(ty, &name)
                .ok_or_else(|| RequestError::invalid_collection(name.clone()))?;
            let filter = self.relation_filter(ctx, ty, &name, &target)?;
            relationships.push(Relationship::new(name, EntityProjection::new(target).with_filter(filter)));
        }
        Ok(relationships)
    }

    fn included_relationships(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Vec<Relationship>> {
        ctx.include_paths()
            .iter()
            .map(|include| {
                let path = Path::parse(self.dictionary, ty, include)?;
                self.visit_include_path(ctx, &path)
            })
            .collect()
    }

    /// Included relationships merged with sparse ones.
    fn required_relationships(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Vec<Relationship>> {
        let merged = EntityProjection::new(ty.clone())
            .with_relationships(self.included_relationships(ctx, ty)?)
            .with_relationships(self.sparse_relationships(ctx, ty)?);
        Ok(merged.relationships().cloned().collect())
    }

    /// One include chain. The innermost hop gets the full sparse treatment,
    /// intermediate hops only carry the next one.
    fn visit_include_path(&self, ctx: &RequestContext, path: &Path) -> RequestResult<Relationship> {
        let first = path
            .first()
            .ok_or_else(|| RequestError::invalid_value("include path must not be empty"))?;
        let target = first.relation_target().ok_or_else(|| {
            RequestError::invalid_value(format!(
                "{} is not a relationship of {}",
                first.field_name,
                self.dictionary.json_alias(&first.entity_type)
            ))
        })?;

        let projection = match path.tail() {
            Some(rest) => EntityProjection::new(target.clone()).with_relationship(self.visit_include_path(ctx, &rest)?),
            None => EntityProjection::new(target.clone())
                .with_attributes(self.sparse_attributes(ctx, target)?)
                .with_relationships(self.sparse_relationships(ctx, target)?)
                .with_filter(self.relation_filter(ctx, &first.entity_type, &first.field_name, target)?),
        };

        Ok(Relationship::new(first.field_name.clone(), projection))
    }
}
