//! Shared fixtures: a small library model plus one analytic table.
#![allow(dead_code)]

use quarry::aggregation::{DefaultQueryValidator, Query, QueryTranslator, Table};
use quarry::catalog::Catalog;
use quarry::dictionary::EntityType;
use quarry::error::RequestResult;
use quarry::jsonapi::ProjectionBuilder;
use quarry::pagination::{DefaultPaginationResolver, PageLimits};
use quarry::projection::EntityProjection;
use quarry::request::RequestContext;
use quarry::sorting::DefaultSortResolver;

pub const MODEL: &str = r#"
[[entity]]
name = "book"
root = true
attributes = [
    { name = "title", type = "text" },
    { name = "genre", type = "text" },
    { name = "language", type = "text" },
    { name = "publishDate", type = "time" },
]
relationships = [
    { name = "authors", target = "author", to_many = true },
    { name = "publisher", target = "publisher" },
]

[[entity]]
name = "author"
root = true
attributes = [{ name = "name", type = "text" }]
relationships = [{ name = "books", target = "book", to_many = true }]

[[entity]]
name = "publisher"
attributes = [{ name = "name", type = "text" }]
relationships = [{ name = "books", target = "book", to_many = true }]

[[entity]]
name = "country"
root = true
attributes = [{ name = "isoCode", type = "text" }]

[[table]]
name = "playerStats"
id = "id"
arguments = [{ name = "rating", type = "text", values = ["good", "bad"] }]
dimensions = [
    { name = "countryIsoCode", type = "text", values = ["HKG", "USA"] },
    { name = "overallRating", type = "text" },
    { name = "countryName", type = "text", arguments = [{ name = "format", type = "text", values = ["lower", "upper"], default = "lower" }] },
    { name = "country", target = "country" },
]
time_dimensions = [
    { name = "recordedDate", grains = ["day", "month"] },
]
metrics = [
    { name = "highScore", type = "integer" },
    { name = "lowScore", type = "integer" },
]

[[table]]
name = "videoGame"
require_filter = "sessionDate=ge={{start}}"
time_dimensions = [{ name = "sessionDate", grains = ["day"] }]
dimensions = [
    { name = "platform", type = "text", require_filter = "platform=={{platform}}" },
]
metrics = [{ name = "sessions", type = "integer" }]
"#;

pub fn catalog() -> Catalog {
    Catalog::from_toml(MODEL).unwrap()
}

pub fn page_limits() -> PageLimits {
    PageLimits {
        default_limit: 10,
        max_limit: 100,
    }
}

/// Build the projection for `path` with `query` as its query string.
pub fn project(catalog: &Catalog, path: &str, query: &str) -> RequestResult<EntityProjection> {
    project_with(catalog, path, RequestContext::from_query(query))
}

pub fn project_with(catalog: &Catalog, path: &str, ctx: RequestContext) -> RequestResult<EntityProjection> {
    let filters = catalog.filter_resolver();
    let sorts = DefaultSortResolver::new(catalog.dictionary());
    let pages = DefaultPaginationResolver::new(page_limits());
    ProjectionBuilder::new(catalog.dictionary(), &filters, &sorts, &pages)
        .with_strict_params(true)
        .build_from_path(&ctx, path)
}

pub fn table<'c>(catalog: &'c Catalog, name: &str) -> &'c Table {
    catalog.table(&EntityType::new(name)).unwrap()
}

/// Build and translate an analytic request end to end.
pub fn translate<'c>(catalog: &'c Catalog, path: &str, ctx: RequestContext) -> RequestResult<Query<'c>> {
    let projection = project_with(catalog, path, ctx.clone())?;
    let table = catalog.table(projection.entity_type()).unwrap();
    let validator = DefaultQueryValidator;
    QueryTranslator::new(&validator).translate(table, &projection, &ctx)
}
