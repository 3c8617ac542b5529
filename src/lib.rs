//! # Quarry
//!
//! Turns JSON:API request paths into entity projections, and projections over
//! analytic tables into grouped queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Request (path + query parameters)               │
//! │  /book/1/authors?fields[author]=name&filter[author]=...  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [jsonapi::grammar]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ResourcePath tree                       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [jsonapi::builder]
//!                          │   dictionary, filter, sort and page resolvers
//! ┌─────────────────────────────────────────────────────────┐
//! │                  EntityProjection                        │
//! │  (attributes, relationships, filter, sorting, pages)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [aggregation::translator]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Query (metrics, dimensions, WHERE / HAVING)         │
//! │      + validation + cache key                            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Entity metadata and analytic tables are declared in a TOML model file
//! (see [`catalog`]); runtime options live in `quarry.toml` (see [`config`]).

pub mod aggregation;
pub mod catalog;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod filter;
pub mod jsonapi;
pub mod pagination;
pub mod path;
pub mod projection;
pub mod request;
pub mod sorting;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::aggregation::{
        DefaultQueryValidator, Query, QueryTranslator, QueryValidator, Table, TimeGrain, ValueType,
    };
    pub use crate::catalog::{Catalog, CatalogError};
    pub use crate::dictionary::{AttributeType, EntityBinding, EntityDictionary, EntityMetadata, EntityType};
    pub use crate::filter::{DefaultFilterResolver, FilterExpression, FilterResolver};
    pub use crate::jsonapi::ProjectionBuilder;
    pub use crate::pagination::{DefaultPaginationResolver, PageLimits, Pagination, PaginationResolver};
    pub use crate::projection::{Argument, Attribute, EntityProjection, Relationship};
    pub use crate::request::RequestContext;
    pub use crate::sorting::{DefaultSortResolver, SortResolver, Sorting};
}

pub use error::{RequestError, RequestResult};
