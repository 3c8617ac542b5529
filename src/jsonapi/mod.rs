//! JSON:API request handling.
//!
//! ```text
//! /author/1/books?include=publisher&fields[book]=title
//!        │
//!        ▼ [grammar]
//! EntityWithSubCollection(author, 1, Collection(books))
//!        │
//!        ▼ [builder]
//! EntityProjection(author) ─ books ─ EntityProjection(book) ─ publisher
//! ```

pub mod builder;
pub mod grammar;

pub use builder::ProjectionBuilder;
pub use grammar::{parse_path, ResourcePath};
