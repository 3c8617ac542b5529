//! JSON:API resource path grammar.
//!
//! ```text
//! path         := '/'? collection '/'?
//! collection   := term ( '/' id ( '/' 'relationships' '/' term | '/' collection )? )?
//! ```
//!
//! Parsing yields a [`ResourcePath`] tree. Whether a node is a root or a
//! nested collection depends only on its position, so the builder threads the
//! parent type through a single recursive match instead of dispatching on
//! separate node kinds.

use chumsky::prelude::*;
use serde::Serialize;

use crate::error::{RequestError, RequestResult};

const RELATIONSHIPS: &str = "relationships";

/// Parsed resource path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResourcePath {
    /// `/book`
    Collection { name: String },
    /// `/book/1`
    Entity { name: String, id: String },
    /// `/book/1/authors...`
    EntityWithSubCollection {
        name: String,
        id: String,
        child: Box<ResourcePath>,
    },
    /// `/book/1/relationships/authors`
    EntityWithRelationship {
        name: String,
        id: String,
        relationship: String,
    },
}

impl ResourcePath {
    /// The collection or relationship name this node addresses.
    pub fn name(&self) -> &str {
        match self {
            ResourcePath::Collection { name }
            | ResourcePath::Entity { name, .. }
            | ResourcePath::EntityWithSubCollection { name, .. }
            | ResourcePath::EntityWithRelationship { name, .. } => name,
        }
    }
}

enum Tail {
    Relationship(String),
    SubCollection(ResourcePath),
}

fn parser<'src>() -> impl Parser<'src, &'src str, ResourcePath, extra::Err<Rich<'src, char>>> {
    let segment = none_of('/')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(str::to_string)
        .labelled("path segment");

    let collection = recursive(|collection| {
        let tail = just('/').ignore_then(choice((
            just(RELATIONSHIPS)
                .then(just('/'))
                .ignore_then(segment.clone())
                .map(Tail::Relationship),
            collection.map(Tail::SubCollection),
        )));

        segment
            .clone()
            .then(just('/').ignore_then(segment.clone()).then(tail.or_not()).or_not())
            .map(|(name, rest)| match rest {
                None => ResourcePath::Collection { name },
                Some((id, None)) => ResourcePath::Entity { name, id },
                Some((id, Some(Tail::Relationship(relationship)))) => {
                    ResourcePath::EntityWithRelationship {
                        name,
                        id,
                        relationship,
                    }
                }
                Some((id, Some(Tail::SubCollection(child)))) => ResourcePath::EntityWithSubCollection {
                    name,
                    id,
                    child: Box::new(child),
                },
            })
    });

    just('/')
        .or_not()
        .ignore_then(collection)
        .then_ignore(just('/').or_not())
        .then_ignore(end())
}

/// Parse a resource path such as `/author/1/books/3/publisher`.
pub fn parse_path(path: &str) -> RequestResult<ResourcePath> {
    parser()
        .parse(path)
        .into_result()
        .map_err(|_| RequestError::bad_request(format!("Invalid path: {}", path)))
}
