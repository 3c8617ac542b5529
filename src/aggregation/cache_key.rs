//! Query cache keys.
//!
//! The key is a flat string of `;` terminated tokens with `{`/`}` marking
//! nested groups. Ordered parts of the query (metrics, sort rules, filter
//! operands) keep their order. Unordered parts (dimensions, arguments) are
//! sorted first so equal queries always produce the same key. The cache
//! bypass flag is not part of the key.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::query::{ColumnProjection, Query};
use crate::dictionary::FieldType;
use crate::filter::FilterExpression;
use crate::pagination::PageSnapshot;
use crate::path::{Path, PathElement};
use crate::projection::Argument;
use crate::sorting::Sorting;

const DELIMITER: char = ';';
const BEGIN_GROUP: char = '{';
const END_GROUP: char = '}';

/// SHA-256 of `key`, as 64 lowercase hex characters.
pub fn compute_hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the cache key for `query`.
pub fn extract_key(query: &Query<'_>) -> String {
    let mut key = KeyBuilder::default();
    key.token(query.table.name());

    key.group(|key| query.metrics.iter().for_each(|m| key.column(m)));

    let mut dimensions: Vec<&ColumnProjection> = query.dimensions.iter().collect();
    dimensions.sort_by(|a, b| a.alias.cmp(&b.alias));
    key.group(|key| dimensions.iter().for_each(|d| key.column(d)));

    let mut time_dimensions: Vec<&ColumnProjection> = query.time_dimensions.iter().map(|t| &t.column).collect();
    time_dimensions.sort_by(|a, b| a.alias.cmp(&b.alias));
    key.group(|key| time_dimensions.iter().for_each(|t| key.column(t)));

    key.expression(query.where_filter.as_ref());
    key.expression(query.having_filter.as_ref());
    key.sorting(query.sorting.as_ref());
    key.pagination(query.pagination.as_ref());
    key.arguments(&query.arguments);
    key.finish()
}

#[derive(Default)]
struct KeyBuilder {
    out: String,
}

impl KeyBuilder {
    fn finish(self) -> String {
        self.out
    }

    fn token(&mut self, value: &str) {
        self.out.push_str(value);
        self.out.push(DELIMITER);
    }

    /// Length prefixed, so values containing delimiters stay unambiguous.
    fn value(&mut self, value: &str) {
        self.token(&value.len().to_string());
        self.token(value);
    }

    fn empty(&mut self) {
        self.out.push(DELIMITER);
    }

    fn group(&mut self, body: impl FnOnce(&mut Self)) {
        self.out.push(BEGIN_GROUP);
        body(self);
        self.out.push(END_GROUP);
    }

    fn column(&mut self, column: &ColumnProjection) {
        self.token(&column.name);
        self.token(&column.alias);
        self.arguments(&column.arguments);
    }

    fn arguments(&mut self, arguments: &BTreeMap<String, Argument>) {
        self.group(|key| {
            for (name, argument) in arguments {
                key.token(name);
                key.value(&argument.value);
            }
        });
    }

    fn path(&mut self, path: &Path) {
        self.group(|key| path.elements().iter().for_each(|e| key.path_element(e)));
    }

    fn path_element(&mut self, element: &PathElement) {
        self.group(|key| {
            key.token(element.entity_type.name());
            match &element.field_type {
                FieldType::Relation(target) => key.token(target.name()),
                FieldType::Attribute(_) => key.token("attribute"),
            }
            key.token(&element.field_name);
            key.arguments(&element.arguments);
        });
    }

    fn expression(&mut self, expression: Option<&FilterExpression>) {
        match expression {
            None => self.empty(),
            Some(expression) => self.filter(expression),
        }
    }

    fn filter(&mut self, expression: &FilterExpression) {
        self.group(|key| match expression {
            FilterExpression::Predicate(predicate) => {
                key.token("P");
                key.path(&predicate.path);
                key.token(predicate.operator.keyword());
                predicate.values.iter().for_each(|v| key.value(v));
            }
            FilterExpression::And(l, r) => {
                key.token("A");
                key.filter(l);
                key.filter(r);
            }
            FilterExpression::Or(l, r) => {
                key.token("O");
                key.filter(l);
                key.filter(r);
            }
            FilterExpression::Not(inner) => {
                key.token("N");
                key.filter(inner);
            }
        });
    }

    fn sorting(&mut self, sorting: Option<&Sorting>) {
        let Some(sorting) = sorting else {
            self.empty();
            return;
        };
        self.group(|key| {
            key.token(sorting.entity_type.name());
            for (path, order) in &sorting.rules {
                key.path(path);
                key.token(&order.to_string());
            }
        });
    }

    fn pagination(&mut self, pagination: Option<&PageSnapshot>) {
        let Some(page) = pagination else {
            self.empty();
            return;
        };
        self.group(|key| {
            key.token(&page.offset.to_string());
            key.token(&page.limit.to_string());
            key.token(if page.return_totals { "1" } else { "0" });
        });
    }
}
