//! Per-request state.
//!
//! A [`RequestContext`] is built once from the raw query string and passed by
//! reference into every builder function. It is never stored on a long-lived
//! object, so nothing about one request can leak into another.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{RequestError, RequestResult};
use crate::projection::Argument;

pub const INCLUDE: &str = "include";
pub const SORT: &str = "sort";
pub const FILTER: &str = "filter";

/// Query parameters in arrival order, one key to many values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams {
    entries: IndexMap<String, Vec<String>>,
}

impl QueryParams {
    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in pairs {
            entries.entry(key.into()).or_default().push(value.into());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Entries whose key looks like `<prefix>[...]`, yielding the bracketed part.
    pub fn bracketed<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a [String])> + 'a {
        self.iter().filter_map(move |(key, values)| {
            bracket_contents(key, prefix).map(|inner| (inner, values))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `fields[book]` with prefix `fields` gives `book`.
pub fn bracket_contents<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

fn is_recognized_key(key: &str) -> bool {
    key == SORT
        || key == INCLUDE
        || key == FILTER
        || bracket_contents(key, FILTER).is_some()
        || bracket_contents(key, "fields").is_some()
        || bracket_contents(key, "page").is_some()
}

/// Comma separated list values, trimmed, with empty entries dropped.
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything the projection builder needs to know about one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestContext {
    params: QueryParams,
    sparse_fields: IndexMap<String, Vec<String>>,
    api_version: String,
    bypass_cache: bool,
    table_arguments: BTreeMap<String, Argument>,
}

impl RequestContext {
    pub fn new(params: QueryParams) -> Self {
        let sparse_fields = params
            .bracketed("fields")
            .map(|(alias, values)| (alias.to_string(), split_list(values)))
            .collect();

        Self {
            params,
            sparse_fields,
            ..Self::default()
        }
    }

    /// Parse a raw query string.
    pub fn from_query(query: &str) -> Self {
        Self::new(QueryParams::parse(query))
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// Bind a table-level argument for analytic queries.
    pub fn with_table_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let argument = Argument::new(name, value);
        self.table_arguments.insert(argument.name.clone(), argument);
        self
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn bypass_cache(&self) -> bool {
        self.bypass_cache
    }

    pub fn table_arguments(&self) -> &BTreeMap<String, Argument> {
        &self.table_arguments
    }

    /// Requested fields for a JSON:API type alias, if the client sent `fields[alias]`.
    pub fn sparse_fields(&self, alias: &str) -> Option<&[String]> {
        self.sparse_fields.get(alias).map(Vec::as_slice)
    }

    /// Relationship paths named by `include`.
    pub fn include_paths(&self) -> Vec<String> {
        self.params.get(INCLUDE).map(split_list).unwrap_or_default()
    }

    /// Reject query parameters outside the JSON:API vocabulary.
    pub fn validate_strict(&self) -> RequestResult<()> {
        let undefined: Vec<&str> = self.params.keys().filter(|k| !is_recognized_key(k)).collect();
        if undefined.is_empty() {
            return Ok(());
        }

        tracing::warn!(keys = ?undefined, "rejecting undefined query parameters");
        Err(RequestError::bad_request(format!(
            "Found undefined keys in request: {}",
            undefined.join(", ")
        )))
    }
}
