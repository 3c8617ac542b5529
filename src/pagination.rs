//! Pagination from `page[...]` query parameters.
//!
//! Two styles are accepted and may not be mixed: `page[number]`/`page[size]`
//! pages by whole pages, `page[offset]`/`page[limit]` by records. Either may
//! be combined with `page[totals]` to request a total record count.

use serde::Serialize;

use crate::dictionary::EntityType;
use crate::error::{RequestError, RequestResult};
use crate::request::{QueryParams, RequestContext};

pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const MAX_PAGE_SIZE: u32 = 10000;

pub const PAGE_NUMBER_KEY: &str = "page[number]";
pub const PAGE_SIZE_KEY: &str = "page[size]";
pub const PAGE_OFFSET_KEY: &str = "page[offset]";
pub const PAGE_LIMIT_KEY: &str = "page[limit]";
pub const PAGE_TOTALS_KEY: &str = "page[totals]";

const PAGE_KEYS: [&str; 5] = [
    PAGE_NUMBER_KEY,
    PAGE_SIZE_KEY,
    PAGE_OFFSET_KEY,
    PAGE_LIMIT_KEY,
    PAGE_TOTALS_KEY,
];

/// System wide page size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
            max_limit: MAX_PAGE_SIZE,
        }
    }
}

/// Resolved window over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pagination {
    entity_type: EntityType,
    offset: u64,
    limit: u32,
    return_totals: bool,
    default_instance: bool,
    page_totals: Option<u64>,
}

/// Read-only copy of a pagination handed to analytic queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageSnapshot {
    pub offset: u64,
    pub limit: u32,
    pub return_totals: bool,
}

#[derive(Default)]
struct PageData {
    number: Option<i64>,
    size: Option<i64>,
    offset: Option<i64>,
    limit: Option<i64>,
    totals: bool,
}

impl Pagination {
    /// The pagination used when the client sends no `page[...]` parameters.
    pub fn default_for(entity_type: EntityType, limits: PageLimits) -> Self {
        Self {
            entity_type,
            offset: 0,
            limit: limits.default_limit,
            return_totals: false,
            default_instance: true,
            page_totals: None,
        }
    }

    /// Parse `page[...]` parameters. Returns `None` when there are none.
    pub fn parse(
        entity_type: &EntityType,
        params: &QueryParams,
        limits: PageLimits,
    ) -> RequestResult<Option<Self>> {
        let mut data = PageData::default();
        let mut seen = false;

        for (key, values) in params.iter() {
            if !key.starts_with("page[") {
                continue;
            }
            seen = true;
            let value = values.first().map(String::as_str).unwrap_or_default();
            match key {
                PAGE_TOTALS_KEY => data.totals = true,
                PAGE_NUMBER_KEY => data.number = Some(parse_int(value)?),
                PAGE_SIZE_KEY => data.size = Some(parse_int(value)?),
                PAGE_OFFSET_KEY => data.offset = Some(parse_int(value)?),
                PAGE_LIMIT_KEY => data.limit = Some(parse_int(value)?),
                _ => {
                    return Err(RequestError::invalid_value(format!(
                        "Invalid Pagination Parameter. Accepted values are {}",
                        PAGE_KEYS.join(", ")
                    )))
                }
            }
        }

        if !seen {
            return Ok(None);
        }
        Self::from_page_data(entity_type.clone(), data, limits).map(Some)
    }

    fn from_page_data(entity_type: EntityType, data: PageData, limits: PageLimits) -> RequestResult<Self> {
        let by_pages = data.size.is_some() || data.number.is_some();
        if by_pages && (data.limit.is_some() || data.offset.is_some()) {
            return Err(RequestError::invalid_value("Invalid usage of pagination parameters."));
        }

        let (client_offset, client_limit) = if by_pages {
            (data.number, data.size)
        } else {
            (data.offset, data.limit)
        };

        let default_instance = client_offset.is_none() && client_limit.is_none() && !data.totals;
        let limit = client_limit.unwrap_or(i64::from(limits.default_limit));
        let label = if by_pages { "size" } else { "limit" };

        if limit > i64::from(limits.max_limit) && !default_instance {
            return Err(RequestError::invalid_value(format!(
                "Pagination {} must be less than or equal to {}",
                label, limits.max_limit
            )));
        }
        if limit < 1 {
            return Err(RequestError::invalid_value(format!(
                "Pagination {} must contain a positive, non-zero value.",
                label
            )));
        }

        let offset = if by_pages {
            let number = client_offset.unwrap_or(1);
            if number < 1 {
                return Err(RequestError::invalid_value(
                    "Pagination number must be a positive, non-zero value.",
                ));
            }
            (number - 1) * limit
        } else {
            let offset = client_offset.unwrap_or(0);
            if offset < 0 {
                return Err(RequestError::invalid_value(
                    "Pagination offset must contain a positive value.",
                ));
            }
            offset
        };

        let limit = u32::try_from(limit).map_err(|_| {
            RequestError::invalid_value(format!(
                "Pagination {} must be less than or equal to {}",
                label, limits.max_limit
            ))
        })?;

        Ok(Self {
            entity_type,
            offset: offset.unsigned_abs(),
            limit,
            return_totals: data.totals,
            default_instance,
            page_totals: None,
        })
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn returns_page_totals(&self) -> bool {
        self.return_totals
    }

    pub fn is_default_instance(&self) -> bool {
        self.default_instance
    }

    pub fn page_totals(&self) -> Option<u64> {
        self.page_totals
    }

    /// Record the total number of records, filled in after the query ran.
    pub fn set_page_totals(&mut self, totals: u64) {
        self.page_totals = Some(totals);
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            offset: self.offset,
            limit: self.limit,
            return_totals: self.return_totals,
        }
    }
}

fn parse_int(value: &str) -> RequestResult<i64> {
    value
        .trim()
        .parse::<i32>()
        .map(i64::from)
        .map_err(|_| RequestError::invalid_value("page values must be integers"))
}

/// Supplies the pagination attached to a terminal collection.
pub trait PaginationResolver {
    fn parse_pagination(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Option<Pagination>>;

    fn default_pagination(&self, ty: &EntityType) -> Pagination;
}

/// Reads JSON:API `page[...]` parameters with configured limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPaginationResolver {
    limits: PageLimits,
}

impl DefaultPaginationResolver {
    pub fn new(limits: PageLimits) -> Self {
        Self { limits }
    }
}

impl PaginationResolver for DefaultPaginationResolver {
    fn parse_pagination(&self, ctx: &RequestContext, ty: &EntityType) -> RequestResult<Option<Pagination>> {
        Pagination::parse(ty, ctx.params(), self.limits)
    }

    fn default_pagination(&self, ty: &EntityType) -> Pagination {
        Pagination::default_for(ty.clone(), self.limits)
    }
}
