#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::{self, project};
    use quarry::dictionary::EntityType;
    use quarry::error::{RequestError, RequestResult};
    use quarry::pagination::{DefaultPaginationResolver, Pagination, PaginationResolver};
    use quarry::request::RequestContext;

    fn resolve(query: &str) -> RequestResult<Option<Pagination>> {
        let resolver = DefaultPaginationResolver::new(common::page_limits());
        resolver.parse_pagination(&RequestContext::from_query(query), &EntityType::new("book"))
    }

    fn error(query: &str) -> String {
        resolve(query).unwrap_err().to_string()
    }

    #[test]
    fn test_offset_and_limit() {
        let page = resolve("page[offset]=20&page[limit]=5").unwrap().unwrap();
        assert_eq!((page.offset(), page.limit()), (20, 5));
        assert!(!page.returns_page_totals());
    }

    #[test]
    fn test_number_defaults_size() {
        let page = resolve("page[number]=4").unwrap().unwrap();
        assert_eq!((page.offset(), page.limit()), (30, 10));
    }

    #[test]
    fn test_totals_with_window() {
        let page = resolve("page[size]=25&page[totals]").unwrap().unwrap();
        assert!(page.returns_page_totals());
        assert_eq!(page.snapshot().limit, 25);
    }

    #[test]
    fn test_non_integer_values() {
        assert_eq!(error("page[size]=abc"), "Invalid value: page values must be integers");
        assert_eq!(error("page[offset]=1.5"), "Invalid value: page values must be integers");
    }

    #[test]
    fn test_unknown_page_key() {
        assert_eq!(
            error("page[cursor]=abc"),
            "Invalid value: Invalid Pagination Parameter. Accepted values are page[number], page[size], page[offset], page[limit], page[totals]"
        );
    }

    #[test]
    fn test_mixed_styles() {
        assert_eq!(
            resolve("page[size]=10&page[offset]=3").unwrap_err(),
            RequestError::invalid_value("Invalid usage of pagination parameters.")
        );
    }

    #[test]
    fn test_limit_bounds() {
        assert_eq!(
            error("page[limit]=101"),
            "Invalid value: Pagination limit must be less than or equal to 100"
        );
        assert_eq!(
            error("page[size]=101"),
            "Invalid value: Pagination size must be less than or equal to 100"
        );
        assert_eq!(
            error("page[size]=0"),
            "Invalid value: Pagination size must contain a positive, non-zero value."
        );
        assert_eq!(
            error("page[limit]=-2"),
            "Invalid value: Pagination limit must contain a positive, non-zero value."
        );
    }

    #[test]
    fn test_number_and_offset_bounds() {
        assert_eq!(
            error("page[number]=0"),
            "Invalid value: Pagination number must be a positive, non-zero value."
        );
        assert_eq!(
            error("page[offset]=-1"),
            "Invalid value: Pagination offset must contain a positive value."
        );
    }

    #[test]
    fn test_collections_get_default_window() {
        let catalog = common::catalog();
        let projection = project(&catalog, "/author", "").unwrap();
        let page = projection.pagination().unwrap();

        assert!(page.is_default_instance());
        assert_eq!(page.limit(), 10);
        assert_eq!(page.entity_type(), &EntityType::new("author"));
    }

    #[test]
    fn test_invalid_window_fails_the_build() {
        let catalog = common::catalog();
        let err = project(&catalog, "/book", "page[limit]=1000").unwrap_err();

        assert_eq!(err.status(), 400);
    }
}
