#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common;
    use insta::assert_snapshot;
    use quarry::dictionary::{AttributeType, EntityType};
    use quarry::filter::{FilterExpression, RsqlDialect};
    use quarry::pagination::{PageLimits, Pagination};
    use quarry::projection::{Attribute, EntityProjection, Relationship};

    fn book() -> EntityType {
        EntityType::new("book")
    }

    fn filter(text: &str) -> FilterExpression {
        let catalog = common::catalog();
        RsqlDialect::new(catalog.dictionary()).parse(&book(), text).unwrap()
    }

    fn projection(attributes: &[&str], filter_text: Option<&str>) -> EntityProjection {
        EntityProjection::new(book())
            .with_attributes(attributes.iter().map(|name| Attribute::new(*name, AttributeType::Text)))
            .with_filter(filter_text.map(filter))
    }

    #[test]
    fn test_attributes_keep_first_declaration() {
        let projection = EntityProjection::new(book())
            .with_attribute(Attribute::new("title", AttributeType::Text))
            .with_attribute(Attribute::new("title", AttributeType::Text).with_alias("name"));

        assert_eq!(projection.attribute_names(), vec!["title"]);
        assert_eq!(projection.attribute("title").unwrap().alias, "title");
    }

    #[test]
    fn test_relationships_with_same_alias_merge() {
        let author = EntityType::new("author");
        let projection = EntityProjection::new(book())
            .with_relationship(Relationship::new(
                "authors",
                EntityProjection::new(author.clone()).with_attribute(Attribute::new("name", AttributeType::Text)),
            ))
            .with_relationship(Relationship::new(
                "authors",
                EntityProjection::new(author).with_attribute(Attribute::new("age", AttributeType::Integer)),
            ));

        let authors = &projection.relationship("authors").unwrap().projection;
        assert_eq!(authors.attribute_names(), vec!["name", "age"]);
    }

    #[test]
    fn test_merge_unions_attributes() {
        let merged = projection(&["title"], None).merge(&projection(&["genre", "title"], None));
        assert_eq!(merged.attribute_names(), vec!["title", "genre"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = projection(&["title"], Some("genre==SF;title==Dune"));
        assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn test_merge_filters_commute() {
        let a = projection(&["title"], Some("genre==SF"));
        let b = projection(&["title"], Some("title==Dune"));

        let ab = a.merge(&b);
        let ba = b.merge(&a);
        assert_eq!(ab.filter(), ba.filter());
        assert_snapshot!(ab.filter().unwrap().to_string(), @"(genre IN ['SF'] AND title IN ['Dune'])");
    }

    #[test]
    fn test_merge_filters_associate() {
        let a = projection(&[], Some("genre==SF"));
        let b = projection(&[], Some("title==Dune"));
        let c = projection(&[], Some("language==en;genre==SF"));

        let left = a.merge(&b).merge(&c);
        let right = a.merge(&b.merge(&c));
        assert_eq!(left.filter(), right.filter());
        assert_snapshot!(
            left.filter().unwrap().to_string(),
            @"((genre IN ['SF'] AND language IN ['en']) AND title IN ['Dune'])"
        );
    }

    #[test]
    fn test_merge_keeps_one_sided_filter() {
        let a = projection(&[], Some("genre==SF"));
        let b = projection(&[], None);

        assert_eq!(a.merge(&b).filter(), a.filter());
        assert_eq!(b.merge(&a).filter(), a.filter());
    }

    #[test]
    fn test_page_totals_are_reported_back() {
        let limits = PageLimits::default();
        let mut projection =
            EntityProjection::new(book()).with_pagination(Some(Pagination::default_for(book(), limits)));

        projection.set_page_totals(42);
        assert_eq!(projection.pagination().unwrap().page_totals(), Some(42));
    }
}
