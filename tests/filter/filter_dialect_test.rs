#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common;
    use insta::assert_snapshot;
    use quarry::catalog::Catalog;
    use quarry::dictionary::EntityType;
    use quarry::error::RequestError;
    use quarry::filter::visitor::{normalize, predicates};
    use quarry::filter::{FilterResolver, Operator, RsqlDialect};
    use quarry::request::RequestContext;

    fn book() -> EntityType {
        EntityType::new("book")
    }

    #[test]
    fn test_resolver_reads_typed_filter() {
        let catalog = common::catalog();
        let resolver = catalog.filter_resolver();
        let ctx = RequestContext::from_query("filter[book]=genre==SF;publishDate=ge=2000&filter[author]=name==Herbert");

        let expr = resolver.parse_filter_for_type(&ctx, &book()).unwrap().unwrap();
        assert_snapshot!(expr.to_string(), @"(genre IN ['SF'] AND publishDate GE ['2000'])");

        let expr = resolver
            .parse_filter_for_type(&ctx, &EntityType::new("author"))
            .unwrap()
            .unwrap();
        assert_snapshot!(expr.to_string(), @"name IN ['Herbert']");

        assert!(resolver
            .parse_filter_for_type(&ctx, &EntityType::new("publisher"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_typed_filter_needs_exactly_one_expression() {
        let catalog = common::catalog();
        let resolver = catalog.filter_resolver();
        let ctx = RequestContext::from_query("filter[book]=genre==SF&filter[book]=title==Dune");

        assert_eq!(
            resolver.parse_filter_for_type(&ctx, &book()).unwrap_err(),
            RequestError::bad_request("Exactly one RSQL expression must be defined for type : book")
        );
    }

    #[test]
    fn test_global_filter() {
        let catalog = common::catalog();
        let resolver = catalog.filter_resolver();

        let ctx = RequestContext::from_query("filter=authors.name=out=(Herbert,Asimov)");
        let expr = resolver.parse_global_filter(&ctx, &book()).unwrap().unwrap();
        assert_snapshot!(expr.to_string(), @"authors.name NOT ['Herbert', 'Asimov']");

        let ctx = RequestContext::from_query("filter=a==1&filter=b==2");
        assert_eq!(
            resolver.parse_global_filter(&ctx, &book()).unwrap_err(),
            RequestError::bad_request("There can only be a single filter query parameter")
        );
    }

    #[test]
    fn test_quoted_values_keep_reserved_characters() {
        let catalog = common::catalog();
        let dialect = RsqlDialect::new(catalog.dictionary());

        let expr = dialect.parse(&book(), r#"title=in=('Dune, Messiah',"Children (of) Dune")"#).unwrap();
        let leaves = predicates(&expr);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].values, vec!["Dune, Messiah", "Children (of) Dune"]);
    }

    #[test]
    fn test_negated_wildcard_normalizes_to_leaf() {
        let catalog = common::catalog();
        let dialect = RsqlDialect::new(catalog.dictionary());

        let expr = dialect.parse(&book(), "title!=*Dune*,genre!=SF").unwrap();
        assert_snapshot!(expr.to_string(), @"(NOT (title INFIX ['Dune']) OR genre NOT ['SF'])");
        assert_snapshot!(normalize(&expr).to_string(), @"(title NOTINFIX ['Dune'] OR genre NOT ['SF'])");
    }

    #[test]
    fn test_comparison_shorthands() {
        let catalog = common::catalog();
        let dialect = RsqlDialect::new(catalog.dictionary());
        let stats = EntityType::new("playerStats");

        let expr = dialect.parse(&stats, "highScore>100;lowScore<=5").unwrap();
        let operators: Vec<Operator> = predicates(&expr).iter().map(|p| p.operator).collect();
        assert_eq!(operators, vec![Operator::Gt, Operator::Le]);
    }

    #[test]
    fn test_selector_arguments_and_placeholders() {
        let catalog = common::catalog();
        let dialect = RsqlDialect::new(catalog.dictionary());
        let stats = EntityType::new("playerStats");

        let expr = dialect.parse(&stats, "recordedDate[grain:month]=ge={{since}}").unwrap();
        let leaf = predicates(&expr)[0];
        assert_eq!(leaf.path.last().unwrap().arguments["grain"].value, "month");
        assert_eq!(leaf.values, vec!["{{since}}"]);
    }

    #[test]
    fn test_relationship_hops_must_be_relations() {
        let catalog = common::catalog();
        let dialect = RsqlDialect::new(catalog.dictionary());

        let err = dialect.parse(&book(), "title.name==x").unwrap_err();
        assert_snapshot!(err.to_string(), @"No such association title for type book");
    }

    #[test]
    fn test_relation_filter_is_target_load_filter() {
        let model = r#"
[[entity]]
name = "book"
root = true
attributes = [{ name = "title" }]
relationships = [{ name = "reviews", target = "review", to_many = true }]

[[entity]]
name = "review"
load_filter = "approved==true"
attributes = [{ name = "approved", type = "boolean" }]
"#;
        let catalog = Catalog::from_toml(model).unwrap();
        let resolver = catalog.filter_resolver();

        assert!(resolver.load_filter_for(&book()).is_none());
        let expr = resolver.relation_filter_for(&book(), "reviews").unwrap();
        assert_snapshot!(expr.to_string(), @"approved IN ['true']");
        assert!(resolver.relation_filter_for(&book(), "title").is_none());
    }
}
