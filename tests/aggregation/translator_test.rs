#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::{self, translate};
    use insta::assert_snapshot;
    use quarry::aggregation::{
        ColumnProjection, DefaultQueryValidator, Query, QueryTranslator, TimeGrain, ValueType,
    };
    use quarry::dictionary::{AttributeType, EntityType};
    use quarry::error::RequestError;
    use quarry::filter::RsqlDialect;
    use quarry::projection::{Attribute, EntityProjection};
    use quarry::request::RequestContext;

    fn ctx(query: &str) -> RequestContext {
        RequestContext::from_query(query)
    }

    fn aliases(columns: &[ColumnProjection]) -> Vec<&str> {
        columns.iter().map(|c| c.alias.as_str()).collect()
    }

    #[test]
    fn test_default_projection() {
        let catalog = common::catalog();
        let query = translate(&catalog, "/playerStats", ctx("")).unwrap();

        assert_eq!(query.table.name(), "playerStats");
        assert_eq!(aliases(&query.metrics), vec!["highScore", "lowScore"]);
        assert_eq!(
            aliases(&query.dimensions),
            vec!["id", "countryIsoCode", "overallRating", "countryName", "country"]
        );
        assert_eq!(query.time_dimensions.len(), 1);
        assert_eq!(query.time_dimensions[0].alias(), "recordedDate");
        assert_eq!(query.time_dimensions[0].grain, TimeGrain::Day);
        assert_eq!(query.time_dimensions[0].column.arguments["grain"].value, "day");

        let page = query.pagination.unwrap();
        assert_eq!((page.offset, page.limit), (0, 10));
        assert!(query.where_filter.is_none());
        assert!(query.having_filter.is_none());
    }

    #[test]
    fn test_requested_grain() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let validator = DefaultQueryValidator;
        let translator = QueryTranslator::new(&validator);

        let projection = EntityProjection::new(EntityType::new("playerStats"))
            .with_attribute(Attribute::new("highScore", AttributeType::Integer))
            .with_attribute(Attribute::new("recordedDate", AttributeType::Time).with_argument("grain", "MONTH"));
        let query = translator.translate(table, &projection, &ctx("")).unwrap();
        assert_eq!(query.time_dimensions[0].grain, TimeGrain::Month);

        let projection = EntityProjection::new(EntityType::new("playerStats"))
            .with_attribute(Attribute::new("highScore", AttributeType::Integer))
            .with_attribute(Attribute::new("recordedDate", AttributeType::Time).with_argument("grain", "week"));
        assert_eq!(
            translator.translate(table, &projection, &ctx("")).unwrap_err(),
            RequestError::invalid_operation("Unsupported grain week for field recordedDate")
        );
    }

    #[test]
    fn test_filter_split_and_metric_backfill() {
        let catalog = common::catalog();
        let query = translate(
            &catalog,
            "/playerStats",
            ctx("fields[playerStats]=countryIsoCode&filter=countryIsoCode==USA;highScore=gt=100"),
        )
        .unwrap();

        assert_eq!(aliases(&query.dimensions), vec!["countryIsoCode"]);
        assert_eq!(aliases(&query.metrics), vec!["highScore"]);
        assert_snapshot!(query.where_filter.as_ref().unwrap().to_string(), @"countryIsoCode IN ['USA']");
        assert_snapshot!(query.having_filter.as_ref().unwrap().to_string(), @"highScore GT ['100']");
    }

    #[test]
    fn test_aliased_metric_is_backfilled_under_its_field_name() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let validator = DefaultQueryValidator;
        let translator = QueryTranslator::new(&validator);
        let high_score = RsqlDialect::new(catalog.dictionary())
            .parse(&EntityType::new("playerStats"), "highScore[window:7]>3")
            .unwrap();

        let projection = EntityProjection::new(EntityType::new("playerStats"))
            .with_attribute(Attribute::new("highScore", AttributeType::Integer).with_alias("hs"))
            .with_attribute(Attribute::new("overallRating", AttributeType::Text))
            .with_filter(Some(high_score));
        let query = translator.translate(table, &projection, &ctx("")).unwrap();

        assert_eq!(aliases(&query.metrics), vec!["hs", "highScore"]);
        assert_eq!(query.metrics[1].name, "highScore");
        assert_eq!(query.metrics[1].arguments["window"].value, "7");
        assert!(query.metrics[0].arguments.is_empty());
    }

    #[test]
    fn test_sorting_and_pagination_are_copied() {
        let catalog = common::catalog();
        let query = translate(
            &catalog,
            "/playerStats",
            ctx("fields[playerStats]=highScore,overallRating&sort=-highScore&page[offset]=5&page[limit]=5&page[totals]"),
        )
        .unwrap();

        assert_snapshot!(query.sorting.as_ref().unwrap().to_string(), @"highScore desc");
        let page = query.pagination.unwrap();
        assert_eq!((page.offset, page.limit, page.return_totals), (5, 5, true));
    }

    #[test]
    fn test_sorting_on_unprojected_field_fails() {
        let catalog = common::catalog();
        let err = translate(
            &catalog,
            "/playerStats",
            ctx("fields[playerStats]=highScore&sort=lowScore"),
        )
        .unwrap_err();

        assert_eq!(
            err,
            RequestError::invalid_operation("Can not sort on lowScore as it is not present in query")
        );
    }

    #[test]
    fn test_table_arguments_and_bypass() {
        let catalog = common::catalog();
        let query = translate(
            &catalog,
            "/playerStats",
            ctx("").with_table_argument("rating", "good").with_bypass_cache(true),
        )
        .unwrap();

        assert_eq!(query.arguments["rating"].value, "good");
        assert!(query.bypass_cache);

        let err = translate(&catalog, "/playerStats", ctx("").with_table_argument("rating", "great")).unwrap_err();
        assert_snapshot!(
            err.to_string(),
            @"Invalid operation: Argument 'rating' for table 'playerStats' must match one of these values: [good, bad]"
        );
    }

    #[test]
    fn test_required_filter_missing() {
        let catalog = common::catalog();
        let err = translate(&catalog, "/videoGame", ctx("")).unwrap_err();

        assert_eq!(
            err,
            RequestError::bad_request("Querying videoGame requires a mandatory filter: sessionDate=ge={{start}}")
        );
    }

    #[test]
    fn test_required_column_filter_applies_when_projected() {
        let catalog = common::catalog();

        let err = translate(&catalog, "/videoGame", ctx("filter=sessionDate=ge=2020-01-01")).unwrap_err();
        assert_eq!(
            err,
            RequestError::bad_request("Querying platform requires a mandatory filter: platform=={{platform}}")
        );

        let query = translate(
            &catalog,
            "/videoGame",
            ctx("fields[videoGame]=sessions,sessionDate&filter=sessionDate=ge=2020-01-01"),
        )
        .unwrap();
        assert_eq!(query.arguments["start"].value, "2020-01-01");
        assert!(!query.arguments.contains_key("platform"));
    }

    #[test]
    fn test_template_variables_become_arguments() {
        let catalog = common::catalog();
        let query = translate(
            &catalog,
            "/videoGame",
            ctx("filter=platform=in=(pc,switch);sessionDate=ge=2020-01-01;sessions=gt=3"),
        )
        .unwrap();

        assert_eq!(query.arguments["start"].value, "2020-01-01");
        assert_eq!(query.arguments["platform"].value, "pc,switch");
        assert_snapshot!(query.having_filter.as_ref().unwrap().to_string(), @"sessions GT ['3']");
    }

    #[test]
    fn test_entity_is_not_a_table() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let validator = DefaultQueryValidator;
        let projection = EntityProjection::new(EntityType::new("book"));

        assert_eq!(
            QueryTranslator::new(&validator)
                .translate(table, &projection, &ctx(""))
                .unwrap_err(),
            RequestError::invalid_operation("Queried table is not analyticView: book")
        );
    }

    #[test]
    fn test_cache_key() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");

        let mut query = Query::new(table);
        query.metrics.push(ColumnProjection::new("highScore", "highScore", ValueType::Integer));
        assert_snapshot!(query.cache_key(), @"playerStats;{highScore;highScore;{}}{}{};;;;{}");
        assert_eq!(query.cache_key_digest().len(), 64);

        let mut bypassed = query.clone();
        bypassed.bypass_cache = true;
        assert_eq!(bypassed.cache_key(), query.cache_key());
    }

    #[test]
    fn test_cache_key_ignores_dimension_order() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let country = ColumnProjection::new("countryIsoCode", "countryIsoCode", ValueType::Text);
        let rating = ColumnProjection::new("overallRating", "overallRating", ValueType::Text);

        let mut first = Query::new(table);
        first.dimensions = vec![country.clone(), rating.clone()];
        let mut second = Query::new(table);
        second.dimensions = vec![rating, country];

        assert_eq!(first.cache_key_digest(), second.cache_key_digest());
    }

    #[test]
    fn test_cache_key_covers_filters() {
        let catalog = common::catalog();
        let usa = translate(&catalog, "/playerStats", ctx("filter=countryIsoCode==USA")).unwrap();
        let hkg = translate(&catalog, "/playerStats", ctx("filter=countryIsoCode==HKG")).unwrap();

        assert_ne!(usa.cache_key_digest(), hkg.cache_key_digest());
    }
}
