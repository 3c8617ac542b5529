#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common;
    use quarry::aggregation::{
        ArgumentDef, Column, ColumnProjection, DefaultQueryValidator, Query, QueryValidator, Table,
        TimeDimensionProjection, TimeGrain, ValueType,
    };
    use quarry::catalog::Catalog;
    use quarry::dictionary::EntityType;
    use quarry::filter::{FilterExpression, RsqlDialect};
    use quarry::projection::Argument;
    use quarry::sorting::Sorting;

    fn stats() -> EntityType {
        EntityType::new("playerStats")
    }

    fn filter(catalog: &Catalog, text: &str) -> Option<FilterExpression> {
        Some(RsqlDialect::new(catalog.dictionary()).parse(&stats(), text).unwrap())
    }

    fn metric(name: &str) -> ColumnProjection {
        ColumnProjection::new(name, name, ValueType::Integer)
    }

    fn dimension(name: &str) -> ColumnProjection {
        ColumnProjection::new(name, name, ValueType::Text)
    }

    /// highScore by countryIsoCode and day.
    fn base_query(table: &Table) -> Query<'_> {
        let mut query = Query::new(table);
        query.metrics.push(metric("highScore"));
        query.dimensions.push(dimension("countryIsoCode"));
        query.time_dimensions.push(TimeDimensionProjection::new(
            ColumnProjection::new("recordedDate", "recordedDate", ValueType::Time),
            TimeGrain::Day,
        ));
        query
    }

    fn validate(query: &Query<'_>) -> String {
        match DefaultQueryValidator.validate(query) {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_valid_query() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        query.where_filter = filter(&catalog, "countryIsoCode=in=(HKG,USA)");
        query.having_filter = filter(&catalog, "highScore>100");

        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_only_id_projected() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = Query::new(table);
        query.dimensions.push(ColumnProjection::new("id", "id", ValueType::Id));

        assert_eq!(validate(&query), "Invalid operation: Cannot query a table only by ID");
    }

    #[test]
    fn test_where_traversal_rejected() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        query.where_filter = filter(&catalog, "country.isoCode==HKG");

        assert_eq!(
            validate(&query),
            "Invalid operation: Relationship traversal not supported for analytic queries."
        );
    }

    #[test]
    fn test_where_values_allow_list() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        query.where_filter = filter(&catalog, "countryIsoCode=in=(USA,GBR)");

        assert_eq!(
            validate(&query),
            "Invalid operation: Column 'countryIsoCode' values must match one of these values: [HKG, USA]"
        );
    }

    #[test]
    fn test_having_metric_must_be_projected() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        query.having_filter = filter(&catalog, "lowScore<3");

        assert_eq!(
            validate(&query),
            "Invalid operation: Post aggregation filtering on 'lowScore' requires the field to be projected in the response"
        );
    }

    #[test]
    fn test_having_metric_arguments_must_match() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        query.having_filter = filter(&catalog, "highScore[window:7]>3");

        assert_eq!(
            validate(&query),
            "Invalid operation: Post aggregation filtering on 'highScore' requires the field to be projected in the response with matching arguments"
        );

        query.metrics[0].arguments.insert("window".to_string(), Argument::new("window", "7"));
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_having_dimension_must_be_grouped() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        query.having_filter = filter(&catalog, "overallRating==good,highScore>3");

        assert_eq!(
            validate(&query),
            "Invalid operation: Dimension field overallRating must be grouped before filtering in having clause."
        );

        query.dimensions.push(dimension("overallRating"));
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_having_dimension_arguments_must_match() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        let mut country_name = dimension("countryName");
        country_name
            .arguments
            .insert("format".to_string(), Argument::new("format", "lower"));
        query.dimensions.push(country_name);

        query.having_filter = filter(&catalog, "countryName[format:upper]==x,highScore>3");
        assert_eq!(
            validate(&query),
            "Invalid operation: Post aggregation filtering on 'countryName' requires the field to be projected in the response with matching arguments"
        );

        query.having_filter = filter(&catalog, "countryName==x,highScore>3");
        assert_eq!(
            validate(&query),
            "Invalid operation: Post aggregation filtering on 'countryName' requires the field to be projected in the response with matching arguments"
        );

        query.having_filter = filter(&catalog, "countryName[format:lower]==x,highScore>3");
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_having_time_dimension_grain() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);

        query.having_filter = filter(&catalog, "recordedDate[grain:month]=ge=2020-01,highScore>3");
        assert_eq!(
            validate(&query),
            "Invalid operation: Time Dimension field recordedDate must use the same grain argument in the projection and the having clause."
        );

        query.having_filter = filter(&catalog, "recordedDate[grain:day]=ge=2020-01-01,highScore>3");
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_sorting_rules() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);

        query.sorting = Some(Sorting::parse(catalog.dictionary(), &stats(), &["-lowScore".to_string()]).unwrap());
        assert_eq!(
            validate(&query),
            "Invalid operation: Can not sort on lowScore as it is not present in query"
        );

        query.dimensions.push(ColumnProjection::new("id", "id", ValueType::Id));
        query.sorting = Some(Sorting::parse(catalog.dictionary(), &stats(), &["id".to_string()]).unwrap());
        assert_eq!(validate(&query), "Invalid operation: Sorting on id field is not permitted");

        query.sorting = Some(Sorting::parse(catalog.dictionary(), &stats(), &["-highScore".to_string()]).unwrap());
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_table_arguments() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);

        query.arguments.insert("rating".to_string(), Argument::new("rating", "excellent"));
        assert_eq!(
            validate(&query),
            "Invalid operation: Argument 'rating' for table 'playerStats' must match one of these values: [good, bad]"
        );

        query.arguments.insert("rating".to_string(), Argument::new("rating", "good"));
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_required_table_argument() {
        let table = Table::new("sales")
            .with_column(Column::metric("revenue", ValueType::Decimal))
            .with_column(Column::dimension("region", ValueType::Text))
            .with_argument(ArgumentDef::new("currency", ValueType::Text).required());
        let mut query = Query::new(&table);
        query.metrics.push(ColumnProjection::new("revenue", "revenue", ValueType::Decimal));

        assert_eq!(
            validate(&query),
            "Invalid operation: Argument 'currency' for table 'sales' is required"
        );

        query.arguments.insert("currency".to_string(), Argument::new("currency", "USD"));
        assert_eq!(validate(&query), "ok");

        query.arguments.insert("currency".to_string(), Argument::new("currency", "US D"));
        assert_eq!(
            validate(&query),
            "Invalid operation: Argument 'currency' for table 'sales' has an invalid value: US D"
        );

        let defaulted = Table::new("sales")
            .with_column(Column::metric("revenue", ValueType::Decimal))
            .with_argument(ArgumentDef::new("currency", ValueType::Text).required().with_default("USD"));
        let mut query = Query::new(&defaulted);
        query.metrics.push(ColumnProjection::new("revenue", "revenue", ValueType::Decimal));
        assert_eq!(validate(&query), "ok");
    }

    #[test]
    fn test_column_arguments() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");
        let mut query = base_query(table);
        let mut country_name = dimension("countryName");
        country_name
            .arguments
            .insert("format".to_string(), Argument::new("format", "title"));
        query.dimensions.push(country_name);

        assert_eq!(
            validate(&query),
            "Invalid operation: Argument 'format' for column 'countryName' must match one of these values: [lower, upper]"
        );
    }
}
