#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common;
    use insta::assert_snapshot;
    use quarry::aggregation::{split_filter, FilterSplit};
    use quarry::catalog::Catalog;
    use quarry::dictionary::EntityType;
    use quarry::filter::visitor::normalize;
    use quarry::filter::{FilterExpression, RsqlDialect};

    fn parse(catalog: &Catalog, text: &str) -> FilterExpression {
        RsqlDialect::new(catalog.dictionary())
            .parse(&EntityType::new("playerStats"), text)
            .unwrap()
    }

    fn split(text: &str) -> FilterSplit {
        let catalog = common::catalog();
        let expr = parse(&catalog, text);
        split_filter(&expr, common::table(&catalog, "playerStats"))
    }

    fn render(expr: &Option<FilterExpression>) -> String {
        expr.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
    }

    fn sorted_conjuncts(expr: &FilterExpression) -> Vec<String> {
        let mut out: Vec<String> = expr.conjuncts().iter().map(|c| c.to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn test_and_splits_by_column_kind() {
        let split = split("countryIsoCode==USA;highScore>100;overallRating==good");

        assert_snapshot!(render(&split.where_filter), @"(countryIsoCode IN ['USA'] AND overallRating IN ['good'])");
        assert_snapshot!(render(&split.having_filter), @"highScore GT ['100']");
    }

    #[test]
    fn test_pure_where_or_stays_in_where() {
        let split = split("countryIsoCode==USA,overallRating==good");

        assert_snapshot!(render(&split.where_filter), @"(countryIsoCode IN ['USA'] OR overallRating IN ['good'])");
        assert!(split.having_filter.is_none());
    }

    #[test]
    fn test_mixed_or_moves_to_having() {
        let split = split("countryIsoCode==USA,highScore>100");

        assert!(split.where_filter.is_none());
        assert_snapshot!(render(&split.having_filter), @"(countryIsoCode IN ['USA'] OR highScore GT ['100'])");
    }

    #[test]
    fn test_mixed_or_inside_and() {
        let split = split("overallRating==good;(countryIsoCode==USA,lowScore<3)");

        assert_snapshot!(render(&split.where_filter), @"overallRating IN ['good']");
        assert_snapshot!(render(&split.having_filter), @"(countryIsoCode IN ['USA'] OR lowScore LT ['3'])");
    }

    #[test]
    fn test_negation_is_pushed_down_first() {
        let catalog = common::catalog();
        let expr = FilterExpression::not(parse(&catalog, "countryIsoCode==USA,highScore>100"));
        let split = split_filter(&expr, common::table(&catalog, "playerStats"));

        assert_snapshot!(render(&split.where_filter), @"countryIsoCode NOT ['USA']");
        assert_snapshot!(render(&split.having_filter), @"highScore LE ['100']");
    }

    #[test]
    fn test_relationship_paths_stay_in_where() {
        let split = split("country.isoCode==HKG;highScore>1");

        assert_snapshot!(render(&split.where_filter), @"country.isoCode IN ['HKG']");
        assert_snapshot!(render(&split.having_filter), @"highScore GT ['1']");
    }

    #[test]
    fn test_only_metrics() {
        let split = split("highScore>1;lowScore<9");

        assert!(split.where_filter.is_none());
        assert_snapshot!(render(&split.having_filter), @"(highScore GT ['1'] AND lowScore LT ['9'])");
    }

    #[test]
    fn test_split_preserves_conjuncts() {
        let catalog = common::catalog();
        let table = common::table(&catalog, "playerStats");

        for text in [
            "countryIsoCode==USA;highScore>100",
            "overallRating==good;lowScore<3;countryIsoCode=in=(HKG,USA);highScore>=7",
            "highScore>1;(countryIsoCode==USA,overallRating==bad)",
            "recordedDate=ge=2020-01-01;lowScore=isnull=false",
        ] {
            let original = normalize(&parse(&catalog, text));
            let split = split_filter(&original, table);
            let rejoined = FilterExpression::and_all([split.where_filter, split.having_filter]).unwrap();

            assert_eq!(sorted_conjuncts(&rejoined), sorted_conjuncts(&original), "{}", text);
        }
    }
}
