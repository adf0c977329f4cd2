//! Integration tests for reading result rows through the projector

use super::load_sales_catalog;
use criteria_sql::config::TranslatorConfig;
use criteria_sql::criteria::AggregateFunction;
use criteria_sql::result_projector::{ResultError, TransformedRow};
use criteria_sql::{CriteriaTranslator, Projection, QuerySpecification, ResultTransformer};
use std::collections::HashMap;

fn row(columns: &[(&str, &str)]) -> HashMap<String, String> {
    columns
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_entity_row_read_by_property() {
    let catalog = load_sales_catalog();
    let query = CriteriaTranslator::new(&catalog, TranslatorConfig::default())
        .translate(&QuerySpecification::new("Tag"))
        .unwrap();
    let projector = query.projector();

    let values = projector
        .read_entities(&row(&[("tag_id0_", "7"), ("label1_", "urgent")]))
        .unwrap();
    assert_eq!(
        values,
        vec![vec![
            ("id".to_string(), "7".to_string()),
            ("label".to_string(), "urgent".to_string()),
        ]]
    );
    assert_eq!(
        projector.read_projected(&row(&[])).unwrap_err(),
        ResultError::NotProjected
    );

    let missing = projector.read_entities(&row(&[("tag_id0_", "7")])).unwrap_err();
    assert_eq!(
        missing,
        ResultError::MissingColumn {
            column: "label1_".to_string()
        }
    );
}

#[test]
fn test_projected_row_read_and_shaped() {
    let catalog = load_sales_catalog();
    let spec = QuerySpecification::new("Order").project(Projection::list(vec![
        Projection::group_property("status").with_alias("status"),
        Projection::RowCount,
        Projection::aggregate(AggregateFunction::Sum, "total").with_alias("revenue"),
    ]));
    let query = CriteriaTranslator::new(&catalog, TranslatorConfig::default())
        .translate(&spec)
        .unwrap();
    let projector = query.projector();
    assert_eq!(projector.transformer(), ResultTransformer::Projection);

    let values = projector
        .read_projected(&row(&[("y0_", "OPEN"), ("y1_", "4"), ("y2_", "99.50")]))
        .unwrap();
    assert_eq!(values, vec!["OPEN", "4", "99.50"]);

    match projector.transform(values).unwrap() {
        TransformedRow::Tuple(tuple) => assert_eq!(tuple.len(), 3),
        other => panic!("unexpected row {:?}", other),
    }
}

#[test]
fn test_distinct_root_entity_drops_repeated_roots() {
    let catalog = load_sales_catalog();
    let spec = QuerySpecification::new("Order")
        .join("items", "items")
        .transform(ResultTransformer::DistinctRootEntity);
    let query = CriteriaTranslator::new(&catalog, TranslatorConfig::default())
        .translate(&spec)
        .unwrap();

    let rows = query
        .projector()
        .transform_list(vec![
            vec!["item-1", "order-1"],
            vec!["item-2", "order-1"],
            vec!["item-3", "order-2"],
        ])
        .unwrap();
    assert_eq!(
        rows,
        vec![
            TransformedRow::Single("order-1"),
            TransformedRow::Single("order-2"),
        ]
    );
}
