//! Unit tests for query specification files
//!
//! Query files are the YAML/JSON form of the fluent builders; both must
//! describe the same tree.

#[cfg(test)]
mod query_file_tests {
    use criteria_sql::criteria::{
        JoinKind, LockMode, MatchMode, Order, Projection, QuerySpecification,
    };
    use criteria_sql::{Criterion, ResultTransformer, Value};

    #[test]
    fn test_yaml_query_matches_builder() {
        let yaml = r#"
entity: Order
alias: o
sub_nodes:
  - { path: items, alias: i }
restrictions:
  - { kind: compare, property: status, op: eq, value: OPEN }
  - { kind: between, property: total, low: 10, high: 20.5 }
orderings:
  - { property: total, ascending: false }
"#;
        let parsed: QuerySpecification = serde_yaml::from_str(yaml).unwrap();
        let built = QuerySpecification::aliased("Order", "o")
            .join("items", "i")
            .add(Criterion::eq("status", "OPEN"))
            .add(Criterion::between("total", 10, 20.5))
            .order_by(Order::desc("total"));
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_yaml_values_keep_their_kind() {
        let yaml = r#"
entity: Order
restrictions:
  - { kind: in, property: placedOn, values: [2024-03-01, 2024-03-02] }
  - { kind: like, property: reference, pattern: INV, match_mode: start }
"#;
        let parsed: QuerySpecification = serde_yaml::from_str(yaml).unwrap();
        match &parsed.restrictions[0] {
            Criterion::In { values, .. } => {
                assert!(values.iter().all(|v| matches!(v, Value::Date(_))));
            }
            other => panic!("unexpected criterion {:?}", other),
        }
        assert_eq!(
            parsed.restrictions[1],
            Criterion::like("reference", "INV", MatchMode::Start)
        );
    }

    #[test]
    fn test_json_query_with_options() {
        let json = r#"{
            "entity": "Order",
            "sub_nodes": [{ "path": "customer", "alias": "c", "join_kind": "left_outer" }],
            "projection": { "kind": "row_count" },
            "lock_mode": "upgrade",
            "selection": { "max_results": 50 },
            "options": { "cacheable": true, "enabled_filters": ["not_deleted"] },
            "result_transformer": "to_list"
        }"#;
        let parsed: QuerySpecification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sub_nodes[0].join_kind, JoinKind::LeftOuter);
        assert_eq!(parsed.projection, Some(Projection::RowCount));
        assert_eq!(parsed.lock_mode, LockMode::Upgrade);
        assert_eq!(parsed.selection.max_results, Some(50));
        assert!(parsed.options.cacheable);
        assert_eq!(parsed.options.enabled_filters, vec!["not_deleted".to_string()]);
        assert_eq!(parsed.result_transformer, Some(ResultTransformer::ToList));
    }

    #[test]
    fn test_unknown_criterion_kind_is_rejected() {
        let yaml = r#"
entity: Order
restrictions:
  - { kind: regex, property: status, pattern: "O.*" }
"#;
        assert!(serde_yaml::from_str::<QuerySpecification>(yaml).is_err());
    }

    #[test]
    fn test_nested_subquery_in_yaml() {
        let yaml = r#"
entity: Order
alias: o
restrictions:
  - kind: subquery
    op: exists
    query:
      entity: OrderItem
      restrictions:
        - { kind: property_compare, property: order.id, op: eq, other: o.id }
"#;
        let parsed: QuerySpecification = serde_yaml::from_str(yaml).unwrap();
        let items = QuerySpecification::new("OrderItem")
            .add(Criterion::eq_property("order.id", "o.id"));
        assert_eq!(
            parsed,
            QuerySpecification::aliased("Order", "o").add(Criterion::exists(items))
        );
    }
}
