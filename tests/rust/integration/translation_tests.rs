//! Integration tests for translating query files against the fixture catalog

use super::load_sales_catalog;
use criteria_sql::config::{DialectKind, TranslatorConfig};
use criteria_sql::criteria::LockMode;
use criteria_sql::entity_catalog::SemanticType;
use criteria_sql::{
    CriteriaTranslator, QuerySpecification, TranslatedQuery, TranslationError, Value,
};
use test_case::test_case;

fn translate_yaml(
    yaml: &str,
    config: TranslatorConfig,
) -> Result<TranslatedQuery, TranslationError> {
    let catalog = load_sales_catalog();
    let spec: QuerySpecification = serde_yaml::from_str(yaml).expect("query file parses");
    CriteriaTranslator::new(&catalog, config).translate(&spec)
}

#[test]
fn test_query_file_with_join_and_restriction() {
    let yaml = r#"
entity: Order
sub_nodes:
  - { path: items, alias: items }
restrictions:
  - { kind: compare, property: status, op: eq, value: OPEN }
"#;
    let query = translate_yaml(yaml, TranslatorConfig::default()).unwrap();

    assert!(query.sql.ends_with(
        " from orders order_ inner join order_items items1_ on order_.order_id=items1_.order_id \
         where order_.status=? order by items1_.line_no"
    ));
    assert_eq!(query.parameters.values, vec![Value::from("OPEN")]);
    assert_eq!(query.parameters.types, vec![SemanticType::String]);
    assert_eq!(query.aliases(), ["items".to_string(), "order_".to_string()]);
}

#[test]
fn test_query_file_with_like_restriction() {
    let yaml = r#"
entity: Tag
restrictions:
  - { kind: like, property: label, pattern: urg, match_mode: start }
"#;
    let query = translate_yaml(yaml, TranslatorConfig::default()).unwrap();
    assert_eq!(
        query.sql,
        "select tag_.tag_id as tag_id0_, tag_.label as label1_ from tags tag_ where tag_.label like ?"
    );
    assert_eq!(query.parameters.values, vec![Value::from("urg%")]);
}

#[test_case(DialectKind::Postgres, " order by tag_.label asc limit 10 offset 20"; "postgres")]
#[test_case(DialectKind::Generic, " order by tag_.label asc offset 20 rows fetch next 10 rows only"; "generic")]
fn test_row_window_per_dialect(dialect: DialectKind, suffix: &str) {
    let yaml = r#"
entity: Tag
orderings:
  - { property: label }
selection: { first_result: 20, max_results: 10 }
"#;
    let config = TranslatorConfig {
        dialect,
        ..TranslatorConfig::default()
    };
    let query = translate_yaml(yaml, config).unwrap();
    assert!(query.sql.ends_with(suffix), "unexpected sql: {}", query.sql);
    assert_eq!(query.parameters.selection.first_result, Some(20));
}

#[test]
fn test_lock_modes_resolved_to_sql_aliases() {
    let yaml = r#"
entity: Order
alias: o
sub_nodes:
  - { path: items, alias: i }
lock_mode: upgrade
lock_modes: { i: upgrade_nowait }
"#;
    let config = TranslatorConfig {
        dialect: DialectKind::Postgres,
        ..TranslatorConfig::default()
    };
    let query = translate_yaml(yaml, config).unwrap();
    assert!(query.sql.ends_with(" for update of o_, i1_ nowait"));
    assert_eq!(query.parameters.lock_modes.get("o_"), Some(&LockMode::Upgrade));
    assert_eq!(
        query.parameters.lock_modes.get("i1_"),
        Some(&LockMode::UpgradeNowait)
    );
}

#[test]
fn test_query_file_errors_surface_unchanged() {
    let yaml = r#"
entity: Order
restrictions:
  - { kind: compare, property: nope, op: eq, value: 1 }
"#;
    assert_eq!(
        translate_yaml(yaml, TranslatorConfig::default()).unwrap_err(),
        TranslationError::UnresolvedPath {
            entity: "Order".to_string(),
            path: "nope".to_string(),
        }
    );
}

#[test]
fn test_json_output_shape() {
    let yaml = r#"
entity: Tag
restrictions:
  - { kind: compare, property: label, op: eq, value: urgent }
"#;
    let query = translate_yaml(yaml, TranslatorConfig::default()).unwrap();
    let json = serde_json::to_value(&query).unwrap();
    assert_eq!(json["sql"], serde_json::json!(query.sql));
    assert_eq!(json["query_spaces"], serde_json::json!(["tags"]));
    assert_eq!(json["parameters"]["values"], serde_json::json!(["urgent"]));
}
