use super::translate;
use crate::config::TranslatorConfig;
use crate::criteria::{Criterion, Projection, QuerySpecification, Value};
use crate::entity_catalog::{CatalogError, EntityCatalog, SemanticType};
use crate::translator::{CriteriaTranslator, TranslatedQuery, TranslationError};

#[test]
fn test_single_column_comparison_on_multi_column_property() {
    let spec = QuerySpecification::new("Invoice").add(Criterion::eq("period", "2024-01-01"));
    assert_eq!(
        translate(&spec).unwrap_err(),
        TranslationError::ColumnArity {
            path: "period".to_string(),
            columns: 2,
        }
    );
}

#[test]
fn test_count_of_multi_column_property() {
    let spec = QuerySpecification::new("Invoice").project(Projection::count("period"));
    assert!(matches!(
        translate(&spec),
        Err(TranslationError::ColumnArity { columns: 2, .. })
    ));
}

#[test]
fn test_boolean_discriminator_binds_as_boolean() {
    let spec = QuerySpecification::new("Flagged").add(Criterion::eq("class", "SpecialFlagged"));
    let query = translate(&spec).unwrap();
    assert!(query.sql.ends_with(" where flagged_.is_special=?"));
    assert_eq!(query.parameters.values, vec![Value::Bool(true)]);
    assert_eq!(query.parameters.types, vec![SemanticType::Boolean]);
}

#[test]
fn test_decimal_discriminator_cannot_be_compared() {
    let catalog = EntityCatalog::from_yaml_str(
        r#"
entities:
  - name: Rate
    table: rates
    id: { name: id, columns: rate_id, type: long }
    discriminator: { column: band, type: decimal }
    discriminator_value: "1.0"
  - name: HighRate
    superclass: Rate
    discriminator_value: "2.5"
"#,
    )
    .unwrap();
    let spec = QuerySpecification::new("Rate").add(Criterion::eq("class", "HighRate"));
    assert_eq!(
        CriteriaTranslator::new(&catalog, TranslatorConfig::default())
            .translate(&spec)
            .unwrap_err(),
        TranslationError::UnsupportedDiscriminatorType {
            entity: "Rate".to_string(),
            ty: "decimal".to_string(),
        }
    );
}

#[test]
fn test_size_of_non_collection() {
    let spec = QuerySpecification::new("Order").add(Criterion::size_eq("customer", 1));
    assert!(matches!(
        translate(&spec),
        Err(TranslationError::InvalidQuery(_))
    ));
}

#[test]
fn test_alias_reused_for_another_path() {
    let spec = QuerySpecification::new("Order")
        .join("items", "x")
        .join("tags", "x");
    match translate(&spec).unwrap_err() {
        TranslationError::DuplicateAlias { alias, path, .. } => {
            assert_eq!(alias, "x");
            assert_eq!(path, "tags");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_sub_node_alias_clashing_with_root() {
    let spec = QuerySpecification::aliased("Order", "o").join("items", "o");
    assert!(matches!(
        translate(&spec),
        Err(TranslationError::DuplicateAlias { .. })
    ));
}

#[test]
fn test_path_joined_twice() {
    let spec = QuerySpecification::new("Order")
        .join("items", "a")
        .join("items", "b");
    assert_eq!(
        translate(&spec).unwrap_err(),
        TranslationError::DuplicateAssociationPath {
            path: "items".to_string(),
        }
    );
}

#[test]
fn test_unresolved_path() {
    let spec = QuerySpecification::new("Order").add(Criterion::eq("nope", 1));
    assert_eq!(
        translate(&spec).unwrap_err(),
        TranslationError::UnresolvedPath {
            entity: "Order".to_string(),
            path: "nope".to_string(),
        }
    );
}

#[test]
fn test_join_through_basic_property() {
    let spec = QuerySpecification::new("Order").join("status", "s");
    assert!(matches!(
        translate(&spec),
        Err(TranslationError::NotAnAssociation { .. })
    ));

    let dotted = QuerySpecification::new("Order").add(Criterion::eq("status.length", 3));
    assert!(matches!(
        translate(&dotted),
        Err(TranslationError::NotAnAssociation { .. })
    ));
}

#[test]
fn test_unjoined_association_property() {
    // Only the identifier of an unjoined association can be read
    let spec = QuerySpecification::new("Order").add(Criterion::eq("customer.name", "Acme"));
    assert!(matches!(
        translate(&spec),
        Err(TranslationError::UnresolvedPath { .. })
    ));
}

#[test]
fn test_unknown_entity_and_fetch_profile() {
    let spec = QuerySpecification::new("Ghost");
    assert_eq!(
        translate(&spec).unwrap_err(),
        TranslationError::Mapping(CatalogError::unknown_entity("Ghost"))
    );

    let spec = QuerySpecification::new("Order").enable_fetch_profile("everything");
    assert_eq!(
        translate(&spec).unwrap_err(),
        TranslationError::Mapping(CatalogError::UnknownFetchProfile {
            profile: "everything".to_string(),
        })
    );
}

#[test]
fn test_composite_id_needs_list() {
    let spec = QuerySpecification::new("Invoice").add(Criterion::id_eq(7));
    assert!(matches!(
        translate(&spec),
        Err(TranslationError::InvalidQuery(_))
    ));
}

const LEVELED_CATALOG: &str = r#"
entities:
  - name: Account
    table: accounts
    id: { name: id, columns: account_id, type: long }
    discriminator: { column: level, type: integer }
    discriminator_value: "1"
  - name: GoldAccount
    superclass: Account
    discriminator_value: "2"
  - name: LegacyAccount
    superclass: Account
    discriminator_value: "2.5"
"#;

fn translate_accounts(
    spec: &QuerySpecification,
) -> Result<TranslatedQuery, TranslationError> {
    let catalog = EntityCatalog::from_yaml_str(LEVELED_CATALOG).unwrap();
    CriteriaTranslator::new(&catalog, TranslatorConfig::default()).translate(spec)
}

#[test]
fn test_integer_discriminator_binds_as_integer() {
    let spec = QuerySpecification::new("Account").add(Criterion::eq("class", "GoldAccount"));
    let query = translate_accounts(&spec).unwrap();
    assert!(query.sql.ends_with(" where account_.level=?"));
    assert_eq!(query.parameters.values, vec![Value::Int(2)]);
    assert_eq!(query.parameters.types, vec![SemanticType::Integer]);
}

#[test]
fn test_fractional_value_for_integer_discriminator() {
    let spec = QuerySpecification::new("Account").add(Criterion::eq("class", "LegacyAccount"));
    assert!(matches!(
        translate_accounts(&spec),
        Err(TranslationError::InvalidQuery(_))
    ));
}
