//! Unit tests for entity catalog loading
//!
//! Covers file loading, inheritance flattening and definition validation.

#[cfg(test)]
mod catalog_loading_tests {
    use std::io::Write;

    use criteria_sql::entity_catalog::{CatalogError, EntityCatalog, EntityMetadata};

    const SALES_CATALOG: &str = include_str!("../fixtures/sales_catalog.yaml");

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SALES_CATALOG.as_bytes()).unwrap();

        let catalog = EntityCatalog::from_yaml_file(file.path()).unwrap();
        let order = catalog.entity("Order").unwrap();
        assert_eq!(order.table, "orders");
        assert_eq!(order.subclasses, vec!["RushOrder".to_string()]);
        assert!(catalog.fetch_profile("order-with-customer").is_some());
    }

    #[test]
    fn test_missing_catalog_file() {
        let err = EntityCatalog::from_yaml_file("/nonexistent/catalog.yaml").unwrap_err();
        assert!(matches!(err, CatalogError::ConfigReadError { .. }));
    }

    #[test]
    fn test_subclass_inherits_table_and_properties() {
        let catalog = EntityCatalog::from_yaml_str(SALES_CATALOG).unwrap();
        let rush = catalog.entity("RushOrder").unwrap();
        assert_eq!(rush.table, "orders");
        assert_eq!(rush.hierarchy_root, "Order");
        assert!(rush.property("status").is_some());
        assert!(rush.property("priority").is_some());
        assert_eq!(rush.discriminator_value.as_deref(), Some("RUSH"));
    }

    #[test]
    fn test_subclass_without_root_discriminator() {
        let yaml = r#"
entities:
  - name: Animal
    table: animals
    id: { name: id, columns: animal_id, type: long }
  - name: Dog
    superclass: Animal
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("discriminator"));
    }

    #[test]
    fn test_subclass_with_own_table_is_rejected() {
        let yaml = r#"
entities:
  - name: Animal
    table: animals
    id: { name: id, columns: animal_id, type: long }
    discriminator: { column: kind }
  - name: Dog
    superclass: Animal
    table: dogs
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_invalid_column_name_is_rejected() {
        let yaml = r#"
entities:
  - name: Thing
    table: things
    id: { name: id, columns: "thing id", type: long }
"#;
        assert!(EntityCatalog::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_fetch_profile_must_name_an_association() {
        let yaml = r#"
entities:
  - name: Thing
    table: things
    id: { name: id, columns: thing_id, type: long }
    properties:
      - { name: label, columns: [label], type: string }
fetch_profiles:
  - name: broken
    fetches: [{ entity: Thing, association: label }]
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert_eq!(
            err,
            CatalogError::NotAnAssociation {
                entity: "Thing".to_string(),
                property: "label".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_yaml() {
        let err = EntityCatalog::from_yaml_str("entities: [ {").unwrap_err();
        assert!(matches!(err, CatalogError::ConfigParseError { .. }));
    }
}
