use super::EntityCatalog;

pub(crate) const SALES_CATALOG_YAML: &str =
    include_str!("../../tests/rust/fixtures/sales_catalog.yaml");

pub(crate) fn sales_catalog() -> EntityCatalog {
    EntityCatalog::from_yaml_str(SALES_CATALOG_YAML).expect("sales catalog fixture loads")
}
