//! Integration tests - catalog file, query files and translation together
//!
//! These tests load the sales catalog fixture from disk and drive the public
//! translation entry point the way an embedding caller would.

mod concurrent_translation_tests;
mod result_projection_tests;
mod translation_tests;

use criteria_sql::EntityCatalog;

pub(crate) const SALES_CATALOG_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/rust/fixtures/sales_catalog.yaml");

pub(crate) fn load_sales_catalog() -> EntityCatalog {
    EntityCatalog::from_yaml_file(SALES_CATALOG_PATH).expect("sales catalog fixture loads")
}
