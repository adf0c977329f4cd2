//! Translation tests against the sales catalog fixture.

mod error_tests;
mod join_planning_tests;

use super::{CriteriaTranslator, TranslatedQuery, TranslationError};
use crate::config::{DialectKind, TranslatorConfig};
use crate::criteria::QuerySpecification;
use crate::entity_catalog::test_support::sales_catalog;

fn translate(spec: &QuerySpecification) -> Result<TranslatedQuery, TranslationError> {
    translate_with(spec, TranslatorConfig::default())
}

fn translate_with(
    spec: &QuerySpecification,
    config: TranslatorConfig,
) -> Result<TranslatedQuery, TranslationError> {
    let catalog = sales_catalog();
    CriteriaTranslator::new(&catalog, config).translate(spec)
}

fn translate_for(
    spec: &QuerySpecification,
    dialect: DialectKind,
) -> Result<TranslatedQuery, TranslationError> {
    translate_with(
        spec,
        TranslatorConfig {
            dialect,
            ..TranslatorConfig::default()
        },
    )
}

fn join_count(sql: &str) -> usize {
    sql.matches(" join ").count()
}
