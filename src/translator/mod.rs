//! Criteria-to-SQL translation entry point.
//!
//! [`CriteriaTranslator::translate`] runs one translation from scratch:
//!
//! 1. Build a [`TranslationContext`]: register declared sub-nodes (aliases,
//!    target entities), plan joins, lay out the projection.
//! 2. Render the SQL text and the result mapping.
//! 3. Collect bind values and lock modes in placeholder order.
//!
//! Nothing survives between calls except the metadata and the configuration,
//! both read-only, so one translator can serve concurrent callers.

pub mod alias_registry;
pub mod context;
pub mod errors;
pub mod parameters;
pub mod path_resolver;
pub mod projected;

#[cfg(test)]
mod tests;

pub use context::TranslationContext;
pub use errors::TranslationError;
pub use parameters::{ParameterCollector, QueryParameters};

use crate::config::TranslatorConfig;
use crate::criteria::QuerySpecification;
use crate::entity_catalog::EntityMetadata;
use crate::join_planner::DuplicateJoin;
use crate::result_projector::{ResultMapping, ResultProjector};
use crate::sql_generator::{dialect_for, Dialect, SqlRenderer};
use serde::Serialize;
use std::collections::BTreeSet;

/// Output of one translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedQuery {
    pub sql: String,
    pub parameters: QueryParameters,
    pub result_mapping: ResultMapping,
    /// Tables the statement reads
    pub query_spaces: BTreeSet<String>,
    /// Associations joined more than once
    pub duplicate_joins: Vec<DuplicateJoin>,
}

impl TranslatedQuery {
    /// Caller-visible aliases: entity aliases (root last) or projection aliases.
    pub fn aliases(&self) -> &[String] {
        self.result_mapping.aliases()
    }

    pub fn projector(&self) -> ResultProjector {
        ResultProjector::new(
            self.result_mapping.clone(),
            self.parameters.result_transformer,
        )
    }
}

pub struct CriteriaTranslator<'m> {
    metadata: &'m dyn EntityMetadata,
    config: TranslatorConfig,
    dialect: Box<dyn Dialect>,
}

impl<'m> CriteriaTranslator<'m> {
    pub fn new(metadata: &'m dyn EntityMetadata, config: TranslatorConfig) -> Self {
        let dialect = dialect_for(config.dialect);
        Self::with_dialect(metadata, config, dialect)
    }

    /// Translator rendering through a caller-supplied dialect.
    pub fn with_dialect(
        metadata: &'m dyn EntityMetadata,
        config: TranslatorConfig,
        dialect: Box<dyn Dialect>,
    ) -> Self {
        CriteriaTranslator {
            metadata,
            config,
            dialect,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn translate(&self, spec: &QuerySpecification) -> Result<TranslatedQuery, TranslationError> {
        log::debug!(
            "Translating criteria on {} ({} sub-nodes, {} restrictions)",
            spec.entity,
            spec.sub_nodes.len(),
            spec.restrictions.len()
        );
        let ctx = TranslationContext::build(spec, self.metadata, &self.config, self.dialect.as_ref())?;

        let rendered = SqlRenderer::new(&ctx).render()?;
        let parameters = ParameterCollector::new(&ctx).collect()?;
        let query_spaces = ctx.query_spaces()?;
        if !ctx.plan().duplicates.is_empty() {
            log::warn!(
                "{} association(s) joined more than once in criteria on {}",
                ctx.plan().duplicates.len(),
                spec.entity
            );
        }

        Ok(TranslatedQuery {
            sql: rendered.sql,
            parameters,
            result_mapping: rendered.result_mapping,
            query_spaces,
            duplicate_joins: ctx.plan().duplicates.clone(),
        })
    }
}
