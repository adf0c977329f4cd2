//! Criteria SQL - translate criteria queries over mapped entities into SQL
//!
//! This crate turns a caller-built criteria tree into one parameterized SQL
//! statement plus everything needed to run it and read its rows:
//! - Entity metadata catalogs (tables, columns, associations, inheritance)
//! - Alias registration and property path resolution
//! - Join planning, including implicit fetch joins and fetch profiles
//! - Dialect-aware SQL rendering with ordered bind values
//! - Result row projection back to caller-visible aliases

pub mod config;
pub mod criteria;
pub mod entity_catalog;
pub mod join_planner;
pub mod result_projector;
pub mod sql_generator;
pub mod translator;

pub use config::{DialectKind, TranslatorConfig};
pub use criteria::{Criterion, Order, Projection, QuerySpecification, SubNode, Value};
pub use entity_catalog::{EntityCatalog, EntityMetadata};
pub use result_projector::{ResultProjector, ResultTransformer};
pub use translator::{CriteriaTranslator, TranslatedQuery, TranslationError};
