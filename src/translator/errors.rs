//! # Translation Error Types
//!
//! Every failure here is a programming or mapping error: the query names a
//! path the metadata does not have, reuses an alias, or asks for a single
//! column where the mapping has several. None are retryable, and translation
//! stops at the first one without producing partial SQL.

use crate::entity_catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Duplicate alias `{alias}`: already used for `{existing_path}`, requested again for `{path}`")]
    DuplicateAlias {
        alias: String,
        existing_path: String,
        path: String,
    },

    #[error("Association path `{path}` is joined more than once")]
    DuplicateAssociationPath { path: String },

    #[error("Could not resolve property `{path}` of `{entity}`")]
    UnresolvedPath { entity: String, path: String },

    #[error("Not an association: `{property}` of `{entity}` (while resolving `{path}`)")]
    NotAnAssociation {
        entity: String,
        property: String,
        path: String,
    },

    #[error("Property `{path}` maps to {columns} columns where exactly one is required")]
    ColumnArity { path: String, columns: usize },

    #[error("Unsupported discriminator type `{ty}` for entity `{entity}`")]
    UnsupportedDiscriminatorType { entity: String, ty: String },

    #[error("Mapping error: {0}")]
    Mapping(#[from] CatalogError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Helper methods for creating errors with context information
impl TranslationError {
    pub fn unresolved(entity: &str, path: &str) -> Self {
        TranslationError::UnresolvedPath {
            entity: entity.to_string(),
            path: path.to_string(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        TranslationError::InvalidQuery(message.into())
    }

    /// Translate a metadata lookup failure for `path` into the resolution taxonomy.
    pub fn from_lookup(error: CatalogError, path: &str) -> Self {
        match error {
            CatalogError::UnknownProperty { entity, .. } => TranslationError::UnresolvedPath {
                entity,
                path: path.to_string(),
            },
            CatalogError::NotAnAssociation { entity, property } => {
                TranslationError::NotAnAssociation {
                    entity,
                    property,
                    path: path.to_string(),
                }
            }
            other => TranslationError::Mapping(other),
        }
    }

    /// Whether resolution may be retried against an enclosing query.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            TranslationError::UnresolvedPath { .. } | TranslationError::NotAnAssociation { .. }
        )
    }
}
