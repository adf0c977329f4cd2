//! # Entity Catalog Error Types
//!
//! Errors raised while loading entity definitions and while answering
//! metadata lookups (columns, types, association targets) for the translator.
//!
//! Loading errors name the entity whose definition is broken. Lookup errors
//! name the entity and the property path that failed, so they can be surfaced
//! unchanged to the caller of the translation entry point.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("No entity definition found for `{entity}`")]
    UnknownEntity { entity: String },
    #[error("Entity `{entity}` has no property `{property}`")]
    UnknownProperty { entity: String, property: String },
    #[error("Property `{property}` of `{entity}` is not an association")]
    NotAnAssociation { entity: String, property: String },
    #[error("Association `{entity}.{property}` targets unknown entity `{target}`")]
    UnknownAssociationTarget {
        entity: String,
        property: String,
        target: String,
    },
    #[error("No fetch profile named `{profile}`")]
    UnknownFetchProfile { profile: String },
    #[error("Invalid definition for entity `{entity}`: {message}")]
    InvalidDefinition { entity: String, message: String },
    #[error("Failed to read catalog file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse catalog: {error}")]
    ConfigParseError { error: String },
}

/// Helper methods for creating errors with context information
impl CatalogError {
    pub fn invalid_definition(entity: &str, message: impl Into<String>) -> Self {
        CatalogError::InvalidDefinition {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown_property(entity: &str, property: &str) -> Self {
        CatalogError::UnknownProperty {
            entity: entity.to_string(),
            property: property.to_string(),
        }
    }

    pub fn unknown_entity(entity: &str) -> Self {
        CatalogError::UnknownEntity {
            entity: entity.to_string(),
        }
    }
}
