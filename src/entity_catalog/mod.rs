//! Entity metadata consumed by the translator.
//!
//! The translator only ever reads metadata through [`EntityMetadata`]. The
//! required methods expose flattened [`EntitySchema`]s; the provided methods
//! answer the questions translation asks (columns, types, association
//! targets, filter and discriminator fragments) on top of them. Implementors
//! must be safe to share between threads translating concurrently.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod schema;
pub mod semantic_type;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::EntityCatalog;
pub use config::{CatalogConfig, EntityDefinition};
pub use errors::CatalogError;
pub use schema::{
    AssociationSchema, DiscriminatorSchema, EntitySchema, FetchProfile, FetchProfileEntry,
    FetchStyle, FilterDefinition, Identifier, IdentifierSchema, PropertySchema,
};
pub use semantic_type::{AssociationKind, AssociationType, SemanticType};

use std::collections::BTreeSet;

/// A property path located within one entity.
#[derive(Debug, Clone, Copy)]
pub enum PropertyRef<'m> {
    /// The identifier property (by its declared name or `id`)
    Identifier(&'m EntitySchema),
    /// The `class` pseudo-property of a discriminated hierarchy
    Discriminator(&'m EntitySchema),
    Property {
        owner: &'m EntitySchema,
        schema: &'m PropertySchema,
    },
    /// `assoc.id` on a to-one association that owns its foreign key
    ForeignKeyId {
        owner: &'m EntitySchema,
        schema: &'m PropertySchema,
        target: &'m EntitySchema,
    },
}

impl<'m> PropertyRef<'m> {
    pub fn owner(&self) -> &'m EntitySchema {
        match self {
            PropertyRef::Identifier(owner) | PropertyRef::Discriminator(owner) => owner,
            PropertyRef::Property { owner, .. } | PropertyRef::ForeignKeyId { owner, .. } => owner,
        }
    }

    pub fn association_schema(&self) -> Option<&'m AssociationSchema> {
        match self {
            PropertyRef::Property { schema, .. } => schema.association.as_ref(),
            _ => None,
        }
    }
}

/// Read-only metadata contract.
pub trait EntityMetadata: Send + Sync {
    fn entity(&self, name: &str) -> Option<&EntitySchema>;

    fn fetch_profile(&self, name: &str) -> Option<&FetchProfile>;

    fn entity_schema(&self, name: &str) -> Result<&EntitySchema, CatalogError> {
        self.entity(name)
            .ok_or_else(|| CatalogError::unknown_entity(name))
    }

    /// Locate a property path within an entity. Component segments are walked;
    /// association boundaries are only crossed by the `assoc.id` shortcut.
    fn property_at(&self, entity: &str, path: &str) -> Result<PropertyRef<'_>, CatalogError> {
        let schema = self.entity_schema(entity)?;
        let segments: Vec<&str> = path.split('.').collect();

        if let [single] = segments.as_slice() {
            if schema.property(single).is_none() {
                if schema.is_identifier_name(single) {
                    return Ok(PropertyRef::Identifier(schema));
                }
                if *single == "class" && schema.discriminator.is_some() {
                    return Ok(PropertyRef::Discriminator(schema));
                }
            }
        }

        let mut properties: &[PropertySchema] = &schema.properties;
        for (i, segment) in segments.iter().enumerate() {
            let property = properties
                .iter()
                .find(|p| p.name == *segment)
                .ok_or_else(|| CatalogError::unknown_property(entity, path))?;
            if i + 1 == segments.len() {
                return Ok(PropertyRef::Property {
                    owner: schema,
                    schema: property,
                });
            }
            if let Some(parts) = &property.component {
                properties = parts;
                continue;
            }
            if let Some(assoc) = &property.association {
                let rest = &segments[i + 1..];
                if rest.len() == 1 && property.has_owned_foreign_key() {
                    let target = self.entity_schema(&assoc.target)?;
                    if target.is_identifier_name(rest[0]) {
                        return Ok(PropertyRef::ForeignKeyId {
                            owner: schema,
                            schema: property,
                            target,
                        });
                    }
                }
                return Err(CatalogError::unknown_property(entity, path));
            }
            return Err(CatalogError::NotAnAssociation {
                entity: entity.to_string(),
                property: segments[..=i].join("."),
            });
        }
        Err(CatalogError::unknown_property(entity, path))
    }

    fn columns_for(&self, entity: &str, path: &str) -> Result<Vec<String>, CatalogError> {
        Ok(match self.property_at(entity, path)? {
            PropertyRef::Identifier(owner) => owner.id_columns(),
            PropertyRef::Discriminator(owner) => owner
                .discriminator
                .as_ref()
                .map(|d| vec![d.column.clone()])
                .unwrap_or_default(),
            PropertyRef::Property { owner, schema } => {
                if schema.is_association() && !schema.has_owned_foreign_key() {
                    // Collections and inverse one-to-ones are keyed by the owner's id
                    owner.id_columns()
                } else {
                    schema.selectable_columns()
                }
            }
            PropertyRef::ForeignKeyId { schema, .. } => schema.columns.clone(),
        })
    }

    fn type_for(&self, entity: &str, path: &str) -> Result<SemanticType, CatalogError> {
        match self.property_at(entity, path)? {
            PropertyRef::Identifier(owner) => Ok(owner.id.ty.clone()),
            PropertyRef::Discriminator(_) => Ok(SemanticType::Class),
            PropertyRef::Property { owner, schema } => {
                if schema.is_component() {
                    return Ok(SemanticType::Component(path.to_string()));
                }
                if let Some(assoc) = &schema.association {
                    return Ok(SemanticType::Association(AssociationType {
                        kind: assoc.kind,
                        owner: owner.name.clone(),
                        role: path.to_string(),
                        target: assoc.target.clone(),
                    }));
                }
                schema.ty.clone().ok_or_else(|| {
                    CatalogError::invalid_definition(
                        &owner.name,
                        format!("property `{}` has no type", path),
                    )
                })
            }
            PropertyRef::ForeignKeyId { target, .. } => Ok(target.id.ty.clone()),
        }
    }

    fn associated_entity_of(&self, association: &AssociationType) -> Result<String, CatalogError> {
        match self.entity(&association.target) {
            Some(target) => Ok(target.name.clone()),
            None => Err(CatalogError::UnknownAssociationTarget {
                entity: association.owner.clone(),
                property: association.role.clone(),
                target: association.target.clone(),
            }),
        }
    }

    fn query_spaces_of(&self, entity: &str) -> Result<BTreeSet<String>, CatalogError> {
        let schema = self.entity_schema(entity)?;
        Ok(BTreeSet::from([schema.table.clone()]))
    }

    /// Enabled filter conditions for `entity`, qualified with `alias`.
    fn filter_fragment(
        &self,
        entity: &str,
        alias: &str,
        enabled_filters: &[String],
    ) -> Result<Option<String>, CatalogError> {
        let schema = self.entity_schema(entity)?;
        let conditions: Vec<String> = schema
            .filters
            .iter()
            .filter(|f| enabled_filters.iter().any(|name| *name == f.name))
            .map(|f| f.condition.replace("{alias}", alias))
            .collect();
        Ok(if conditions.is_empty() {
            None
        } else {
            Some(conditions.join(" and "))
        })
    }

    /// Subclass narrowing for entities below the root of a discriminated
    /// hierarchy: the discriminator column and the literals it may hold.
    fn discriminator_restriction(
        &self,
        entity: &str,
    ) -> Result<Option<DiscriminatorRestriction>, CatalogError> {
        let schema = self.entity_schema(entity)?;
        let disc = match &schema.discriminator {
            Some(disc) if !schema.is_hierarchy_root() => disc,
            _ => return Ok(None),
        };
        let mut literals = Vec::with_capacity(schema.subclasses.len() + 1);
        for name in std::iter::once(&schema.name).chain(&schema.subclasses) {
            let member = self.entity_schema(name)?;
            let value = member.discriminator_value.as_deref().unwrap_or(&member.name);
            literals.push(discriminator_literal(&disc.ty, value));
        }
        Ok(Some(DiscriminatorRestriction {
            column: disc.column.clone(),
            literals,
        }))
    }

    /// Alias of the table holding the identifier columns. Identity for
    /// single-table entities.
    fn root_table_alias(&self, _entity: &str, alias: &str) -> String {
        alias.to_string()
    }
}

/// Discriminator column of a subclass and its allowed literals, unqualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorRestriction {
    pub column: String,
    pub literals: Vec<String>,
}

/// SQL literal for a discriminator value of the given type.
pub fn discriminator_literal(ty: &SemanticType, value: &str) -> String {
    if ty.is_integral() && value.parse::<i64>().is_ok() {
        return value.to_string();
    }
    if *ty == SemanticType::Boolean {
        if let Ok(flag) = value.trim().to_ascii_lowercase().parse::<bool>() {
            return flag.to_string();
        }
    }
    format!("'{}'", value.replace('\'', "''"))
}
