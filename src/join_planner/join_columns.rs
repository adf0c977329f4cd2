use crate::entity_catalog::{AssociationKind, CatalogError, EntityMetadata, PropertyRef};
use crate::translator::TranslationError;
use serde::Serialize;

/// Link table crossed by a many-to-many join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTable {
    pub table: String,
    /// Link columns referencing the owner's identifier
    pub owner_columns: Vec<String>,
    /// Link columns referencing the target's identifier
    pub element_columns: Vec<String>,
}

/// Column pairs equated by a join's ON clause. With a link table, the owner
/// side joins `lhs_columns = link.owner_columns` and the target side joins
/// `link.element_columns = rhs_columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinColumns {
    pub lhs_columns: Vec<String>,
    pub rhs_columns: Vec<String>,
    pub link: Option<LinkTable>,
}

impl JoinColumns {
    /// Table and columns identifying the association, used to spot the same
    /// association being joined twice.
    pub fn association_key(&self, owner_table: &str, target_table: &str, owns_key: bool) -> (String, Vec<String>) {
        match &self.link {
            Some(link) => (link.table.clone(), link.owner_columns.clone()),
            None if owns_key => (owner_table.to_string(), self.lhs_columns.clone()),
            None => (target_table.to_string(), self.rhs_columns.clone()),
        }
    }
}

/// Join columns of association `property` on `owner`.
pub fn join_columns(
    metadata: &dyn EntityMetadata,
    owner: &str,
    property: &str,
) -> Result<JoinColumns, TranslationError> {
    let located = metadata
        .property_at(owner, property)
        .map_err(|e| TranslationError::from_lookup(e, property))?;
    let (owner_schema, schema) = match located {
        PropertyRef::Property { owner, schema } => (owner, schema),
        _ => {
            return Err(TranslationError::NotAnAssociation {
                entity: owner.to_string(),
                property: property.to_string(),
                path: property.to_string(),
            })
        }
    };
    let assoc = schema
        .association
        .as_ref()
        .ok_or_else(|| TranslationError::NotAnAssociation {
            entity: owner.to_string(),
            property: property.to_string(),
            path: property.to_string(),
        })?;
    let target = metadata.entity_schema(&assoc.target)?;

    let columns = match assoc.kind {
        _ if schema.has_owned_foreign_key() => JoinColumns {
            lhs_columns: schema.columns.clone(),
            rhs_columns: target.id_columns(),
            link: None,
        },
        AssociationKind::OneToOne => match &assoc.mapped_by {
            Some(inverse) => {
                let inverse_schema = target.property(inverse).ok_or_else(|| {
                    TranslationError::Mapping(CatalogError::unknown_property(&target.name, inverse))
                })?;
                JoinColumns {
                    lhs_columns: owner_schema.id_columns(),
                    rhs_columns: inverse_schema.columns.clone(),
                    link: None,
                }
            }
            // Shared primary key
            None => JoinColumns {
                lhs_columns: owner_schema.id_columns(),
                rhs_columns: target.id_columns(),
                link: None,
            },
        },
        AssociationKind::ManyToOne => {
            return Err(CatalogError::invalid_definition(
                &owner_schema.name,
                format!("many-to-one `{}` has no foreign key columns", property),
            )
            .into())
        }
        AssociationKind::OneToMany => JoinColumns {
            lhs_columns: owner_schema.id_columns(),
            rhs_columns: assoc.key_columns.clone(),
            link: None,
        },
        AssociationKind::ManyToMany => {
            let table = assoc.join_table.clone().ok_or_else(|| {
                CatalogError::invalid_definition(
                    &owner_schema.name,
                    format!("many-to-many `{}` has no join table", property),
                )
            })?;
            JoinColumns {
                lhs_columns: owner_schema.id_columns(),
                rhs_columns: target.id_columns(),
                link: Some(LinkTable {
                    table,
                    owner_columns: assoc.key_columns.clone(),
                    element_columns: assoc.element_columns.clone(),
                }),
            }
        }
    };

    if let Some(link) = &columns.link {
        if link.owner_columns.len() != columns.lhs_columns.len()
            || link.element_columns.len() != columns.rhs_columns.len()
        {
            return Err(TranslationError::ColumnArity {
                path: property.to_string(),
                columns: link.owner_columns.len(),
            });
        }
    } else if columns.lhs_columns.len() != columns.rhs_columns.len() {
        return Err(TranslationError::ColumnArity {
            path: property.to_string(),
            columns: columns.lhs_columns.len(),
        });
    }
    Ok(columns)
}
