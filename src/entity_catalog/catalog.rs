use super::config::{CatalogConfig, EntityDefinition};
use super::errors::CatalogError;
use super::schema::{EntitySchema, FetchProfile, PropertySchema};
use super::EntityMetadata;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

lazy_static! {
    /// Table or column name, optionally schema-qualified, optionally backtick-quoted
    static ref SQL_IDENTIFIER: Regex = Regex::new(
        r"^(`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*)(\.(`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*))?$"
    )
    .expect("identifier pattern compiles");

    /// Entity and property names
    static ref NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("name pattern compiles");
}

/// Entity metadata loaded from a catalog configuration.
///
/// Inheritance is flattened when the catalog is built: every entity carries
/// its hierarchy's table, identifier and discriminator plus the inherited
/// properties, so lookups never walk superclass chains.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    entities: Vec<EntitySchema>,
    index: HashMap<String, usize>,
    fetch_profiles: Vec<FetchProfile>,
}

impl EntityCatalog {
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        Self::from_config(CatalogConfig::from_yaml_str(content)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        Self::from_config(CatalogConfig::from_yaml_file(path)?)
    }

    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for def in &config.entities {
            if !NAME.is_match(&def.name) {
                return Err(CatalogError::invalid_definition(&def.name, "invalid entity name"));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(CatalogError::invalid_definition(&def.name, "defined more than once"));
            }
        }

        let mut chains: Vec<Vec<&EntityDefinition>> = Vec::with_capacity(config.entities.len());
        for def in &config.entities {
            chains.push(ancestry(&config, def)?);
        }

        let mut entities = Vec::with_capacity(config.entities.len());
        for (def, chain) in config.entities.iter().zip(&chains) {
            entities.push(flatten(&config, def, chain)?);
        }

        // Subclass lists, in definition order
        for (def, chain) in config.entities.iter().zip(&chains) {
            for ancestor in &chain[..chain.len() - 1] {
                if let Some(schema) = entities.iter_mut().find(|e| e.name == ancestor.name) {
                    schema.subclasses.push(def.name.clone());
                }
            }
        }
        for schema in &entities {
            if schema.is_hierarchy_root()
                && !schema.subclasses.is_empty()
                && schema.discriminator.is_none()
            {
                return Err(CatalogError::invalid_definition(
                    &schema.name,
                    "subclasses require a discriminator on the hierarchy root",
                ));
            }
        }

        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        let catalog = EntityCatalog {
            entities,
            index,
            fetch_profiles: config.fetch_profiles,
        };
        catalog.validate_fetch_profiles()?;

        log::debug!(
            "Loaded entity catalog: {} entities, {} fetch profiles",
            catalog.entities.len(),
            catalog.fetch_profiles.len()
        );
        Ok(catalog)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.iter()
    }

    fn validate_fetch_profiles(&self) -> Result<(), CatalogError> {
        for profile in &self.fetch_profiles {
            for fetch in &profile.fetches {
                let property = self.property_at(&fetch.entity, &fetch.association)?;
                if property.association_schema().is_none() {
                    return Err(CatalogError::NotAnAssociation {
                        entity: fetch.entity.clone(),
                        property: fetch.association.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl EntityMetadata for EntityCatalog {
    fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    fn fetch_profile(&self, name: &str) -> Option<&FetchProfile> {
        self.fetch_profiles.iter().find(|p| p.name == name)
    }
}

/// Definitions from the hierarchy root down to `def`.
fn ancestry<'c>(
    config: &'c CatalogConfig,
    def: &'c EntityDefinition,
) -> Result<Vec<&'c EntityDefinition>, CatalogError> {
    let mut chain = vec![def];
    let mut visited: HashSet<&str> = HashSet::from([def.name.as_str()]);
    let mut current = def;
    while let Some(parent_name) = &current.superclass {
        let parent = config.definition(parent_name).ok_or_else(|| {
            CatalogError::invalid_definition(
                &def.name,
                format!("unknown superclass `{}`", parent_name),
            )
        })?;
        if !visited.insert(parent.name.as_str()) {
            return Err(CatalogError::invalid_definition(
                &def.name,
                "inheritance cycle",
            ));
        }
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    Ok(chain)
}

fn flatten(
    config: &CatalogConfig,
    def: &EntityDefinition,
    chain: &[&EntityDefinition],
) -> Result<EntitySchema, CatalogError> {
    let root = chain[0];
    let is_subclass = chain.len() > 1;

    if is_subclass && def.id.is_some() {
        return Err(CatalogError::invalid_definition(
            &def.name,
            format!("identifier must be declared on hierarchy root `{}`", root.name),
        ));
    }
    if is_subclass && def.discriminator.is_some() {
        return Err(CatalogError::invalid_definition(
            &def.name,
            format!("discriminator must be declared on hierarchy root `{}`", root.name),
        ));
    }
    if is_subclass && def.table.is_some() {
        return Err(CatalogError::invalid_definition(
            &def.name,
            "only single-table inheritance is supported; subclasses cannot declare a table",
        ));
    }

    let table = root
        .table
        .clone()
        .ok_or_else(|| CatalogError::invalid_definition(&def.name, "no table declared"))?;
    check_sql_identifier(&def.name, &table)?;

    let id = root.id.clone().ok_or_else(|| {
        CatalogError::invalid_definition(&def.name, "hierarchy root declares no identifier")
    })?;
    let id_columns = id.columns.columns();
    if id_columns.is_empty() {
        return Err(CatalogError::invalid_definition(&def.name, "identifier has no columns"));
    }
    for column in &id_columns {
        check_sql_identifier(&def.name, column)?;
    }

    if let Some(disc) = &root.discriminator {
        check_sql_identifier(&def.name, &disc.column)?;
    }

    let mut properties: Vec<PropertySchema> = Vec::new();
    let mut names = HashSet::new();
    for level in chain {
        for property in &level.properties {
            if !names.insert(property.name.clone()) {
                return Err(CatalogError::invalid_definition(
                    &def.name,
                    format!("property `{}` declared more than once", property.name),
                ));
            }
            validate_property(config, &def.name, property)?;
            properties.push(property.clone());
        }
    }

    Ok(EntitySchema {
        name: def.name.clone(),
        table,
        id,
        discriminator: root.discriminator.clone(),
        discriminator_value: if root.discriminator.is_some() {
            Some(def.discriminator_value.clone().unwrap_or_else(|| def.name.clone()))
        } else {
            None
        },
        hierarchy_root: root.name.clone(),
        subclasses: Vec::new(),
        lazy: def.lazy,
        properties,
        filters: chain.iter().flat_map(|d| d.filters.iter().cloned()).collect(),
    })
}

fn validate_property(
    config: &CatalogConfig,
    entity: &str,
    property: &PropertySchema,
) -> Result<(), CatalogError> {
    let invalid = |message: &str| {
        CatalogError::invalid_definition(entity, format!("property `{}`: {}", property.name, message))
    };

    if !NAME.is_match(&property.name) {
        return Err(invalid("invalid property name"));
    }
    for column in &property.columns {
        check_sql_identifier(entity, column)?;
    }

    match (&property.component, &property.association) {
        (Some(_), Some(_)) => Err(invalid("cannot be both a component and an association")),
        (Some(parts), None) => {
            if parts.is_empty() {
                return Err(invalid("component has no properties"));
            }
            for part in parts {
                validate_property(config, entity, part)?;
            }
            Ok(())
        }
        (None, Some(assoc)) => {
            if config.definition(&assoc.target).is_none() {
                return Err(CatalogError::UnknownAssociationTarget {
                    entity: entity.to_string(),
                    property: property.name.clone(),
                    target: assoc.target.clone(),
                });
            }
            for column in assoc.key_columns.iter().chain(&assoc.element_columns) {
                check_sql_identifier(entity, column)?;
            }
            use super::semantic_type::AssociationKind::*;
            match assoc.kind {
                ManyToOne if property.columns.is_empty() => {
                    Err(invalid("many-to-one needs foreign key columns"))
                }
                OneToMany if assoc.key_columns.is_empty() => {
                    Err(invalid("one-to-many needs key columns"))
                }
                ManyToMany
                    if assoc.join_table.is_none()
                        || assoc.key_columns.is_empty()
                        || assoc.element_columns.is_empty() =>
                {
                    Err(invalid(
                        "many-to-many needs a join table, key columns and element columns",
                    ))
                }
                _ => {
                    if let Some(table) = &assoc.join_table {
                        check_sql_identifier(entity, table)?;
                    }
                    Ok(())
                }
            }
        }
        (None, None) => {
            if property.columns.is_empty() {
                return Err(invalid("no columns"));
            }
            if property.ty.is_none() {
                return Err(invalid("no type"));
            }
            Ok(())
        }
    }
}

fn check_sql_identifier(entity: &str, identifier: &str) -> Result<(), CatalogError> {
    if SQL_IDENTIFIER.is_match(identifier) {
        Ok(())
    } else {
        Err(CatalogError::invalid_definition(
            entity,
            format!("`{}` is not a valid SQL identifier", identifier),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_catalog::test_support::sales_catalog;

    #[test]
    fn test_flattens_single_table_subclass() {
        let catalog = sales_catalog();
        let rush = catalog.entity("RushOrder").unwrap();

        assert_eq!(rush.table, "orders");
        assert_eq!(rush.hierarchy_root, "Order");
        assert_eq!(rush.discriminator_value.as_deref(), Some("RUSH"));
        // Inherited properties come first
        assert_eq!(rush.properties.first().unwrap().name, "status");
        assert_eq!(rush.properties.last().unwrap().name, "priority");
        assert_eq!(rush.filters.len(), 1);

        let order = catalog.entity("Order").unwrap();
        assert_eq!(order.subclasses, vec!["RushOrder".to_string()]);
        assert!(order.is_hierarchy_root());
    }

    #[test]
    fn test_lazy_defaults_to_true() {
        let catalog = sales_catalog();
        assert!(catalog.entity("Customer").unwrap().lazy);
        assert!(!catalog.entity("Region").unwrap().lazy);
    }

    #[test]
    fn test_unknown_superclass() {
        let yaml = r#"
entities:
  - name: Child
    superclass: Missing
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDefinition { ref entity, .. } if entity == "Child"));
    }

    #[test]
    fn test_inheritance_cycle() {
        let yaml = r#"
entities:
  - { name: A, superclass: B }
  - { name: B, superclass: A }
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("inheritance cycle"));
    }

    #[test]
    fn test_unknown_association_target() {
        let yaml = r#"
entities:
  - name: Order
    table: orders
    id: { columns: order_id }
    properties:
      - name: customer
        columns: [customer_id]
        association: { kind: many_to_one, target: Nobody }
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownAssociationTarget {
                entity: "Order".to_string(),
                property: "customer".to_string(),
                target: "Nobody".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_bad_column_identifier() {
        let yaml = r#"
entities:
  - name: Order
    table: orders
    id: { columns: "order id" }
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("not a valid SQL identifier"));
    }

    #[test]
    fn test_accepts_quoted_and_qualified_tables() {
        let yaml = r#"
entities:
  - name: Order
    table: "sales.`order`"
    id: { columns: order_id }
"#;
        let catalog = EntityCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.entity("Order").unwrap().table, "sales.`order`");
    }

    #[test]
    fn test_subclasses_need_discriminator() {
        let yaml = r#"
entities:
  - { name: Animal, table: animals, id: { columns: animal_id } }
  - { name: Dog, superclass: Animal }
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("discriminator"));
    }

    #[test]
    fn test_fetch_profile_must_name_association() {
        let yaml = r#"
entities:
  - name: Order
    table: orders
    id: { columns: order_id }
    properties:
      - { name: status, columns: [status], type: string }
fetch_profiles:
  - name: broken
    fetches: [{ entity: Order, association: status }]
"#;
        let err = EntityCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::NotAnAssociation { .. }));
    }

    #[test]
    fn test_from_yaml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "entities:\n  - {{ name: Tag, table: tags, id: {{ columns: tag_id }} }}\n"
        )
        .unwrap();

        let catalog = EntityCatalog::from_yaml_file(file.path()).unwrap();
        assert_eq!(catalog.entities().count(), 1);
        assert!(EntityCatalog::from_yaml_file("/nonexistent/catalog.yaml").is_err());
    }
}
