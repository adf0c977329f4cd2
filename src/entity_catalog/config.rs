/// Entity catalog configuration.
///
/// Entities are defined in YAML with the following structure:
///
/// ```yaml
/// entities:
///   - name: Order
///     table: orders
///     lazy: false
///     id: { name: id, columns: order_id, type: long }
///     properties:
///       - { name: status, columns: [status], type: string }
///       - name: customer
///         columns: [customer_id]
///         nullable: false
///         association: { kind: many_to_one, target: Customer }
///       - name: items
///         association: { kind: one_to_many, target: OrderItem, key_columns: [order_id] }
///     filters:
///       - { name: active, condition: "{alias}.deleted = 0" }
///   - name: RushOrder
///     superclass: Order          # single-table subclass, inherits table and id
///     discriminator_value: RUSH
/// fetch_profiles:
///   - name: with-customer
///     fetches: [{ entity: Order, association: customer }]
/// ```
///
/// Properties are listed, not keyed, so their order is the order used for
/// implicit join expansion and entity column selection.
use super::errors::CatalogError;
use super::schema::{
    DiscriminatorSchema, FetchProfile, FilterDefinition, IdentifierSchema, PropertySchema,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root of a catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
    #[serde(default)]
    pub fetch_profiles: Vec<FetchProfile>,
}

/// One entity as written in the catalog, before inheritance is flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    /// Omitted on single-table subclasses
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub superclass: Option<String>,
    /// Required on hierarchy roots
    #[serde(default)]
    pub id: Option<IdentifierSchema>,
    /// Declared on the hierarchy root only
    #[serde(default)]
    pub discriminator: Option<DiscriminatorSchema>,
    #[serde(default)]
    pub discriminator_value: Option<String>,
    #[serde(default = "default_lazy")]
    pub lazy: bool,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
}

fn default_lazy() -> bool {
    true
}

impl CatalogConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(content).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
            error: format!("{}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn definition(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }
}
