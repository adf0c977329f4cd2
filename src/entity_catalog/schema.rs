use super::semantic_type::{AssociationKind, SemanticType};
use serde::{Deserialize, Serialize};

/// Identifier type supporting both single and composite IDs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Identifier {
    /// Single column identifier
    Single(String),
    /// Composite identifier (multiple columns)
    Composite(Vec<String>),
}

impl Identifier {
    pub fn columns(&self) -> Vec<String> {
        match self {
            Identifier::Single(col) => vec![col.clone()],
            Identifier::Composite(cols) => cols.clone(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Identifier::Composite(_))
    }
}

/// How the mapping asks for an association to be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStyle {
    /// Join when the target entity is not lazy
    #[default]
    Default,
    Join,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSchema {
    #[serde(default = "default_id_name")]
    pub name: String,
    pub columns: Identifier,
    #[serde(rename = "type", default = "default_id_type")]
    pub ty: SemanticType,
}

fn default_id_name() -> String {
    "id".to_string()
}

fn default_id_type() -> SemanticType {
    SemanticType::Long
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscriminatorSchema {
    pub column: String,
    #[serde(rename = "type", default = "default_discriminator_type")]
    pub ty: SemanticType,
}

fn default_discriminator_type() -> SemanticType {
    SemanticType::String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSchema {
    pub kind: AssociationKind,
    pub target: String,
    /// Foreign key columns on the collection side (one-to-many) or in the link table
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub join_table: Option<String>,
    /// Link-table columns pointing at the target (many-to-many)
    #[serde(default)]
    pub element_columns: Vec<String>,
    /// Inverse property on the target that owns the foreign key (one-to-one)
    #[serde(default)]
    pub mapped_by: Option<String>,
    /// SQL ordering applied to the collection rows, `{alias}` is the target alias
    #[serde(default)]
    pub order_by: Option<String>,
}

/// One mapped property. Basic properties carry a `type`, components carry
/// nested properties, associations carry an association block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(rename = "type", default)]
    pub ty: Option<SemanticType>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub natural_id: bool,
    #[serde(default)]
    pub fetch: FetchStyle,
    #[serde(default)]
    pub component: Option<Vec<PropertySchema>>,
    #[serde(default)]
    pub association: Option<AssociationSchema>,
}

fn default_true() -> bool {
    true
}

impl PropertySchema {
    pub fn basic(name: &str, column: &str, ty: SemanticType) -> Self {
        PropertySchema {
            name: name.to_string(),
            columns: vec![column.to_string()],
            ty: Some(ty),
            nullable: true,
            natural_id: false,
            fetch: FetchStyle::Default,
            component: None,
            association: None,
        }
    }

    pub fn is_component(&self) -> bool {
        self.component.is_some()
    }

    pub fn is_association(&self) -> bool {
        self.association.is_some()
    }

    /// Whether the property owns foreign key columns in the owner's table.
    pub fn has_owned_foreign_key(&self) -> bool {
        match &self.association {
            Some(assoc) => assoc.kind.is_to_one() && !self.columns.is_empty(),
            None => false,
        }
    }

    /// Columns this property selects from the owner's table.
    pub fn selectable_columns(&self) -> Vec<String> {
        match (&self.component, &self.association) {
            (Some(parts), _) => parts
                .iter()
                .flat_map(|p| p.selectable_columns())
                .collect(),
            (None, Some(_)) if self.has_owned_foreign_key() => self.columns.clone(),
            (None, Some(_)) => Vec::new(),
            (None, None) => self.columns.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    /// SQL condition; `{alias}` is replaced by the table alias
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProfileEntry {
    pub entity: String,
    pub association: String,
    /// Force an outer join regardless of nullability
    #[serde(default)]
    pub outer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProfile {
    pub name: String,
    #[serde(default)]
    pub fetches: Vec<FetchProfileEntry>,
}

impl FetchProfile {
    pub fn entry_for(&self, entity: &str, association: &str) -> Option<&FetchProfileEntry> {
        self.fetches
            .iter()
            .find(|f| f.entity == entity && f.association == association)
    }
}

/// Fully resolved entity: inheritance flattened, table and identifier known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: String,
    pub table: String,
    pub id: IdentifierSchema,
    /// Discriminator of the hierarchy this entity belongs to
    pub discriminator: Option<DiscriminatorSchema>,
    pub discriminator_value: Option<String>,
    /// Topmost entity of the hierarchy (itself for non-inheriting entities)
    pub hierarchy_root: String,
    /// All transitive subclasses, in definition order
    pub subclasses: Vec<String>,
    pub lazy: bool,
    /// Inherited properties first
    pub properties: Vec<PropertySchema>,
    pub filters: Vec<FilterDefinition>,
}

impl EntitySchema {
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn id_columns(&self) -> Vec<String> {
        self.id.columns.columns()
    }

    /// Whether `name` addresses the identifier property.
    pub fn is_identifier_name(&self, name: &str) -> bool {
        name == self.id.name || name == "id"
    }

    pub fn is_hierarchy_root(&self) -> bool {
        self.hierarchy_root == self.name
    }

    /// Property marked as natural id, in declaration order.
    pub fn natural_id_properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.properties.iter().filter(|p| p.natural_id)
    }

    /// Every column an entity row selects: identifier, owned columns, discriminator.
    pub fn select_columns(&self) -> Vec<(String, String)> {
        let mut columns: Vec<(String, String)> = self
            .id_columns()
            .into_iter()
            .map(|c| (self.id.name.clone(), c))
            .collect();
        for property in &self.properties {
            for column in property.selectable_columns() {
                columns.push((property.name.clone(), column));
            }
        }
        if let Some(disc) = &self.discriminator {
            columns.push(("class".to_string(), disc.column.clone()));
        }
        columns
    }
}
