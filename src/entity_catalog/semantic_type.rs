use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an association property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl AssociationKind {
    /// To-one associations yield a single target row per owner row.
    pub fn is_to_one(&self) -> bool {
        matches!(self, AssociationKind::ManyToOne | AssociationKind::OneToOne)
    }

    pub fn is_collection(&self) -> bool {
        !self.is_to_one()
    }
}

/// Identity of an association: which property of which entity, pointing where.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationType {
    pub kind: AssociationKind,
    /// Entity declaring the property
    pub owner: String,
    /// Property path within the owner (component segments included)
    pub role: String,
    pub target: String,
}

impl AssociationType {
    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }
}

/// Semantic type attached to every bound value and projected column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Boolean,
    Integer,
    Long,
    Double,
    Decimal,
    String,
    Character,
    Date,
    Timestamp,
    Binary,
    /// Embedded value object; carries the property path
    Component(String),
    Association(AssociationType),
    /// The `class` pseudo-property of a discriminated hierarchy
    Class,
}

impl SemanticType {
    pub fn is_association(&self) -> bool {
        matches!(self, SemanticType::Association(_))
    }

    pub fn is_component(&self) -> bool {
        matches!(self, SemanticType::Component(_))
    }

    /// Whether discriminator values of this type have a string form that
    /// converts back unchanged.
    pub fn is_discriminator_capable(&self) -> bool {
        matches!(
            self,
            SemanticType::String
                | SemanticType::Character
                | SemanticType::Integer
                | SemanticType::Long
                | SemanticType::Boolean
        )
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Long)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Boolean => write!(f, "boolean"),
            SemanticType::Integer => write!(f, "integer"),
            SemanticType::Long => write!(f, "long"),
            SemanticType::Double => write!(f, "double"),
            SemanticType::Decimal => write!(f, "decimal"),
            SemanticType::String => write!(f, "string"),
            SemanticType::Character => write!(f, "character"),
            SemanticType::Date => write!(f, "date"),
            SemanticType::Timestamp => write!(f, "timestamp"),
            SemanticType::Binary => write!(f, "binary"),
            SemanticType::Component(role) => write!(f, "component({})", role),
            SemanticType::Association(assoc) => {
                write!(f, "association({}.{} -> {})", assoc.owner, assoc.role, assoc.target)
            }
            SemanticType::Class => write!(f, "class"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_types() {
        assert!(SemanticType::Integer.is_integral());
        assert!(SemanticType::Long.is_integral());
        assert!(!SemanticType::Decimal.is_integral());
        assert!(!SemanticType::Double.is_integral());
    }

    #[test]
    fn test_discriminator_capable_types() {
        assert!(SemanticType::Boolean.is_discriminator_capable());
        assert!(SemanticType::Character.is_discriminator_capable());
        assert!(!SemanticType::Double.is_discriminator_capable());
        assert!(!SemanticType::Date.is_discriminator_capable());
        assert!(!SemanticType::Binary.is_discriminator_capable());
    }
}
