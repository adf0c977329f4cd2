use crate::entity_catalog::SemanticType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Avg,
    Sum,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// Scalar or aggregate output replacing the whole-entity result shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    Property {
        property: String,
    },
    Id,
    RowCount,
    Count {
        property: String,
        #[serde(default)]
        distinct: bool,
    },
    Aggregate {
        function: AggregateFunction,
        property: String,
    },
    /// Selected and grouped by
    GroupProperty {
        property: String,
    },
    /// Raw select fragment; `{alias}` is replaced by the root table alias
    Sql {
        sql: String,
        column_aliases: Vec<String>,
        types: Vec<SemanticType>,
    },
    SqlGroup {
        sql: String,
        group_by: String,
        column_aliases: Vec<String>,
        types: Vec<SemanticType>,
    },
    Distinct {
        projection: Box<Projection>,
    },
    List {
        projections: Vec<Projection>,
    },
    /// Gives the wrapped projection a caller-visible name
    Alias {
        projection: Box<Projection>,
        alias: String,
    },
}

impl Projection {
    pub fn property(property: &str) -> Self {
        Projection::Property {
            property: property.to_string(),
        }
    }

    pub fn count(property: &str) -> Self {
        Projection::Count {
            property: property.to_string(),
            distinct: false,
        }
    }

    pub fn count_distinct(property: &str) -> Self {
        Projection::Count {
            property: property.to_string(),
            distinct: true,
        }
    }

    pub fn aggregate(function: AggregateFunction, property: &str) -> Self {
        Projection::Aggregate {
            function,
            property: property.to_string(),
        }
    }

    pub fn group_property(property: &str) -> Self {
        Projection::GroupProperty {
            property: property.to_string(),
        }
    }

    pub fn distinct(projection: Projection) -> Self {
        Projection::Distinct {
            projection: Box::new(projection),
        }
    }

    pub fn list(projections: Vec<Projection>) -> Self {
        Projection::List { projections }
    }

    pub fn sql(sql: &str, column_aliases: &[&str], types: Vec<SemanticType>) -> Self {
        Projection::Sql {
            sql: sql.to_string(),
            column_aliases: column_aliases.iter().map(|s| s.to_string()).collect(),
            types,
        }
    }

    pub fn with_alias(self, alias: &str) -> Self {
        Projection::Alias {
            projection: Box::new(self),
            alias: alias.to_string(),
        }
    }

    /// Whether any part of this projection contributes a GROUP BY term.
    pub fn is_grouped(&self) -> bool {
        match self {
            Projection::GroupProperty { .. } | Projection::SqlGroup { .. } => true,
            Projection::Distinct { projection } | Projection::Alias { projection, .. } => {
                projection.is_grouped()
            }
            Projection::List { projections } => projections.iter().any(|p| p.is_grouped()),
            _ => false,
        }
    }

    /// Leaf projections in select order, each with the alias given to it (if any).
    pub fn leaves(&self) -> Vec<(&Projection, Option<&str>)> {
        let mut out = Vec::new();
        self.collect_leaves(None, &mut out);
        out
    }

    fn collect_leaves<'p>(&'p self, alias: Option<&'p str>, out: &mut Vec<(&'p Projection, Option<&'p str>)>) {
        match self {
            Projection::List { projections } => {
                for (i, p) in projections.iter().enumerate() {
                    // An alias on a list names its first entry
                    p.collect_leaves(if i == 0 { alias } else { None }, out);
                }
            }
            Projection::Distinct { projection } => projection.collect_leaves(alias, out),
            Projection::Alias { projection, alias } => {
                projection.collect_leaves(Some(alias.as_str()), out)
            }
            leaf => out.push((leaf, alias)),
        }
    }

    /// Whether the select list starts with `distinct`.
    pub fn is_distinct(&self) -> bool {
        match self {
            Projection::Distinct { .. } => true,
            Projection::Alias { projection, .. } => projection.is_distinct(),
            _ => false,
        }
    }
}
