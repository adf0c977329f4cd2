use super::alias_registry::ROOT_NODE;
use super::context::TranslationContext;
use super::errors::TranslationError;
use crate::criteria::{AggregateFunction, Projection};
use crate::entity_catalog::SemanticType;

/// One projected value: its caller-visible alias, the SQL column aliases it
/// occupies and its result type.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedColumn {
    /// Index of the projection leaf producing this entry
    pub leaf: usize,
    pub alias: Option<String>,
    pub column_aliases: Vec<String>,
    pub ty: SemanticType,
}

/// Select-list layout of a projection, computed once per translation so that
/// rendering, alias lookup and result mapping agree on positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionLayout {
    pub entries: Vec<ProjectedColumn>,
}

impl ProjectionLayout {
    pub fn build(projection: &Projection, ctx: &TranslationContext<'_>) -> Result<Self, TranslationError> {
        let mut entries = Vec::new();
        let mut position = 0usize;

        for (leaf, (projection, alias)) in projection.leaves().into_iter().enumerate() {
            match projection {
                Projection::Sql {
                    column_aliases,
                    types,
                    ..
                }
                | Projection::SqlGroup {
                    column_aliases,
                    types,
                    ..
                } => {
                    if column_aliases.len() != types.len() {
                        return Err(TranslationError::invalid_query(format!(
                            "SQL projection declares {} column aliases but {} types",
                            column_aliases.len(),
                            types.len()
                        )));
                    }
                    for (i, (column, ty)) in column_aliases.iter().zip(types).enumerate() {
                        let visible = match alias {
                            Some(alias) if i == 0 => alias.to_string(),
                            _ => column.clone(),
                        };
                        entries.push(ProjectedColumn {
                            leaf,
                            alias: Some(visible),
                            column_aliases: vec![column.clone()],
                            ty: ty.clone(),
                        });
                    }
                    position += column_aliases.len();
                }
                _ => {
                    let span = leaf_span(projection, ctx)?;
                    let column_aliases: Vec<String> =
                        (position..position + span).map(|p| format!("y{}_", p)).collect();
                    position += span;
                    entries.push(ProjectedColumn {
                        leaf,
                        alias: alias.map(str::to_string),
                        column_aliases,
                        ty: leaf_type(projection, ctx)?,
                    });
                }
            }
        }
        Ok(ProjectionLayout { entries })
    }

    pub fn entry(&self, alias: &str) -> Option<&ProjectedColumn> {
        self.entries
            .iter()
            .find(|e| e.alias.as_deref() == Some(alias))
    }

    /// Column aliases of the given projection leaf.
    pub fn leaf_columns(&self, leaf: usize) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.leaf == leaf)
            .flat_map(|e| e.column_aliases.iter().cloned())
            .collect()
    }

    /// Caller-visible alias per entry: the given alias, else the first column alias.
    pub fn aliases(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match &e.alias {
                Some(alias) => alias.clone(),
                None => e.column_aliases.first().cloned().unwrap_or_default(),
            })
            .collect()
    }

    pub fn column_aliases(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| e.column_aliases.iter().cloned())
            .collect()
    }

    pub fn types(&self) -> Vec<SemanticType> {
        self.entries.iter().map(|e| e.ty.clone()).collect()
    }
}

fn leaf_span(projection: &Projection, ctx: &TranslationContext<'_>) -> Result<usize, TranslationError> {
    Ok(match projection {
        Projection::Property { property } | Projection::GroupProperty { property } => {
            ctx.columns(ROOT_NODE, property)?.len()
        }
        Projection::Id => ctx.identifier_columns(ROOT_NODE)?.len(),
        _ => 1,
    })
}

fn leaf_type(projection: &Projection, ctx: &TranslationContext<'_>) -> Result<SemanticType, TranslationError> {
    Ok(match projection {
        Projection::Property { property } | Projection::GroupProperty { property } => {
            ctx.type_of(ROOT_NODE, property)?
        }
        Projection::Id => ctx.identifier_type(ROOT_NODE)?,
        Projection::RowCount | Projection::Count { .. } => SemanticType::Long,
        Projection::Aggregate { function, property } => {
            let ty = ctx.type_of(ROOT_NODE, property)?;
            match function {
                AggregateFunction::Avg => SemanticType::Double,
                AggregateFunction::Sum => match ty {
                    SemanticType::Integer | SemanticType::Long => SemanticType::Long,
                    SemanticType::Double => SemanticType::Double,
                    other => other,
                },
                AggregateFunction::Min | AggregateFunction::Max => ty,
            }
        }
        other => {
            return Err(TranslationError::invalid_query(format!(
                "projection {:?} is not a leaf",
                other
            )))
        }
    })
}
