//! Mapping result rows back to caller-visible names.
//!
//! Entity queries yield one tuple element per selected entity, association
//! aliases first and the root last. Projected queries yield one value per
//! projection entry. A [`ResultTransformer`] (or a caller closure) turns each
//! tuple into the final row shape.

pub mod errors;

pub use errors::ResultError;

use crate::entity_catalog::SemanticType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Built-in row shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTransformer {
    /// The root entity (last tuple element)
    RootEntity,
    /// Root entity, duplicates removed from the list
    DistinctRootEntity,
    /// Alias -> tuple element
    AliasToEntityMap,
    /// Single value for one-entry tuples, the tuple otherwise
    Projection,
    /// The tuple as a list
    ToList,
}

impl ResultTransformer {
    pub fn default_for(projected: bool) -> Self {
        if projected {
            ResultTransformer::Projection
        } else {
            ResultTransformer::RootEntity
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedColumn {
    pub property: String,
    pub column: String,
    /// Alias of the column in the select list
    pub column_alias: String,
}

/// Columns selected for one entity alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityColumns {
    pub alias: String,
    pub sql_alias: String,
    pub entity: String,
    pub columns: Vec<SelectedColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultMapping {
    Entities {
        /// Visible aliases, root last
        aliases: Vec<String>,
        entities: Vec<EntityColumns>,
    },
    Projected {
        aliases: Vec<String>,
        /// Select-list aliases per entry
        column_aliases: Vec<Vec<String>>,
        types: Vec<SemanticType>,
    },
}

impl ResultMapping {
    pub fn aliases(&self) -> &[String] {
        match self {
            ResultMapping::Entities { aliases, .. } | ResultMapping::Projected { aliases, .. } => {
                aliases
            }
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(self, ResultMapping::Projected { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformedRow<T> {
    Single(T),
    Tuple(Vec<T>),
    Map(Vec<(String, T)>),
}

/// A result row addressable by select-list column alias.
pub trait ResultRow {
    type Value;

    fn value(&self, column_alias: &str) -> Option<&Self::Value>;
}

impl<V> ResultRow for HashMap<String, V> {
    type Value = V;

    fn value(&self, column_alias: &str) -> Option<&V> {
        self.get(column_alias)
    }
}

impl<V> ResultRow for BTreeMap<String, V> {
    type Value = V;

    fn value(&self, column_alias: &str) -> Option<&V> {
        self.get(column_alias)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultProjector {
    mapping: ResultMapping,
    transformer: ResultTransformer,
}

impl ResultProjector {
    pub fn new(mapping: ResultMapping, transformer: ResultTransformer) -> Self {
        ResultProjector {
            mapping,
            transformer,
        }
    }

    pub fn aliases(&self) -> &[String] {
        self.mapping.aliases()
    }

    pub fn mapping(&self) -> &ResultMapping {
        &self.mapping
    }

    pub fn transformer(&self) -> ResultTransformer {
        self.transformer
    }

    /// Projected values of one row, one per projection entry.
    pub fn read_projected<R>(&self, row: &R) -> Result<Vec<R::Value>, ResultError>
    where
        R: ResultRow,
        R::Value: Clone,
    {
        let (aliases, column_aliases) = match &self.mapping {
            ResultMapping::Projected {
                aliases,
                column_aliases,
                ..
            } => (aliases, column_aliases),
            ResultMapping::Entities { .. } => return Err(ResultError::NotProjected),
        };
        let mut values = Vec::with_capacity(column_aliases.len());
        for (alias, columns) in aliases.iter().zip(column_aliases) {
            let column = match columns.as_slice() {
                [column] => column,
                _ => {
                    return Err(ResultError::MultiColumnEntry {
                        alias: alias.clone(),
                        columns: columns.len(),
                    })
                }
            };
            let value = row
                .value(column)
                .ok_or_else(|| ResultError::MissingColumn {
                    column: column.clone(),
                })?;
            values.push(value.clone());
        }
        Ok(values)
    }

    /// Property values per selected entity, in alias order.
    pub fn read_entities<R>(&self, row: &R) -> Result<Vec<Vec<(String, R::Value)>>, ResultError>
    where
        R: ResultRow,
        R::Value: Clone,
    {
        let entities = match &self.mapping {
            ResultMapping::Entities { entities, .. } => entities,
            ResultMapping::Projected { .. } => return Err(ResultError::NotEntities),
        };
        entities
            .iter()
            .map(|entity| {
                entity
                    .columns
                    .iter()
                    .map(|c| {
                        row.value(&c.column_alias)
                            .cloned()
                            .map(|v| (c.property.clone(), v))
                            .ok_or_else(|| ResultError::MissingColumn {
                                column: c.column_alias.clone(),
                            })
                    })
                    .collect()
            })
            .collect()
    }

    /// Shape one tuple with the configured transformer.
    pub fn transform<T>(&self, tuple: Vec<T>) -> Result<TransformedRow<T>, ResultError> {
        let aliases = self.aliases();
        if tuple.len() != aliases.len() {
            return Err(ResultError::TupleArity {
                expected: aliases.len(),
                actual: tuple.len(),
            });
        }
        Ok(match self.transformer {
            ResultTransformer::RootEntity | ResultTransformer::DistinctRootEntity => {
                let mut tuple = tuple;
                match tuple.pop() {
                    Some(root) => TransformedRow::Single(root),
                    None => TransformedRow::Tuple(Vec::new()),
                }
            }
            ResultTransformer::AliasToEntityMap => {
                TransformedRow::Map(aliases.iter().cloned().zip(tuple).collect())
            }
            ResultTransformer::Projection if tuple.len() == 1 => {
                let mut tuple = tuple;
                match tuple.pop() {
                    Some(value) => TransformedRow::Single(value),
                    None => TransformedRow::Tuple(Vec::new()),
                }
            }
            ResultTransformer::Projection | ResultTransformer::ToList => TransformedRow::Tuple(tuple),
        })
    }

    /// Shape one tuple with a caller closure receiving `(values, aliases)`.
    pub fn transform_with<T, U, F>(&self, tuple: Vec<T>, f: F) -> Result<U, ResultError>
    where
        F: FnOnce(Vec<T>, &[String]) -> U,
    {
        let aliases = self.aliases();
        if tuple.len() != aliases.len() {
            return Err(ResultError::TupleArity {
                expected: aliases.len(),
                actual: tuple.len(),
            });
        }
        Ok(f(tuple, aliases))
    }

    /// Shape every tuple; `DistinctRootEntity` keeps the first of equal roots.
    pub fn transform_list<T: PartialEq>(
        &self,
        tuples: Vec<Vec<T>>,
    ) -> Result<Vec<TransformedRow<T>>, ResultError> {
        let mut rows: Vec<TransformedRow<T>> = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            let row = self.transform(tuple)?;
            if self.transformer == ResultTransformer::DistinctRootEntity && rows.contains(&row) {
                continue;
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
