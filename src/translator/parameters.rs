//! Bind values and lock modes, in placeholder order.
//!
//! The order is fixed: lock modes first, then with-clause values of the
//! declared joins in plan order, then root restrictions in declaration order.
//! Within one criterion, values follow the left-to-right order of its
//! placeholders.

use super::alias_registry::{NodeId, ROOT_NODE};
use super::context::TranslationContext;
use super::errors::TranslationError;
use crate::criteria::{
    Criterion, LockMode, QuerySpecification, RowSelection, SubqueryOperand, TypedValue, Value,
};
use crate::entity_catalog::{PropertyRef, PropertySchema, SemanticType};
use crate::result_projector::ResultTransformer;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the executor needs besides the SQL text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameters {
    pub types: Vec<SemanticType>,
    pub values: Vec<Value>,
    /// SQL alias -> requested lock mode
    pub lock_modes: BTreeMap<String, LockMode>,
    pub selection: RowSelection,
    pub cacheable: bool,
    pub cache_region: Option<String>,
    pub comment: Option<String>,
    pub read_only: Option<bool>,
    pub natural_key_lookup: bool,
    pub result_transformer: ResultTransformer,
}

impl QueryParameters {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn typed_values(&self) -> Vec<TypedValue> {
        self.types
            .iter()
            .zip(&self.values)
            .map(|(ty, value)| TypedValue::new(ty.clone(), value.clone()))
            .collect()
    }
}

pub struct ParameterCollector<'c, 'a> {
    ctx: &'c TranslationContext<'a>,
}

impl<'c, 'a> ParameterCollector<'c, 'a> {
    pub fn new(ctx: &'c TranslationContext<'a>) -> Self {
        ParameterCollector { ctx }
    }

    pub fn collect(&self) -> Result<QueryParameters, TranslationError> {
        let spec: &QuerySpecification = self.ctx.spec();

        let mut lock_modes = BTreeMap::new();
        for (node, mode) in self.ctx.lock_requests()? {
            let alias = self
                .ctx
                .metadata()
                .root_table_alias(&self.ctx.node(node).entity, self.ctx.sql_alias(node));
            lock_modes.insert(alias, mode);
        }

        let bindings = self.bindings()?;
        log::debug!("Collected {} bind values", bindings.len());
        let (types, values) = bindings.into_iter().map(|tv| (tv.ty, tv.value)).unzip();

        Ok(QueryParameters {
            types,
            values,
            lock_modes,
            selection: spec.selection.clone(),
            cacheable: spec.options.cacheable,
            cache_region: spec.options.cache_region.clone(),
            comment: spec.options.comment.clone(),
            read_only: spec.options.read_only,
            natural_key_lookup: spec.is_lookup_by_natural_key(),
            result_transformer: spec
                .result_transformer
                .unwrap_or_else(|| ResultTransformer::default_for(spec.projection.is_some())),
        })
    }

    /// With-clause values, then restriction values.
    pub fn bindings(&self) -> Result<Vec<TypedValue>, TranslationError> {
        let ctx = self.ctx;
        let mut out = Vec::new();
        for join in &ctx.plan().joins {
            let with_clause = ctx
                .declared_sub_node(join.node)
                .and_then(|sub| sub.with_clause.as_ref());
            if let Some(criterion) = with_clause {
                out.extend(criterion.typed_values(join.node, ctx)?);
            }
        }
        for restriction in &ctx.spec().restrictions {
            out.extend(restriction.typed_values(ROOT_NODE, ctx)?);
        }
        Ok(out)
    }
}

impl Criterion {
    /// Values bound by this criterion, in placeholder order. `node` is the
    /// query node unqualified paths are relative to.
    pub fn typed_values(
        &self,
        node: NodeId,
        ctx: &TranslationContext<'_>,
    ) -> Result<Vec<TypedValue>, TranslationError> {
        Ok(match self {
            Criterion::Compare {
                property,
                value,
                ignore_case,
                ..
            } => {
                let value = if *ignore_case {
                    lower_case(value)
                } else {
                    value.clone()
                };
                vec![ctx.typed_value(node, property, &value)?]
            }
            Criterion::Like {
                property,
                pattern,
                match_mode,
                ignore_case,
                ..
            } => {
                let mut text = match_mode.to_match_string(pattern);
                if *ignore_case {
                    text = text.to_lowercase();
                }
                vec![ctx.typed_value(node, property, &Value::Text(text))?]
            }
            Criterion::Between {
                property,
                low,
                high,
            } => vec![
                ctx.typed_value(node, property, low)?,
                ctx.typed_value(node, property, high)?,
            ],
            Criterion::In { property, values } => in_values(node, property, values, ctx)?,
            Criterion::IsNull { .. }
            | Criterion::IsNotNull { .. }
            | Criterion::PropertyCompare { .. }
            | Criterion::IsEmpty { .. }
            | Criterion::IsNotEmpty { .. } => Vec::new(),
            Criterion::Junction { criteria, .. } => {
                let mut out = Vec::new();
                for criterion in criteria {
                    out.extend(criterion.typed_values(node, ctx)?);
                }
                out
            }
            Criterion::Not { criterion } => criterion.typed_values(node, ctx)?,
            Criterion::Size { size, .. } => vec![TypedValue::new(SemanticType::Integer, *size)],
            Criterion::Example { .. } => match self.example_terms() {
                Some(terms) => terms.typed_values(node, ctx)?,
                None => Vec::new(),
            },
            Criterion::IdEq { value } => {
                let span = ctx.identifier_columns(node)?.len();
                let ty = ctx.identifier_type(node)?;
                if span == 1 {
                    vec![TypedValue::new(ty, value.clone())]
                } else {
                    match value {
                        Value::List(parts) if parts.len() == span => parts
                            .iter()
                            .map(|part| TypedValue::new(ty.clone(), part.clone()))
                            .collect(),
                        _ => {
                            return Err(TranslationError::invalid_query(format!(
                                "composite identifier of `{}` needs a list of {} values",
                                ctx.node(node).entity,
                                span
                            )))
                        }
                    }
                }
            }
            Criterion::NaturalId { values } => {
                let mut out = Vec::with_capacity(values.len());
                for (property, value) in values {
                    out.push(ctx.typed_value(node, property, value)?);
                }
                out
            }
            Criterion::Sql { values, .. } => values.clone(),
            Criterion::Subquery { lhs, query, .. } => {
                let inner = ctx.nested(query)?;
                let mut out = Vec::new();
                if let Some(SubqueryOperand::Value(value)) = lhs {
                    let ty = inner
                        .projection_layout()
                        .and_then(|layout| layout.types().into_iter().next())
                        .ok_or_else(|| {
                            TranslationError::invalid_query(format!(
                                "subquery on `{}` compared with a value has no projection",
                                query.entity
                            ))
                        })?;
                    out.push(TypedValue::new(ty, value.clone()));
                }
                out.extend(ParameterCollector::new(&inner).bindings()?);
                out
            }
        })
    }
}

/// One value per column: multi-column properties take a list per entry.
fn in_values(
    node: NodeId,
    property: &str,
    values: &[Value],
    ctx: &TranslationContext<'_>,
) -> Result<Vec<TypedValue>, TranslationError> {
    let span = ctx.columns_using_projection(node, property)?.len();
    if span == 1 {
        return values
            .iter()
            .map(|value| ctx.typed_value(node, property, value))
            .collect();
    }

    let types = column_types(node, property, span, ctx)?;
    let mut out = Vec::with_capacity(values.len() * span);
    for value in values {
        match value {
            Value::List(parts) if parts.len() == span => {
                for (ty, part) in types.iter().zip(parts) {
                    out.push(TypedValue::new(ty.clone(), part.clone()));
                }
            }
            other => {
                return Err(TranslationError::invalid_query(format!(
                    "`{}` spans {} columns; `{}` is not a list of {} values",
                    property, span, other, span
                )))
            }
        }
    }
    Ok(out)
}

/// Per-column types of a multi-column property.
fn column_types(
    node: NodeId,
    property: &str,
    span: usize,
    ctx: &TranslationContext<'_>,
) -> Result<Vec<SemanticType>, TranslationError> {
    let ty = ctx.type_using_projection(node, property)?;
    if !ty.is_component() {
        return Ok(vec![ty; span]);
    }
    let resolved = ctx.resolve(node, property)?;
    let located = ctx
        .metadata()
        .property_at(&resolved.entity, &resolved.property)
        .map_err(|e| TranslationError::from_lookup(e, property))?;
    let mut types = Vec::with_capacity(span);
    if let PropertyRef::Property { schema, .. } = located {
        flatten_types(schema, &mut types);
    }
    if types.len() != span {
        return Err(TranslationError::ColumnArity {
            path: property.to_string(),
            columns: span,
        });
    }
    Ok(types)
}

fn flatten_types(schema: &PropertySchema, out: &mut Vec<SemanticType>) {
    match &schema.component {
        Some(parts) => parts.iter().for_each(|part| flatten_types(part, out)),
        None => {
            let ty = schema.ty.clone().unwrap_or(SemanticType::Long);
            out.extend(std::iter::repeat(ty).take(schema.selectable_columns().len()));
        }
    }
}

fn lower_case(value: &Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_lowercase()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_case_only_touches_text() {
        assert_eq!(lower_case(&Value::from("OPEN")), Value::from("open"));
        assert_eq!(lower_case(&Value::Int(3)), Value::Int(3));
    }

    #[test]
    fn test_flatten_component_types() {
        let schema = PropertySchema {
            component: Some(vec![
                PropertySchema::basic("street", "street", SemanticType::String),
                PropertySchema::basic("zip", "zip", SemanticType::Integer),
            ]),
            ..PropertySchema::basic("address", "unused", SemanticType::String)
        };
        let mut types = Vec::new();
        flatten_types(&schema, &mut types);
        assert_eq!(types, vec![SemanticType::String, SemanticType::Integer]);
    }
}
