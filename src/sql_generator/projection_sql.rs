use crate::criteria::{Order, Projection};
use crate::translator::alias_registry::{NodeId, ROOT_NODE};
use crate::translator::context::TranslationContext;
use crate::translator::TranslationError;

/// Select fragment of the projection, aliased per the context's layout.
pub fn select_fragment(
    projection: &Projection,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    let layout = ctx.projection_layout().ok_or_else(|| {
        TranslationError::invalid_query("projection layout requested for an entity query")
    })?;
    let root_alias = ctx.sql_alias(ROOT_NODE);
    let mut parts = Vec::new();

    for (leaf, (projection, _)) in projection.leaves().into_iter().enumerate() {
        let aliases = layout.leaf_columns(leaf);
        match projection {
            Projection::Property { property } | Projection::GroupProperty { property } => {
                let columns = ctx.columns(ROOT_NODE, property)?;
                parts.extend(aliased(&columns, &aliases));
            }
            Projection::Id => {
                let columns = ctx.identifier_columns(ROOT_NODE)?;
                parts.extend(aliased(&columns, &aliases));
            }
            Projection::RowCount => parts.extend(aliased(&["count(*)".to_string()], &aliases)),
            Projection::Count { property, distinct } => {
                let column = ctx.column(ROOT_NODE, property)?;
                let expression = if *distinct {
                    format!("count(distinct {})", column)
                } else {
                    format!("count({})", column)
                };
                parts.extend(aliased(&[expression], &aliases));
            }
            Projection::Aggregate { function, property } => {
                let column = ctx.column(ROOT_NODE, property)?;
                let expression = format!("{}({})", function.as_sql(), column);
                parts.extend(aliased(&[expression], &aliases));
            }
            Projection::Sql { sql, .. } | Projection::SqlGroup { sql, .. } => {
                parts.push(sql.replace("{alias}", root_alias));
            }
            Projection::Distinct { .. } | Projection::List { .. } | Projection::Alias { .. } => {}
        }
    }

    let select = parts.join(", ");
    Ok(if projection.is_distinct() {
        format!("distinct {}", select)
    } else {
        select
    })
}

/// GROUP BY terms contributed by grouping projections.
pub fn group_by_terms(
    projection: &Projection,
    ctx: &TranslationContext<'_>,
) -> Result<Vec<String>, TranslationError> {
    let mut terms = Vec::new();
    for (projection, _) in projection.leaves() {
        match projection {
            Projection::GroupProperty { property } => {
                terms.extend(ctx.columns(ROOT_NODE, property)?);
            }
            Projection::SqlGroup { group_by, .. } => {
                terms.push(group_by.replace("{alias}", ctx.sql_alias(ROOT_NODE)));
            }
            _ => {}
        }
    }
    Ok(terms)
}

/// ORDER BY terms of one ordering; the property may name a projection alias.
pub fn order_terms(
    order: &Order,
    node: NodeId,
    ctx: &TranslationContext<'_>,
) -> Result<Vec<String>, TranslationError> {
    let columns = ctx.columns_using_projection(node, &order.property)?;
    let dialect = ctx.dialect();
    Ok(columns
        .iter()
        .map(|column| {
            let expression = if order.ignore_case {
                format!("lower({})", column)
            } else {
                column.clone()
            };
            dialect.order_term(&expression, order.direction(), order.nulls)
        })
        .collect())
}

fn aliased(expressions: &[String], aliases: &[String]) -> Vec<String> {
    expressions
        .iter()
        .zip(aliases)
        .map(|(expression, alias)| format!("{} as {}", expression, alias))
        .collect()
}
