use super::{render_subquery, ToSql};
use crate::criteria::{ComparisonOp, Criterion, Quantifier, SubqueryOp, SubqueryOperand};
use crate::join_planner::join_columns;
use crate::translator::alias_registry::NodeId;
use crate::translator::context::TranslationContext;
use crate::translator::TranslationError;

impl ToSql for Criterion {
    fn to_sql(&self, node: NodeId, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
        match self {
            Criterion::Compare {
                property,
                op,
                ignore_case,
                ..
            } => {
                let column = ctx.column_using_projection(node, property)?;
                if *ignore_case {
                    Ok(format!("lower({}){}?", column, op.as_sql()))
                } else {
                    Ok(format!("{}{}?", column, op.as_sql()))
                }
            }
            Criterion::Like {
                property,
                ignore_case,
                escape,
                ..
            } => {
                let column = ctx.column_using_projection(node, property)?;
                let lhs = if *ignore_case {
                    format!("lower({})", column)
                } else {
                    column
                };
                let escape = match escape {
                    Some(c) => format!(" escape {}", quote_literal(&c.to_string())),
                    None => String::new(),
                };
                Ok(format!("{} like ?{}", lhs, escape))
            }
            Criterion::Between { property, .. } => {
                let column = ctx.column_using_projection(node, property)?;
                Ok(format!("{} between ? and ?", column))
            }
            Criterion::In { property, values } => {
                let columns = ctx.columns_using_projection(node, property)?;
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                if columns.len() == 1 {
                    let markers = vec!["?"; values.len()].join(", ");
                    return Ok(format!("{} in ({})", columns[0], markers));
                }
                let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
                let markers = vec![tuple.as_str(); values.len()].join(", ");
                Ok(format!("({}) in ({})", columns.join(", "), markers))
            }
            Criterion::IsNull { property } => {
                let columns = ctx.columns_using_projection(node, property)?;
                Ok(null_check(&columns, "is null", " and "))
            }
            Criterion::IsNotNull { property } => {
                let columns = ctx.columns_using_projection(node, property)?;
                Ok(null_check(&columns, "is not null", " or "))
            }
            Criterion::PropertyCompare {
                property,
                op,
                other,
            } => {
                let lhs = ctx.columns_using_projection(node, property)?;
                let rhs = ctx.columns_using_projection(node, other)?;
                if lhs.len() != rhs.len() {
                    return Err(TranslationError::ColumnArity {
                        path: other.clone(),
                        columns: rhs.len(),
                    });
                }
                let pairs: Vec<String> = lhs
                    .iter()
                    .zip(&rhs)
                    .map(|(l, r)| format!("{}{}{}", l, op.as_sql(), r))
                    .collect();
                Ok(wrap_conjunction(pairs, " and "))
            }
            Criterion::Junction { op, criteria } => {
                if criteria.is_empty() {
                    return Ok("1=1".to_string());
                }
                let parts = criteria
                    .iter()
                    .map(|c| c.to_sql(node, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(&format!(" {} ", op.as_sql()))))
            }
            Criterion::Not { criterion } => Ok(format!("not ({})", criterion.to_sql(node, ctx)?)),
            Criterion::IdEq { .. } => {
                let columns = ctx.identifier_columns(node)?;
                let parts: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
                Ok(wrap_conjunction(parts, " and "))
            }
            Criterion::NaturalId { values } => {
                let mut parts = Vec::with_capacity(values.len());
                for (property, _) in values {
                    let column = ctx.column(node, property)?;
                    parts.push(format!("{}{}?", column, ComparisonOp::Eq.as_sql()));
                }
                Ok(format!("({})", parts.join(" and ")))
            }
            Criterion::Sql { sql, .. } => Ok(sql.replace("{alias}", ctx.sql_alias(node))),
            Criterion::IsEmpty { property } => collection_existence(node, property, true, ctx),
            Criterion::IsNotEmpty { property } => collection_existence(node, property, false, ctx),
            Criterion::Size { property, op, .. } => Ok(format!(
                "? {} ({})",
                op.as_sql(),
                collection_subselect(node, property, "count(*)", ctx)?
            )),
            Criterion::Example { .. } => match self.example_terms() {
                Some(terms) => terms.to_sql(node, ctx),
                None => Ok("1=1".to_string()),
            },
            Criterion::Subquery {
                lhs,
                op,
                quantifier,
                query,
            } => {
                let inner = ctx.nested(query)?;
                let sql = render_subquery(&inner)?;
                if op.is_existential() {
                    if lhs.is_some() || quantifier.is_some() {
                        return Err(TranslationError::invalid_query(format!(
                            "`{}` subquery takes no left-hand side or quantifier",
                            op.as_sql()
                        )));
                    }
                    return Ok(format!("{} ({})", op.as_sql(), sql));
                }
                if !inner.has_projection() {
                    return Err(TranslationError::invalid_query(format!(
                        "`{}` subquery on `{}` has no projection",
                        op.as_sql(),
                        query.entity
                    )));
                }
                let lhs = match lhs {
                    Some(SubqueryOperand::Property(property)) => {
                        let columns = ctx.columns_using_projection(node, property)?;
                        if columns.len() == 1 {
                            columns[0].clone()
                        } else {
                            format!("({})", columns.join(", "))
                        }
                    }
                    Some(SubqueryOperand::Value(_)) => "?".to_string(),
                    None => {
                        return Err(TranslationError::invalid_query(format!(
                            "`{}` subquery needs a left-hand side",
                            op.as_sql()
                        )))
                    }
                };
                let quantifier = match (quantifier, op) {
                    (None, _) => "",
                    (Some(_), SubqueryOp::In | SubqueryOp::NotIn) => {
                        return Err(TranslationError::invalid_query(
                            "`in` subqueries take no quantifier",
                        ))
                    }
                    (Some(Quantifier::All), _) => "all ",
                    (Some(Quantifier::Some), _) => "some ",
                };
                Ok(format!("{} {} {}({})", lhs, op.as_sql(), quantifier, sql))
            }
        }
    }
}

fn null_check(columns: &[String], test: &str, joiner: &str) -> String {
    let parts: Vec<String> = columns.iter().map(|c| format!("{} {}", c, test)).collect();
    wrap_conjunction(parts, joiner)
}

/// Join `parts`, parenthesized when there is more than one.
fn wrap_conjunction(parts: Vec<String>, joiner: &str) -> String {
    if parts.len() == 1 {
        parts.into_iter().collect()
    } else {
        format!("({})", parts.join(joiner))
    }
}

/// Single-quoted SQL string literal.
fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `[not ]exists (select 1 from <collection table> where <owner key>)`
fn collection_existence(
    node: NodeId,
    property: &str,
    empty: bool,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    Ok(format!(
        "{}exists ({})",
        if empty { "not " } else { "" },
        collection_subselect(node, property, "1", ctx)?
    ))
}

/// `select <select> from <collection or link table> <alias> where <owner key>`
fn collection_subselect(
    node: NodeId,
    property: &str,
    select: &str,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    let resolved = ctx.resolve(node, property)?;
    let association = resolved.association.as_ref().ok_or_else(|| TranslationError::NotAnAssociation {
        entity: resolved.entity.clone(),
        property: resolved.property.clone(),
        path: property.to_string(),
    })?;
    if !association.is_collection() {
        return Err(TranslationError::invalid_query(format!(
            "`{}` is not a collection",
            property
        )));
    }

    let metadata = ctx.metadata();
    let columns = join_columns(metadata, &resolved.entity, &resolved.property)?;
    let (table, key_columns) = match &columns.link {
        Some(link) => (link.table.clone(), link.owner_columns.clone()),
        None => (
            metadata.entity_schema(&association.target)?.table.clone(),
            columns.rhs_columns.clone(),
        ),
    };
    let alias = ctx.mint_alias(&table);
    let dialect = ctx.dialect();
    let conditions: Vec<String> = columns
        .lhs_columns
        .iter()
        .zip(&key_columns)
        .map(|(owner, key)| {
            format!(
                "{}.{}={}.{}",
                resolved.sql_alias,
                dialect.quote_identifier(owner),
                alias,
                dialect.quote_identifier(key)
            )
        })
        .collect();
    Ok(format!(
        "select {} from {} {} where {}",
        select,
        dialect.quote_identifier(&table),
        alias,
        conditions.join(" and ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_conjunction() {
        assert_eq!(wrap_conjunction(vec!["a=?".to_string()], " and "), "a=?");
        assert_eq!(
            wrap_conjunction(vec!["a is null".to_string(), "b is null".to_string()], " and "),
            "(a is null and b is null)"
        );
    }

    #[test]
    fn test_quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("!"), "'!'");
        assert_eq!(quote_literal("'"), "''''");
    }

    #[test]
    fn test_null_check_uses_or_for_not_null() {
        let columns = vec!["i.period_start".to_string(), "i.period_end".to_string()];
        assert_eq!(
            null_check(&columns, "is not null", " or "),
            "(i.period_start is not null or i.period_end is not null)"
        );
    }
}
