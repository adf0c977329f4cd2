//! SQL text assembly.
//!
//! The renderer only reads a planned [`TranslationContext`]; every alias,
//! join and projection position is decided before rendering starts.

mod criterion_sql;
pub mod dialect;
mod projection_sql;

pub use dialect::{
    dialect_for, Dialect, GenericDialect, MySqlDialect, PostgresDialect, SqlServerDialect,
};

use crate::criteria::LockMode;
use crate::entity_catalog::{EntityMetadata, EntitySchema};
use crate::result_projector::{EntityColumns, ResultMapping, SelectedColumn};
use crate::translator::alias_registry::{alias_root, NodeId, ROOT_NODE};
use crate::translator::context::TranslationContext;
use crate::translator::TranslationError;

/// Render a criteria node as a SQL fragment relative to a query node.
pub trait ToSql {
    fn to_sql(&self, node: NodeId, ctx: &TranslationContext<'_>) -> Result<String, TranslationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub result_mapping: ResultMapping,
}

pub struct SqlRenderer<'c, 'a> {
    ctx: &'c TranslationContext<'a>,
}

impl<'c, 'a> SqlRenderer<'c, 'a> {
    pub fn new(ctx: &'c TranslationContext<'a>) -> Self {
        SqlRenderer { ctx }
    }

    pub fn render(&self) -> Result<RenderedQuery, TranslationError> {
        let ctx = self.ctx;
        let spec = ctx.spec();
        let dialect = ctx.dialect();

        let lock_requests = ctx.lock_requests()?;
        let locks: Vec<(NodeId, String, LockMode)> = lock_requests
            .iter()
            .map(|(node, mode)| {
                let alias = ctx
                    .metadata()
                    .root_table_alias(&ctx.node(*node).entity, ctx.sql_alias(*node));
                (*node, alias, *mode)
            })
            .collect();
        let hint_for = |node: NodeId| {
            locks
                .iter()
                .find(|(n, _, _)| *n == node)
                .and_then(|(_, _, mode)| dialect.lock_hint(*mode))
        };

        let (select, result_mapping) = match &spec.projection {
            Some(projection) => {
                let layout = ctx.projection_layout().ok_or_else(|| {
                    TranslationError::invalid_query("projection was not laid out")
                })?;
                (
                    projection_sql::select_fragment(projection, ctx)?,
                    ResultMapping::Projected {
                        aliases: layout.aliases(),
                        column_aliases: layout
                            .entries
                            .iter()
                            .map(|e| e.column_aliases.clone())
                            .collect(),
                        types: layout.types(),
                    },
                )
            }
            None => self.entity_select()?,
        };

        let mut sql = String::new();
        if ctx.config().use_sql_comments {
            if let Some(comment) = &spec.options.comment {
                sql.push_str(&format!("/* {} */ ", comment.replace("*/", "* /")));
            }
        }
        sql.push_str("select ");
        sql.push_str(&select);
        sql.push_str(&self.from_clause(&hint_for)?);

        let where_clause = self.where_clause()?;
        if !where_clause.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&where_clause);
        }

        let group_by = self.group_by_terms()?;
        if !group_by.is_empty() {
            sql.push_str(" group by ");
            sql.push_str(&group_by.join(", "));
        }

        let order_by = self.order_by_terms()?;
        if !order_by.is_empty() {
            sql.push_str(" order by ");
            sql.push_str(&order_by.join(", "));
        }

        if let Some(limit) = dialect.limit_clause(&spec.selection, !order_by.is_empty()) {
            sql.push_str(&limit);
        }

        let alias_locks: Vec<(String, LockMode)> = locks
            .iter()
            .map(|(_, alias, mode)| (alias.clone(), *mode))
            .collect();
        if let Some(clause) = dialect.lock_clause(&alias_locks) {
            sql.push_str(&clause);
        }

        log::debug!("Rendered SQL: {}", sql);
        Ok(RenderedQuery {
            sql,
            result_mapping,
        })
    }

    // ========================================================================
    // SELECT
    // ========================================================================

    /// Every entity alias' columns, root last.
    fn entity_select(&self) -> Result<(String, ResultMapping), TranslationError> {
        let ctx = self.ctx;
        let metadata = ctx.metadata();
        let nodes = ctx.entity_nodes();
        let single = nodes.len() == 1;

        let mut select = Vec::new();
        let mut aliases = Vec::with_capacity(nodes.len());
        let mut entities = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let entity = &ctx.node(*node).entity;
            let sql_alias = ctx.sql_alias(*node).to_string();
            let suffix = if single { String::new() } else { format!("{}_", i) };

            let mut columns = Vec::new();
            for (k, (property, column)) in entity_columns(metadata, metadata.entity_schema(entity)?)?
                .into_iter()
                .enumerate()
            {
                let column_alias = format!("{}{}_{}", alias_root(&column), k, suffix);
                select.push(format!(
                    "{} as {}",
                    ctx.qualify(&sql_alias, &column),
                    column_alias
                ));
                columns.push(SelectedColumn {
                    property,
                    column,
                    column_alias,
                });
            }

            let visible = ctx.visible_alias(*node);
            aliases.push(visible.clone());
            entities.push(EntityColumns {
                alias: visible,
                sql_alias,
                entity: entity.clone(),
                columns,
            });
        }
        Ok((select.join(", "), ResultMapping::Entities { aliases, entities }))
    }

    // ========================================================================
    // FROM / JOIN
    // ========================================================================

    fn from_clause(&self, hint_for: &dyn Fn(NodeId) -> Option<String>) -> Result<String, TranslationError> {
        let ctx = self.ctx;
        let metadata = ctx.metadata();
        let dialect = ctx.dialect();
        let spec = ctx.spec();

        let root = metadata.entity_schema(&ctx.node(ROOT_NODE).entity)?;
        let mut sql = format!(
            " from {} {}",
            dialect.quote_identifier(&root.table),
            ctx.sql_alias(ROOT_NODE)
        );
        if let Some(hint) = hint_for(ROOT_NODE) {
            sql.push(' ');
            sql.push_str(&hint);
        }

        for join in &ctx.plan().joins {
            let target = metadata.entity_schema(&ctx.node(join.node).entity)?;
            let lhs_alias = ctx.sql_alias(join.lhs);
            let alias = ctx.sql_alias(join.node);
            let keyword = join.join_kind.as_sql();

            let mut conditions = match (&join.columns.link, &join.link_alias) {
                (Some(link), Some(link_alias)) => {
                    sql.push_str(&format!(
                        " {} {} {} on {}",
                        keyword,
                        dialect.quote_identifier(&link.table),
                        link_alias,
                        equate(ctx, lhs_alias, &join.columns.lhs_columns, link_alias, &link.owner_columns)
                    ));
                    vec![equate(ctx, link_alias, &link.element_columns, alias, &join.columns.rhs_columns)]
                }
                _ => vec![equate(
                    ctx,
                    lhs_alias,
                    &join.columns.lhs_columns,
                    alias,
                    &join.columns.rhs_columns,
                )],
            };

            if let Some(condition) = discriminator_condition(ctx, &target.name, alias)? {
                conditions.push(condition);
            }
            if let Some(fragment) =
                metadata.filter_fragment(&target.name, alias, &spec.options.enabled_filters)?
            {
                conditions.push(fragment);
            }
            if let Some(with_clause) = ctx
                .declared_sub_node(join.node)
                .and_then(|sub| sub.with_clause.as_ref())
            {
                conditions.push(format!("({})", with_clause.to_sql(join.node, ctx)?));
            }

            sql.push_str(&format!(
                " {} {} {}",
                keyword,
                dialect.quote_identifier(&target.table),
                alias
            ));
            if let Some(hint) = hint_for(join.node) {
                sql.push(' ');
                sql.push_str(&hint);
            }
            sql.push_str(" on ");
            sql.push_str(&conditions.join(" and "));
        }
        Ok(sql)
    }

    // ========================================================================
    // WHERE / GROUP BY / ORDER BY
    // ========================================================================

    fn where_clause(&self) -> Result<String, TranslationError> {
        let ctx = self.ctx;
        let metadata = ctx.metadata();
        let root = &ctx.node(ROOT_NODE).entity;
        let root_alias = ctx.sql_alias(ROOT_NODE);

        let mut parts = Vec::new();
        for restriction in &ctx.spec().restrictions {
            parts.push(restriction.to_sql(ROOT_NODE, ctx)?);
        }
        if let Some(condition) = discriminator_condition(ctx, root, root_alias)? {
            parts.push(condition);
        }
        if let Some(fragment) =
            metadata.filter_fragment(root, root_alias, &ctx.spec().options.enabled_filters)?
        {
            parts.push(fragment);
        }
        Ok(parts.join(" and "))
    }

    fn group_by_terms(&self) -> Result<Vec<String>, TranslationError> {
        let ctx = self.ctx;
        let mut terms = match &ctx.spec().projection {
            Some(projection) => projection_sql::group_by_terms(projection, ctx)?,
            None => Vec::new(),
        };
        for property in &ctx.spec().group_by {
            terms.extend(ctx.columns_using_projection(ROOT_NODE, property)?);
        }
        Ok(terms)
    }

    /// Collection orderings of joined collections, then criteria orderings.
    fn order_by_terms(&self) -> Result<Vec<String>, TranslationError> {
        let ctx = self.ctx;
        let mut terms = Vec::new();
        if !ctx.has_projection() {
            for join in &ctx.plan().joins {
                if let Some(ordering) = collection_ordering(ctx, join.node)? {
                    terms.push(ordering);
                }
            }
        }
        for order in &ctx.spec().orderings {
            terms.extend(projection_sql::order_terms(order, ROOT_NODE, ctx)?);
        }
        Ok(terms)
    }
}

/// Select list of a subquery: its projection, or `1`.
pub fn render_subquery(ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    let renderer = SqlRenderer::new(ctx);
    let select = match &ctx.spec().projection {
        Some(projection) => projection_sql::select_fragment(projection, ctx)?,
        None => "1".to_string(),
    };
    let mut sql = format!("select {}", select);
    sql.push_str(&renderer.from_clause(&|_| None)?);
    let where_clause = renderer.where_clause()?;
    if !where_clause.is_empty() {
        sql.push_str(" where ");
        sql.push_str(&where_clause);
    }
    let group_by = renderer.group_by_terms()?;
    if !group_by.is_empty() {
        sql.push_str(" group by ");
        sql.push_str(&group_by.join(", "));
    }
    log::trace!("Rendered subquery: {}", sql);
    Ok(sql)
}

fn equate(
    ctx: &TranslationContext<'_>,
    lhs_alias: &str,
    lhs_columns: &[String],
    rhs_alias: &str,
    rhs_columns: &[String],
) -> String {
    lhs_columns
        .iter()
        .zip(rhs_columns)
        .map(|(l, r)| format!("{}={}", ctx.qualify(lhs_alias, l), ctx.qualify(rhs_alias, r)))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// `<alias>.<discriminator> in (...)` for a subclass, quoted for the dialect.
fn discriminator_condition(
    ctx: &TranslationContext<'_>,
    entity: &str,
    alias: &str,
) -> Result<Option<String>, TranslationError> {
    Ok(ctx
        .metadata()
        .discriminator_restriction(entity)?
        .map(|restriction| {
            format!(
                "{} in ({})",
                ctx.qualify(alias, &restriction.column),
                restriction.literals.join(", ")
            )
        }))
}

fn collection_ordering(ctx: &TranslationContext<'_>, node: NodeId) -> Result<Option<String>, TranslationError> {
    let joined = ctx.node(node);
    let association = match &joined.association {
        Some(association) if association.is_collection() => association,
        _ => return Ok(None),
    };
    let located = ctx
        .metadata()
        .property_at(&association.owner, &association.role)
        .map_err(|e| TranslationError::from_lookup(e, &joined.whole_path))?;
    Ok(located
        .association_schema()
        .and_then(|schema| schema.order_by.as_ref())
        .map(|order_by| order_by.replace("{alias}", ctx.sql_alias(node))))
}

/// Columns an entity row selects, plus columns only its subclasses declare.
fn entity_columns(
    metadata: &dyn EntityMetadata,
    schema: &EntitySchema,
) -> Result<Vec<(String, String)>, TranslationError> {
    let mut columns = schema.select_columns();
    for subclass in &schema.subclasses {
        let sub = metadata.entity_schema(subclass)?;
        for property in &sub.properties {
            if schema.property(&property.name).is_some()
                || columns.iter().any(|(p, _)| *p == property.name)
            {
                continue;
            }
            for column in property.selectable_columns() {
                columns.push((property.name.clone(), column));
            }
        }
    }
    Ok(columns)
}
