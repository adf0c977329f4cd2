//! Join planning.
//!
//! Planning runs in two phases over a translation context whose declared
//! sub-nodes are already registered:
//!
//! 1. **Declared joins**, in declaration order. A multi-association path
//!    (`items.product`) gets an intermediate join for every hop that is not
//!    itself declared, using the declaring node's join kind.
//! 2. **Implicit joins**, only for a plain entity select (no projection, not
//!    a subquery). Associations of every joined entity are walked depth
//!    first; a per-path fetch mode wins over enabled fetch profiles, which
//!    win over the mapping default. Implicit joins stop at
//!    `max_fetch_depth`.
//!
//! Joining the same association key twice is recorded and logged but never
//! vetoes a join.

pub mod join_columns;

pub use join_columns::{join_columns, JoinColumns, LinkTable};

use crate::criteria::{FetchMode, JoinKind};
use crate::entity_catalog::{
    AssociationSchema, AssociationType, FetchStyle, PropertyRef, PropertySchema,
};
use crate::translator::alias_registry::{NodeId, ROOT_NODE};
use crate::translator::context::{NodeOrigin, QueryNode, TranslationContext};
use crate::translator::path_resolver::join_path;
use crate::translator::TranslationError;
use serde::Serialize;
use std::collections::HashSet;

/// Why a join is in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOrigin {
    Declared,
    Intermediate,
    MappingDefault,
    FetchMode,
    FetchProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJoin {
    /// Node joined in (right-hand side)
    pub node: NodeId,
    /// Node it is joined to
    pub lhs: NodeId,
    pub join_kind: JoinKind,
    pub origin: JoinOrigin,
    pub columns: JoinColumns,
    /// Alias of the link table for many-to-many joins
    pub link_alias: Option<String>,
}

/// The same association joined more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateJoin {
    pub path: String,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    /// Joins in render order; every join's `lhs` is the root or an earlier join
    pub joins: Vec<PlannedJoin>,
    pub duplicates: Vec<DuplicateJoin>,
}

impl JoinPlan {
    pub fn join_for(&self, node: NodeId) -> Option<&PlannedJoin> {
        self.joins.iter().find(|j| j.node == node)
    }

    pub fn is_planned(&self, node: NodeId) -> bool {
        node == ROOT_NODE || self.join_for(node).is_some()
    }
}

pub struct JoinPlanner<'c, 'a> {
    ctx: &'c mut TranslationContext<'a>,
    association_keys: HashSet<(String, Vec<String>)>,
}

impl<'c, 'a> JoinPlanner<'c, 'a> {
    pub fn new(ctx: &'c mut TranslationContext<'a>) -> Self {
        JoinPlanner {
            ctx,
            association_keys: HashSet::new(),
        }
    }

    pub fn plan(mut self) -> Result<(), TranslationError> {
        let declared: Vec<NodeId> = self
            .ctx
            .nodes
            .iter()
            .filter(|n| n.is_declared())
            .map(|n| n.id)
            .collect();
        for node in declared {
            self.plan_declared(node)?;
        }

        if self.ctx.has_projection() || self.ctx.is_subquery() {
            log::debug!("Implicit fetch joins suppressed");
        } else {
            let mut walked = HashSet::new();
            self.walk_entity(ROOT_NODE, &mut walked)?;
        }

        log::debug!(
            "Planned {} joins for {} ({} duplicate association keys)",
            self.ctx.plan.joins.len(),
            self.ctx.spec.entity,
            self.ctx.plan.duplicates.len()
        );
        Ok(())
    }

    // ========================================================================
    // Phase 1: declared joins
    // ========================================================================

    fn plan_declared(&mut self, node: NodeId) -> Result<(), TranslationError> {
        if self.ctx.plan.is_planned(node) {
            return Ok(());
        }
        let declared = self.ctx.node(node).clone();
        let mut lhs = declared.parent.unwrap_or(ROOT_NODE);
        self.plan_declared(lhs)?;

        let (last, intermediate) = match declared.hops.split_last() {
            Some(split) => split,
            None => return Err(TranslationError::unresolved(&declared.entity, &declared.whole_path)),
        };
        for hop in intermediate {
            lhs = match self.ctx.node_at_path(&hop.whole_path) {
                Some(existing) => {
                    self.plan_declared(existing)?;
                    existing
                }
                None => {
                    let depth = self.ctx.node(lhs).depth + 1;
                    let id = self.add_node(QueryNode {
                        id: 0,
                        parent: Some(lhs),
                        whole_path: hop.whole_path.clone(),
                        entity: hop.target.clone(),
                        association: Some(hop.association.clone()),
                        owner_property: hop.property.clone(),
                        depth,
                        origin: NodeOrigin::Intermediate,
                        join_kind: declared.join_kind,
                        user_alias: None,
                        hops: Vec::new(),
                    });
                    self.add_join(id, lhs, declared.join_kind, JoinOrigin::Intermediate)?;
                    id
                }
            };
        }

        let depth = self.ctx.node(lhs).depth + 1;
        {
            let entry = &mut self.ctx.nodes[node];
            entry.parent = Some(lhs);
            entry.owner_property = last.property.clone();
            entry.depth = depth;
        }
        self.add_join(node, lhs, declared.join_kind, JoinOrigin::Declared)
    }

    // ========================================================================
    // Phase 2: implicit fetch joins
    // ========================================================================

    fn walk_entity(&mut self, node: NodeId, walked: &mut HashSet<String>) -> Result<(), TranslationError> {
        let metadata = self.ctx.metadata;
        let schema = metadata.entity_schema(&self.ctx.node(node).entity)?;
        self.walk_properties(node, &schema.properties, "", walked)
    }

    fn walk_properties(
        &mut self,
        node: NodeId,
        properties: &[PropertySchema],
        prefix: &str,
        walked: &mut HashSet<String>,
    ) -> Result<(), TranslationError> {
        for property in properties {
            let path = join_path(prefix, &property.name);
            if let Some(parts) = &property.component {
                self.walk_properties(node, parts, &path, walked)?;
                continue;
            }
            let assoc = match &property.association {
                Some(assoc) => assoc,
                None => continue,
            };
            let whole_path = join_path(&self.ctx.node(node).whole_path, &path);
            if !walked.insert(whole_path.clone()) {
                continue;
            }

            if let Some(existing) = self.ctx.node_at_path(&whole_path) {
                if self.ctx.plan.is_planned(existing) {
                    self.walk_entity(existing, walked)?;
                }
                continue;
            }

            let owner = self.ctx.node(node).clone();
            if let Some((join_kind, origin)) = self.fetch_decision(&owner, &path, property, assoc)? {
                let target = self.ctx.metadata.entity_schema(&assoc.target)?;
                let id = self.add_node(QueryNode {
                    id: 0,
                    parent: Some(node),
                    whole_path,
                    entity: target.name.clone(),
                    association: Some(AssociationType {
                        kind: assoc.kind,
                        owner: owner.entity.clone(),
                        role: path.clone(),
                        target: target.name.clone(),
                    }),
                    owner_property: path.clone(),
                    depth: owner.depth + 1,
                    origin: NodeOrigin::Implicit,
                    join_kind,
                    user_alias: None,
                    hops: Vec::new(),
                });
                self.add_join(id, node, join_kind, origin)?;
                self.walk_entity(id, walked)?;
            }
        }
        Ok(())
    }

    /// Whether `path` on `owner` is fetched by join, and how.
    fn fetch_decision(
        &self,
        owner: &QueryNode,
        path: &str,
        property: &PropertySchema,
        assoc: &AssociationSchema,
    ) -> Result<Option<(JoinKind, JoinOrigin)>, TranslationError> {
        let whole_path = join_path(&owner.whole_path, path);
        let nullable =
            property.nullable || assoc.kind.is_collection() || assoc.mapped_by.is_some();
        let depth = owner.depth;

        match self.ctx.spec.fetch_mode_for(&whole_path) {
            FetchMode::Join => {
                return Ok(Some((join_kind_for(nullable, depth), JoinOrigin::FetchMode)))
            }
            FetchMode::Select => return Ok(None),
            FetchMode::Default => {}
        }

        let metadata = self.ctx.metadata;
        let owner_schema = metadata.entity_schema(&owner.entity)?;
        for name in &self.ctx.spec.options.enabled_fetch_profiles {
            let entry = metadata.fetch_profile(name).and_then(|profile| {
                profile
                    .entry_for(&owner_schema.name, path)
                    .or_else(|| profile.entry_for(&owner_schema.hierarchy_root, path))
            });
            if let Some(entry) = entry {
                if self.too_deep(depth) {
                    return Ok(None);
                }
                let kind = if entry.outer {
                    JoinKind::LeftOuter
                } else {
                    join_kind_for(nullable, depth)
                };
                return Ok(Some((kind, JoinOrigin::FetchProfile)));
            }
        }

        if self.too_deep(depth) || !assoc.kind.is_to_one() {
            return Ok(None);
        }
        let eager = match property.fetch {
            FetchStyle::Join => true,
            FetchStyle::Select => false,
            FetchStyle::Default => !metadata.entity_schema(&assoc.target)?.lazy,
        };
        Ok(eager.then(|| (join_kind_for(nullable, depth), JoinOrigin::MappingDefault)))
    }

    fn too_deep(&self, depth: u32) -> bool {
        depth >= self.ctx.config.max_fetch_depth
    }

    // ========================================================================
    // Plan bookkeeping
    // ========================================================================

    fn add_node(&mut self, mut node: QueryNode) -> NodeId {
        let id = self.ctx.nodes.len();
        node.id = id;
        let entity = node.entity.clone();
        self.ctx.nodes.push(node);
        self.ctx.registry.alias_for(id, &entity);
        self.ctx.registry.record_entity(id, &entity);
        id
    }

    fn add_join(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        join_kind: JoinKind,
        origin: JoinOrigin,
    ) -> Result<(), TranslationError> {
        let metadata = self.ctx.metadata;
        let owner = self.ctx.node(lhs).entity.clone();
        let joined = self.ctx.node(node).clone();
        let columns = join_columns(metadata, &owner, &joined.owner_property)?;

        let owner_table = metadata.entity_schema(&owner)?.table.clone();
        let target_table = metadata.entity_schema(&joined.entity)?.table.clone();
        let owns_key = metadata
            .property_at(&owner, &joined.owner_property)
            .map(|p| match p {
                PropertyRef::Property { schema, .. } => schema.has_owned_foreign_key(),
                _ => false,
            })
            .unwrap_or(false);
        let (table, key_columns) = columns.association_key(&owner_table, &target_table, owns_key);
        if !self.association_keys.insert((table.clone(), key_columns.clone())) {
            log::debug!(
                "Association {}({}) joined again for `{}`",
                table,
                key_columns.join(", "),
                joined.whole_path
            );
            self.ctx.plan.duplicates.push(DuplicateJoin {
                path: joined.whole_path.clone(),
                table,
                columns: key_columns,
            });
        }

        let link_alias = columns
            .link
            .as_ref()
            .map(|link| self.ctx.registry.mint(&link.table));
        log::trace!(
            "Join {:?} `{}` -> {} as {}",
            origin,
            joined.whole_path,
            joined.entity,
            self.ctx.sql_alias(node)
        );
        self.ctx.plan.joins.push(PlannedJoin {
            node,
            lhs,
            join_kind,
            origin,
            columns,
            link_alias,
        });
        Ok(())
    }
}

/// Inner join only for a non-nullable association off the root.
fn join_kind_for(nullable: bool, depth: u32) -> JoinKind {
    if !nullable && depth == 0 {
        JoinKind::Inner
    } else {
        JoinKind::LeftOuter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(false, 0, JoinKind::Inner ; "required at root")]
    #[test_case(true, 0, JoinKind::LeftOuter ; "nullable at root")]
    #[test_case(false, 1, JoinKind::LeftOuter ; "required below root")]
    fn test_join_kind_for(nullable: bool, depth: u32, expected: JoinKind) {
        assert_eq!(join_kind_for(nullable, depth), expected);
    }
}
