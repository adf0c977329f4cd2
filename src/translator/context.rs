use super::alias_registry::{AliasRegistry, NodeId, ROOT_NODE};
use super::errors::TranslationError;
use super::path_resolver::{join_path, AssociationHop, PathResolver, ResolvedPath};
use super::projected::{ProjectedColumn, ProjectionLayout};
use crate::config::TranslatorConfig;
use crate::criteria::{JoinKind, LockMode, QuerySpecification, SubNode, TypedValue, Value};
use crate::entity_catalog::{AssociationType, CatalogError, EntityMetadata, SemanticType};
use crate::join_planner::{JoinPlan, JoinPlanner};
use crate::sql_generator::dialect::Dialect;
use std::collections::BTreeSet;

/// How a node entered the query tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    Root,
    /// Declared by the caller; index into `QuerySpecification::sub_nodes`
    Declared(usize),
    /// Join needed to reach a declared multi-association path
    Intermediate,
    /// Planned by the fetch walk (mapping default, fetch mode or fetch profile)
    Implicit,
}

/// One entity-bearing node: the root or the target of a join.
#[derive(Debug, Clone)]
pub struct QueryNode {
    pub id: NodeId,
    /// Node on the left-hand side of this node's join
    pub parent: Option<NodeId>,
    /// Root-relative association path; empty for the root
    pub whole_path: String,
    pub entity: String,
    pub association: Option<AssociationType>,
    /// Property path of the association within the parent entity
    pub owner_property: String,
    /// Association hops from the root
    pub depth: u32,
    pub origin: NodeOrigin,
    pub join_kind: JoinKind,
    pub user_alias: Option<String>,
    /// Associations crossed from the declaring node (declared nodes only)
    pub hops: Vec<AssociationHop>,
}

impl QueryNode {
    fn root(entity: &str, user_alias: Option<String>) -> Self {
        QueryNode {
            id: ROOT_NODE,
            parent: None,
            whole_path: String::new(),
            entity: entity.to_string(),
            association: None,
            owner_property: String::new(),
            depth: 0,
            origin: NodeOrigin::Root,
            join_kind: JoinKind::Inner,
            user_alias,
            hops: Vec::new(),
        }
    }

    pub fn is_declared(&self) -> bool {
        matches!(self.origin, NodeOrigin::Declared(_))
    }
}

// ============================================================================
// TranslationContext
// ============================================================================

/// State of one translation: the node tree, its aliases and the join plan.
///
/// Built fresh per call and dropped afterwards. Subqueries get their own
/// context holding a reference to the enclosing one, which resolution falls
/// back to when a path does not resolve locally.
pub struct TranslationContext<'a> {
    pub(crate) spec: &'a QuerySpecification,
    pub(crate) metadata: &'a dyn EntityMetadata,
    pub(crate) config: &'a TranslatorConfig,
    pub(crate) dialect: &'a dyn Dialect,
    pub(crate) outer: Option<&'a TranslationContext<'a>>,
    pub(crate) registry: AliasRegistry,
    pub(crate) nodes: Vec<QueryNode>,
    pub(crate) plan: JoinPlan,
    pub(crate) projection: Option<ProjectionLayout>,
}

impl<'a> TranslationContext<'a> {
    pub fn build(
        spec: &'a QuerySpecification,
        metadata: &'a dyn EntityMetadata,
        config: &'a TranslatorConfig,
        dialect: &'a dyn Dialect,
    ) -> Result<Self, TranslationError> {
        let registry = AliasRegistry::new(&spec.entity, spec.alias.as_deref())?;
        Self::assemble(spec, metadata, config, dialect, None, registry)
    }

    /// Context for a subquery correlated with `self`.
    pub fn nested<'b>(
        &'b self,
        spec: &'b QuerySpecification,
    ) -> Result<TranslationContext<'b>, TranslationError> {
        let registry = self.registry.nested(&spec.entity, spec.alias.as_deref())?;
        TranslationContext::assemble(
            spec,
            self.metadata,
            self.config,
            self.dialect,
            Some(self),
            registry,
        )
    }

    fn assemble(
        spec: &'a QuerySpecification,
        metadata: &'a dyn EntityMetadata,
        config: &'a TranslatorConfig,
        dialect: &'a dyn Dialect,
        outer: Option<&'a TranslationContext<'a>>,
        registry: AliasRegistry,
    ) -> Result<Self, TranslationError> {
        let root = metadata.entity_schema(&spec.entity)?;
        for profile in &spec.options.enabled_fetch_profiles {
            if metadata.fetch_profile(profile).is_none() {
                return Err(CatalogError::UnknownFetchProfile {
                    profile: profile.clone(),
                }
                .into());
            }
        }

        let mut ctx = TranslationContext {
            spec,
            metadata,
            config,
            dialect,
            outer,
            registry,
            nodes: vec![QueryNode::root(&root.name, spec.alias.clone())],
            plan: JoinPlan::default(),
            projection: None,
        };
        ctx.register_sub_nodes()?;
        JoinPlanner::new(&mut ctx).plan()?;

        if let Some(projection) = &spec.projection {
            let layout = ProjectionLayout::build(projection, &ctx)?;
            ctx.projection = Some(layout);
        }
        Ok(ctx)
    }

    /// Register declared sub-nodes in declaration order: user alias, target
    /// entity, and SQL alias. Joins are planned afterwards.
    fn register_sub_nodes(&mut self) -> Result<(), TranslationError> {
        let spec = self.spec;
        for (index, sub) in spec.sub_nodes.iter().enumerate() {
            let (base, relative) = self.resolver().split_aliased(&sub.path, ROOT_NODE);
            if relative.is_empty() {
                return Err(TranslationError::invalid_query(format!(
                    "join path `{}` names no association",
                    sub.path
                )));
            }
            let base_node = self.node(base);
            let whole_path = join_path(&base_node.whole_path, relative);
            if self
                .nodes
                .iter()
                .any(|n| n.is_declared() && n.whole_path == whole_path)
            {
                return Err(TranslationError::DuplicateAssociationPath { path: whole_path });
            }

            let hops =
                self.resolver()
                    .association_hops(&base_node.entity, &base_node.whole_path, relative)?;
            let last = match hops.last() {
                Some(last) => last.clone(),
                None => return Err(TranslationError::unresolved(&base_node.entity, relative)),
            };

            let id = self.nodes.len();
            if let Some(alias) = &sub.alias {
                self.registry.register_user_alias(id, alias, &whole_path)?;
            }
            self.nodes.push(QueryNode {
                id,
                parent: Some(base),
                whole_path,
                entity: last.target.clone(),
                association: Some(last.association.clone()),
                owner_property: last.property.clone(),
                depth: 0,
                origin: NodeOrigin::Declared(index),
                join_kind: sub.join_kind,
                user_alias: sub.alias.clone(),
                hops,
            });
            let alias = self
                .registry
                .alias_for(id, sub.alias.as_deref().unwrap_or(&last.target));
            self.registry.record_entity(id, &last.target);
            log::debug!(
                "Registered join `{}` -> {} as `{}`",
                sub.path,
                last.target,
                alias
            );
        }
        Ok(())
    }

    // ========================================================================
    // Node access
    // ========================================================================

    pub fn spec(&self) -> &'a QuerySpecification {
        self.spec
    }

    pub fn metadata(&self) -> &'a dyn EntityMetadata {
        self.metadata
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    pub fn config(&self) -> &'a TranslatorConfig {
        self.config
    }

    pub fn node(&self, id: NodeId) -> &QueryNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[QueryNode] {
        &self.nodes
    }

    pub fn plan(&self) -> &JoinPlan {
        &self.plan
    }

    pub fn node_at_path(&self, whole_path: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.id != ROOT_NODE && n.whole_path == whole_path)
            .map(|n| n.id)
    }

    pub fn sql_alias(&self, node: NodeId) -> &str {
        self.registry.sql_alias(node).unwrap_or_default()
    }

    /// User alias if the caller gave one, SQL alias otherwise.
    pub fn visible_alias(&self, node: NodeId) -> String {
        match &self.node(node).user_alias {
            Some(alias) => alias.clone(),
            None => self.sql_alias(node).to_string(),
        }
    }

    pub fn declared_sub_node(&self, node: NodeId) -> Option<&'a SubNode> {
        match self.node(node).origin {
            NodeOrigin::Declared(index) => self.spec.sub_nodes.get(index),
            _ => None,
        }
    }

    pub fn has_projection(&self) -> bool {
        self.spec.projection.is_some()
    }

    pub fn is_subquery(&self) -> bool {
        self.outer.is_some()
    }

    pub fn projection_layout(&self) -> Option<&ProjectionLayout> {
        self.projection.as_ref()
    }

    /// Nodes whose entity is selected: joins in plan order, root last.
    pub fn entity_nodes(&self) -> Vec<NodeId> {
        self.plan
            .joins
            .iter()
            .map(|j| j.node)
            .chain(std::iter::once(ROOT_NODE))
            .collect()
    }

    pub fn resolver(&self) -> PathResolver<'_, 'a> {
        PathResolver::new(self)
    }

    pub fn resolve(&self, node: NodeId, path: &str) -> Result<ResolvedPath, TranslationError> {
        self.resolver().resolve(path, node)
    }

    /// Fresh alias for a table that is not a query node.
    pub fn mint_alias(&self, description: &str) -> String {
        self.registry.mint(description)
    }

    pub fn qualify(&self, alias: &str, column: &str) -> String {
        format!("{}.{}", alias, self.dialect.quote_identifier(column))
    }

    pub fn query_spaces(&self) -> Result<BTreeSet<String>, TranslationError> {
        let mut spaces = BTreeSet::new();
        for node in self.entity_nodes() {
            spaces.extend(self.metadata.query_spaces_of(&self.node(node).entity)?);
        }
        Ok(spaces)
    }

    // ========================================================================
    // Column and type lookup
    // ========================================================================

    /// Qualified columns of `path`.
    pub fn columns(&self, node: NodeId, path: &str) -> Result<Vec<String>, TranslationError> {
        let resolved = self.resolve(node, path)?;
        let owner = if resolved.outer { self.outer } else { None };
        let columns = self
            .metadata
            .columns_for(&resolved.entity, &resolved.property)
            .map_err(|e| TranslationError::from_lookup(e, path))?;
        let dialect = owner.map(|o| o.dialect).unwrap_or(self.dialect);
        Ok(columns
            .iter()
            .map(|c| format!("{}.{}", resolved.sql_alias, dialect.quote_identifier(c)))
            .collect())
    }

    /// The single qualified column of `path`.
    pub fn column(&self, node: NodeId, path: &str) -> Result<String, TranslationError> {
        single_column(self.columns(node, path)?, path)
    }

    /// Columns of `path`, where `path` may also name a projection alias of
    /// this query or of an enclosing one.
    pub fn columns_using_projection(
        &self,
        node: NodeId,
        path: &str,
    ) -> Result<Vec<String>, TranslationError> {
        if let Some(entry) = self.projected_entry(path) {
            return Ok(entry.column_aliases.clone());
        }
        match self.columns(node, path) {
            Ok(columns) => Ok(columns),
            Err(e) if e.is_resolution_failure() => match self.outer {
                Some(outer) => outer
                    .columns_using_projection(ROOT_NODE, path)
                    .map_err(|_| e),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    pub fn column_using_projection(&self, node: NodeId, path: &str) -> Result<String, TranslationError> {
        single_column(self.columns_using_projection(node, path)?, path)
    }

    pub fn type_of(&self, node: NodeId, path: &str) -> Result<SemanticType, TranslationError> {
        let resolved = self.resolve(node, path)?;
        self.metadata
            .type_for(&resolved.entity, &resolved.property)
            .map_err(|e| TranslationError::from_lookup(e, path))
    }

    pub fn type_using_projection(
        &self,
        node: NodeId,
        path: &str,
    ) -> Result<SemanticType, TranslationError> {
        if let Some(entry) = self.projected_entry(path) {
            return Ok(entry.ty.clone());
        }
        match self.type_of(node, path) {
            Ok(ty) => Ok(ty),
            Err(e) if e.is_resolution_failure() => match self.outer {
                Some(outer) => outer.type_using_projection(ROOT_NODE, path).map_err(|_| e),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// `value` typed by the property it is compared with. Discriminator
    /// comparisons translate entity names into discriminator values, and
    /// to-one associations bind as the target identifier.
    pub fn typed_value(
        &self,
        node: NodeId,
        path: &str,
        value: &Value,
    ) -> Result<TypedValue, TranslationError> {
        if let Some(entry) = self.projected_entry(path) {
            return Ok(TypedValue::new(entry.ty.clone(), value.clone()));
        }
        let resolved = self.resolve(node, path)?;
        let ty = self
            .metadata
            .type_for(&resolved.entity, &resolved.property)
            .map_err(|e| TranslationError::from_lookup(e, path))?;
        match ty {
            SemanticType::Class => self.discriminator_value(&resolved.entity, value),
            SemanticType::Association(assoc) => {
                let target = self.metadata.entity_schema(&assoc.target)?;
                Ok(TypedValue::new(target.id.ty.clone(), value.clone()))
            }
            other => Ok(TypedValue::new(other, value.clone())),
        }
    }

    fn discriminator_value(&self, entity: &str, value: &Value) -> Result<TypedValue, TranslationError> {
        let schema = self.metadata.entity_schema(entity)?;
        let disc = schema
            .discriminator
            .as_ref()
            .ok_or_else(|| TranslationError::unresolved(entity, "class"))?;
        if !disc.ty.is_discriminator_capable() {
            return Err(TranslationError::UnsupportedDiscriminatorType {
                entity: entity.to_string(),
                ty: disc.ty.to_string(),
            });
        }

        let raw = match value {
            Value::Text(name) => match self.metadata.entity(name) {
                Some(member) if member.hierarchy_root == schema.hierarchy_root => member
                    .discriminator_value
                    .clone()
                    .unwrap_or_else(|| member.name.clone()),
                _ => name.clone(),
            },
            other => other.as_discriminator_text().ok_or_else(|| {
                TranslationError::invalid_query(format!(
                    "`{}` cannot be compared with the discriminator of `{}`",
                    other, entity
                ))
            })?,
        };
        let value = if disc.ty.is_integral() {
            raw.parse::<i64>().map(Value::Int).map_err(|_| {
                TranslationError::invalid_query(format!(
                    "discriminator value `{}` of `{}` is not an integer",
                    raw, entity
                ))
            })?
        } else if disc.ty == SemanticType::Boolean {
            raw.parse::<bool>().map(Value::Bool).map_err(|_| {
                TranslationError::invalid_query(format!(
                    "discriminator value `{}` of `{}` is not a boolean",
                    raw, entity
                ))
            })?
        } else {
            Value::Text(raw)
        };
        Ok(TypedValue::new(disc.ty.clone(), value))
    }

    pub fn identifier_columns(&self, node: NodeId) -> Result<Vec<String>, TranslationError> {
        let schema = self.metadata.entity_schema(&self.node(node).entity)?;
        let alias = self.sql_alias(node);
        Ok(schema
            .id_columns()
            .iter()
            .map(|c| self.qualify(alias, c))
            .collect())
    }

    pub fn identifier_type(&self, node: NodeId) -> Result<SemanticType, TranslationError> {
        let schema = self.metadata.entity_schema(&self.node(node).entity)?;
        Ok(schema.id.ty.clone())
    }

    fn projected_entry(&self, alias: &str) -> Option<&ProjectedColumn> {
        self.projection.as_ref().and_then(|layout| layout.entry(alias))
    }

    // ========================================================================
    // Locks
    // ========================================================================

    /// Requested lock modes by node: sub-node modes, then the root mode, then
    /// modes requested by user alias. Later requests for a node win.
    pub fn lock_requests(&self) -> Result<Vec<(NodeId, LockMode)>, TranslationError> {
        let mut requests: Vec<(NodeId, LockMode)> = Vec::new();
        for node in &self.nodes {
            if let Some(mode) = self.declared_sub_node(node.id).and_then(|s| s.lock_mode) {
                set_lock(&mut requests, node.id, mode);
            }
        }
        if !self.spec.lock_mode.is_none() {
            set_lock(&mut requests, ROOT_NODE, self.spec.lock_mode);
        }
        for (alias, mode) in &self.spec.lock_modes {
            let node = self.registry.node_for_user_alias(alias).ok_or_else(|| {
                TranslationError::invalid_query(format!(
                    "lock mode requested for unknown alias `{}`",
                    alias
                ))
            })?;
            set_lock(&mut requests, node, *mode);
        }
        Ok(requests)
    }
}

fn set_lock(requests: &mut Vec<(NodeId, LockMode)>, node: NodeId, mode: LockMode) {
    match requests.iter_mut().find(|(n, _)| *n == node) {
        Some(entry) => entry.1 = mode,
        None => requests.push((node, mode)),
    }
}

fn single_column(mut columns: Vec<String>, path: &str) -> Result<String, TranslationError> {
    if columns.len() == 1 {
        Ok(columns.remove(0))
    } else {
        Err(TranslationError::ColumnArity {
            path: path.to_string(),
            columns: columns.len(),
        })
    }
}
