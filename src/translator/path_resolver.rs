use super::alias_registry::{NodeId, ROOT_NODE};
use super::context::TranslationContext;
use super::errors::TranslationError;
use crate::entity_catalog::{AssociationType, PropertyRef, SemanticType};

/// A path located on a query node: the node whose alias qualifies the
/// columns, and the property path within that node's entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub node: NodeId,
    pub sql_alias: String,
    pub entity: String,
    /// Property path within `entity`; component segments and the `assoc.id`
    /// foreign-key shortcut are the only dotted forms
    pub property: String,
    pub association: Option<AssociationType>,
    /// Resolved against the enclosing query
    pub outer: bool,
}

/// One association crossed by a declared join path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationHop {
    /// Root-relative path up to and including this association
    pub whole_path: String,
    pub owner: String,
    /// Property path within `owner`
    pub property: String,
    pub association: AssociationType,
    pub target: String,
}

pub fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Resolves dotted paths against the nodes of one translation context.
pub struct PathResolver<'c, 'a> {
    ctx: &'c TranslationContext<'a>,
}

impl<'c, 'a> PathResolver<'c, 'a> {
    pub fn new(ctx: &'c TranslationContext<'a>) -> Self {
        PathResolver { ctx }
    }

    /// Split a leading user alias off `path`. The leading segment is tested as
    /// an alias first; otherwise the path is relative to `context_node`.
    pub fn split_aliased<'p>(&self, path: &'p str, context_node: NodeId) -> (NodeId, &'p str) {
        if let Some((first, rest)) = path.split_once('.') {
            if let Some(node) = self.ctx.registry.node_for_user_alias(first) {
                return (node, rest);
            }
        }
        (context_node, path)
    }

    /// Resolve `path` relative to `context_node`, retrying in the enclosing
    /// query when the local tree cannot resolve it.
    pub fn resolve(&self, path: &str, context_node: NodeId) -> Result<ResolvedPath, TranslationError> {
        match self.resolve_local(path, context_node) {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.is_resolution_failure() => match self.ctx.outer {
                Some(outer) => {
                    log::debug!("Resolving `{}` against the enclosing query", path);
                    PathResolver::new(outer)
                        .resolve(path, ROOT_NODE)
                        .map(|resolved| ResolvedPath {
                            outer: true,
                            ..resolved
                        })
                        .map_err(|_| e)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    fn resolve_local(&self, path: &str, context_node: NodeId) -> Result<ResolvedPath, TranslationError> {
        let (start, relative) = self.split_aliased(path, context_node);
        let metadata = self.ctx.metadata;
        let segments: Vec<&str> = relative.split('.').collect();

        let mut node = start;
        let mut prefix = String::new();
        let mut i = 0;
        while i < segments.len() {
            let entity = self.ctx.node(node).entity.as_str();
            let property = join_path(&prefix, segments[i]);
            let is_last = i + 1 == segments.len();
            let located = metadata
                .property_at(entity, &property)
                .map_err(|e| TranslationError::from_lookup(e, path))?;

            let here = node;
            let resolved = |property: String, association: Option<AssociationType>| ResolvedPath {
                node: here,
                sql_alias: self.ctx.sql_alias(here).to_string(),
                entity: entity.to_string(),
                property,
                association,
                outer: false,
            };

            match located {
                PropertyRef::Identifier(_) | PropertyRef::Discriminator(_) | PropertyRef::ForeignKeyId { .. } => {
                    if is_last {
                        return Ok(resolved(property, None));
                    }
                    return Err(TranslationError::NotAnAssociation {
                        entity: entity.to_string(),
                        property,
                        path: path.to_string(),
                    });
                }
                PropertyRef::Property { schema, .. } if schema.is_component() => {
                    if is_last {
                        return Ok(resolved(property, None));
                    }
                    prefix = property;
                    i += 1;
                }
                PropertyRef::Property { schema, .. } if schema.is_association() => {
                    let association = match metadata
                        .type_for(entity, &property)
                        .map_err(|e| TranslationError::from_lookup(e, path))?
                    {
                        SemanticType::Association(assoc) => assoc,
                        _ => return Err(TranslationError::unresolved(entity, path)),
                    };
                    if is_last {
                        return Ok(resolved(property, Some(association)));
                    }
                    let child_path = join_path(&self.ctx.node(node).whole_path, &property);
                    if let Some(child) = self.ctx.node_at_path(&child_path) {
                        node = child;
                        prefix.clear();
                        i += 1;
                        continue;
                    }
                    // Not joined: only the foreign key shortcut can be read
                    let rest = segments[i + 1..].join(".");
                    let shortcut = join_path(&property, &rest);
                    if let Ok(PropertyRef::ForeignKeyId { .. }) = metadata.property_at(entity, &shortcut) {
                        return Ok(resolved(shortcut, None));
                    }
                    return Err(TranslationError::unresolved(entity, path));
                }
                PropertyRef::Property { .. } => {
                    if is_last {
                        return Ok(resolved(property, None));
                    }
                    return Err(TranslationError::NotAnAssociation {
                        entity: entity.to_string(),
                        property,
                        path: path.to_string(),
                    });
                }
            }
        }
        Err(TranslationError::unresolved(&self.ctx.node(start).entity, path))
    }

    /// Associations crossed by `relative` starting at `entity`, walked in
    /// metadata only (nothing needs to be joined yet).
    pub fn association_hops(
        &self,
        entity: &str,
        base_path: &str,
        relative: &str,
    ) -> Result<Vec<AssociationHop>, TranslationError> {
        let metadata = self.ctx.metadata;
        let segments: Vec<&str> = relative.split('.').collect();
        let mut hops = Vec::new();
        let mut current = entity.to_string();
        let mut prefix = String::new();

        for (i, segment) in segments.iter().enumerate() {
            let property = join_path(&prefix, segment);
            let ty = metadata
                .type_for(&current, &property)
                .map_err(|e| TranslationError::from_lookup(e, relative))?;
            match ty {
                SemanticType::Association(association) => {
                    let target = metadata.associated_entity_of(&association)?;
                    hops.push(AssociationHop {
                        whole_path: join_path(base_path, &segments[..=i].join(".")),
                        owner: current.clone(),
                        property,
                        association,
                        target: target.clone(),
                    });
                    current = target;
                    prefix.clear();
                }
                SemanticType::Component(_) if i + 1 < segments.len() => {
                    prefix = property;
                }
                _ => {
                    return Err(TranslationError::NotAnAssociation {
                        entity: current,
                        property,
                        path: relative.to_string(),
                    });
                }
            }
        }
        if hops.is_empty() {
            return Err(TranslationError::unresolved(entity, relative));
        }
        Ok(hops)
    }
}
