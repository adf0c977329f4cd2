use super::errors::TranslationError;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Index of a query node in its translation context. The root is always 0.
pub type NodeId = usize;

pub const ROOT_NODE: NodeId = 0;

const ALIAS_TRUNCATE_LENGTH: usize = 10;

/// Short, lower-case, SQL-safe stem derived from an entity name, path or user alias.
pub fn alias_root(description: &str) -> String {
    let unqualified = description.rsplit('.').next().unwrap_or(description);
    let truncated: String = unqualified.chars().take(ALIAS_TRUNCATE_LENGTH).collect();
    let cleaned: String = truncated
        .to_lowercase()
        .chars()
        .map(|c| if c == '/' || c == '$' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .skip_while(|c| !c.is_ascii_alphabetic())
        .collect();
    if cleaned.is_empty() {
        return "alias".to_string();
    }
    if cleaned.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{}x", cleaned)
    } else {
        cleaned
    }
}

/// Table aliases of one translation.
///
/// The root is registered up front under a reserved alias (`<stem>_`) that
/// never ends in a digit, while every minted alias is `<stem><n>_` with `n`
/// drawn from a sequence shared with nested subquery registries. The two
/// forms cannot collide and no inner alias can shadow an outer one.
#[derive(Debug)]
pub struct AliasRegistry {
    sql_aliases: HashMap<NodeId, String>,
    /// user alias -> (node, declared path)
    user_aliases: HashMap<String, (NodeId, String)>,
    /// node -> resolved entity, in registration order
    entity_names: Vec<(NodeId, String)>,
    sequence: Rc<Cell<usize>>,
}

impl AliasRegistry {
    /// Registry for a top-level query; the root gets the reserved alias.
    pub fn new(root_entity: &str, root_user_alias: Option<&str>) -> Result<Self, TranslationError> {
        let root_alias = format!("{}_", alias_root(root_user_alias.unwrap_or(root_entity)));
        let mut registry = AliasRegistry {
            sql_aliases: HashMap::from([(ROOT_NODE, root_alias)]),
            user_aliases: HashMap::new(),
            entity_names: vec![(ROOT_NODE, root_entity.to_string())],
            sequence: Rc::new(Cell::new(1)),
        };
        if let Some(alias) = root_user_alias {
            registry.register_user_alias(ROOT_NODE, alias, "")?;
        }
        Ok(registry)
    }

    /// Registry for a subquery: shares the alias sequence with `self`, and the
    /// inner root gets a minted alias.
    pub fn nested(
        &self,
        root_entity: &str,
        root_user_alias: Option<&str>,
    ) -> Result<Self, TranslationError> {
        let mut registry = AliasRegistry {
            sql_aliases: HashMap::new(),
            user_aliases: HashMap::new(),
            entity_names: vec![(ROOT_NODE, root_entity.to_string())],
            sequence: Rc::clone(&self.sequence),
        };
        let root_alias = registry.mint(root_user_alias.unwrap_or(root_entity));
        registry.sql_aliases.insert(ROOT_NODE, root_alias);
        if let Some(alias) = root_user_alias {
            registry.register_user_alias(ROOT_NODE, alias, "")?;
        }
        Ok(registry)
    }

    pub fn root_alias(&self) -> &str {
        self.sql_aliases
            .get(&ROOT_NODE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Fresh alias not attached to any node (link tables, inner roots).
    pub fn mint(&self, description: &str) -> String {
        let n = self.sequence.get();
        self.sequence.set(n + 1);
        let alias = format!("{}{}_", alias_root(description), n);
        log::trace!("Minted SQL alias `{}` for `{}`", alias, description);
        alias
    }

    /// The node's alias, minting one from `description` on first request.
    pub fn alias_for(&mut self, node: NodeId, description: &str) -> String {
        if let Some(existing) = self.sql_aliases.get(&node) {
            return existing.clone();
        }
        let alias = self.mint(description);
        self.sql_aliases.insert(node, alias.clone());
        alias
    }

    pub fn sql_alias(&self, node: NodeId) -> Option<&str> {
        self.sql_aliases.get(&node).map(String::as_str)
    }

    pub fn register_user_alias(
        &mut self,
        node: NodeId,
        alias: &str,
        path: &str,
    ) -> Result<(), TranslationError> {
        if let Some((existing, existing_path)) = self.user_aliases.get(alias) {
            if *existing != node {
                return Err(TranslationError::DuplicateAlias {
                    alias: alias.to_string(),
                    existing_path: display_path(existing_path),
                    path: display_path(path),
                });
            }
            return Ok(());
        }
        self.user_aliases
            .insert(alias.to_string(), (node, path.to_string()));
        Ok(())
    }

    pub fn node_for_user_alias(&self, alias: &str) -> Option<NodeId> {
        self.user_aliases.get(alias).map(|(node, _)| *node)
    }

    pub fn record_entity(&mut self, node: NodeId, entity: &str) {
        if !self.entity_names.iter().any(|(n, _)| *n == node) {
            self.entity_names.push((node, entity.to_string()));
        }
    }

    pub fn entity_names(&self) -> &[(NodeId, String)] {
        &self.entity_names
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}
