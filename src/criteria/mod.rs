//! Caller-side query description.
//!
//! A [`QuerySpecification`] is built by the caller (fluently or from YAML/JSON)
//! and only ever read by the translator.

pub mod criterion;
pub mod order;
pub mod projection;
pub mod value;

pub use criterion::{
    ComparisonOp, Criterion, JunctionOp, MatchMode, Quantifier, SubqueryOp, SubqueryOperand,
};
pub use order::{NullPrecedence, Order};
pub use projection::{AggregateFunction, Projection};
pub use value::{TypedValue, Value};

use crate::result_projector::ResultTransformer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
    Full,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::LeftOuter => "left outer join",
            JoinKind::RightOuter => "right outer join",
            JoinKind::Full => "full join",
        }
    }
}

/// Per-path override of the mapping's fetch strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Default,
    Join,
    Select,
}

/// Pessimistic lock request, weakest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    PessimisticRead,
    Upgrade,
    UpgradeNowait,
    UpgradeSkipLocked,
}

impl LockMode {
    pub fn is_none(&self) -> bool {
        matches!(self, LockMode::None)
    }
}

/// An association join declared by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubNode {
    /// Dotted path from the root, or from an earlier alias (`items.product`)
    pub path: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub join_kind: JoinKind,
    /// Restriction rendered into the join's ON clause
    #[serde(default)]
    pub with_clause: Option<Criterion>,
    #[serde(default)]
    pub lock_mode: Option<LockMode>,
}

impl SubNode {
    pub fn new(path: &str, alias: Option<&str>, join_kind: JoinKind) -> Self {
        SubNode {
            path: path.to_string(),
            alias: alias.map(str::to_string),
            join_kind,
            with_clause: None,
            lock_mode: None,
        }
    }
}

/// Row window and driver hints, recorded for the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSelection {
    #[serde(default)]
    pub first_result: Option<u32>,
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Seconds
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub fetch_size: Option<u32>,
}

impl RowSelection {
    pub fn is_limited(&self) -> bool {
        self.first_result.unwrap_or(0) > 0 || self.max_results.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub cacheable: bool,
    #[serde(default)]
    pub cache_region: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub read_only: Option<bool>,
    #[serde(default)]
    pub enabled_filters: Vec<String>,
    #[serde(default)]
    pub enabled_fetch_profiles: Vec<String>,
}

/// Root entity plus the criteria tree to translate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpecification {
    pub entity: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub sub_nodes: Vec<SubNode>,
    #[serde(default)]
    pub restrictions: Vec<Criterion>,
    #[serde(default)]
    pub orderings: Vec<Order>,
    #[serde(default)]
    pub projection: Option<Projection>,
    /// Extra GROUP BY property paths, after projection grouping
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Root-relative association path to fetch override
    #[serde(default)]
    pub fetch_modes: BTreeMap<String, FetchMode>,
    /// Lock mode of the root entity
    #[serde(default)]
    pub lock_mode: LockMode,
    /// Lock modes by user alias
    #[serde(default)]
    pub lock_modes: BTreeMap<String, LockMode>,
    #[serde(default)]
    pub selection: RowSelection,
    #[serde(default)]
    pub options: QueryOptions,
    #[serde(default)]
    pub result_transformer: Option<ResultTransformer>,
}

impl QuerySpecification {
    pub fn new(entity: &str) -> Self {
        QuerySpecification {
            entity: entity.to_string(),
            alias: None,
            sub_nodes: Vec::new(),
            restrictions: Vec::new(),
            orderings: Vec::new(),
            projection: None,
            group_by: Vec::new(),
            fetch_modes: BTreeMap::new(),
            lock_mode: LockMode::None,
            lock_modes: BTreeMap::new(),
            selection: RowSelection::default(),
            options: QueryOptions::default(),
            result_transformer: None,
        }
    }

    pub fn aliased(entity: &str, alias: &str) -> Self {
        QuerySpecification {
            alias: Some(alias.to_string()),
            ..Self::new(entity)
        }
    }

    pub fn add(mut self, criterion: Criterion) -> Self {
        self.restrictions.push(criterion);
        self
    }

    pub fn join(mut self, path: &str, alias: &str) -> Self {
        self.sub_nodes
            .push(SubNode::new(path, Some(alias), JoinKind::Inner));
        self
    }

    pub fn join_with(mut self, sub_node: SubNode) -> Self {
        self.sub_nodes.push(sub_node);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.orderings.push(order);
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn fetch(mut self, path: &str, mode: FetchMode) -> Self {
        self.fetch_modes.insert(path.to_string(), mode);
        self
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    pub fn lock_alias(mut self, alias: &str, mode: LockMode) -> Self {
        self.lock_modes.insert(alias.to_string(), mode);
        self
    }

    pub fn first_result(mut self, first: u32) -> Self {
        self.selection.first_result = Some(first);
        self
    }

    pub fn max_results(mut self, max: u32) -> Self {
        self.selection.max_results = Some(max);
        self
    }

    pub fn enable_filter(mut self, name: &str) -> Self {
        self.options.enabled_filters.push(name.to_string());
        self
    }

    pub fn enable_fetch_profile(mut self, name: &str) -> Self {
        self.options.enabled_fetch_profiles.push(name.to_string());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.options.comment = Some(comment.to_string());
        self
    }

    pub fn transform(mut self, transformer: ResultTransformer) -> Self {
        self.result_transformer = Some(transformer);
        self
    }

    pub fn fetch_mode_for(&self, path: &str) -> FetchMode {
        self.fetch_modes.get(path).copied().unwrap_or_default()
    }

    /// A single natural-id restriction over a plain entity select.
    pub fn is_lookup_by_natural_key(&self) -> bool {
        self.projection.is_none()
            && self.sub_nodes.is_empty()
            && self.restrictions.len() == 1
            && self.restrictions[0].is_natural_id()
    }
}
