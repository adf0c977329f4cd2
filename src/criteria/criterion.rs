use super::value::{TypedValue, Value};
use super::QuerySpecification;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionOp {
    And,
    Or,
}

impl JunctionOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JunctionOp::And => "and",
            JunctionOp::Or => "or",
        }
    }
}

/// Where a LIKE pattern is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    Start,
    End,
    Anywhere,
}

impl MatchMode {
    pub fn to_match_string(&self, pattern: &str) -> String {
        match self {
            MatchMode::Exact => pattern.to_string(),
            MatchMode::Start => format!("{}%", pattern),
            MatchMode::End => format!("%{}", pattern),
            MatchMode::Anywhere => format!("%{}%", pattern),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubqueryOp {
    Exists,
    NotExists,
    In,
    NotIn,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl SubqueryOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SubqueryOp::Exists => "exists",
            SubqueryOp::NotExists => "not exists",
            SubqueryOp::In => "in",
            SubqueryOp::NotIn => "not in",
            SubqueryOp::Eq => "=",
            SubqueryOp::Ne => "<>",
            SubqueryOp::Gt => ">",
            SubqueryOp::Lt => "<",
            SubqueryOp::Ge => ">=",
            SubqueryOp::Le => "<=",
        }
    }

    pub fn is_existential(&self) -> bool {
        matches!(self, SubqueryOp::Exists | SubqueryOp::NotExists)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    All,
    Some,
}

/// Left-hand side of a subquery comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubqueryOperand {
    Property(String),
    Value(Value),
}

/// One restriction node. Each variant knows how to render itself and which
/// values it binds (see `sql_generator::criterion_sql` and
/// `translator::parameters`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    Compare {
        property: String,
        op: ComparisonOp,
        value: Value,
        #[serde(default)]
        ignore_case: bool,
    },
    Like {
        property: String,
        pattern: String,
        #[serde(default)]
        match_mode: MatchMode,
        #[serde(default)]
        ignore_case: bool,
        #[serde(default)]
        escape: Option<char>,
    },
    Between {
        property: String,
        low: Value,
        high: Value,
    },
    In {
        property: String,
        values: Vec<Value>,
    },
    IsNull {
        property: String,
    },
    IsNotNull {
        property: String,
    },
    PropertyCompare {
        property: String,
        op: ComparisonOp,
        other: String,
    },
    Junction {
        op: JunctionOp,
        criteria: Vec<Criterion>,
    },
    Not {
        criterion: Box<Criterion>,
    },
    IdEq {
        value: Value,
    },
    NaturalId {
        values: Vec<(String, Value)>,
    },
    Sql {
        sql: String,
        #[serde(default)]
        values: Vec<TypedValue>,
    },
    IsEmpty {
        property: String,
    },
    IsNotEmpty {
        property: String,
    },
    /// Compares the element count of a mapped collection with `size`
    Size {
        property: String,
        op: ComparisonOp,
        size: i64,
    },
    /// Query by example: one restriction per supplied property value
    Example {
        values: Vec<(String, Value)>,
        #[serde(default)]
        ignore_case: bool,
        /// Text values match with `like` in this mode instead of `=`
        #[serde(default)]
        like: Option<MatchMode>,
        #[serde(default = "default_exclude_nulls")]
        exclude_nulls: bool,
        #[serde(default)]
        excluded: Vec<String>,
    },
    Subquery {
        #[serde(default)]
        lhs: Option<SubqueryOperand>,
        op: SubqueryOp,
        #[serde(default)]
        quantifier: Option<Quantifier>,
        query: Box<QuerySpecification>,
    },
}

fn default_exclude_nulls() -> bool {
    true
}

// ============================================================================
// Builders
// ============================================================================

impl Criterion {
    pub fn eq(property: &str, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOp::Eq, value)
    }

    pub fn ne(property: &str, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOp::Ne, value)
    }

    pub fn gt(property: &str, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOp::Gt, value)
    }

    pub fn lt(property: &str, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOp::Lt, value)
    }

    pub fn ge(property: &str, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOp::Ge, value)
    }

    pub fn le(property: &str, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOp::Le, value)
    }

    pub fn compare(property: &str, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Criterion::Compare {
            property: property.to_string(),
            op,
            value: value.into(),
            ignore_case: false,
        }
    }

    /// Case-insensitive equality, rendered as `lower(col) = ?`.
    pub fn eq_ignore_case(property: &str, value: impl Into<Value>) -> Self {
        Criterion::Compare {
            property: property.to_string(),
            op: ComparisonOp::Eq,
            value: value.into(),
            ignore_case: true,
        }
    }

    pub fn like(property: &str, pattern: &str, match_mode: MatchMode) -> Self {
        Criterion::Like {
            property: property.to_string(),
            pattern: pattern.to_string(),
            match_mode,
            ignore_case: false,
            escape: None,
        }
    }

    pub fn ilike(property: &str, pattern: &str, match_mode: MatchMode) -> Self {
        Criterion::Like {
            property: property.to_string(),
            pattern: pattern.to_string(),
            match_mode,
            ignore_case: true,
            escape: None,
        }
    }

    pub fn between(property: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Criterion::Between {
            property: property.to_string(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(property: &str, values: Vec<V>) -> Self {
        Criterion::In {
            property: property.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(property: &str) -> Self {
        Criterion::IsNull {
            property: property.to_string(),
        }
    }

    pub fn is_not_null(property: &str) -> Self {
        Criterion::IsNotNull {
            property: property.to_string(),
        }
    }

    pub fn eq_property(property: &str, other: &str) -> Self {
        Criterion::PropertyCompare {
            property: property.to_string(),
            op: ComparisonOp::Eq,
            other: other.to_string(),
        }
    }

    pub fn property_compare(property: &str, op: ComparisonOp, other: &str) -> Self {
        Criterion::PropertyCompare {
            property: property.to_string(),
            op,
            other: other.to_string(),
        }
    }

    pub fn and(criteria: Vec<Criterion>) -> Self {
        Criterion::Junction {
            op: JunctionOp::And,
            criteria,
        }
    }

    pub fn or(criteria: Vec<Criterion>) -> Self {
        Criterion::Junction {
            op: JunctionOp::Or,
            criteria,
        }
    }

    pub fn not(criterion: Criterion) -> Self {
        Criterion::Not {
            criterion: Box::new(criterion),
        }
    }

    pub fn id_eq(value: impl Into<Value>) -> Self {
        Criterion::IdEq {
            value: value.into(),
        }
    }

    pub fn natural_id(values: Vec<(&str, Value)>) -> Self {
        Criterion::NaturalId {
            values: values
                .into_iter()
                .map(|(p, v)| (p.to_string(), v))
                .collect(),
        }
    }

    /// Raw SQL; `{alias}` is replaced by the root table alias.
    pub fn sql(sql: &str, values: Vec<TypedValue>) -> Self {
        Criterion::Sql {
            sql: sql.to_string(),
            values,
        }
    }

    pub fn is_empty(property: &str) -> Self {
        Criterion::IsEmpty {
            property: property.to_string(),
        }
    }

    pub fn is_not_empty(property: &str) -> Self {
        Criterion::IsNotEmpty {
            property: property.to_string(),
        }
    }

    pub fn size(property: &str, op: ComparisonOp, size: i64) -> Self {
        Criterion::Size {
            property: property.to_string(),
            op,
            size,
        }
    }

    pub fn size_eq(property: &str, size: i64) -> Self {
        Self::size(property, ComparisonOp::Eq, size)
    }

    pub fn size_gt(property: &str, size: i64) -> Self {
        Self::size(property, ComparisonOp::Gt, size)
    }

    pub fn size_lt(property: &str, size: i64) -> Self {
        Self::size(property, ComparisonOp::Lt, size)
    }

    /// Example restriction with `=` matching and null values skipped.
    pub fn example(values: Vec<(&str, Value)>) -> Self {
        Criterion::Example {
            values: values
                .into_iter()
                .map(|(p, v)| (p.to_string(), v))
                .collect(),
            ignore_case: false,
            like: None,
            exclude_nulls: true,
            excluded: Vec::new(),
        }
    }

    /// Example options; no-ops on other criteria.
    pub fn ignore_case(mut self) -> Self {
        if let Criterion::Example { ignore_case, .. } = &mut self {
            *ignore_case = true;
        }
        self
    }

    pub fn enable_like(mut self, mode: MatchMode) -> Self {
        if let Criterion::Example { like, .. } = &mut self {
            *like = Some(mode);
        }
        self
    }

    pub fn include_nulls(mut self) -> Self {
        if let Criterion::Example { exclude_nulls, .. } = &mut self {
            *exclude_nulls = false;
        }
        self
    }

    pub fn exclude_property(mut self, property: &str) -> Self {
        if let Criterion::Example { excluded, .. } = &mut self {
            excluded.push(property.to_string());
        }
        self
    }

    pub fn exists(query: QuerySpecification) -> Self {
        Criterion::Subquery {
            lhs: None,
            op: SubqueryOp::Exists,
            quantifier: None,
            query: Box::new(query),
        }
    }

    pub fn not_exists(query: QuerySpecification) -> Self {
        Criterion::Subquery {
            lhs: None,
            op: SubqueryOp::NotExists,
            quantifier: None,
            query: Box::new(query),
        }
    }

    pub fn property_in(property: &str, query: QuerySpecification) -> Self {
        Self::property_subquery(property, SubqueryOp::In, None, query)
    }

    pub fn property_subquery(
        property: &str,
        op: SubqueryOp,
        quantifier: Option<Quantifier>,
        query: QuerySpecification,
    ) -> Self {
        Criterion::Subquery {
            lhs: Some(SubqueryOperand::Property(property.to_string())),
            op,
            quantifier,
            query: Box::new(query),
        }
    }

    pub fn value_subquery(
        value: impl Into<Value>,
        op: SubqueryOp,
        quantifier: Option<Quantifier>,
        query: QuerySpecification,
    ) -> Self {
        Criterion::Subquery {
            lhs: Some(SubqueryOperand::Value(value.into())),
            op,
            quantifier,
            query: Box::new(query),
        }
    }

    /// The conjunction an example restriction stands for. Text values use
    /// `like` when enabled; nulls become `is null` unless excluded.
    pub fn example_terms(&self) -> Option<Criterion> {
        let Criterion::Example {
            values,
            ignore_case,
            like,
            exclude_nulls,
            excluded,
        } = self
        else {
            return None;
        };
        let criteria = values
            .iter()
            .filter(|(property, _)| !excluded.contains(property))
            .filter(|(_, value)| !(*exclude_nulls && matches!(value, Value::Null)))
            .map(|(property, value)| match (value, like) {
                (Value::Null, _) => Criterion::IsNull {
                    property: property.clone(),
                },
                (Value::Text(text), Some(mode)) => Criterion::Like {
                    property: property.clone(),
                    pattern: text.clone(),
                    match_mode: *mode,
                    ignore_case: *ignore_case,
                    escape: None,
                },
                (Value::Text(_), None) => Criterion::Compare {
                    property: property.clone(),
                    op: ComparisonOp::Eq,
                    value: value.clone(),
                    ignore_case: *ignore_case,
                },
                _ => Criterion::Compare {
                    property: property.clone(),
                    op: ComparisonOp::Eq,
                    value: value.clone(),
                    ignore_case: false,
                },
            })
            .collect();
        Some(Criterion::Junction {
            op: JunctionOp::And,
            criteria,
        })
    }

    /// Whether this is a natural-id restriction.
    pub fn is_natural_id(&self) -> bool {
        matches!(self, Criterion::NaturalId { .. })
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Compare {
                property, op, value, ..
            } => write!(f, "{}{}{}", property, op.as_sql(), value),
            Criterion::Like {
                property, pattern, ..
            } => write!(f, "{} like {}", property, pattern),
            Criterion::Between {
                property, low, high,
            } => write!(f, "{} between {} and {}", property, low, high),
            Criterion::In { property, values } => {
                write!(f, "{} in {}", property, Value::List(values.clone()))
            }
            Criterion::IsNull { property } => write!(f, "{} is null", property),
            Criterion::IsNotNull { property } => write!(f, "{} is not null", property),
            Criterion::PropertyCompare {
                property,
                op,
                other,
            } => write!(f, "{}{}{}", property, op.as_sql(), other),
            Criterion::Junction { op, criteria } => {
                write!(f, "(")?;
                for (i, c) in criteria.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.as_sql())?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            Criterion::Not { criterion } => write!(f, "not {}", criterion),
            Criterion::IdEq { value } => write!(f, "id = {}", value),
            Criterion::NaturalId { values } => {
                let parts: Vec<String> =
                    values.iter().map(|(p, v)| format!("{}={}", p, v)).collect();
                write!(f, "naturalId({})", parts.join(", "))
            }
            Criterion::Sql { sql, .. } => write!(f, "{}", sql),
            Criterion::IsEmpty { property } => write!(f, "{} is empty", property),
            Criterion::IsNotEmpty { property } => write!(f, "{} is not empty", property),
            Criterion::Size { property, op, size } => {
                write!(f, "size({}){}{}", property, op.as_sql(), size)
            }
            Criterion::Example { values, .. } => {
                let parts: Vec<String> =
                    values.iter().map(|(p, v)| format!("{}={}", p, v)).collect();
                write!(f, "example({})", parts.join(", "))
            }
            Criterion::Subquery { op, query, .. } => {
                write!(f, "{} (subquery on {})", op.as_sql(), query.entity)
            }
        }
    }
}
