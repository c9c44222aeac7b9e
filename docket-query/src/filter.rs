//! Filter vocabulary: dynamic values, operators and structured where clauses.
//!
//! A [`WhereClause`] is the store-agnostic description of a filter that
//! upstream code generators emit and backends translate into their native
//! predicate form. Operators are carried as strings on [`Condition`] so that a
//! clause can be deserialized as-is; [`Operator::parse`] resolves the aliases.
//!
//! ```rust
//! use docket_query::{Condition, FilterValue, Operator, WhereClause};
//!
//! let clause = WhereClause::and(vec![
//!     Condition::new("status", Operator::Equals, "active"),
//!     Condition::new("price", Operator::LessThan, 10.0),
//! ]);
//!
//! assert_eq!(clause.conditions.len(), 2);
//! assert_eq!(Operator::parse("$gte"), Some(Operator::GreaterThanOrEqual));
//! assert_eq!(Operator::parse("STARTSWITH"), Some(Operator::StartsWith));
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A dynamically typed value used in conditions and the map DSL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values.
    List(Vec<FilterValue>),
    /// Nested mapping of values, in insertion order.
    Map(IndexMap<String, FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the map payload, if any.
    pub fn as_map(&self) -> Option<&IndexMap<String, FilterValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Build a map value from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Comparison operators understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Direct equality.
    Equals,
    /// Negated equality.
    NotEquals,
    /// Strictly greater than.
    GreaterThan,
    /// Greater than or equal.
    GreaterThanOrEqual,
    /// Strictly less than.
    LessThan,
    /// Less than or equal.
    LessThanOrEqual,
    /// Case-insensitive substring match.
    Contains,
    /// Case-insensitive prefix match.
    StartsWith,
    /// Case-insensitive suffix match.
    EndsWith,
    /// Set membership.
    In,
    /// Negated set membership.
    NotIn,
    /// Field is null.
    IsNull,
    /// Field is not null.
    IsNotNull,
    /// SQL-style wildcard pattern, case-sensitive.
    Like,
    /// SQL-style wildcard pattern, case-insensitive.
    ILike,
    /// Inclusive range `{low, high}`.
    Between,
    /// Full-text search.
    Fuzzy,
    /// Array field contains the value.
    Includes,
}

impl Operator {
    /// Resolve an operator name or alias, ignoring case and a leading `$`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix('$').unwrap_or(name).to_ascii_lowercase();
        let op = match name.as_str() {
            "eq" | "=" | "==" | "equals" | "equal" => Self::Equals,
            "ne" | "neq" | "!=" | "<>" | "not_equals" | "notequals" => Self::NotEquals,
            "gt" | ">" | "greater_than" | "greaterthan" => Self::GreaterThan,
            "gte" | ">=" | "greater_than_or_equal" | "greaterthanorequal" => {
                Self::GreaterThanOrEqual
            }
            "lt" | "<" | "less_than" | "lessthan" => Self::LessThan,
            "lte" | "<=" | "less_than_or_equal" | "lessthanorequal" => Self::LessThanOrEqual,
            "contains" => Self::Contains,
            "starts_with" | "startswith" => Self::StartsWith,
            "ends_with" | "endswith" => Self::EndsWith,
            "in" => Self::In,
            "nin" | "not_in" | "notin" => Self::NotIn,
            "is_null" | "isnull" | "null" => Self::IsNull,
            "is_not_null" | "isnotnull" | "not_null" | "notnull" => Self::IsNotNull,
            "like" => Self::Like,
            "ilike" => Self::ILike,
            "between" => Self::Between,
            "fuzzy" | "search" | "text" => Self::Fuzzy,
            "includes" | "array_contains" | "arraycontains" | "has" => Self::Includes,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThan => "less_than",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::Between => "between",
            Self::Fuzzy => "fuzzy",
            Self::Includes => "includes",
        }
    }

    /// Whether the operator renders to a regular expression.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::StartsWith | Self::EndsWith | Self::Like | Self::ILike
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sibling conditions of a clause combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    /// All siblings must match.
    #[default]
    And,
    /// Any sibling may match.
    Or,
}

/// One field-level condition of a where clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Field the condition applies to.
    pub field: String,
    /// Operator name as supplied (see [`Operator::parse`]).
    pub operator: String,
    /// Operand.
    #[serde(default = "null_value")]
    pub value: FilterValue,
    /// Negate the rendered predicate.
    #[serde(default)]
    pub not: bool,
    /// Sub-clause rendered in place of this condition's own predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<WhereClause>>,
}

fn null_value() -> FilterValue {
    FilterValue::Null
}

impl Condition {
    /// Create a condition with a known operator.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator: operator.as_str().to_string(),
            value: value.into(),
            not: false,
            nested: None,
        }
    }

    /// Create a condition from a raw operator name.
    pub fn raw(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            not: false,
            nested: None,
        }
    }

    /// Create a condition that wraps a nested clause.
    pub fn nested(clause: WhereClause) -> Self {
        Self {
            field: String::new(),
            operator: String::new(),
            value: FilterValue::Null,
            not: false,
            nested: Some(Box::new(clause)),
        }
    }

    /// Negate this condition.
    pub fn negate(mut self) -> Self {
        self.not = !self.not;
        self
    }

    /// Resolve the operator name.
    pub fn resolved_operator(&self) -> Option<Operator> {
        Operator::parse(&self.operator)
    }
}

/// A tree of conditions combined with AND/OR.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WhereClause {
    /// Field-level conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Nested groups, rendered recursively.
    #[serde(default)]
    pub groups: Vec<WhereClause>,
    /// How conditions and groups combine.
    #[serde(default)]
    pub operator: LogicalOperator,
}

impl WhereClause {
    /// Create an empty clause (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Conditions combined with AND.
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            groups: Vec::new(),
            operator: LogicalOperator::And,
        }
    }

    /// Conditions combined with OR.
    pub fn or(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            groups: Vec::new(),
            operator: LogicalOperator::Or,
        }
    }

    /// Add a condition.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a nested group.
    pub fn group(mut self, group: WhereClause) -> Self {
        self.groups.push(group);
        self
    }

    /// Check if the clause has nothing to render.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.is_empty()
    }
}
