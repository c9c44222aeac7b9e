//! Structured query descriptions consumed by `execute_query`.

use serde::{Deserialize, Serialize};

use crate::filter::WhereClause;
use crate::types::OrderByField;

/// A complete query: filter, projection, ordering and window.
///
/// Backends apply the parts in a fixed order: the where clause, then the
/// field projection, then ordering, then limit and offset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Filter to apply.
    #[serde(default, rename = "where")]
    pub where_clause: WhereClause,
    /// Fields to return; empty means every field.
    #[serde(default)]
    pub select: Vec<String>,
    /// Ordering, in precedence order.
    #[serde(default)]
    pub order_by: Vec<OrderByField>,
    /// Maximum number of documents.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Documents to skip.
    #[serde(default)]
    pub offset: Option<u64>,
}

impl StructuredQuery {
    /// Create a query matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the where clause.
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clause = clause;
        self
    }

    /// Add a projected field.
    pub fn select(mut self, field: impl Into<String>) -> Self {
        self.select.push(field.into());
        self
    }

    /// Add an ordering.
    pub fn order_by(mut self, order: OrderByField) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the offset.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Condition, Operator};

    #[test]
    fn test_structured_query_builder() {
        let query = StructuredQuery::new()
            .filter(WhereClause::and(vec![Condition::new(
                "name",
                Operator::Contains,
                "an",
            )]))
            .select("name")
            .select("price")
            .order_by(OrderByField::asc("price"))
            .limit(10)
            .offset(5);

        assert_eq!(query.select, vec!["name", "price"]);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn test_deserialize_where_key() {
        let query: StructuredQuery = serde_json::from_str(
            r#"{"where": {"conditions": [{"field": "a", "operator": "eq", "value": 1}]},
                "order_by": [{"field": "a", "order": "desc"}], "limit": 3}"#,
        )
        .unwrap();
        assert_eq!(query.where_clause.conditions.len(), 1);
        assert_eq!(query.limit, Some(3));
        assert_eq!(query.offset, None);
    }
}
