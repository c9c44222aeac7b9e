//! Common types used in query building.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// The opposite order.
    pub fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Numeric direction as stores expect it (`1` / `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// Order by specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByField {
    /// The field name to order by.
    pub field: String,
    /// The sort direction.
    #[serde(default)]
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_reverse() {
        assert_eq!(SortOrder::Asc.reverse(), SortOrder::Desc);
        assert_eq!(SortOrder::Desc.reverse(), SortOrder::Asc);
        assert_eq!(SortOrder::Desc.as_i32(), -1);
    }

    #[test]
    fn test_order_by_field() {
        let order = OrderByField::desc("createdAt");
        assert_eq!(order.field, "createdAt");
        assert_eq!(order.order, SortOrder::Desc);
    }
}
