//! Fluent construction of native filter documents.

use bson::{Bson, Document, doc};

use crate::id::{DocumentId, ID_FIELD, normalize_bson};

/// Builder for MongoDB filter documents.
///
/// Comparison operators on the same field accumulate into one operator
/// document, so `gte("age", 18).lt("age", 65)` yields
/// `{ age: { $gte: 18, $lt: 65 } }`. Values compared against `_id` are
/// normalized the same way the query translator normalizes them.
///
/// ```rust
/// use docket_mongodb::FilterBuilder;
///
/// let filter = FilterBuilder::new()
///     .eq("status", "active")
///     .gte("age", 18)
///     .lt("age", 65)
///     .build();
///
/// assert_eq!(filter.get_document("age").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    doc: Document,
}

impl FilterBuilder {
    /// Create a new empty filter builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing filter document.
    pub fn from_doc(doc: Document) -> Self {
        Self { doc }
    }

    fn coerce(field: &str, value: Bson) -> Bson {
        if field == ID_FIELD {
            normalize_bson(value)
        } else {
            value
        }
    }

    fn op(mut self, field: &str, op: &str, value: Bson) -> Self {
        let value = Self::coerce(field, value);
        match self.doc.get_mut(field) {
            Some(Bson::Document(existing)) if existing.keys().all(|k| k.starts_with('$')) => {
                existing.insert(op, value);
            }
            _ => {
                let mut condition = Document::new();
                condition.insert(op, value);
                self.doc.insert(field, condition);
            }
        }
        self
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: &str, value: impl Into<Bson>) -> Self {
        let value = Self::coerce(field, value.into());
        self.doc.insert(field, value);
        self
    }

    /// Add a not-equal condition.
    pub fn ne(self, field: &str, value: impl Into<Bson>) -> Self {
        self.op(field, "$ne", value.into())
    }

    /// Add a greater-than condition.
    pub fn gt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.op(field, "$gt", value.into())
    }

    /// Add a greater-than-or-equal condition.
    pub fn gte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.op(field, "$gte", value.into())
    }

    /// Add a less-than condition.
    pub fn lt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.op(field, "$lt", value.into())
    }

    /// Add a less-than-or-equal condition.
    pub fn lte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.op(field, "$lte", value.into())
    }

    /// Add an "in" condition.
    pub fn in_array(self, field: &str, values: Vec<impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.op(field, "$in", Bson::Array(values))
    }

    /// Add a "not in" condition.
    pub fn not_in(self, field: &str, values: Vec<impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.op(field, "$nin", Bson::Array(values))
    }

    /// Add a regex condition.
    pub fn regex(self, field: &str, pattern: &str) -> Self {
        self.op(field, "$regex", Bson::String(pattern.to_string()))
    }

    /// Add a regex condition with options (e.g. `"i"`).
    pub fn regex_with_options(self, field: &str, pattern: &str, options: &str) -> Self {
        self.op(field, "$regex", Bson::String(pattern.to_string()))
            .op(field, "$options", Bson::String(options.to_string()))
    }

    /// Add an exists condition.
    pub fn exists(self, field: &str, exists: bool) -> Self {
        self.op(field, "$exists", Bson::Boolean(exists))
    }

    /// Add a full-text search condition.
    pub fn text_search(mut self, search: &str) -> Self {
        self.doc.insert("$text", doc! { "$search": search });
        self
    }

    /// Match a document identifier, normalizing ObjectId-shaped strings.
    pub fn by_id(mut self, id: &str) -> Self {
        self.doc.insert(ID_FIELD, DocumentId::parse(id));
        self
    }

    /// Combine with AND (`$and`).
    pub fn and(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$and", conditions);
        self
    }

    /// Combine with OR (`$or`).
    pub fn or(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$or", conditions);
        self
    }

    /// Combine with NOR (`$nor`).
    pub fn nor(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$nor", conditions);
        self
    }

    /// Negate an operator document on a field.
    pub fn not(mut self, field: &str, condition: Document) -> Self {
        self.doc.insert(field, doc! { "$not": condition });
        self
    }

    /// Merge another filter into this one; keys in `other` win.
    pub fn merge(mut self, other: Document) -> Self {
        for (k, v) in other {
            self.doc.insert(k, v);
        }
        self
    }

    /// Build the filter document.
    pub fn build(self) -> Document {
        self.doc
    }

    /// Check if the filter is empty.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}

/// Create an empty filter (matches all documents).
pub fn all() -> Document {
    doc! {}
}

/// Create an `_id` filter, normalizing ObjectId-shaped strings.
pub fn by_id(id: &str) -> Document {
    FilterBuilder::new().by_id(id).build()
}

/// Conjoin two filters without letting either shadow the other's keys.
///
/// Empty operands are dropped; two non-empty filters become
/// `{ $and: [left, right] }`.
pub fn and_filters(left: Document, right: Document) -> Document {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right,
        (_, true) => left,
        _ => doc! { "$and": [left, right] },
    }
}
