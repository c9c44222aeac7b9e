//! Options for multi-document reads.

use bson::Document;
use docket_query::{OrderByField, SortOrder, StructuredQuery};

/// Which fields a read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Only these fields (plus `_id`).
    Include(Vec<String>),
    /// Every field except these.
    Exclude(Vec<String>),
}

impl Projection {
    /// Render as a projection document.
    pub fn to_document(&self) -> Document {
        let (fields, flag) = match self {
            Self::Include(fields) => (fields, 1),
            Self::Exclude(fields) => (fields, 0),
        };
        let mut doc = Document::new();
        for field in fields {
            doc.insert(field.clone(), flag);
        }
        doc
    }
}

/// Sort, window and projection for `find`.
///
/// Sort keys keep their insertion order; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Ordered sort keys.
    pub sort: Vec<(String, SortOrder)>,
    /// Maximum number of documents.
    pub limit: Option<u64>,
    /// Documents to skip.
    pub skip: Option<u64>,
    /// Field projection.
    pub projection: Option<Projection>,
}

impl FindOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    /// Append an ascending sort key.
    pub fn sort_asc(self, field: impl Into<String>) -> Self {
        self.sort(field, SortOrder::Asc)
    }

    /// Append a descending sort key.
    pub fn sort_desc(self, field: impl Into<String>) -> Self {
        self.sort(field, SortOrder::Desc)
    }

    /// Set the limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the skip count.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Only return these fields.
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(Projection::Include(
            fields.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Return every field except these.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(Projection::Exclude(
            fields.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Options described by a structured query: projection, ordering, then
    /// limit/offset.
    pub fn from_query(query: &StructuredQuery) -> Self {
        let mut options = Self::new();
        if !query.select.is_empty() {
            options = options.include(query.select.iter().cloned());
        }
        for OrderByField { field, order } in &query.order_by {
            options = options.sort(field.clone(), *order);
        }
        options.limit = query.limit;
        options.skip = query.offset;
        options
    }

    /// The primary sort key, if any.
    pub fn primary_sort(&self) -> Option<(&str, SortOrder)> {
        self.sort.first().map(|(f, o)| (f.as_str(), *o))
    }

    /// Render the sort document.
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }
        let mut doc = Document::new();
        for (field, order) in &self.sort {
            doc.insert(field.clone(), order.as_i32());
        }
        Some(doc)
    }

    /// Convert to driver options.
    pub fn to_driver(&self) -> mongodb::options::FindOptions {
        let mut options = mongodb::options::FindOptions::default();
        options.sort = self.sort_document();
        options.limit = self.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        options.skip = self.skip;
        options.projection = self.projection.as_ref().map(Projection::to_document);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docket_query::{Condition, Operator, WhereClause};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sort_keeps_precedence() {
        let options = FindOptions::new().sort_desc("priority").sort_asc("createdAt");
        let sort = options.sort_document().unwrap();
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["priority", "createdAt"]);
        assert_eq!(sort.get_i32("priority").unwrap(), -1);
        assert_eq!(options.primary_sort(), Some(("priority", SortOrder::Desc)));
    }

    #[test]
    fn test_projection() {
        assert_eq!(
            Projection::Include(vec!["a".into(), "b".into()]).to_document(),
            doc! { "a": 1, "b": 1 }
        );
        assert_eq!(
            Projection::Exclude(vec!["secret".into()]).to_document(),
            doc! { "secret": 0 }
        );
    }

    #[test]
    fn test_to_driver() {
        let driver = FindOptions::new()
            .sort_asc("index")
            .limit(11)
            .skip(10)
            .exclude(["blob"])
            .to_driver();
        assert_eq!(driver.sort, Some(doc! { "index": 1 }));
        assert_eq!(driver.limit, Some(11));
        assert_eq!(driver.skip, Some(10));
        assert_eq!(driver.projection, Some(doc! { "blob": 0 }));
    }

    #[test]
    fn test_from_query() {
        let query = StructuredQuery::new()
            .filter(WhereClause::and(vec![Condition::new("a", Operator::Equals, 1)]))
            .select("name")
            .select("price")
            .order_by(OrderByField::desc("price"))
            .limit(5)
            .offset(10);

        let options = FindOptions::from_query(&query);
        assert_eq!(
            options.projection,
            Some(Projection::Include(vec!["name".into(), "price".into()]))
        );
        assert_eq!(options.sort, vec![("price".to_string(), SortOrder::Desc)]);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, Some(10));
    }
}
