//! The CRUD contract every document store adapter presents.
//!
//! Application repositories (deployments, configs, orders, ...) are written
//! against [`DocumentRepository`] so that the backing store can be swapped
//! without touching them. Adapters map their native errors onto
//! [`QueryError`](crate::QueryError) codes.

use async_trait::async_trait;

use crate::error::QueryResult;
use crate::index::IndexDeclaration;
use crate::pagination::{PageRequest, PageResponse};
use crate::query::StructuredQuery;

/// Generic CRUD over untyped documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// The store's document representation.
    type Document: Send + Sync;
    /// The store's native filter representation.
    type Filter: Send + Sync;
    /// The store's native update representation.
    type Update: Send + Sync;
    /// The identifier returned by inserts.
    type Id: Send + Sync;
    /// Sort/limit/skip/projection options for multi-document reads.
    type Options: Send + Sync + Default;

    /// Name of the underlying collection or table.
    fn name(&self) -> &str;

    /// First document matching the filter, or a not-found error.
    async fn find_one(&self, filter: Self::Filter) -> QueryResult<Self::Document>;

    /// Document with the given identifier, or a not-found error.
    async fn find_by_id(&self, id: &str) -> QueryResult<Self::Document>;

    /// All documents matching the filter, in the requested order.
    async fn find(
        &self,
        filter: Self::Filter,
        options: Self::Options,
    ) -> QueryResult<Vec<Self::Document>>;

    /// Insert one document and return its identifier.
    async fn insert_one(&self, document: Self::Document) -> QueryResult<Self::Id>;

    /// Insert many documents and return their identifiers in input order.
    async fn insert_many(&self, documents: Vec<Self::Document>) -> QueryResult<Vec<Self::Id>>;

    /// Update the first matching document; returns the modified count.
    async fn update_one(&self, filter: Self::Filter, update: Self::Update) -> QueryResult<u64>;

    /// Update every matching document; returns the modified count.
    async fn update_many(&self, filter: Self::Filter, update: Self::Update) -> QueryResult<u64>;

    /// Delete the first matching document; returns the deleted count.
    async fn delete_one(&self, filter: Self::Filter) -> QueryResult<u64>;

    /// Delete every matching document; returns the deleted count.
    async fn delete_many(&self, filter: Self::Filter) -> QueryResult<u64>;

    /// Number of matching documents.
    async fn count(&self, filter: Self::Filter) -> QueryResult<u64>;

    /// Whether any document matches.
    async fn exists(&self, filter: Self::Filter) -> QueryResult<bool> {
        Ok(self.count(filter).await? > 0)
    }

    /// Build the declared indexes.
    async fn ensure_indexes(&self, declarations: &[IndexDeclaration]) -> QueryResult<()>;

    /// Run a structured query.
    async fn execute_query(&self, query: &StructuredQuery) -> QueryResult<Vec<Self::Document>>;

    /// Fetch one page of matching documents.
    async fn paginate(
        &self,
        filter: Self::Filter,
        options: Self::Options,
        request: PageRequest,
    ) -> QueryResult<PageResponse<Self::Document>>;
}
