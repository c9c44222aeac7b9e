//! Generic CRUD over one collection of untyped documents.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use docket_query::{
    DocumentRepository, FilterValue, IndexDeclaration, IndexKind, PageRequest, PageResponse,
    QueryError, QueryResult, StructuredQuery, WhereClause,
};
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use tracing::debug;

use crate::client::MongoClient;
use crate::document::{now, stamp_insert, stamp_update};
use crate::error::{MongoError, MongoResult};
use crate::id::ID_FIELD;
use crate::options::FindOptions;
use crate::pagination::{PageSource, paginate};
use crate::translate::{render_where, translate_dsl};

/// A repository over one collection.
///
/// Every operation checks the client's closed state first and fails with
/// [`MongoError::ClientClosed`] before any I/O.
#[derive(Clone)]
pub struct MongoRepository {
    client: MongoClient,
    name: String,
}

impl MongoRepository {
    /// Create a repository over `name`.
    pub fn new(client: MongoClient, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client backing this repository.
    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    fn collection(&self) -> MongoResult<Collection<Document>> {
        self.client.collection(&self.name)
    }

    /// First document matching `filter`.
    pub async fn find_one(&self, filter: Document) -> MongoResult<Document> {
        let collection = self.collection()?;
        debug!(collection = %self.name, "find_one");
        collection
            .find_one(filter, None)
            .await?
            .ok_or_else(|| MongoError::not_found(self.name.clone()))
    }

    /// Document with identifier `id`.
    ///
    /// The identifier is tried verbatim first; if nothing matches and it
    /// parses as an ObjectId, the ObjectId is tried.
    pub async fn find_by_id(&self, id: &str) -> MongoResult<Document> {
        let collection = self.collection()?;
        debug!(collection = %self.name, id, "find_by_id");

        if let Some(found) = collection.find_one(doc! { ID_FIELD: id }, None).await? {
            return Ok(found);
        }
        if let Ok(oid) = ObjectId::parse_str(id) {
            if let Some(found) = collection.find_one(doc! { ID_FIELD: oid }, None).await? {
                return Ok(found);
            }
        }
        Err(MongoError::not_found(self.name.clone()))
    }

    /// Documents matching `filter`, in the requested order.
    pub async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>> {
        let collection = self.collection()?;
        debug!(collection = %self.name, "find");
        let cursor = collection.find(filter, options.to_driver()).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    /// Documents matching a structured where clause.
    pub async fn find_where(
        &self,
        clause: &WhereClause,
        options: FindOptions,
    ) -> MongoResult<Vec<Document>> {
        let filter = render_where(clause)?;
        self.find(filter, options).await
    }

    /// Documents matching a DSL filter.
    pub async fn find_dsl(
        &self,
        filter: &FilterValue,
        options: FindOptions,
    ) -> MongoResult<Vec<Document>> {
        let filter = translate_dsl(filter)?;
        self.find(filter, options).await
    }

    /// Insert one document and return its identifier.
    ///
    /// Missing `createdAt`/`updatedAt` are stamped with the current UTC time
    /// and a missing `_id` is generated.
    pub async fn insert_one(&self, mut document: Document) -> MongoResult<Bson> {
        let collection = self.collection()?;
        let id = stamp_insert(&mut document, now());
        debug!(collection = %self.name, "insert_one");
        collection
            .insert_one(document, None)
            .await
            .map_err(MongoError::from_write)?;
        Ok(id)
    }

    /// Insert many documents and return their identifiers in input order.
    pub async fn insert_many(&self, mut documents: Vec<Document>) -> MongoResult<Vec<Bson>> {
        let collection = self.collection()?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let stamp = now();
        let ids: Vec<Bson> = documents
            .iter_mut()
            .map(|document| stamp_insert(document, stamp))
            .collect();

        debug!(collection = %self.name, count = documents.len(), "insert_many");
        collection
            .insert_many(documents, None)
            .await
            .map_err(MongoError::from_write)?;
        Ok(ids)
    }

    /// Update the first matching document; `updatedAt` is always refreshed.
    pub async fn update_one(&self, filter: Document, update: Document) -> MongoResult<u64> {
        let collection = self.collection()?;
        let update = stamp_update(update, now())?;
        debug!(collection = %self.name, "update_one");
        let result = collection
            .update_one(filter, update, None)
            .await
            .map_err(MongoError::from_write)?;
        Ok(result.modified_count)
    }

    /// Update every matching document; `updatedAt` is always refreshed.
    pub async fn update_many(&self, filter: Document, update: Document) -> MongoResult<u64> {
        let collection = self.collection()?;
        let update = stamp_update(update, now())?;
        debug!(collection = %self.name, "update_many");
        let result = collection
            .update_many(filter, update, None)
            .await
            .map_err(MongoError::from_write)?;
        Ok(result.modified_count)
    }

    /// Delete the first matching document.
    pub async fn delete_one(&self, filter: Document) -> MongoResult<u64> {
        let collection = self.collection()?;
        debug!(collection = %self.name, "delete_one");
        let result = collection.delete_one(filter, None).await?;
        Ok(result.deleted_count)
    }

    /// Delete every matching document.
    pub async fn delete_many(&self, filter: Document) -> MongoResult<u64> {
        let collection = self.collection()?;
        debug!(collection = %self.name, "delete_many");
        let result = collection.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }

    /// Number of matching documents.
    pub async fn count(&self, filter: Document) -> MongoResult<u64> {
        let collection = self.collection()?;
        debug!(collection = %self.name, "count");
        let count = collection.count_documents(filter, None).await?;
        Ok(count)
    }

    /// Whether any document matches.
    pub async fn exists(&self, filter: Document) -> MongoResult<bool> {
        Ok(self.count(filter).await? > 0)
    }

    /// Build one ascending compound index over `fields`.
    pub async fn ensure_index(&self, fields: &[&str], unique: bool) -> MongoResult<String> {
        let declaration = IndexDeclaration::new(fields.iter().copied());
        let declaration = if unique {
            declaration.unique()
        } else {
            declaration
        };
        self.create_declared_index(&declaration).await
    }

    /// Build every declared index; returns the index names.
    pub async fn ensure_indexes(&self, declarations: &[IndexDeclaration]) -> MongoResult<Vec<String>> {
        self.collection()?;
        let mut names = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            names.push(self.create_declared_index(declaration).await?);
        }
        Ok(names)
    }

    async fn create_declared_index(&self, declaration: &IndexDeclaration) -> MongoResult<String> {
        let model = index_model(declaration)?;
        debug!(
            collection = %self.name,
            fields = ?declaration.fields,
            kind = ?declaration.kind,
            unique = declaration.unique,
            "Creating index"
        );
        self.client.create_index(&self.name, model).await
    }

    /// Run a structured query: where clause, projection, ordering, then
    /// limit/offset.
    pub async fn execute_query(&self, query: &StructuredQuery) -> MongoResult<Vec<Document>> {
        let filter = render_where(&query.where_clause)?;
        self.find(filter, FindOptions::from_query(query)).await
    }

    /// Fetch one page of matching documents.
    pub async fn paginate(
        &self,
        filter: Document,
        options: FindOptions,
        request: PageRequest,
    ) -> MongoResult<PageResponse<Document>> {
        paginate(self, filter, options, request).await
    }

    fn query_error(&self, err: MongoError) -> QueryError {
        QueryError::from(err).with_collection(self.name.clone())
    }
}

/// Translate an index declaration into a driver index model.
pub fn index_model(declaration: &IndexDeclaration) -> MongoResult<IndexModel> {
    if declaration.fields.is_empty() {
        return Err(MongoError::invalid_filter("index declaration has no fields"));
    }

    let mut keys = Document::new();
    for field in &declaration.fields {
        let key = match declaration.kind {
            IndexKind::Plain => Bson::Int32(1),
            IndexKind::Text => Bson::String("text".to_string()),
            IndexKind::Geospatial => Bson::String("2dsphere".to_string()),
        };
        keys.insert(field.clone(), key);
    }

    let options = IndexOptions::builder()
        .unique(declaration.unique.then_some(true))
        .name(declaration.name.clone())
        .build();

    Ok(IndexModel::builder().keys(keys).options(options).build())
}

#[async_trait]
impl PageSource for MongoRepository {
    async fn count(&self, filter: Document) -> MongoResult<u64> {
        MongoRepository::count(self, filter).await
    }

    async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>> {
        MongoRepository::find(self, filter, options).await
    }
}

#[async_trait]
impl DocumentRepository for MongoRepository {
    type Document = Document;
    type Filter = Document;
    type Update = Document;
    type Id = Bson;
    type Options = FindOptions;

    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(&self, filter: Document) -> QueryResult<Document> {
        MongoRepository::find_one(self, filter)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn find_by_id(&self, id: &str) -> QueryResult<Document> {
        MongoRepository::find_by_id(self, id)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn find(&self, filter: Document, options: FindOptions) -> QueryResult<Vec<Document>> {
        MongoRepository::find(self, filter, options)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn insert_one(&self, document: Document) -> QueryResult<Bson> {
        MongoRepository::insert_one(self, document)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn insert_many(&self, documents: Vec<Document>) -> QueryResult<Vec<Bson>> {
        MongoRepository::insert_many(self, documents)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn update_one(&self, filter: Document, update: Document) -> QueryResult<u64> {
        MongoRepository::update_one(self, filter, update)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn update_many(&self, filter: Document, update: Document) -> QueryResult<u64> {
        MongoRepository::update_many(self, filter, update)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn delete_one(&self, filter: Document) -> QueryResult<u64> {
        MongoRepository::delete_one(self, filter)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn delete_many(&self, filter: Document) -> QueryResult<u64> {
        MongoRepository::delete_many(self, filter)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn count(&self, filter: Document) -> QueryResult<u64> {
        MongoRepository::count(self, filter)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn ensure_indexes(&self, declarations: &[IndexDeclaration]) -> QueryResult<()> {
        MongoRepository::ensure_indexes(self, declarations)
            .await
            .map(|_| ())
            .map_err(|e| self.query_error(e))
    }

    async fn execute_query(&self, query: &StructuredQuery) -> QueryResult<Vec<Document>> {
        MongoRepository::execute_query(self, query)
            .await
            .map_err(|e| self.query_error(e))
    }

    async fn paginate(
        &self,
        filter: Document,
        options: FindOptions,
        request: PageRequest,
    ) -> QueryResult<PageResponse<Document>> {
        MongoRepository::paginate(self, filter, options, request)
            .await
            .map_err(|e| self.query_error(e))
    }
}
