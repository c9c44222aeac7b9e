//! Session-bound handle for multi-document transactions.
//!
//! Only operations issued through a [`TransactionSession`] participate in the
//! transaction; reads and writes made through a repository or the ambient
//! client in the meantime run outside it.

use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::{ClientSession, Collection, Database};
use tracing::debug;

use crate::document::{now, stamp_insert, stamp_update};
use crate::error::{MongoError, MongoResult};
use crate::options::FindOptions;

/// The handle passed to a [`MongoClient::with_transaction`](crate::MongoClient::with_transaction)
/// callback.
pub struct TransactionSession {
    session: ClientSession,
    database: Database,
}

impl TransactionSession {
    pub(crate) fn new(session: ClientSession, database: Database) -> Self {
        Self { session, database }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Insert a document inside the transaction and return its identifier.
    pub async fn insert_one(&mut self, collection: &str, mut document: Document) -> MongoResult<Bson> {
        let id = stamp_insert(&mut document, now());
        debug!(collection = %collection, "Transactional insert_one");
        self.collection(collection)
            .insert_one_with_session(document, None, &mut self.session)
            .await
            .map_err(MongoError::from_write)?;
        Ok(id)
    }

    /// Find the first matching document inside the transaction.
    pub async fn find_one(&mut self, collection: &str, filter: Document) -> MongoResult<Option<Document>> {
        debug!(collection = %collection, "Transactional find_one");
        let found = self
            .collection(collection)
            .find_one_with_session(filter, None, &mut self.session)
            .await?;
        Ok(found)
    }

    /// Find every matching document inside the transaction.
    pub async fn find(
        &mut self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> MongoResult<Vec<Document>> {
        debug!(collection = %collection, "Transactional find");
        let mut cursor = self
            .collection(collection)
            .find_with_session(filter, options.to_driver(), &mut self.session)
            .await?;
        let documents: Vec<Document> = cursor.stream(&mut self.session).try_collect().await?;
        Ok(documents)
    }

    /// Update the first matching document; returns the modified count.
    pub async fn update_one(
        &mut self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> MongoResult<u64> {
        let update = stamp_update(update, now())?;
        debug!(collection = %collection, "Transactional update_one");
        let result = self
            .collection(collection)
            .update_one_with_session(filter, update, None, &mut self.session)
            .await
            .map_err(MongoError::from_write)?;
        Ok(result.modified_count)
    }

    /// Delete the first matching document; returns the deleted count.
    pub async fn delete_one(&mut self, collection: &str, filter: Document) -> MongoResult<u64> {
        debug!(collection = %collection, "Transactional delete_one");
        let result = self
            .collection(collection)
            .delete_one_with_session(filter, None, &mut self.session)
            .await?;
        Ok(result.deleted_count)
    }

    /// Count matching documents inside the transaction.
    pub async fn count(&mut self, collection: &str, filter: Document) -> MongoResult<u64> {
        let count = self
            .collection(collection)
            .count_documents_with_session(filter, None, &mut self.session)
            .await?;
        Ok(count)
    }

    pub(crate) async fn commit(&mut self) -> MongoResult<()> {
        self.session
            .commit_transaction()
            .await
            .map_err(|e| MongoError::transaction(format!("commit failed: {}", e)))
    }

    pub(crate) async fn abort(&mut self) -> MongoResult<()> {
        self.session
            .abort_transaction()
            .await
            .map_err(|e| MongoError::transaction(format!("abort failed: {}", e)))
    }
}
