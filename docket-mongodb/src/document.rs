//! Document helpers: identifiers and timestamps.

use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};

use crate::error::{MongoError, MongoResult};
use crate::id::{DocumentId, ID_FIELD, normalize_bson};

/// Field stamped with the creation time.
pub const CREATED_AT: &str = "createdAt";

/// Field stamped with the last modification time.
pub const UPDATED_AT: &str = "updatedAt";

/// Extension trait for BSON documents.
pub trait DocumentExt {
    /// The document identifier, if present and of a supported type.
    fn id(&self) -> Option<DocumentId>;

    /// Get an optional string value.
    fn get_str_opt(&self, key: &str) -> Option<&str>;

    /// Get an optional integer, widening 32-bit values.
    fn get_i64_opt(&self, key: &str) -> Option<i64>;

    /// Creation timestamp.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Last modification timestamp.
    fn updated_at(&self) -> Option<DateTime<Utc>>;
}

impl DocumentExt for Document {
    fn id(&self) -> Option<DocumentId> {
        self.get(ID_FIELD).and_then(DocumentId::from_bson)
    }

    fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.get_str(key).ok()
    }

    fn get_i64_opt(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Bson::Int32(v) => Some(i64::from(*v)),
            Bson::Int64(v) => Some(*v),
            _ => None,
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get_datetime(CREATED_AT).ok().map(|d| d.to_chrono())
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.get_datetime(UPDATED_AT).ok().map(|d| d.to_chrono())
    }
}

/// The current time as stored in timestamp fields.
pub fn now() -> bson::DateTime {
    bson::DateTime::from_chrono(Utc::now())
}

/// Prepare a document for insertion and return its identifier.
///
/// Missing `createdAt`/`updatedAt` are set to `now`; a missing `_id` is
/// generated and an ObjectId-shaped string `_id` is normalized.
pub fn stamp_insert(document: &mut Document, now: bson::DateTime) -> Bson {
    if !document.contains_key(CREATED_AT) {
        document.insert(CREATED_AT, now);
    }
    if !document.contains_key(UPDATED_AT) {
        document.insert(UPDATED_AT, now);
    }

    let id = match document.remove(ID_FIELD) {
        Some(existing) => normalize_bson(existing),
        None => Bson::from(DocumentId::generate()),
    };
    document.insert(ID_FIELD, id.clone());
    id
}

/// Prepare an update: a payload without operators becomes `$set`, and
/// `$set.updatedAt` is always refreshed to `now`.
pub fn stamp_update(update: Document, now: bson::DateTime) -> MongoResult<Document> {
    let operators = update.keys().filter(|k| k.starts_with('$')).count();
    let mut update = match operators {
        0 if update.is_empty() => Document::new(),
        0 => doc! { "$set": update },
        n if n == update.len() => update,
        _ => {
            return Err(MongoError::invalid_filter(
                "update mixes operators and plain fields",
            ));
        }
    };

    match update.get_mut("$set") {
        Some(Bson::Document(set)) => {
            set.insert(UPDATED_AT, now);
        }
        Some(other) => {
            return Err(MongoError::invalid_filter(format!(
                "$set must be a document, got {:?}",
                other.element_type()
            )));
        }
        None => {
            update.insert("$set", doc! { UPDATED_AT: now });
        }
    }

    Ok(update)
}
