//! # docket-mongodb
//!
//! MongoDB backend for docket's generic document repositories.
//!
//! This crate provides:
//! - A verified client with retrying, cancellable connection establishment
//!   and an explicit closed state
//! - Identifier normalization between ObjectIds and strings
//! - Translation of structured where clauses and the nested-map DSL into
//!   native filters
//! - Offset and cursor pagination
//! - [`MongoRepository`], generic CRUD over untyped documents
//! - Multi-document transactions and a health checker
//!
//! ## Example
//!
//! ```rust,ignore
//! use docket_mongodb::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("shop")
//!         .build()
//!         .await?;
//!
//!     let orders = MongoRepository::new(client.clone(), "orders");
//!     orders.insert_one(doc! { "status": "sent", "total": 42 }).await?;
//!
//!     let page = orders
//!         .paginate(
//!             doc! { "status": "sent" },
//!             FindOptions::new().sort_desc("createdAt"),
//!             PageRequest::cursor(20),
//!         )
//!         .await?;
//!     println!("{} orders, more: {}", page.len(), page.pagination.has_next);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Filters
//!
//! Structured clauses and the map DSL render to the same native filter:
//!
//! ```rust
//! use docket_mongodb::translate::{render_where, translate_dsl};
//! use docket_query::{Condition, FilterValue, Operator, WhereClause};
//!
//! let structured = render_where(&WhereClause::and(vec![Condition::new(
//!     "age",
//!     Operator::GreaterThanOrEqual,
//!     18,
//! )]))
//! .unwrap();
//!
//! let dsl = translate_dsl(&FilterValue::map([(
//!     "age",
//!     FilterValue::map([("$gte", FilterValue::from(18))]),
//! )]))
//! .unwrap();
//!
//! assert_eq!(structured, dsl);
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod health;
pub mod id;
pub mod options;
pub mod pagination;
pub mod repository;
pub mod retry;
pub mod transaction;
pub mod translate;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder, ReadPreference, RetryPolicy, WriteConcern};
pub use document::DocumentExt;
pub use error::{MongoError, MongoResult};
pub use filter::FilterBuilder;
pub use health::{HealthChecker, HealthReport, HealthStatus, ServerDetails};
pub use id::DocumentId;
pub use options::{FindOptions, Projection};
pub use pagination::PageSource;
pub use repository::MongoRepository;
pub use transaction::TransactionSession;
pub use translate::QueryBuilder;
pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder, RetryPolicy};
    pub use crate::document::DocumentExt;
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::filter::FilterBuilder;
    pub use crate::health::{HealthChecker, HealthStatus};
    pub use crate::id::DocumentId;
    pub use crate::options::FindOptions;
    pub use crate::repository::MongoRepository;
    pub use crate::transaction::TransactionSession;
    pub use crate::translate::QueryBuilder;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
    pub use docket_query::prelude::*;
    pub use tokio_util::sync::CancellationToken;
}
