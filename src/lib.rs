//! # Docket
//!
//! Generic document repositories over MongoDB.
//!
//! Docket provides:
//! - A verified, cancellable MongoDB client with an explicit closed state
//! - Store-agnostic filters, translated into native queries
//! - Offset and keyset cursor pagination
//! - Generic CRUD over untyped documents, plus transactions and health checks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docket::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), docket::mongodb::MongoError> {
//!     let client = MongoClient::new(MongoConfig::from_uri(
//!         "mongodb://localhost:27017",
//!         "shop",
//!     ))
//!     .await?;
//!
//!     let products = MongoRepository::new(client.clone(), "products");
//!     products
//!         .ensure_indexes(&[IndexDeclaration::new(["sku"]).unique()])
//!         .await?;
//!
//!     let cheap = products
//!         .execute_query(
//!             &StructuredQuery::new()
//!                 .filter(WhereClause::and(vec![Condition::new(
//!                     "price",
//!                     Operator::LessThan,
//!                     1.0,
//!                 )]))
//!                 .order_by(OrderByField::asc("price"))
//!                 .limit(10),
//!         )
//!         .await?;
//!     println!("{} cheap products", cheap.len());
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Store-agnostic filters, pagination and the repository contract.
pub mod query {
    pub use docket_query::*;
}

/// The MongoDB backend.
pub mod mongodb {
    pub use docket_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use docket_mongodb::prelude::*;
}

// Re-export key types at the crate root
pub use docket_mongodb::{MongoClient, MongoConfig, MongoError, MongoRepository};
pub use docket_query::{DocumentRepository, QueryError};
