//! # docket-query
//!
//! Store-agnostic vocabulary for the docket document repositories.
//!
//! This crate provides:
//! - [`FilterValue`], a dynamically typed value for conditions and the map DSL
//! - Structured filters ([`WhereClause`], [`Condition`], [`Operator`])
//! - [`StructuredQuery`] descriptions with projection, ordering and windowing
//! - Offset and cursor pagination types ([`PageRequest`], [`PageCursor`], [`PageResponse`])
//! - [`IndexDeclaration`]s consumed when preparing collections
//! - The [`DocumentRepository`] adapter contract and [`QueryError`]
//!
//! ## Filters
//!
//! ```rust
//! use docket_query::{Condition, Operator, WhereClause};
//!
//! // status = 'active' AND (price < 10 OR name contains 'sale')
//! let clause = WhereClause::and(vec![Condition::new("status", Operator::Equals, "active")])
//!     .group(WhereClause::or(vec![
//!         Condition::new("price", Operator::LessThan, 10),
//!         Condition::new("name", Operator::Contains, "sale"),
//!     ]));
//!
//! assert_eq!(clause.groups.len(), 1);
//! ```
//!
//! ## Pagination
//!
//! ```rust
//! use docket_query::{PageRequest, PageType};
//!
//! let request = PageRequest::cursor(25).validate().unwrap();
//! assert_eq!(request.page_type, PageType::Cursor);
//! assert_eq!(request.limit, 25);
//! ```

pub mod error;
pub mod filter;
pub mod index;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod types;

pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use filter::{Condition, FilterValue, LogicalOperator, Operator, WhereClause};
pub use index::{IndexDeclaration, IndexKind};
pub use pagination::{
    CursorDirection, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, PageCursor, PageInfo, PageRequest,
    PageResponse, PageType,
};
pub use query::StructuredQuery;
pub use repository::DocumentRepository;
pub use types::{OrderByField, SortOrder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::filter::{Condition, FilterValue, LogicalOperator, Operator, WhereClause};
    pub use crate::index::{IndexDeclaration, IndexKind};
    pub use crate::pagination::{CursorDirection, PageCursor, PageRequest, PageResponse, PageType};
    pub use crate::query::StructuredQuery;
    pub use crate::repository::DocumentRepository;
    pub use crate::types::{OrderByField, SortOrder};
}
