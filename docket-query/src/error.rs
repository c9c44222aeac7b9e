//! Error types shared by every repository backend.
//!
//! Errors carry an [`ErrorCode`] so callers can branch on the kind of failure
//! without matching on message text:
//!
//! - 1xxx: Query errors (not found, invalid filter, invalid identifier)
//! - 2xxx: Constraint violations (duplicate key)
//! - 3xxx: Connection errors (failed, closed, timeout)
//! - 4xxx: Transaction errors
//! - 5xxx: Execution errors (timeout, cancelled, database)
//! - 6xxx: Data errors (serialization)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use docket_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_found("orders");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.is_not_found());
//! assert!(err.to_string().contains("orders"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for repository operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// Record not found (D1001).
    RecordNotFound = 1001,
    /// Invalid filter or where clause (D1003).
    InvalidFilter = 1003,
    /// Invalid document identifier (D1006).
    InvalidId = 1006,
    /// A bulk operation received no documents (D1007).
    NoDocuments = 1007,
    /// Malformed pagination cursor (D1008).
    InvalidCursor = 1008,

    // Constraint errors (2xxx)
    /// Unique constraint violation (D2001).
    UniqueConstraint = 2001,

    // Connection errors (3xxx)
    /// Database connection failed (D3001).
    ConnectionFailed = 3001,
    /// Connection timeout (D3003).
    ConnectionTimeout = 3003,
    /// Client already closed (D3006).
    ClientClosed = 3006,

    // Transaction errors (4xxx)
    /// Transaction failed (D4001).
    TransactionFailed = 4001,

    // Query execution errors (5xxx)
    /// Query timeout (D5001).
    QueryTimeout = 5001,
    /// Operation cancelled by the caller (D5006).
    Cancelled = 5006,
    /// General database error (D5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Serialization error (D6002).
    SerializationError = 6002,

    // Configuration errors (7xxx)
    /// Invalid configuration (D7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (D9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "D1001").
    pub fn code(&self) -> String {
        format!("D{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidFilter => "Invalid filter condition",
            Self::InvalidId => "Invalid document identifier",
            Self::NoDocuments => "No documents supplied",
            Self::InvalidCursor => "Invalid pagination cursor",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::ClientClosed => "Client is closed",
            Self::TransactionFailed => "Transaction failed",
            Self::QueryTimeout => "Query timeout",
            Self::Cancelled => "Operation cancelled",
            Self::DatabaseError => "Database error",
            Self::SerializationError => "Serialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The collection involved.
    pub collection: Option<String>,
    /// The field involved.
    pub field: Option<String>,
}

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Set the collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.context.collection = Some(collection.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No document in {} matches the filter", collection),
        )
        .with_collection(collection)
    }

    /// Create a duplicate key error.
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Duplicate key: {}", message.into()),
        )
    }

    /// Create an invalid identifier error.
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidId,
            format!("Invalid document identifier: {}", id.into()),
        )
        .with_field("_id")
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidFilter,
            format!("Invalid filter: {}", message.into()),
        )
    }

    /// Create an invalid cursor error.
    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidCursor,
            format!("Invalid cursor: {}", message.into()),
        )
    }

    /// Create a no documents error.
    pub fn no_documents() -> Self {
        Self::new(ErrorCode::NoDocuments, "No documents supplied")
    }

    /// Create a client closed error.
    pub fn client_closed() -> Self {
        Self::new(ErrorCode::ClientClosed, "Client is closed")
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConnectionFailed,
            format!("Connection error: {}", message.into()),
        )
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Operation timed out after {}ms", duration_ms),
        )
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            format!("Cancelled: {}", message.into()),
        )
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransactionFailed,
            format!("Transaction error: {}", message.into()),
        )
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid configuration: {}", message.into()),
        )
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Internal,
            format!("Internal error: {}", message.into()),
        )
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a duplicate key violation.
    pub fn is_duplicate_key(&self) -> bool {
        self.code == ErrorCode::UniqueConstraint
    }

    /// Check if the client was closed.
    pub fn is_client_closed(&self) -> bool {
        self.code == ErrorCode::ClientClosed
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout
        )
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionFailed | ErrorCode::ConnectionTimeout | ErrorCode::ClientClosed
        )
    }
}
