//! Error types for MongoDB operations.

use docket_query::QueryError;
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Result type for MongoDB operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Server error codes reported for unique index violations.
const DUPLICATE_KEY_CODES: [i32; 2] = [11000, 11001];

/// Errors that can occur during MongoDB operations.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// A retried phase gave up; `source` is the last attempt's failure.
    #[error("{phase} failed after {attempts} attempts: {source}")]
    Exhausted {
        /// The phase that was retried.
        phase: &'static str,
        /// Total attempts made.
        attempts: u32,
        /// The last underlying error.
        source: Box<MongoError>,
    },

    /// The caller cancelled the operation.
    #[error("{0} cancelled")]
    Cancelled(&'static str),

    /// The client was closed before or during the operation.
    #[error("client is closed")]
    ClientClosed,

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Unique index violation.
    #[error("duplicate key: {source}")]
    DuplicateKey {
        /// The driver's write error.
        source: mongodb::error::Error,
    },

    /// Invalid ObjectId.
    #[error("invalid object id: {0}")]
    InvalidId(String),

    /// Invalid filter.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A bulk operation was handed nothing to work on.
    #[error("no documents supplied")]
    NoDocuments,

    /// Transaction failure.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }

    /// Create an invalid object id error.
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId(message.into())
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Classify a driver error raised by a write.
    pub fn from_write(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            Self::DuplicateKey { source: err }
        } else {
            Self::Driver(err)
        }
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Exhausted { .. })
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique index violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Check if the client was closed.
    pub fn is_client_closed(&self) -> bool {
        matches!(self, Self::ClientClosed)
    }

    /// Check if the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Whether a driver error is a unique index violation.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => DUPLICATE_KEY_CODES.contains(&e.code),
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| DUPLICATE_KEY_CODES.contains(&e.code))),
        ErrorKind::Command(e) => DUPLICATE_KEY_CODES.contains(&e.code),
        _ => false,
    }
}

impl From<bson::oid::Error> for MongoError {
    fn from(err: bson::oid::Error) -> Self {
        MongoError::InvalidId(err.to_string())
    }
}

impl From<QueryError> for MongoError {
    fn from(err: QueryError) -> Self {
        use docket_query::ErrorCode;

        match err.code {
            ErrorCode::InvalidFilter | ErrorCode::InvalidCursor => {
                MongoError::InvalidFilter(err.message)
            }
            ErrorCode::InvalidId => MongoError::InvalidId(err.message),
            ErrorCode::RecordNotFound => MongoError::NotFound(err.message),
            ErrorCode::ClientClosed => MongoError::ClientClosed,
            ErrorCode::InvalidConfiguration => MongoError::Config(err.message),
            _ => MongoError::Internal(err.message),
        }
    }
}

impl From<MongoError> for QueryError {
    fn from(err: MongoError) -> Self {
        match err {
            MongoError::Driver(e) => {
                let msg = e.to_string();
                if matches!(
                    e.kind.as_ref(),
                    ErrorKind::ServerSelection { .. } | ErrorKind::Io(_)
                ) {
                    return QueryError::connection(msg).with_source(e);
                }
                QueryError::database(msg).with_source(e)
            }
            MongoError::Config(msg) => QueryError::configuration(msg),
            MongoError::Connection(msg) => QueryError::connection(msg),
            err @ MongoError::Exhausted { .. } => QueryError::connection(err.to_string()),
            MongoError::Cancelled(phase) => QueryError::cancelled(phase),
            MongoError::ClientClosed => QueryError::client_closed(),
            MongoError::NotFound(msg) => QueryError::not_found(msg),
            MongoError::DuplicateKey { source } => {
                QueryError::duplicate_key(source.to_string()).with_source(source)
            }
            MongoError::InvalidId(msg) => QueryError::invalid_id(msg),
            MongoError::InvalidFilter(msg) => QueryError::invalid_filter(msg),
            MongoError::NoDocuments => QueryError::no_documents(),
            MongoError::Transaction(msg) => QueryError::transaction(msg),
            MongoError::Timeout(ms) => QueryError::timeout(ms),
            MongoError::Internal(msg) => QueryError::internal(msg),
        }
    }
}
