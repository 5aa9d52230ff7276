//! Error types for the Glaive library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`GlaiveError`] enum. The variants follow the failure taxonomy of the index
//! layer: cursor misuse, lookup misses, storage exhaustion and malformed
//! input, plus the schema/analysis errors raised while defining tables.
//!
//! # Examples
//!
//! ```
//! use glaive::error::{ErrorKind, GlaiveError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(GlaiveError::not_found("term 'missing'"))
//! }
//!
//! let err = example_operation().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Glaive operations.
#[derive(Error, Debug)]
pub enum GlaiveError {
    /// Operation invoked on a closed, exhausted or not-yet-positioned cursor.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Term, record, table or column lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The storage backend could not allocate the requested slots.
    #[error("Storage exhausted: {0}")]
    StorageExhausted(String),

    /// Input that the tokenizer cannot decode.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Schema definition errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Analysis-related errors (tokenizer construction, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Storage backend errors other than exhaustion
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors while loading a schema or configuration file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Coarse classification of a [`GlaiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidState,
    NotFound,
    StorageExhausted,
    MalformedInput,
    Schema,
    Analysis,
    Index,
    Storage,
    InvalidArgument,
    Io,
    Serialization,
    Other,
}

/// Result type alias for operations that may fail with GlaiveError.
pub type Result<T> = std::result::Result<T, GlaiveError>;

impl GlaiveError {
    /// Create a new invalid state error.
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        GlaiveError::InvalidState(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        GlaiveError::NotFound(msg.into())
    }

    /// Create a new storage exhausted error.
    pub fn storage_exhausted<S: Into<String>>(msg: S) -> Self {
        GlaiveError::StorageExhausted(msg.into())
    }

    /// Create a new malformed input error.
    pub fn malformed_input<S: Into<String>>(msg: S) -> Self {
        GlaiveError::MalformedInput(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Schema(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Analysis(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Storage(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        GlaiveError::InvalidArgument(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Other(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GlaiveError::InvalidState(_) => ErrorKind::InvalidState,
            GlaiveError::NotFound(_) => ErrorKind::NotFound,
            GlaiveError::StorageExhausted(_) => ErrorKind::StorageExhausted,
            GlaiveError::MalformedInput(_) => ErrorKind::MalformedInput,
            GlaiveError::Schema(_) => ErrorKind::Schema,
            GlaiveError::Analysis(_) => ErrorKind::Analysis,
            GlaiveError::Index(_) => ErrorKind::Index,
            GlaiveError::Storage(_) => ErrorKind::Storage,
            GlaiveError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            GlaiveError::Io(_) => ErrorKind::Io,
            GlaiveError::Json(_) => ErrorKind::Serialization,
            GlaiveError::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this error reports cursor misuse.
    pub fn is_invalid_state(&self) -> bool {
        self.kind() == ErrorKind::InvalidState
    }
}
