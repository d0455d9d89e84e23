//! Error types for stratadoc
//!
//! This module defines the single error type shared by every layer.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Native storage-engine faults are carried unchanged inside [`Error::Storage`];
//! only unique-constraint violations are translated (into [`Error::DuplicateKey`]).

use crate::limits::LimitError;
use thiserror::Error;

/// Result type alias for stratadoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error from the storage engine
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for stratadoc
#[derive(Debug, Error)]
pub enum Error {
    /// A predicate contains a construct that cannot be translated
    #[error("invalid query: unsupported expression `{expression}`: {reason}")]
    InvalidQuery {
        /// Rendering of the offending subexpression
        expression: String,
        /// Why it was rejected
        reason: String,
    },

    /// Malformed argument (identifier text, field path, collection name)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unique constraint violated
    #[error("duplicate key {value} in collection '{collection}'")]
    DuplicateKey {
        /// Collection the write targeted
        collection: String,
        /// The colliding value
        value: String,
    },

    /// Collection has not been created
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Document or path exceeds a configured limit
    #[error(transparent)]
    Limit(#[from] LimitError),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage engine fault, propagated as-is
    #[error("storage error: {0}")]
    Storage(#[source] StorageSource),
}

impl Error {
    /// Build an `InvalidQuery` error for a rejected subexpression
    pub fn invalid_query(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidQuery {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Build an `InvalidArgument` error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Build a `DuplicateKey` error
    pub fn duplicate_key(collection: impl Into<String>, value: impl Into<String>) -> Self {
        Error::DuplicateKey {
            collection: collection.into(),
            value: value.into(),
        }
    }

    /// Wrap a native storage-engine error
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Storage(Box::new(source))
    }

    /// Check if this is a duplicate-key error
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }

    /// Check if this is an invalid-query error
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Error::InvalidQuery { .. })
    }

    /// Check if this is a collection-not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::CollectionNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
