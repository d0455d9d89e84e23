//! Size limits for documents, paths and predicates
//!
//! Limits are enforced by the engine before a payload is written and by the
//! translator before a predicate is compiled. Violations return
//! [`LimitError`] wrapped in `Error::Limit`.

use thiserror::Error;

/// Maximum serialized document size in bytes (16 MB)
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum nesting depth of a document payload
pub const MAX_NESTING_DEPTH: usize = 100;

/// Maximum number of segments in a field path
pub const MAX_PATH_LENGTH: usize = 256;

/// Maximum depth of a predicate expression tree
pub const MAX_PREDICATE_DEPTH: usize = 128;

/// Maximum collection name length in bytes
pub const MAX_COLLECTION_NAME_LENGTH: usize = 128;

/// Error type for limit violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// Document exceeds maximum size
    #[error("document size {size} exceeds maximum of {max} bytes")]
    DocumentTooLarge {
        /// Actual document size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Document nesting exceeds maximum depth
    #[error("document nesting depth {depth} exceeds maximum of {max} levels")]
    NestingTooDeep {
        /// Actual nesting depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Field path exceeds maximum length
    #[error("path length {length} exceeds maximum of {max} segments")]
    PathTooLong {
        /// Actual path length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Predicate tree exceeds maximum depth
    #[error("predicate depth {depth} exceeds maximum of {max}")]
    PredicateTooDeep {
        /// Actual depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },
}

/// Limits applied by a database instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum serialized document size in bytes (default: 16MB)
    pub max_document_bytes: usize,
    /// Maximum payload nesting depth (default: 100)
    pub max_nesting_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_document_bytes: MAX_DOCUMENT_SIZE,
            max_nesting_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl Limits {
    /// Validate a serialized payload against these limits
    ///
    /// `encoded_len` is the length of the JSON text that will be stored.
    pub fn validate_payload(
        &self,
        value: &serde_json::Value,
        encoded_len: usize,
    ) -> Result<(), LimitError> {
        if encoded_len > self.max_document_bytes {
            return Err(LimitError::DocumentTooLarge {
                size: encoded_len,
                max: self.max_document_bytes,
            });
        }
        let depth = nesting_depth(value);
        if depth > self.max_nesting_depth {
            return Err(LimitError::NestingTooDeep {
                depth,
                max: self.max_nesting_depth,
            });
        }
        Ok(())
    }
}

/// Nesting depth of a JSON value; scalars are depth 0
pub fn nesting_depth(value: &serde_json::Value) -> usize {
    use serde_json::Value;
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => 0,
        Value::Array(arr) => 1 + arr.iter().map(nesting_depth).max().unwrap_or(0),
        Value::Object(obj) => 1 + obj.values().map(nesting_depth).max().unwrap_or(0),
    }
}
