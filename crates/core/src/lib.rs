//! Core types for stratadoc
//!
//! This crate defines the foundational types used throughout the system:
//! - DocumentId / IdGenerator: 12-byte time-ordered identifiers
//! - FieldPath: Path into a document payload (e.g. `address.city`)
//! - FieldNaming: On-disk spelling of field names, shared with the serializer
//! - Document: Capability trait for storable types
//! - Error: Error type hierarchy
//! - Limits: Document, path and predicate limits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod id;
pub mod limits;
pub mod naming;
pub mod path;

pub use document::{Document, ID_FIELD};
pub use error::{Error, Result, StorageSource};
pub use id::{DocumentId, IdGenerator, ID_HEX_LEN, ID_LEN};
pub use limits::{
    LimitError, Limits, MAX_COLLECTION_NAME_LENGTH, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH,
    MAX_PATH_LENGTH, MAX_PREDICATE_DEPTH,
};
pub use naming::FieldNaming;
pub use path::{FieldPath, PathParseError, PathSegment};
