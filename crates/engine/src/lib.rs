//! Storage engine for stratadoc
//!
//! This crate maps document collections onto one SQLite database:
//! - [`Database`]: connection, schema, configuration, transactions
//! - [`CollectionCatalog`]: collection names to internal ids
//! - [`IndexManager`]: partial expression indexes on document fields
//! - [`Collection`]: typed CRUD and queries over one collection
//! - [`Serializer`]: payload encoding, with [`JsonSerializer`] as default
//!
//! Predicates are compiled by `stratadoc-query`; this crate only scopes the
//! resulting clause to a collection and runs it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod collection;
pub mod database;
pub mod index;
pub mod serializer;

pub use catalog::{validate_name, CollectionCatalog, CollectionInfo};
pub use collection::{Collection, FindOptions, SortOrder, StoredDocument};
pub use database::{Database, Row, SqlValue, StoreConfig, Transaction, CONFIG_FILE_NAME};
pub use index::{IndexInfo, IndexManager, IndexOptions};
pub use serializer::{JsonSerializer, Serializer};
