//! Stratadoc - embedded document store over SQLite JSON
//!
//! Typed documents are stored as JSON text in a single SQLite table, one
//! logical collection per name, and queried with predicates that are
//! translated into `json_extract` clauses.
//!
//! # Quick Start
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use stratadoc::{field, Database, DocumentId, Document};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Person {
//!     #[serde(default)]
//!     id: DocumentId,
//!     name: String,
//!     age: i64,
//! }
//!
//! impl Document for Person {
//!     fn id(&self) -> DocumentId {
//!         self.id
//!     }
//!     fn set_id(&mut self, id: DocumentId) {
//!         self.id = id;
//!     }
//! }
//!
//! let db = Database::open_in_memory()?;
//! let people = db.collection::<Person>("people")?;
//! people.insert(&mut Person { id: DocumentId::default(), name: "Alice".into(), age: 30 }, None)?;
//! people.insert(&mut Person { id: DocumentId::default(), name: "Bob".into(), age: 25 }, None)?;
//!
//! assert_eq!(people.count(&field("age").eq(30), None)?, 1);
//! # Ok::<(), stratadoc::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`stratadoc_core`]: ids, field paths, naming, limits, errors
//! - [`stratadoc_query`]: predicate AST, text parser, SQL translation
//! - [`stratadoc_engine`]: database handle, catalog, indexes, collections

pub use stratadoc_core::*;
pub use stratadoc_engine::*;
pub use stratadoc_query::*;
