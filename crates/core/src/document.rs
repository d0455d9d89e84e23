//! Document capability trait
//!
//! The store needs to read and assign a document's id and, when the type
//! carries them, its creation and modification stamps. Types opt into that
//! through [`Document`]; everything is resolved at compile time.
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//! use stratadoc_core::{Document, DocumentId};
//!
//! #[derive(Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct User {
//!     id: DocumentId,
//!     name: String,
//!     updated_at: Option<DateTime<Utc>>,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> DocumentId {
//!         self.id
//!     }
//!     fn set_id(&mut self, id: DocumentId) {
//!         self.id = id;
//!     }
//!     fn set_updated_at(&mut self, at: DateTime<Utc>) {
//!         self.updated_at = Some(at);
//!     }
//! }
//! ```

use crate::id::DocumentId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Field name used for the id of untyped JSON documents
pub const ID_FIELD: &str = "id";

/// A type that can be stored in a collection
pub trait Document: Serialize + DeserializeOwned {
    /// Current id; [`DocumentId::EMPTY`] when unassigned
    fn id(&self) -> DocumentId;

    /// Assign the id
    fn set_id(&mut self, id: DocumentId);

    /// Record the creation time. Default: not tracked.
    fn set_created_at(&mut self, _at: DateTime<Utc>) {}

    /// Record the last modification time. Default: not tracked.
    fn set_updated_at(&mut self, _at: DateTime<Utc>) {}
}

/// Untyped documents keep their id in a top-level `"id"` string member.
/// Assigning [`DocumentId::EMPTY`] removes the member.
impl Document for serde_json::Value {
    fn id(&self) -> DocumentId {
        self.get(ID_FIELD)
            .and_then(|v| v.as_str())
            .and_then(DocumentId::try_parse)
            .unwrap_or(DocumentId::EMPTY)
    }

    fn set_id(&mut self, id: DocumentId) {
        if let Some(object) = self.as_object_mut() {
            if id.is_empty() {
                object.remove(ID_FIELD);
            } else {
                object.insert(ID_FIELD.to_string(), serde_json::Value::String(id.to_hex()));
            }
        }
    }
}
