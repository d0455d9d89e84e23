//! Typed document collections
//!
//! A [`Collection`] is a cheap handle pairing a collection name with a
//! serializer. Every operation:
//! 1. translates its predicate (before the connection is touched)
//! 2. looks the collection up in the catalog
//! 3. runs SQL scoped to that collection id
//!
//! Find, count, any, delete and update all build their `WHERE` clause with
//! the same scoping function, so `find(p).len() == count(p)` for every
//! predicate.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use stratadoc_core::{Document, DocumentId};
//! use stratadoc_engine::{Database, FindOptions};
//! use stratadoc_query::field;
//!
//! #[derive(Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct User {
//!     id: DocumentId,
//!     full_name: String,
//!     age: u32,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> DocumentId { self.id }
//!     fn set_id(&mut self, id: DocumentId) { self.id = id }
//! }
//!
//! let db = Database::open_in_memory().unwrap();
//! let users = db.collection::<User>("users").unwrap();
//! let mut ada = User { id: DocumentId::EMPTY, full_name: "Ada".into(), age: 36 };
//! let id = users.insert(&mut ada, None).unwrap();
//! assert_eq!(ada.id, id);
//!
//! let found = users.find(&field("full_name").starts_with("A"), &FindOptions::new(), None).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

use crate::catalog::CollectionCatalog;
use crate::database::sql::{as_i64, as_text, columns, format_time, into_text, parse_time};
use crate::database::sql::{unique_violation, UniqueViolation};
use crate::database::{Database, Row, Transaction};
use crate::index::{IndexInfo, IndexManager, IndexOptions};
use crate::serializer::{JsonSerializer, Serializer};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use stratadoc_core::{Document, DocumentId, Error, FieldPath, Limits, PathSegment, Result};
use stratadoc_query::{Expr, Param, Translation, Translator};
use tracing::debug;

// ============================================================================
// Options and results
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Paging and ordering for [`Collection::find`]
///
/// Without `order_by`, results come back in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Rows to skip
    pub skip: Option<u64>,
    /// Maximum rows to return
    pub limit: Option<u64>,
    /// Sort field and direction; insertion order breaks ties
    pub order_by: Option<(FieldPath, SortOrder)>,
}

impl FindOptions {
    /// No paging, insertion order
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the first `n` matches
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Return at most `n` matches
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sort by a field
    pub fn order_by(mut self, path: FieldPath, order: SortOrder) -> Self {
        self.order_by = Some((path, order));
        self
    }
}

/// A document with its storage metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument<T> {
    /// Document id
    pub id: DocumentId,
    /// The document
    pub document: T,
    /// 1 after insert, +1 per update
    pub version: u64,
    /// Insert time
    pub created_at: DateTime<Utc>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

/// Predicate compiled and scoped to one collection
struct Scoped {
    collection_id: i64,
    clause: String,
    params: Vec<Param>,
}

// ============================================================================
// Collection
// ============================================================================

/// Handle to a named collection of `T`
pub struct Collection<T, S = JsonSerializer> {
    db: Arc<Database>,
    name: String,
    serializer: S,
    translator: Translator,
    limits: Limits,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S: Clone> Clone for Collection<T, S> {
    fn clone(&self) -> Self {
        Collection {
            db: Arc::clone(&self.db),
            name: self.name.clone(),
            serializer: self.serializer.clone(),
            translator: self.translator.clone(),
            limits: self.limits.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, S> std::fmt::Debug for Collection<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("naming", &self.translator.naming())
            .finish()
    }
}

impl<T: Document, S: Serializer> Collection<T, S> {
    pub(crate) fn new(db: Arc<Database>, name: &str, serializer: S) -> Self {
        let translator = Translator::new(serializer.naming());
        let limits = db.limits();
        Collection {
            db,
            name: name.to_string(),
            serializer,
            translator,
            limits,
            _marker: PhantomData,
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Translator used for this collection's predicates
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Owning database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    fn collection_id(&self, txn: Option<&Transaction<'_>>) -> Result<i64> {
        CollectionCatalog::new(Arc::clone(&self.db)).lookup(&self.name, txn)
    }

    fn indexes(&self) -> IndexManager {
        IndexManager::new(Arc::clone(&self.db), self.translator.clone())
    }

    /// Compile `predicate` and scope it to this collection.
    fn scope(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<Scoped> {
        let translation = self.translator.translate(predicate)?;
        let collection_id = self.collection_id(txn)?;
        let mut params = Vec::with_capacity(translation.params.len() + 1);
        params.push(Param::Int(collection_id));
        params.extend(translation.params);
        Ok(Scoped {
            collection_id,
            clause: format!("collection_id = ? AND ({})", translation.clause),
            params,
        })
    }

    /// The `WHERE` clause and parameters every query path uses for
    /// `predicate`
    pub fn filter(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<Translation> {
        let scoped = self.scope(predicate, txn)?;
        Ok(Translation {
            clause: scoped.clause,
            params: scoped.params,
        })
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    fn encode(&self, document: &T) -> Result<(Value, String)> {
        let payload = self.serializer.serialize(document)?;
        if !payload.is_object() {
            return Err(Error::invalid_argument(format!(
                "documents in '{}' must serialize to a JSON object",
                self.name
            )));
        }
        let text = self.serializer.encode(&payload)?;
        self.limits.validate_payload(&payload, text.len())?;
        Ok((payload, text))
    }

    fn decode(&self, data: &str) -> Result<T> {
        self.serializer.deserialize(self.serializer.decode(data)?)
    }

    fn stored_from_row(&self, id: DocumentId, row: Row) -> Result<StoredDocument<T>> {
        let [data, version, created_at, updated_at] = columns(row)?;
        Ok(StoredDocument {
            id,
            document: self.decode(as_text(&data)?)?,
            version: as_i64(&version)?.max(0) as u64,
            created_at: parse_time(as_text(&created_at)?)?,
            updated_at: parse_time(as_text(&updated_at)?)?,
        })
    }

    /// Turn a unique-constraint failure into `DuplicateKey`; pass anything
    /// else through.
    fn write_error(
        &self,
        err: Error,
        collection_id: i64,
        id: DocumentId,
        payload: &Value,
        txn: Option<&Transaction<'_>>,
    ) -> Error {
        match unique_violation(&err) {
            None => err,
            Some(UniqueViolation::PrimaryKey) => Error::duplicate_key(&self.name, id.to_hex()),
            Some(UniqueViolation::Index(native)) => {
                let value = self
                    .indexes()
                    .by_native_name(&self.name, collection_id, &native, txn)
                    .ok()
                    .flatten()
                    .map(|info| self.field_value(payload, &info.field_path))
                    .unwrap_or(native);
                Error::duplicate_key(&self.name, value)
            }
        }
    }

    /// JSON text of the value at `path` in `payload`, `null` when absent
    fn field_value(&self, payload: &Value, path: &FieldPath) -> String {
        let mut current = payload;
        for segment in self.translator.naming().apply_path(path) {
            let next = match segment {
                PathSegment::Key(key) => current.get(key.as_str()),
                PathSegment::Index(i) => current.get(i),
            };
            match next {
                Some(value) => current = value,
                None => return Value::Null.to_string(),
            }
        }
        current.to_string()
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert a document.
    ///
    /// Assigns a fresh id when the document's id is empty and stamps the
    /// creation and update times. The stored version starts at 1. If the
    /// write fails the document's id is put back; the stamped times are not.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` when the id is already present or a unique index
    /// rejects the document.
    pub fn insert(&self, document: &mut T, txn: Option<&Transaction<'_>>) -> Result<DocumentId> {
        let collection_id = self.collection_id(txn)?;
        self.insert_into(collection_id, document, txn)
    }

    /// Insert every document or none of them. Returns the number inserted.
    ///
    /// On failure every document gets back the id it had before the call.
    pub fn insert_many(&self, documents: &mut [T], txn: Option<&Transaction<'_>>) -> Result<usize> {
        let collection_id = self.collection_id(txn)?;
        let previous: Vec<DocumentId> = documents.iter().map(Document::id).collect();
        let result = self.db.atomic(txn, |t| {
            for document in documents.iter_mut() {
                self.insert_into(collection_id, document, Some(t))?;
            }
            Ok(documents.len())
        });
        let inserted = match result {
            Ok(inserted) => inserted,
            Err(e) => {
                for (document, id) in documents.iter_mut().zip(previous) {
                    document.set_id(id);
                }
                return Err(e);
            }
        };
        debug!(target: "stratadoc::store", collection = %self.name, inserted, "bulk insert");
        Ok(inserted)
    }

    fn insert_into(
        &self,
        collection_id: i64,
        document: &mut T,
        txn: Option<&Transaction<'_>>,
    ) -> Result<DocumentId> {
        let previous = document.id();
        if previous.is_empty() {
            document.set_id(DocumentId::new());
        }
        let now = Utc::now();
        document.set_created_at(now);
        document.set_updated_at(now);
        let id = document.id();

        if let Err(e) = self.write_new(collection_id, id, document, now, txn) {
            document.set_id(previous);
            return Err(e);
        }
        debug!(target: "stratadoc::store", collection = %self.name, %id, "inserted");
        Ok(id)
    }

    fn write_new(
        &self,
        collection_id: i64,
        id: DocumentId,
        document: &T,
        now: DateTime<Utc>,
        txn: Option<&Transaction<'_>>,
    ) -> Result<()> {
        let (payload, text) = self.encode(document)?;
        let stamp = format_time(now);
        self.db
            .execute(
                "INSERT INTO sd_documents \
                 (collection_id, doc_id, data, created_at, updated_at, version) \
                 VALUES (?, ?, ?, ?, ?, 1)",
                &[
                    Param::Int(collection_id),
                    Param::Text(id.to_hex()),
                    Param::Text(text),
                    Param::Text(stamp.clone()),
                    Param::Text(stamp),
                ],
                txn,
            )
            .map_err(|e| self.write_error(e, collection_id, id, &payload, txn))?;
        Ok(())
    }

    // ========================================================================
    // Read by id
    // ========================================================================

    /// Fetch a document by id
    pub fn get(&self, id: DocumentId, txn: Option<&Transaction<'_>>) -> Result<Option<T>> {
        Ok(self.get_stored(id, txn)?.map(|stored| stored.document))
    }

    /// Fetch a document by id together with its version and timestamps
    pub fn get_stored(
        &self,
        id: DocumentId,
        txn: Option<&Transaction<'_>>,
    ) -> Result<Option<StoredDocument<T>>> {
        let collection_id = self.collection_id(txn)?;
        let rows = self.db.query(
            "SELECT data, version, created_at, updated_at FROM sd_documents \
             WHERE collection_id = ? AND doc_id = ?",
            &[Param::Int(collection_id), Param::Text(id.to_hex())],
            txn,
        )?;
        rows.into_iter()
            .next()
            .map(|row| self.stored_from_row(id, row))
            .transpose()
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Replace the stored document with the same id.
    ///
    /// Bumps the version and the update time. Returns `false` (and writes
    /// nothing) when no document has that id; this is not an upsert.
    pub fn update(&self, document: &mut T, txn: Option<&Transaction<'_>>) -> Result<bool> {
        let id = document.id();
        if id.is_empty() {
            return Ok(false);
        }
        let collection_id = self.collection_id(txn)?;
        let now = Utc::now();
        document.set_updated_at(now);
        let (payload, text) = self.encode(document)?;
        let changed = self
            .write_back(collection_id, id, text, now, txn)
            .map_err(|e| self.write_error(e, collection_id, id, &payload, txn))?;
        Ok(changed > 0)
    }

    /// Apply `f` to the first document matching `predicate` and store it.
    ///
    /// Returns whether a document matched. The id cannot be changed by `f`.
    pub fn update_one<F>(&self, predicate: &Expr, mut f: F, txn: Option<&Transaction<'_>>) -> Result<bool>
    where
        F: FnMut(&mut T),
    {
        Ok(self.update_matching(predicate, Some(1), &mut f, txn)? > 0)
    }

    /// Apply `f` to every document matching `predicate` and store them.
    ///
    /// All-or-nothing. Returns the number of documents updated.
    pub fn update_many<F>(&self, predicate: &Expr, mut f: F, txn: Option<&Transaction<'_>>) -> Result<usize>
    where
        F: FnMut(&mut T),
    {
        self.update_matching(predicate, None, &mut f, txn)
    }

    fn update_matching(
        &self,
        predicate: &Expr,
        limit: Option<u64>,
        f: &mut dyn FnMut(&mut T),
        txn: Option<&Transaction<'_>>,
    ) -> Result<usize> {
        let scoped = self.scope(predicate, txn)?;
        let mut sql = format!(
            "SELECT doc_id, data FROM sd_documents WHERE {} ORDER BY rowid",
            scoped.clause
        );
        let mut params = scoped.params;
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(Param::Int(clamp(limit)));
        }

        let updated = self.db.atomic(txn, |t| {
            let rows = self.db.query(&sql, &params, Some(t))?;
            let now = Utc::now();
            let mut updated = 0;
            for row in rows {
                let [doc_id, data] = columns(row)?;
                let id = DocumentId::parse(&into_text(doc_id)?)?;
                let mut document = self.decode(as_text(&data)?)?;
                f(&mut document);
                document.set_id(id);
                document.set_updated_at(now);
                let (payload, text) = self.encode(&document)?;
                self.write_back(scoped.collection_id, id, text, now, Some(t))
                    .map_err(|e| self.write_error(e, scoped.collection_id, id, &payload, Some(t)))?;
                updated += 1;
            }
            Ok(updated)
        })?;
        debug!(target: "stratadoc::store", collection = %self.name, updated, "update by predicate");
        Ok(updated)
    }

    fn write_back(
        &self,
        collection_id: i64,
        id: DocumentId,
        text: String,
        now: DateTime<Utc>,
        txn: Option<&Transaction<'_>>,
    ) -> Result<usize> {
        self.db.execute(
            "UPDATE sd_documents SET data = ?, updated_at = ?, version = version + 1 \
             WHERE collection_id = ? AND doc_id = ?",
            &[
                Param::Text(text),
                Param::Text(format_time(now)),
                Param::Int(collection_id),
                Param::Text(id.to_hex()),
            ],
            txn,
        )
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete by id. Returns whether a document was removed.
    pub fn delete(&self, id: DocumentId, txn: Option<&Transaction<'_>>) -> Result<bool> {
        let collection_id = self.collection_id(txn)?;
        let removed = self.db.execute(
            "DELETE FROM sd_documents WHERE collection_id = ? AND doc_id = ?",
            &[Param::Int(collection_id), Param::Text(id.to_hex())],
            txn,
        )?;
        Ok(removed > 0)
    }

    /// Delete the first document matching `predicate`
    pub fn delete_one(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<bool> {
        let scoped = self.scope(predicate, txn)?;
        let removed = self.db.execute(
            &format!(
                "DELETE FROM sd_documents WHERE rowid = \
                 (SELECT rowid FROM sd_documents WHERE {} ORDER BY rowid LIMIT 1)",
                scoped.clause
            ),
            &scoped.params,
            txn,
        )?;
        Ok(removed > 0)
    }

    /// Delete every document matching `predicate`. Returns the number removed.
    pub fn delete_many(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<usize> {
        let scoped = self.scope(predicate, txn)?;
        let removed = self.db.execute(
            &format!("DELETE FROM sd_documents WHERE {}", scoped.clause),
            &scoped.params,
            txn,
        )?;
        debug!(target: "stratadoc::store", collection = %self.name, removed, "delete by predicate");
        Ok(removed)
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Documents matching `predicate`
    ///
    /// # Errors
    ///
    /// `InvalidQuery` for predicates the translator cannot express,
    /// `CollectionNotFound` if the collection was dropped.
    pub fn find(
        &self,
        predicate: &Expr,
        options: &FindOptions,
        txn: Option<&Transaction<'_>>,
    ) -> Result<Vec<T>> {
        let order = match &options.order_by {
            Some((path, order)) => format!(
                " ORDER BY {} {}, rowid",
                self.translator.accessor(path)?,
                order.sql()
            ),
            None => " ORDER BY rowid".to_string(),
        };
        let scoped = self.scope(predicate, txn)?;
        let mut sql = format!("SELECT data FROM sd_documents WHERE {}{}", scoped.clause, order);
        let mut params = scoped.params;
        if options.limit.is_some() || options.skip.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Param::Int(options.limit.map_or(-1, clamp)));
            params.push(Param::Int(options.skip.map_or(0, clamp)));
        }

        let rows = self.db.query(&sql, &params, txn)?;
        rows.into_iter()
            .map(|row| {
                let [data] = columns(row)?;
                self.decode(as_text(&data)?)
            })
            .collect()
    }

    /// First document matching `predicate` in insertion order
    pub fn find_one(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<Option<T>> {
        Ok(self
            .find(predicate, &FindOptions::new().limit(1), txn)?
            .into_iter()
            .next())
    }

    /// Every document in insertion order
    pub fn all(&self, txn: Option<&Transaction<'_>>) -> Result<Vec<T>> {
        self.find(&Expr::always(), &FindOptions::new(), txn)
    }

    /// Number of documents matching `predicate`
    pub fn count(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<u64> {
        let scoped = self.scope(predicate, txn)?;
        let count = self
            .db
            .scalar(
                &format!("SELECT COUNT(*) FROM sd_documents WHERE {}", scoped.clause),
                &scoped.params,
                txn,
            )?
            .map(|v| as_i64(&v))
            .transpose()?
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    /// Number of documents in the collection
    pub fn count_all(&self, txn: Option<&Transaction<'_>>) -> Result<u64> {
        self.count(&Expr::always(), txn)
    }

    /// Whether any document matches `predicate`
    pub fn any(&self, predicate: &Expr, txn: Option<&Transaction<'_>>) -> Result<bool> {
        let scoped = self.scope(predicate, txn)?;
        let exists = self.db.scalar(
            &format!(
                "SELECT EXISTS (SELECT 1 FROM sd_documents WHERE {})",
                scoped.clause
            ),
            &scoped.params,
            txn,
        )?;
        Ok(matches!(exists.map(|v| as_i64(&v)).transpose()?, Some(1)))
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Create a non-unique index on `path`
    pub fn create_index(&self, path: &str, txn: Option<&Transaction<'_>>) -> Result<IndexInfo> {
        self.create_index_with(path, IndexOptions::default(), txn)
    }

    /// Create an index on `path` with options
    pub fn create_index_with(
        &self,
        path: &str,
        options: IndexOptions,
        txn: Option<&Transaction<'_>>,
    ) -> Result<IndexInfo> {
        let path = FieldPath::parse(path)?;
        self.indexes().create_index(&self.name, &path, options, txn)
    }

    /// Drop the index on `path`; missing indexes are not an error
    pub fn drop_index(&self, path: &str, txn: Option<&Transaction<'_>>) -> Result<bool> {
        let path = FieldPath::parse(path)?;
        self.indexes().drop_index(&self.name, &path, txn)
    }

    /// Indexes on this collection
    pub fn list_indexes(&self, txn: Option<&Transaction<'_>>) -> Result<Vec<IndexInfo>> {
        self.indexes().list_indexes(&self.name, txn)
    }
}

/// SQLite integers are signed
fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
