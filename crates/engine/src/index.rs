//! Secondary indexes on document fields
//!
//! Each index is a native SQLite expression index over the same accessor
//! the translator emits for the field, restricted to one collection by a
//! partial-index `WHERE` clause:
//!
//! ```sql
//! CREATE UNIQUE INDEX IF NOT EXISTS "sdx_1_users_email"
//!     ON sd_documents(json_extract(data, '$.email'))
//!     WHERE collection_id = 1
//! ```
//!
//! A metadata row in `sd_indexes` records the field path and options so
//! indexes can be listed, dropped with their collection, and mapped back to
//! a field when a write violates one.

use crate::catalog::CollectionCatalog;
use crate::database::sql::{as_i64, columns, format_time, into_text, parse_time, unique_violation};
use crate::database::{Database, Row, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stratadoc_core::{Error, FieldPath, Result};
use stratadoc_query::{Param, Translator};
use tracing::{debug, info};

/// Options for [`IndexManager::create_index`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Reject two documents with the same value
    pub unique: bool,
    /// Leave out documents where the field is null or absent
    pub sparse: bool,
}

impl IndexOptions {
    /// Non-unique, non-sparse
    pub fn new() -> Self {
        Self::default()
    }

    /// Set uniqueness
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set sparseness
    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }
}

/// Index metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    /// Owning collection
    pub collection: String,
    /// Derived name, unique per collection
    pub name: String,
    /// Name of the SQLite index
    pub native_name: String,
    /// Indexed field
    #[serde(serialize_with = "serialize_path")]
    pub field_path: FieldPath,
    /// Unique flag
    pub unique: bool,
    /// Sparse flag
    pub sparse: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

fn serialize_path<S: serde::Serializer>(path: &FieldPath, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&path.to_path_string())
}

/// Derived index name: `{collection}_{path}`, e.g. `users_address.city`
///
/// The dotted path is kept verbatim so distinct paths never share a name
/// (`a.b` and `a_b` would both flatten to `a_b`).
pub fn index_name(collection: &str, path: &FieldPath) -> String {
    format!("{}_{}", collection, path.to_path_string())
}

/// SQLite index name for a collection id and derived name
pub fn native_index_name(collection_id: i64, name: &str) -> String {
    format!("sdx_{}_{}", collection_id, name)
}

/// Creates, drops and lists indexes
#[derive(Debug, Clone)]
pub struct IndexManager {
    db: Arc<Database>,
    translator: Translator,
}

impl IndexManager {
    /// Index manager rendering accessors with `translator`
    ///
    /// The translator must use the same naming rule as the collection's
    /// serializer, or the index expression will not match query accessors.
    pub fn new(db: Arc<Database>, translator: Translator) -> Self {
        IndexManager { db, translator }
    }

    fn catalog(&self) -> CollectionCatalog {
        CollectionCatalog::new(Arc::clone(&self.db))
    }

    /// Create an index on `path`.
    ///
    /// Re-issuing for an existing index is a no-op returning the existing
    /// metadata, even when `options` differ.
    ///
    /// # Errors
    ///
    /// - `CollectionNotFound` for an unknown collection
    /// - `InvalidArgument` for a path with index segments, or when the
    ///   derived name is already taken by an index on another field
    /// - `DuplicateKey` when a unique index is requested over documents that
    ///   already collide
    pub fn create_index(
        &self,
        collection: &str,
        path: &FieldPath,
        options: IndexOptions,
        txn: Option<&Transaction<'_>>,
    ) -> Result<IndexInfo> {
        let collection_id = self.catalog().lookup(collection, txn)?;
        let accessor = self.translator.accessor(path)?;
        let name = index_name(collection, path);

        self.db.atomic(txn, |t| {
            if let Some(existing) = self.get(collection, collection_id, &name, Some(t))? {
                if existing.field_path != *path {
                    return Err(Error::invalid_argument(format!(
                        "index name '{}' is already used by field '{}'",
                        name, existing.field_path
                    )));
                }
                debug!(target: "stratadoc::index", index = %name, "index already exists");
                return Ok(existing);
            }

            let native_name = native_index_name(collection_id, &name);
            let mut ddl = format!(
                "CREATE {}INDEX IF NOT EXISTS \"{}\" ON sd_documents({}) WHERE collection_id = {}",
                if options.unique { "UNIQUE " } else { "" },
                native_name,
                accessor,
                collection_id
            );
            if options.sparse {
                ddl.push_str(&format!(" AND {} IS NOT NULL", accessor));
            }
            self.db
                .execute_batch(&ddl, Some(t))
                .map_err(|e| match unique_violation(&e) {
                    Some(_) => Error::duplicate_key(
                        collection,
                        format!("existing documents share a value for '{}'", path),
                    ),
                    None => e,
                })?;

            let created_at = Utc::now();
            self.db.execute(
                "INSERT INTO sd_indexes \
                 (collection_id, name, native_name, field_path, is_unique, is_sparse, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                &[
                    Param::Int(collection_id),
                    Param::Text(name.clone()),
                    Param::Text(native_name.clone()),
                    Param::Text(path.to_path_string()),
                    Param::Int(options.unique as i64),
                    Param::Int(options.sparse as i64),
                    Param::Text(format_time(created_at)),
                ],
                Some(t),
            )?;
            info!(
                target: "stratadoc::index",
                collection,
                index = %name,
                unique = options.unique,
                sparse = options.sparse,
                "index created"
            );
            Ok(IndexInfo {
                collection: collection.to_string(),
                name,
                native_name,
                field_path: path.clone(),
                unique: options.unique,
                sparse: options.sparse,
                created_at,
            })
        })
    }

    /// Drop the index on `path`. Returns whether it existed.
    pub fn drop_index(
        &self,
        collection: &str,
        path: &FieldPath,
        txn: Option<&Transaction<'_>>,
    ) -> Result<bool> {
        let collection_id = self.catalog().lookup(collection, txn)?;
        let name = index_name(collection, path);
        let dropped = self.db.atomic(txn, |t| {
            let Some(info) = self
                .get(collection, collection_id, &name, Some(t))?
                .filter(|info| info.field_path == *path)
            else {
                return Ok(false);
            };
            self.db.execute_batch(
                &format!("DROP INDEX IF EXISTS \"{}\"", info.native_name),
                Some(t),
            )?;
            self.db.execute(
                "DELETE FROM sd_indexes WHERE collection_id = ? AND name = ?",
                &[Param::Int(collection_id), Param::Text(name.clone())],
                Some(t),
            )?;
            Ok(true)
        })?;
        if dropped {
            info!(target: "stratadoc::index", collection, index = %name, "index dropped");
        }
        Ok(dropped)
    }

    /// Indexes of a collection, ordered by name
    pub fn list_indexes(&self, collection: &str, txn: Option<&Transaction<'_>>) -> Result<Vec<IndexInfo>> {
        let collection_id = self.catalog().lookup(collection, txn)?;
        let rows = self.db.query(
            "SELECT name, native_name, field_path, is_unique, is_sparse, created_at \
             FROM sd_indexes WHERE collection_id = ? ORDER BY name",
            &[Param::Int(collection_id)],
            txn,
        )?;
        rows.into_iter()
            .map(|row| info_from_row(collection, row))
            .collect()
    }

    /// Metadata for the SQLite index named `native_name`, if it is ours
    pub(crate) fn by_native_name(
        &self,
        collection: &str,
        collection_id: i64,
        native_name: &str,
        txn: Option<&Transaction<'_>>,
    ) -> Result<Option<IndexInfo>> {
        let rows = self.db.query(
            "SELECT name, native_name, field_path, is_unique, is_sparse, created_at \
             FROM sd_indexes WHERE collection_id = ? AND native_name = ?",
            &[Param::Int(collection_id), Param::Text(native_name.to_string())],
            txn,
        )?;
        rows.into_iter()
            .next()
            .map(|row| info_from_row(collection, row))
            .transpose()
    }

    fn get(
        &self,
        collection: &str,
        collection_id: i64,
        name: &str,
        txn: Option<&Transaction<'_>>,
    ) -> Result<Option<IndexInfo>> {
        let rows = self.db.query(
            "SELECT name, native_name, field_path, is_unique, is_sparse, created_at \
             FROM sd_indexes WHERE collection_id = ? AND name = ?",
            &[Param::Int(collection_id), Param::Text(name.to_string())],
            txn,
        )?;
        rows.into_iter()
            .next()
            .map(|row| info_from_row(collection, row))
            .transpose()
    }
}

fn info_from_row(collection: &str, row: Row) -> Result<IndexInfo> {
    let [name, native_name, field_path, unique, sparse, created_at] = columns(row)?;
    Ok(IndexInfo {
        collection: collection.to_string(),
        name: into_text(name)?,
        native_name: into_text(native_name)?,
        field_path: FieldPath::parse(&into_text(field_path)?)?,
        unique: as_i64(&unique)? != 0,
        sparse: as_i64(&sparse)? != 0,
        created_at: parse_time(&into_text(created_at)?)?,
    })
}
