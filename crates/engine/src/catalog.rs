//! Collection catalog
//!
//! Maps collection names to internal ids. Ids are memoized per database in
//! a concurrent map; the memo is cleared whenever a transaction rolls back,
//! since the rollback may have discarded a collection row it remembers.
//!
//! Only [`CollectionCatalog::resolve`] creates collections. Every query path
//! goes through [`CollectionCatalog::lookup`], which fails with
//! `CollectionNotFound` instead of provisioning.

use crate::database::sql::{as_i64, columns, format_time, into_text, parse_time};
use crate::database::{Database, Transaction};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use stratadoc_core::{Error, Result, MAX_COLLECTION_NAME_LENGTH};
use stratadoc_query::Param;
use tracing::info;

/// Registered collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    /// Internal id
    pub id: i64,
    /// Unique name
    pub name: String,
    /// When the collection was first opened
    pub created_at: DateTime<Utc>,
}

/// Check a collection name: 1..=128 characters of `[A-Za-z0-9_.-]`
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("collection name must not be empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_LENGTH {
        return Err(Error::invalid_argument(format!(
            "collection name is {} bytes, maximum is {}",
            name.len(),
            MAX_COLLECTION_NAME_LENGTH
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(Error::invalid_argument(format!(
            "collection name '{}' contains invalid character {:?}",
            name, bad
        )));
    }
    Ok(())
}

/// Name-to-id registry for collections
#[derive(Debug, Clone)]
pub struct CollectionCatalog {
    db: Arc<Database>,
}

impl CollectionCatalog {
    /// Catalog over a database
    pub fn new(db: Arc<Database>) -> Self {
        CollectionCatalog { db }
    }

    /// Internal id of `name`, creating the collection if absent.
    ///
    /// Idempotent: concurrent or repeated calls return the same id.
    pub fn resolve(&self, name: &str, txn: Option<&Transaction<'_>>) -> Result<i64> {
        validate_name(name)?;
        if let Some(id) = self.db.collection_ids.get(name) {
            return Ok(*id);
        }

        let id = self.db.atomic(txn, |t| {
            let created = self.db.execute(
                "INSERT OR IGNORE INTO sd_collections (name, created_at) VALUES (?, ?)",
                &[Param::Text(name.to_string()), Param::Text(format_time(Utc::now()))],
                Some(t),
            )?;
            let id = self
                .select_id(name, Some(t))?
                .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
            if created > 0 {
                info!(target: "stratadoc::catalog", collection = name, id, "collection created");
            }
            Ok(id)
        })?;
        self.remember(name, id, txn);
        Ok(id)
    }

    /// Internal id of an existing collection.
    ///
    /// # Errors
    ///
    /// `CollectionNotFound` if the collection was never created or has been
    /// dropped.
    pub fn lookup(&self, name: &str, txn: Option<&Transaction<'_>>) -> Result<i64> {
        if let Some(id) = self.db.collection_ids.get(name) {
            return Ok(*id);
        }
        let id = self
            .select_id(name, txn)?
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        self.remember(name, id, txn);
        Ok(id)
    }

    /// Ids seen inside an explicit transaction stay out of the memo until
    /// committed state shows them again; other threads read the memo
    /// without taking the connection lock.
    fn remember(&self, name: &str, id: i64, txn: Option<&Transaction<'_>>) {
        if txn.is_none() {
            self.db.collection_ids.insert(name.to_string(), id);
        }
    }

    /// Whether the collection exists
    pub fn exists(&self, name: &str, txn: Option<&Transaction<'_>>) -> Result<bool> {
        match self.lookup(name, txn) {
            Ok(_) => Ok(true),
            Err(Error::CollectionNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop a collection with all of its documents and indexes.
    ///
    /// Returns whether the collection existed.
    pub fn drop_collection(&self, name: &str, txn: Option<&Transaction<'_>>) -> Result<bool> {
        validate_name(name)?;
        let dropped = self.db.atomic(txn, |t| {
            let Some(id) = self.select_id(name, Some(t))? else {
                return Ok(false);
            };
            let natives = self.db.query(
                "SELECT native_name FROM sd_indexes WHERE collection_id = ?",
                &[Param::Int(id)],
                Some(t),
            )?;
            for row in natives {
                let [native] = columns(row)?;
                let native = into_text(native)?;
                self.db
                    .execute_batch(&format!("DROP INDEX IF EXISTS \"{}\"", native), Some(t))?;
            }
            // Cascades to documents and index metadata.
            self.db.execute(
                "DELETE FROM sd_collections WHERE id = ?",
                &[Param::Int(id)],
                Some(t),
            )?;
            Ok(true)
        })?;

        self.db.collection_ids.remove(name);
        if dropped {
            info!(target: "stratadoc::catalog", collection = name, "collection dropped");
        }
        Ok(dropped)
    }

    /// All collections, ordered by name
    pub fn list(&self, txn: Option<&Transaction<'_>>) -> Result<Vec<CollectionInfo>> {
        let rows = self.db.query(
            "SELECT id, name, created_at FROM sd_collections ORDER BY name",
            &[],
            txn,
        )?;
        rows.into_iter()
            .map(|row| {
                let [id, name, created_at] = columns(row)?;
                Ok(CollectionInfo {
                    id: as_i64(&id)?,
                    name: into_text(name)?,
                    created_at: parse_time(&into_text(created_at)?)?,
                })
            })
            .collect()
    }

    fn select_id(&self, name: &str, txn: Option<&Transaction<'_>>) -> Result<Option<i64>> {
        self.db
            .scalar(
                "SELECT id FROM sd_collections WHERE name = ?",
                &[Param::Text(name.to_string())],
                txn,
            )?
            .map(|v| as_i64(&v))
            .transpose()
    }
}
