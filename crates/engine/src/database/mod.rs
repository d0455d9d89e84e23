//! Database struct and open logic
//!
//! This module provides the main Database struct that owns:
//! - The SQLite connection (behind a re-entrant lock)
//! - Schema initialization and pragma configuration
//! - The collection-id memo used by the catalog
//! - Transaction API
//!
//! ## Transaction API
//!
//! 1. **Closure API** (recommended): `db.transaction(|txn| { ... })`
//!    - Commit on `Ok`, rollback on `Err`
//!    - Returns the closure's return value
//!
//! 2. **Manual API**: `begin()` + `Transaction::commit()`/`rollback()`
//!    - For cases requiring external control over commit timing
//!
//! Every data operation takes `Option<&Transaction>`. With `None` the
//! operation runs on its own; on a thread that holds an open transaction it
//! joins that transaction, because the connection lock is re-entrant.

pub mod config;
pub mod schema;
pub mod sql;
mod transactions;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use sql::{Row, SqlValue};
pub use transactions::Transaction;

use crate::catalog::CollectionCatalog;
use crate::collection::Collection;
use crate::index::IndexManager;
use crate::serializer::{JsonSerializer, Serializer};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use std::time::Duration;
use stratadoc_core::{Document, Error, Limits, Result};
use stratadoc_query::{Param, Translator};
use tracing::{debug, info};

/// Open database files by canonical path. Opening a file that is already
/// open returns the live handle; entries are weak and go stale when the last
/// handle drops.
static OPEN_DATABASES: Lazy<Mutex<HashMap<PathBuf, Weak<Database>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// An open document store over one SQLite database
///
/// Opened as `Arc<Database>`; collection, catalog and index handles keep a
/// clone of the `Arc`.
pub struct Database {
    conn: ReentrantMutex<Connection>,
    config: StoreConfig,
    path: Option<PathBuf>,
    /// Collection name -> internal id
    pub(crate) collection_ids: DashMap<String, i64>,
    savepoint_seq: AtomicU64,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

impl Database {
    /// Open (or create) a database file with default configuration.
    ///
    /// Opening a path that is already open in this process returns the
    /// existing instance.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open a database file with explicit configuration.
    ///
    /// # Errors
    ///
    /// `Error::Config` for invalid configuration values, `Error::Storage`
    /// when SQLite cannot open the file.
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let canonical = canonical_path(path.as_ref());

        // Hold the registry lock for the whole open so two threads cannot
        // create two instances for one file.
        let mut registry = OPEN_DATABASES.lock();
        if let Some(existing) = registry.get(&canonical).and_then(|weak| weak.upgrade()) {
            info!(target: "stratadoc::db", path = ?canonical, "returning existing database instance");
            return Ok(existing);
        }

        let conn = Connection::open(&canonical).map_err(Error::storage)?;
        let db = Arc::new(Self::from_connection(conn, config, Some(canonical.clone()))?);
        registry.insert(canonical.clone(), Arc::downgrade(&db));
        info!(target: "stratadoc::db", path = ?canonical, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with default configuration.
    pub fn open_in_memory() -> Result<Arc<Self>> {
        Self::open_in_memory_with_config(StoreConfig::default())
    }

    /// Open a private in-memory database.
    pub fn open_in_memory_with_config(config: StoreConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let conn = Connection::open_in_memory().map_err(Error::storage)?;
        let db = Self::from_connection(conn, config, None)?;
        debug!(target: "stratadoc::db", "in-memory database opened");
        Ok(Arc::new(db))
    }

    fn from_connection(conn: Connection, config: StoreConfig, path: Option<PathBuf>) -> Result<Self> {
        configure(&conn, &config, path.is_some())?;
        schema::ensure(&conn)?;
        Ok(Database {
            conn: ReentrantMutex::new(conn),
            config,
            path,
            collection_ids: DashMap::new(),
            savepoint_seq: AtomicU64::new(0),
        })
    }

    /// File path, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Document limits enforced on writes
    pub fn limits(&self) -> Limits {
        self.config.limits()
    }

    /// Translator matching the configured field naming
    pub fn translator(&self) -> Translator {
        Translator::new(self.config.field_naming)
    }

    // ========================================================================
    // Facades
    // ========================================================================

    /// Open a collection of `T`, creating it if absent.
    pub fn collection<T: Document>(self: &Arc<Self>, name: &str) -> Result<Collection<T>> {
        self.collection_with(name, JsonSerializer::new(self.config.field_naming))
    }

    /// Open a collection with a custom serializer.
    pub fn collection_with<T, S>(self: &Arc<Self>, name: &str, serializer: S) -> Result<Collection<T, S>>
    where
        T: Document,
        S: Serializer,
    {
        self.catalog().resolve(name, None)?;
        Ok(Collection::new(Arc::clone(self), name, serializer))
    }

    /// Collection registry
    pub fn catalog(self: &Arc<Self>) -> CollectionCatalog {
        CollectionCatalog::new(Arc::clone(self))
    }

    /// Index management using the configured field naming
    pub fn indexes(self: &Arc<Self>) -> IndexManager {
        IndexManager::new(Arc::clone(self), self.translator())
    }

    // ========================================================================
    // Raw SQL
    // ========================================================================

    /// Run `f` against the connection: the transaction's when given,
    /// otherwise the shared one under the lock.
    pub(crate) fn with_conn<R>(
        &self,
        txn: Option<&Transaction<'_>>,
        f: impl FnOnce(&Connection) -> Result<R>,
    ) -> Result<R> {
        match txn {
            Some(txn) => {
                debug_assert!(std::ptr::eq(txn.database(), self));
                f(txn.connection())
            }
            None => {
                let conn = self.conn.lock();
                f(&conn)
            }
        }
    }

    /// Execute a statement, returning the number of rows changed.
    pub fn execute(&self, sql: &str, params: &[Param], txn: Option<&Transaction<'_>>) -> Result<usize> {
        let values = sql::to_sql_values(params);
        self.with_conn(txn, |conn| {
            let mut stmt = conn.prepare_cached(sql).map_err(Error::storage)?;
            stmt.execute(params_from_iter(values.iter()))
                .map_err(Error::storage)
        })
    }

    /// Run a query and collect every row.
    pub fn query(&self, sql: &str, params: &[Param], txn: Option<&Transaction<'_>>) -> Result<Vec<Row>> {
        let values = sql::to_sql_values(params);
        self.with_conn(txn, |conn| {
            let mut stmt = conn.prepare_cached(sql).map_err(Error::storage)?;
            let columns = stmt.column_count();
            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    (0..columns)
                        .map(|i| row.get::<_, SqlValue>(i))
                        .collect::<rusqlite::Result<Row>>()
                })
                .map_err(Error::storage)?;
            rows.collect::<rusqlite::Result<Vec<Row>>>()
                .map_err(Error::storage)
        })
    }

    /// First column of the first row, `None` when the query returns nothing.
    pub fn scalar(
        &self,
        sql: &str,
        params: &[Param],
        txn: Option<&Transaction<'_>>,
    ) -> Result<Option<SqlValue>> {
        Ok(self
            .query(sql, params, txn)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }

    /// Execute DDL or other unparameterized statements.
    pub(crate) fn execute_batch(&self, sql: &str, txn: Option<&Transaction<'_>>) -> Result<()> {
        self.with_conn(txn, |conn| conn.execute_batch(sql).map_err(Error::storage))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            let mut registry = OPEN_DATABASES.lock();
            if registry
                .get(path)
                .map_or(false, |weak| weak.strong_count() == 0)
            {
                registry.remove(path);
            }
        }
    }
}

/// Apply configuration pragmas to a fresh connection
fn configure(conn: &Connection, config: &StoreConfig, on_disk: bool) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(Error::storage)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(Error::storage)?;
    conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
    conn.pragma_update(None, "case_sensitive_like", config.case_sensitive_like)
        .map_err(Error::storage)?;
    conn.pragma_update(None, "synchronous", config.synchronous.to_ascii_lowercase())
        .map_err(Error::storage)?;

    // In-memory databases only support the "memory" journal.
    if on_disk {
        let requested = config.journal_mode.to_ascii_lowercase();
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", &requested, |row| row.get(0))
            .map_err(Error::storage)?;
        debug!(target: "stratadoc::db", requested = %requested, active = %mode, "journal mode");
    }
    Ok(())
}

/// Best-effort canonical form of a database path, which may not exist yet
fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}
