//! Relational schema for collections, documents and index metadata
//!
//! Created idempotently on every open. `user_version` records the layout so
//! a future change can tell old files apart.

use rusqlite::Connection;
use stratadoc_core::{Error, Result};
use tracing::debug;

/// Layout version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Collection registry
pub const COLLECTIONS_TABLE: &str = "sd_collections";
/// Document rows
pub const DOCUMENTS_TABLE: &str = "sd_documents";
/// Index metadata
pub const INDEXES_TABLE: &str = "sd_indexes";

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS sd_collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sd_documents (
    collection_id INTEGER NOT NULL REFERENCES sd_collections(id) ON DELETE CASCADE,
    doc_id TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (collection_id, doc_id)
);
CREATE TABLE IF NOT EXISTS sd_indexes (
    collection_id INTEGER NOT NULL REFERENCES sd_collections(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    native_name TEXT NOT NULL,
    field_path TEXT NOT NULL,
    is_unique INTEGER NOT NULL,
    is_sparse INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (collection_id, name)
);
"#;

/// Create the tables if absent and stamp the layout version.
///
/// # Errors
///
/// `Error::Config` if the file was written by a newer layout.
pub fn ensure(conn: &Connection) -> Result<()> {
    let found: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(Error::storage)?;
    if found > SCHEMA_VERSION {
        return Err(Error::Config(format!(
            "database schema version {} is newer than supported version {}",
            found, SCHEMA_VERSION
        )));
    }

    conn.execute_batch(DDL).map_err(Error::storage)?;
    if found < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(Error::storage)?;
        debug!(target: "stratadoc::db", from = found, to = SCHEMA_VERSION, "schema initialized");
    }
    Ok(())
}
