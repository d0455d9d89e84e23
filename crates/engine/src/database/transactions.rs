//! Savepoint-based transactions
//!
//! A [`Transaction`] holds the connection guard for its whole lifetime, so
//! other threads queue behind it while the owning thread keeps issuing
//! operations (the lock is re-entrant). Each transaction is one SQLite
//! `SAVEPOINT`, which makes them nest: beginning a transaction while another
//! is open on the same thread opens an inner savepoint.
//!
//! Dropping a transaction that was neither committed nor rolled back rolls
//! it back.

use super::Database;
use parking_lot::ReentrantMutexGuard;
use rusqlite::Connection;
use std::sync::atomic::Ordering;
use stratadoc_core::{Error, Result};
use tracing::{trace, warn};

/// An open savepoint on a [`Database`]
pub struct Transaction<'db> {
    db: &'db Database,
    conn: ReentrantMutexGuard<'db, Connection>,
    savepoint: String,
    finished: bool,
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("savepoint", &self.savepoint)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<'db> Transaction<'db> {
    pub(super) fn start(db: &'db Database, conn: ReentrantMutexGuard<'db, Connection>) -> Result<Self> {
        let seq = db.savepoint_seq.fetch_add(1, Ordering::Relaxed);
        let savepoint = format!("sd_sp_{}", seq);
        conn.execute_batch(&format!("SAVEPOINT {}", savepoint))
            .map_err(Error::storage)?;
        trace!(target: "stratadoc::txn", %savepoint, "begin");
        Ok(Transaction {
            db,
            conn,
            savepoint,
            finished: false,
        })
    }

    /// The database this transaction belongs to
    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Savepoint name, unique per database instance
    pub fn name(&self) -> &str {
        &self.savepoint
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Make the transaction's writes permanent (or visible to the enclosing
    /// transaction when nested).
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {}", self.savepoint))
            .map_err(Error::storage)?;
        trace!(target: "stratadoc::txn", savepoint = %self.savepoint, "commit");
        Ok(())
    }

    /// Discard every write made since the transaction began.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.undo()
    }

    fn undo(&self) -> Result<()> {
        // The catalog memo may hold ids of collections created inside the
        // discarded savepoint.
        self.db.collection_ids.clear();
        self.conn
            .execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {sp}; RELEASE SAVEPOINT {sp}",
                sp = self.savepoint
            ))
            .map_err(Error::storage)?;
        trace!(target: "stratadoc::txn", savepoint = %self.savepoint, "rollback");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.undo() {
                warn!(target: "stratadoc::txn", savepoint = %self.savepoint, error = %e, "rollback on drop failed");
            }
        }
    }
}

impl Database {
    /// Begin a transaction.
    ///
    /// Blocks while another thread holds a transaction. On the thread that
    /// already holds one, this opens a nested savepoint instead.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Transaction::start(self, self.conn.lock())
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err` and
    /// hands the closure's error back unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use stratadoc_engine::Database;
    /// use serde_json::json;
    ///
    /// let db = Database::open_in_memory().unwrap();
    /// let people = db.collection::<serde_json::Value>("people").unwrap();
    /// let result: stratadoc_core::Result<()> = db.transaction(|txn| {
    ///     people.insert(&mut json!({"name": "Ada"}), Some(txn))?;
    ///     Err(stratadoc_core::Error::invalid_argument("abort"))
    /// });
    /// assert!(result.is_err());
    /// assert_eq!(people.count_all(None).unwrap(), 0);
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let txn = self.begin()?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback() {
                    warn!(target: "stratadoc::txn", error = %rollback_err, "rollback after failed transaction failed");
                }
                Err(e)
            }
        }
    }

    /// Run `f` atomically, nested under `txn` when one is given.
    pub(crate) fn atomic<F, T>(&self, txn: Option<&Transaction<'_>>, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        if let Some(outer) = txn {
            debug_assert!(std::ptr::eq(outer.database(), self));
        }
        self.transaction(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::Database;
    use stratadoc_query::Param;

    fn count(db: &Database) -> i64 {
        let value = db
            .scalar("SELECT COUNT(*) FROM sd_collections", &[], None)
            .unwrap();
        crate::database::sql::as_i64(&value.unwrap()).unwrap()
    }

    fn add(db: &Database, name: &str, txn: Option<&super::Transaction<'_>>) {
        db.execute(
            "INSERT INTO sd_collections (name, created_at) VALUES (?, 'now')",
            &[Param::Text(name.into())],
            txn,
        )
        .unwrap();
    }

    #[test]
    fn test_commit_persists() {
        let db = Database::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        add(&db, "a", Some(&txn));
        txn.commit().unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_rollback_discards() {
        let db = Database::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        add(&db, "a", Some(&txn));
        txn.rollback().unwrap();
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_drop_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        {
            let txn = db.begin().unwrap();
            add(&db, "a", Some(&txn));
        }
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_nested_inner_rollback_keeps_outer() {
        let db = Database::open_in_memory().unwrap();
        let outer = db.begin().unwrap();
        add(&db, "a", Some(&outer));
        {
            let inner = db.begin().unwrap();
            add(&db, "b", Some(&inner));
            inner.rollback().unwrap();
        }
        outer.commit().unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_closure_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        let n = db
            .transaction(|txn| {
                add(&db, "a", Some(txn));
                add(&db, "b", Some(txn));
                Ok(2)
            })
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(count(&db), 2);
    }

    #[test]
    fn test_closure_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: stratadoc_core::Result<()> = db.transaction(|txn| {
            add(&db, "a", Some(txn));
            Err(stratadoc_core::Error::invalid_argument("nope"))
        });
        assert!(matches!(
            result,
            Err(stratadoc_core::Error::InvalidArgument(_))
        ));
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_savepoint_names_unique() {
        let db = Database::open_in_memory().unwrap();
        let a = db.begin().unwrap();
        let a_name = a.name().to_string();
        a.commit().unwrap();
        let b = db.begin().unwrap();
        assert_ne!(a_name, b.name());
    }
}
