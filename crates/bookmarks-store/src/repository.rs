//! The [`Repository`] view over one connection.
//!
//! CRUD helpers live in per-entity files (`bookmarks.rs`, `favicons.rs`,
//! `files.rs`) as `impl Repository` blocks, the same way every table gets its
//! own module.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Typed access to the bookmark tables.
///
/// A repository is either in auto-commit mode (handed out by
/// [`Store::with_repository`](crate::Store::with_repository) and
/// [`Store::read`](crate::Store::read)) or bound to an active transaction
/// (handed out by a unit-of-work). Multi-statement writes in auto-commit mode
/// open their own short transaction so they never leave a partial result
/// behind. Writes are only possible on the connection owned by the
/// [`WriteGuard`](crate::WriteGuard), which serializes them.
pub struct Repository<'a> {
    conn: &'a Connection,
    in_tx: bool,
}

impl<'a> Repository<'a> {
    pub(crate) fn new(conn: &'a Connection, in_tx: bool) -> Self {
        Self { conn, in_tx }
    }

    /// `true` while bound to a unit-of-work.
    pub fn in_transaction(&self) -> bool {
        self.in_tx
    }

    /// Run `f` against a transactional view of this repository.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. A repository that
    /// is already inside a unit-of-work refuses to start another one.
    pub fn in_unit_of_work<T, E>(
        &self,
        f: impl FnOnce(&Repository<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        if self.in_tx {
            return Err(StoreError::TransactionActive.into());
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StoreError::from)?;
        let result = f(&Repository::new(&tx, true));

        match result {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    tracing::warn!(error = %rb, "rollback failed");
                }
                Err(e)
            }
        }
    }

    pub(crate) fn conn(&self) -> &Connection {
        self.conn
    }

    /// Run `f` so that all of its statements commit or none do.
    ///
    /// Inside a unit-of-work the enclosing transaction already provides that;
    /// otherwise a transaction is opened around `f`.
    pub(crate) fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.in_tx {
            return f();
        }

        let tx = self.conn.unchecked_transaction()?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }
}
