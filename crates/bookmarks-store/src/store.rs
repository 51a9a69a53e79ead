use std::path::Path;

use rusqlite::TransactionBehavior;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::guard::WriteGuard;
use crate::pool::ReadPool;
use crate::repository::Repository;

/// Read connections opened next to the write connection of a file database.
pub const READ_CONNECTIONS: usize = 4;

/// Shared handle to the bookmark database.
///
/// Writes run on the one connection owned by the [`WriteGuard`]; reads run on
/// a [`ReadPool`] of read-only connections and are not serialized behind
/// them. An in-memory database has no pool and reads share the write
/// connection.
///
/// `Store` is `Send + Sync`; wrap it in an `Arc` to share it between tasks.
/// Calls block the current thread, so async callers run them through
/// `tokio::task::spawn_blocking`.
pub struct Store {
    writer: WriteGuard,
    readers: ReadPool,
}

impl Store {
    pub fn new(db: Database) -> Self {
        let readers = match db.path() {
            Some(path) => ReadPool::open(&path, READ_CONNECTIONS).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not open read connections, reads share the writer");
                ReadPool::empty()
            }),
            None => ReadPool::empty(),
        };
        Self {
            writer: WriteGuard::new(db),
            readers,
        }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run read-only `f` on a pooled read connection.
    ///
    /// Sees the last committed state. Write statements fail.
    pub fn read<T, E>(
        &self,
        f: impl FnOnce(&Repository<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        match self.readers.acquire() {
            Some(conn) => f(&Repository::new(&conn, false)),
            None => self.with_repository(f),
        }
    }

    /// Run `f` against the repository on the write connection in auto-commit
    /// mode.
    pub fn with_repository<T, E>(
        &self,
        f: impl FnOnce(&Repository<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let db = self.writer.acquire();
        f(&Repository::new(db.conn(), false))
    }

    /// Run `f` inside one transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// The transaction is opened `IMMEDIATE` so that the write lock is taken
    /// up front rather than on the first write statement.
    pub fn in_unit_of_work<T, E>(
        &self,
        f: impl FnOnce(&Repository<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut db = self.writer.acquire();
        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let result = f(&Repository::new(&tx, true));

        match result {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("unit-of-work failed, rolling back");
                if let Err(rb) = tx.rollback() {
                    tracing::warn!(error = %rb, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bookmark, NodeType};

    #[test]
    fn unit_of_work_commits() {
        let store = Store::open_in_memory().unwrap();
        let created = store
            .in_unit_of_work(|repo| repo.create(Bookmark::new("u", "/", "A", NodeType::Folder)))
            .unwrap();

        let found = store
            .with_repository(|repo| repo.get_bookmark_by_id(&created.id, "u"))
            .unwrap();
        assert_eq!(found.display_name, "A");
    }

    #[test]
    fn unit_of_work_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<()> = store.in_unit_of_work(|repo| {
            repo.create(Bookmark::new("u", "/", "A", NodeType::Folder))?;
            Err(StoreError::InvalidInput("abort".into()))
        });
        assert!(result.is_err());

        let all = store.with_repository(|repo| repo.get_all_bookmarks("u")).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn nested_unit_of_work_is_refused() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<()> =
            store.in_unit_of_work(|repo| repo.in_unit_of_work(|_inner| Ok(())));
        assert!(matches!(result, Err(StoreError::TransactionActive)));
    }

    #[test]
    fn repository_can_start_a_unit_of_work() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_repository(|repo| {
                assert!(!repo.in_transaction());
                repo.in_unit_of_work(|inner| {
                    assert!(inner.in_transaction());
                    inner.create(Bookmark::new("u", "/", "A", NodeType::Folder))
                })
            })
            .unwrap();

        let paths = store.with_repository(|repo| repo.get_all_paths("u")).unwrap();
        assert_eq!(paths, vec!["/".to_string(), "/A".to_string()]);
    }

    #[test]
    fn concurrent_writers_keep_counts_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(Store::open_at(&dir.path().join("b.db")).unwrap());
        let folder = store
            .in_unit_of_work(|repo| repo.create(Bookmark::new("u", "/", "A", NodeType::Folder)))
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let node = Bookmark::new("u", "/A", format!("n{t}-{i}"), NodeType::Node)
                            .with_url("http://example.org");
                        store
                            .in_unit_of_work(|repo| repo.create(node))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let folder = store
            .with_repository(|repo| repo.get_bookmark_by_id(&folder.id, "u"))
            .unwrap();
        assert_eq!(folder.child_count, 40);
    }

    #[test]
    fn reads_do_not_wait_for_an_open_unit_of_work() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(&dir.path().join("b.db")).unwrap();
        store
            .in_unit_of_work(|repo| repo.create(Bookmark::new("u", "/", "A", NodeType::Folder)))
            .unwrap();

        let seen = store
            .in_unit_of_work(|repo| -> Result<Vec<String>> {
                repo.create(Bookmark::new("u", "/", "B", NodeType::Folder))?;
                // the writer is held by this thread; a reader on another
                // thread still completes and sees only committed rows
                let seen = std::thread::scope(|s| {
                    s.spawn(|| store.read(|r| r.get_all_paths("u")))
                        .join()
                        .unwrap()
                })?;
                Ok(seen)
            })
            .unwrap();
        assert_eq!(seen, vec!["/".to_string(), "/A".to_string()]);

        let after = store.read(|r| r.get_all_paths("u")).unwrap();
        assert_eq!(after, vec!["/".to_string(), "/A".to_string(), "/B".to_string()]);
    }

    #[test]
    fn read_connections_reject_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(&dir.path().join("b.db")).unwrap();
        let result = store.read(|repo| repo.create(Bookmark::new("u", "/", "A", NodeType::Folder)));
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
        assert!(store.read(|r| r.get_all_bookmarks("u")).unwrap().is_empty());
    }

    #[test]
    fn in_memory_reads_share_the_writer() {
        let store = Store::open_in_memory().unwrap();
        store
            .in_unit_of_work(|repo| repo.create(Bookmark::new("u", "/", "A", NodeType::Folder)))
            .unwrap();
        assert_eq!(store.read(|r| r.get_all_paths("u")).unwrap().len(), 2);
    }
}
