use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use rusqlite::Connection;

use crate::database::Database;
use crate::error::Result;

/// A fixed set of read-only connections to a WAL database.
///
/// Readers see the last committed state and never wait for an open
/// unit-of-work on the write connection.
pub struct ReadPool {
    conns: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    pub fn open(path: &Path, size: usize) -> Result<Self> {
        let conns = (0..size.max(1))
            .map(|_| Database::open_reader(path).map(Mutex::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            conns,
            next: AtomicUsize::new(0),
        })
    }

    /// A pool without connections; callers fall back to the write connection.
    pub fn empty() -> Self {
        Self {
            conns: Vec::new(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// An idle connection if there is one, otherwise wait for the next in turn.
    pub fn acquire(&self) -> Option<MutexGuard<'_, Connection>> {
        if self.conns.is_empty() {
            return None;
        }
        for conn in &self.conns {
            match conn.try_lock() {
                Ok(held) => return Some(held),
                Err(TryLockError::Poisoned(p)) => return Some(p.into_inner()),
                Err(TryLockError::WouldBlock) => {}
            }
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.conns.len();
        Some(self.conns[i].lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_hands_out_nothing() {
        let pool = ReadPool::empty();
        assert!(pool.is_empty());
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn busy_connections_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.db");
        let _db = Database::open_at(&path).unwrap();

        let pool = ReadPool::open(&path, 2).unwrap();
        assert_eq!(pool.len(), 2);

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert!(!std::ptr::eq(&*first, &*second));
    }

    #[test]
    fn readers_cannot_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.db");
        let _db = Database::open_at(&path).unwrap();

        let pool = ReadPool::open(&path, 1).unwrap();
        let conn = pool.acquire().unwrap();
        assert!(conn.execute("DELETE FROM BOOKMARKS", []).is_err());
    }
}
