use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::database::Database;

/// Owns the single write connection and serializes its users.
///
/// `create`, `update`, `delete` and `delete_path` each read the hierarchy,
/// write rows and fix up child counts. Whoever holds the guard holds the
/// write connection for the whole operation, so two writers never
/// interleave between those steps. Reads go through the
/// [`ReadPool`](crate::pool::ReadPool) and do not take it.
pub struct WriteGuard {
    db: Mutex<Database>,
}

impl WriteGuard {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Block until no other write is in progress.
    ///
    /// A panic inside a previous writer leaves the lock poisoned. Any open
    /// transaction was rolled back when it was dropped, so the connection is
    /// simply taken over.
    pub fn acquire(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn writers_do_not_overlap() {
        let guard = Arc::new(WriteGuard::new(Database::open_in_memory().unwrap()));
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let active = active.clone();
                let max_seen = max_seen.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let _held = guard.acquire();
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn survives_poisoning() {
        let guard = Arc::new(WriteGuard::new(Database::open_in_memory().unwrap()));
        let g = guard.clone();
        let _ = std::thread::spawn(move || {
            let _held = g.acquire();
            panic!("writer failed");
        })
        .join();

        let db = guard.acquire();
        let one: i64 = db.conn().query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }
}
