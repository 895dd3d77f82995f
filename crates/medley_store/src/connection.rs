//! The shared, lockable database connection handle.

use crate::error::StoreResult;
use crate::lock::{FairMutex, FairMutexGuard};
use rusqlite::Connection;
use std::path::Path;

/// Exclusive access to the shared connection, released on drop.
pub type ConnectionGuard<'a> = FairMutexGuard<'a, Connection>;

/// The single physical database connection, brokered by a fair lock.
///
/// One `LockableConnection` exists per process. It is constructed explicitly
/// at startup, shared (via `Arc`) by the scanner, the request-serving layer
/// and the sync engine, and torn down explicitly at shutdown with
/// [`LockableConnection::close`].
///
/// None of the wrapped connection's methods are implicitly locked: a caller
/// acquires the guard with [`LockableConnection::lock`], issues statements
/// through the guard, and releases by dropping it. Issuing statements on a
/// connection obtained outside the guard is undefined behavior the design
/// assumes callers never trigger.
///
/// Callers serving network requests must not hold the guard across a
/// network wait; fetch what the response needs, drop the guard, then write
/// the response.
///
/// # Example
///
/// ```rust
/// use medley_store::LockableConnection;
///
/// let db = LockableConnection::open_in_memory()?;
/// {
///     let conn = db.lock();
///     conn.execute_batch("CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT)")?;
/// } // guard dropped, next waiter admitted
/// db.close()?;
/// # Ok::<(), medley_store::StoreError>(())
/// ```
#[derive(Debug)]
pub struct LockableConnection {
    inner: FairMutex<Connection>,
}

impl LockableConnection {
    /// Wraps an already-open connection.
    pub fn new(connection: Connection) -> Self {
        Self {
            inner: FairMutex::new(connection),
        }
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Blocks until this thread holds the connection, in FIFO arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds the guard; the lock is not
    /// reentrant.
    pub fn lock(&self) -> ConnectionGuard<'_> {
        self.inner.lock()
    }

    /// Returns the number of threads currently waiting for the connection.
    pub fn waiters(&self) -> usize {
        self.inner.waiters()
    }

    /// Closes the connection, consuming the handle.
    ///
    /// Shutdown path: by the time this is called no other user of the handle
    /// may remain (ownership of `self` enforces that for `Arc`-shared
    /// handles via `Arc::try_unwrap`).
    pub fn close(self) -> StoreResult<()> {
        self.inner.into_inner().close().map_err(|(_, err)| err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn statements_run_through_the_guard() {
        let db = LockableConnection::open_in_memory().unwrap();
        {
            let conn = db.lock();
            conn.execute_batch(
                "CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
                 INSERT INTO artists (name) VALUES ('Holst');",
            )
            .unwrap();
        }

        let conn = db.lock();
        let name: String = conn
            .query_row("SELECT name FROM artists", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Holst");
    }

    #[test]
    fn close_tears_down_cleanly() {
        let db = LockableConnection::open_in_memory().unwrap();
        db.lock().execute_batch("CREATE TABLE t (x)").unwrap();
        db.close().unwrap();
    }

    #[test]
    fn open_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.db");

        let db = LockableConnection::open(&path).unwrap();
        db.lock()
            .execute_batch("CREATE TABLE t (x); INSERT INTO t VALUES (7);")
            .unwrap();
        db.close().unwrap();

        let db = LockableConnection::open(&path).unwrap();
        let x: i64 = db
            .lock()
            .query_row("SELECT x FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(x, 7);
        db.close().unwrap();
    }

    #[test]
    fn shared_handle_serializes_writers() {
        let db = Arc::new(LockableConnection::open_in_memory().unwrap());
        db.lock()
            .execute_batch("CREATE TABLE counter (n INTEGER); INSERT INTO counter VALUES (0);")
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = Arc::clone(&db);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    let conn = db.lock();
                    conn.execute("UPDATE counter SET n = n + 1", []).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let n: i64 = db
            .lock()
            .query_row("SELECT n FROM counter", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 100);
    }
}
