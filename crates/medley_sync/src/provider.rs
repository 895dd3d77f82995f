//! Process-scoped library state: the shared connection and local schema.

use crate::error::SyncResult;
use medley_store::{ConnectionGuard, LockableConnection};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

const LIBRARY_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artists (
        id      INTEGER PRIMARY KEY,
        sync_id TEXT NOT NULL UNIQUE,
        name    TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS albums (
        id        INTEGER PRIMARY KEY,
        sync_id   TEXT NOT NULL UNIQUE,
        artist_id INTEGER NOT NULL REFERENCES artists (id),
        name      TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS songs (
        id       INTEGER PRIMARY KEY,
        sync_id  TEXT NOT NULL UNIQUE,
        album_id INTEGER NOT NULL REFERENCES albums (id),
        title    TEXT NOT NULL,
        track    INTEGER,
        duration INTEGER
    );
    CREATE TABLE IF NOT EXISTS playlists (
        id      INTEGER PRIMARY KEY,
        sync_id TEXT NOT NULL UNIQUE,
        name    TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS playlist_songs (
        id          INTEGER PRIMARY KEY,
        sync_id     TEXT NOT NULL UNIQUE,
        playlist_id INTEGER NOT NULL REFERENCES playlists (id),
        song_id     INTEGER NOT NULL REFERENCES songs (id),
        position    INTEGER
    );
";

/// Owner of the library's shared connection and its schema.
///
/// One `MetaProvider` is constructed at startup and torn down at shutdown;
/// every collaborator (scanner, request handlers, sync engine) receives the
/// shared [`LockableConnection`] from it rather than reaching for a global.
///
/// Request-serving callers lock, query through a
/// [`medley_store::RowCursor`], and drop the guard before doing any network
/// I/O.
pub struct MetaProvider {
    db: Arc<LockableConnection>,
}

impl MetaProvider {
    /// Opens (or creates) the library database at `path`.
    pub fn open(path: &Path) -> SyncResult<Self> {
        Self::from_connection(LockableConnection::open(path)?)
    }

    /// Opens an in-memory library, typical for tests.
    pub fn open_in_memory() -> SyncResult<Self> {
        Self::from_connection(LockableConnection::open_in_memory()?)
    }

    fn from_connection(db: LockableConnection) -> SyncResult<Self> {
        Self::init_schema(&db.lock())?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Creates the local tables if they do not exist.
    ///
    /// The caller must hold the connection guard; `from_connection` does,
    /// and scanner-style collaborators creating ad-hoc databases do too.
    pub fn init_schema(conn: &Connection) -> SyncResult<()> {
        conn.execute_batch(LIBRARY_SCHEMA)?;
        Ok(())
    }

    /// The shared connection handle.
    pub fn connection(&self) -> &Arc<LockableConnection> {
        &self.db
    }

    /// Acquires the connection guard, in FIFO arrival order.
    pub fn lock(&self) -> ConnectionGuard<'_> {
        self.db.lock()
    }

    /// Closes the library.
    ///
    /// Fails if another collaborator still holds a clone of the shared
    /// handle; teardown is explicit and must come last.
    pub fn close(self) -> SyncResult<()> {
        match Arc::try_unwrap(self.db) {
            Ok(db) => {
                db.close()?;
                Ok(())
            }
            Err(_) => Err(crate::error::SyncError::HandleShared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_created_and_idempotent() {
        let provider = MetaProvider::open_in_memory().unwrap();
        {
            let conn = provider.lock();
            MetaProvider::init_schema(&conn).unwrap();

            let tables: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('artists', 'albums', 'songs', 'playlists', 'playlist_songs')",
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(tables, 5);
        }
        provider.close().unwrap();
    }

    #[test]
    fn close_refuses_while_handle_is_shared() {
        let provider = MetaProvider::open_in_memory().unwrap();
        let held = Arc::clone(provider.connection());
        assert!(provider.close().is_err());
        drop(held);
    }
}
