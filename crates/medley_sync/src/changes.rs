//! Change-set staging.
//!
//! Incoming changes (from the scanner or a remote sync source) are staged in
//! a private SQLite database, one table per entity kind, before a sync
//! session merges them into the library. The staging database has its own
//! connection; it is never touched through the shared, guarded one.

use crate::entity::{ChangeOp, EntityKind};
use crate::error::{SyncError, SyncResult};
use rusqlite::{Connection, Statement, ToSql};
use std::path::Path;

const STAGING_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artist_changes (
        op      TEXT NOT NULL,
        sync_id TEXT NOT NULL,
        name    TEXT
    );
    CREATE TABLE IF NOT EXISTS album_changes (
        op      TEXT NOT NULL,
        sync_id TEXT NOT NULL,
        artist  TEXT,
        name    TEXT
    );
    CREATE TABLE IF NOT EXISTS song_changes (
        op       TEXT NOT NULL,
        sync_id  TEXT NOT NULL,
        album    TEXT,
        title    TEXT,
        track    INTEGER,
        duration INTEGER
    );
    CREATE TABLE IF NOT EXISTS playlist_changes (
        op      TEXT NOT NULL,
        sync_id TEXT NOT NULL,
        name    TEXT
    );
    CREATE TABLE IF NOT EXISTS playlist_song_changes (
        op       TEXT NOT NULL,
        sync_id  TEXT NOT NULL,
        playlist TEXT,
        song     TEXT,
        position INTEGER
    );
";

/// A staged set of per-entity-kind changes awaiting a sync session.
///
/// Every staging row carries the change op, the entity's sync key and the
/// entity payload columns; delete rows carry only the key. Rows are read
/// back in staging order.
///
/// # Example
///
/// ```rust
/// use medley_sync::{ChangeOp, ChangeSet, EntityKind};
///
/// let changes = ChangeSet::in_memory()?;
/// changes.stage(
///     EntityKind::Artists,
///     ChangeOp::Add,
///     &[("sync_id", &"a-1"), ("name", &"Holst")],
/// )?;
/// assert_eq!(changes.pending(EntityKind::Artists)?, 1);
/// # Ok::<(), medley_sync::SyncError>(())
/// ```
pub struct ChangeSet {
    conn: Connection,
}

impl ChangeSet {
    /// Creates an in-memory change set (typical for a single sync session).
    pub fn in_memory() -> SyncResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens (or creates) a change set staged on disk, as the scanner does
    /// for large imports.
    pub fn open(path: &Path) -> SyncResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> SyncResult<Self> {
        conn.execute_batch(STAGING_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Stages one change row for `kind`.
    ///
    /// `values` lists staging-column name/value pairs; it must include the
    /// entity's `sync_id` and, for add/modify, the payload columns the
    /// kind's merger reads.
    ///
    /// # Errors
    ///
    /// A column name outside [`EntityKind::staging_columns`] is
    /// [`SyncError::MalformedChange`], so a producer typo fails here with
    /// the offending name rather than deep in the merge.
    ///
    /// [`SyncError::MalformedChange`]: crate::SyncError::MalformedChange
    pub fn stage(
        &self,
        kind: EntityKind,
        op: ChangeOp,
        values: &[(&str, &dyn ToSql)],
    ) -> SyncResult<()> {
        let mut columns = String::from("op");
        let mut placeholders = String::from("?1");
        for (i, (name, _)) in values.iter().enumerate() {
            if !kind.staging_columns().iter().any(|column| column == name) {
                return Err(SyncError::MalformedChange(format!(
                    "unknown staging column {name:?} for kind {kind}"
                )));
            }
            columns.push_str(", ");
            columns.push_str(name);
            placeholders.push_str(&format!(", ?{}", i + 2));
        }

        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            kind.changes_table()
        );

        let op_code = op.code();
        let mut params: Vec<&dyn ToSql> = vec![&op_code];
        params.extend(values.iter().map(|(_, value)| *value));
        self.conn.execute(&sql, params.as_slice())?;
        Ok(())
    }

    /// Prepares the statement that reads `kind`'s staged changes back in
    /// staging order. Pair it with [`medley_store::RowCursor::over`]:
    ///
    /// ```rust,ignore
    /// let mut stmt = changes.prepare_changes(EntityKind::Artists)?;
    /// let mut cursor = RowCursor::over(&mut stmt)?;
    /// ```
    pub fn prepare_changes(&self, kind: EntityKind) -> SyncResult<Statement<'_>> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", kind.changes_table());
        Ok(self.conn.prepare(&sql)?)
    }

    /// Returns how many changes are staged for `kind`.
    pub fn pending(&self, kind: EntityKind) -> SyncResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.changes_table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Discards every staged change, keeping the staging tables.
    pub fn clear(&self) -> SyncResult<()> {
        for kind in EntityKind::DEPENDENCY_ORDER {
            let sql = format!("DELETE FROM {}", kind.changes_table());
            self.conn.execute(&sql, [])?;
        }
        Ok(())
    }
}
