//! The table-merger contract.

use crate::entity::EntityKind;
use crate::error::{SyncError, SyncResult};
use medley_store::RowCursor;
use rusqlite::{Connection, OptionalExtension};

/// Rows affected by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Rows inserted.
    pub inserted: u64,
    /// Rows updated in place.
    pub updated: u64,
    /// Rows deleted.
    pub deleted: u64,
}

impl MergeCounts {
    /// Total rows touched.
    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.deleted
    }

    /// Accumulates another merge's counts into this one.
    pub fn absorb(&mut self, other: MergeCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

/// Applies one entity kind's change cursor to its local table.
///
/// A merger is a stateless protocol object. It receives its connection
/// context explicitly at merge time; it never owns the connection and never
/// acquires or releases the fair guard — the calling sync engine holds the
/// guard for the full duration of [`TableMerger::merge`].
///
/// Semantics per change row: an addition inserts the entity if absent, a
/// modification updates the local row matched by its sync key, a deletion
/// removes that row. Additions and modifications both resolve by key first
/// (upsert-by-key), so re-merging an identical change set is idempotent.
pub trait TableMerger: Send + Sync {
    /// The entity kind this merger is bound to.
    fn kind(&self) -> EntityKind;

    /// Consumes `changes` and reconciles each row against the local table.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnresolvedReference`] when a change references a foreign
    /// entity whose key is not present locally — this indicates the caller
    /// violated the dependency-ordering contract (or the change set is
    /// malformed) and must be surfaced, never dropped.
    fn merge(&self, conn: &Connection, changes: &mut RowCursor<'_>) -> SyncResult<MergeCounts>;
}

/// Looks up the surrogate key of the row in `table` with the given sync key.
pub(crate) fn local_id(
    conn: &Connection,
    table: &str,
    sync_id: &str,
) -> SyncResult<Option<i64>> {
    let sql = format!("SELECT id FROM {table} WHERE sync_id = ?1");
    let id = conn
        .query_row(&sql, [sync_id], |row| row.get(0))
        .optional()?;
    Ok(id)
}

/// Resolves a parent reference, raising the ordering violation if absent.
pub(crate) fn resolve_parent(
    conn: &Connection,
    kind: EntityKind,
    parent: EntityKind,
    reference: &str,
) -> SyncResult<i64> {
    local_id(conn, parent.table(), reference)?.ok_or_else(|| SyncError::UnresolvedReference {
        kind,
        parent,
        reference: reference.into(),
    })
}
