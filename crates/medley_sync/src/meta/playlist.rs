//! Playlist merger.

use super::required;
use crate::entity::{ChangeOp, EntityKind};
use crate::error::SyncResult;
use crate::merger::{local_id, MergeCounts, TableMerger};
use medley_store::RowCursor;
use rusqlite::{params, Connection};

/// Merges playlist changes into the `playlists` table.
#[derive(Debug, Default)]
pub struct PlaylistMerger;

impl TableMerger for PlaylistMerger {
    fn kind(&self) -> EntityKind {
        EntityKind::Playlists
    }

    fn merge(&self, conn: &Connection, changes: &mut RowCursor<'_>) -> SyncResult<MergeCounts> {
        let op_col = changes.column_index("op")?;
        let key_col = changes.column_index("sync_id")?;
        let name_col = changes.column_index("name")?;

        let mut counts = MergeCounts::default();
        while let Some(row) = changes.next()? {
            let op = ChangeOp::parse(&row.get::<_, String>(op_col)?)?;
            let key: String = row.get(key_col)?;

            match op {
                ChangeOp::Add | ChangeOp::Modify => {
                    let name: String = required(row, name_col, "playlist name")?;
                    match local_id(conn, "playlists", &key)? {
                        Some(id) => {
                            conn.execute(
                                "UPDATE playlists SET name = ?1 WHERE id = ?2",
                                params![name, id],
                            )?;
                            counts.updated += 1;
                        }
                        None => {
                            conn.execute(
                                "INSERT INTO playlists (sync_id, name) VALUES (?1, ?2)",
                                params![key, name],
                            )?;
                            counts.inserted += 1;
                        }
                    }
                }
                ChangeOp::Delete => {
                    counts.deleted +=
                        conn.execute("DELETE FROM playlists WHERE sync_id = ?1", [&key])? as u64;
                }
            }
        }

        Ok(counts)
    }
}
