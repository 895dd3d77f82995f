//! Album merger.

use super::required;
use crate::entity::{ChangeOp, EntityKind};
use crate::error::SyncResult;
use crate::merger::{local_id, resolve_parent, MergeCounts, TableMerger};
use medley_store::RowCursor;
use rusqlite::{params, Connection};

/// Merges album changes into the `albums` table.
///
/// Add and modify changes carry the owning artist's sync key in the
/// `artist` column; it must already resolve locally, which the engine's
/// artists-before-albums ordering guarantees.
#[derive(Debug, Default)]
pub struct AlbumMerger;

impl TableMerger for AlbumMerger {
    fn kind(&self) -> EntityKind {
        EntityKind::Albums
    }

    fn merge(&self, conn: &Connection, changes: &mut RowCursor<'_>) -> SyncResult<MergeCounts> {
        let op_col = changes.column_index("op")?;
        let key_col = changes.column_index("sync_id")?;
        let artist_col = changes.column_index("artist")?;
        let name_col = changes.column_index("name")?;

        let mut counts = MergeCounts::default();
        while let Some(row) = changes.next()? {
            let op = ChangeOp::parse(&row.get::<_, String>(op_col)?)?;
            let key: String = row.get(key_col)?;

            match op {
                ChangeOp::Add | ChangeOp::Modify => {
                    let artist_key: String = required(row, artist_col, "album artist")?;
                    let name: String = required(row, name_col, "album name")?;
                    let artist_id =
                        resolve_parent(conn, EntityKind::Albums, EntityKind::Artists, &artist_key)?;

                    match local_id(conn, "albums", &key)? {
                        Some(id) => {
                            conn.execute(
                                "UPDATE albums SET artist_id = ?1, name = ?2 WHERE id = ?3",
                                params![artist_id, name, id],
                            )?;
                            counts.updated += 1;
                        }
                        None => {
                            conn.execute(
                                "INSERT INTO albums (sync_id, artist_id, name) VALUES (?1, ?2, ?3)",
                                params![key, artist_id, name],
                            )?;
                            counts.inserted += 1;
                        }
                    }
                }
                ChangeOp::Delete => {
                    counts.deleted +=
                        conn.execute("DELETE FROM albums WHERE sync_id = ?1", [&key])? as u64;
                }
            }
        }

        Ok(counts)
    }
}
