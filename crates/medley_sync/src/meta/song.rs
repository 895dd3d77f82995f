//! Song merger.

use super::required;
use crate::entity::{ChangeOp, EntityKind};
use crate::error::SyncResult;
use crate::merger::{local_id, resolve_parent, MergeCounts, TableMerger};
use medley_store::RowCursor;
use rusqlite::{params, Connection};

/// Merges song changes into the `songs` table.
///
/// Add and modify changes carry the owning album's sync key in the `album`
/// column, plus optional `track` and `duration` payload fields.
#[derive(Debug, Default)]
pub struct SongMerger;

impl TableMerger for SongMerger {
    fn kind(&self) -> EntityKind {
        EntityKind::Songs
    }

    fn merge(&self, conn: &Connection, changes: &mut RowCursor<'_>) -> SyncResult<MergeCounts> {
        let op_col = changes.column_index("op")?;
        let key_col = changes.column_index("sync_id")?;
        let album_col = changes.column_index("album")?;
        let title_col = changes.column_index("title")?;
        let track_col = changes.column_index("track")?;
        let duration_col = changes.column_index("duration")?;

        let mut counts = MergeCounts::default();
        while let Some(row) = changes.next()? {
            let op = ChangeOp::parse(&row.get::<_, String>(op_col)?)?;
            let key: String = row.get(key_col)?;

            match op {
                ChangeOp::Add | ChangeOp::Modify => {
                    let album_key: String = required(row, album_col, "song album")?;
                    let title: String = required(row, title_col, "song title")?;
                    let track: Option<i64> = row.get(track_col)?;
                    let duration: Option<i64> = row.get(duration_col)?;
                    let album_id =
                        resolve_parent(conn, EntityKind::Songs, EntityKind::Albums, &album_key)?;

                    match local_id(conn, "songs", &key)? {
                        Some(id) => {
                            conn.execute(
                                "UPDATE songs
                                 SET album_id = ?1, title = ?2, track = ?3, duration = ?4
                                 WHERE id = ?5",
                                params![album_id, title, track, duration, id],
                            )?;
                            counts.updated += 1;
                        }
                        None => {
                            conn.execute(
                                "INSERT INTO songs (sync_id, album_id, title, track, duration)
                                 VALUES (?1, ?2, ?3, ?4, ?5)",
                                params![key, album_id, title, track, duration],
                            )?;
                            counts.inserted += 1;
                        }
                    }
                }
                ChangeOp::Delete => {
                    counts.deleted +=
                        conn.execute("DELETE FROM songs WHERE sync_id = ?1", [&key])? as u64;
                }
            }
        }

        Ok(counts)
    }
}
