//! Playlist-membership merger.

use super::required;
use crate::entity::{ChangeOp, EntityKind};
use crate::error::SyncResult;
use crate::merger::{local_id, resolve_parent, MergeCounts, TableMerger};
use medley_store::RowCursor;
use rusqlite::{params, Connection};

/// Merges playlist-membership changes into the `playlist_songs` table.
///
/// Memberships are the deepest kind in the dependency order: each change
/// resolves both its playlist and its song by sync key.
#[derive(Debug, Default)]
pub struct PlaylistSongMerger;

impl TableMerger for PlaylistSongMerger {
    fn kind(&self) -> EntityKind {
        EntityKind::PlaylistSongs
    }

    fn merge(&self, conn: &Connection, changes: &mut RowCursor<'_>) -> SyncResult<MergeCounts> {
        let op_col = changes.column_index("op")?;
        let key_col = changes.column_index("sync_id")?;
        let playlist_col = changes.column_index("playlist")?;
        let song_col = changes.column_index("song")?;
        let position_col = changes.column_index("position")?;

        let mut counts = MergeCounts::default();
        while let Some(row) = changes.next()? {
            let op = ChangeOp::parse(&row.get::<_, String>(op_col)?)?;
            let key: String = row.get(key_col)?;

            match op {
                ChangeOp::Add | ChangeOp::Modify => {
                    let playlist_key: String = required(row, playlist_col, "membership playlist")?;
                    let song_key: String = required(row, song_col, "membership song")?;
                    let position: Option<i64> = row.get(position_col)?;

                    let playlist_id = resolve_parent(
                        conn,
                        EntityKind::PlaylistSongs,
                        EntityKind::Playlists,
                        &playlist_key,
                    )?;
                    let song_id = resolve_parent(
                        conn,
                        EntityKind::PlaylistSongs,
                        EntityKind::Songs,
                        &song_key,
                    )?;

                    match local_id(conn, "playlist_songs", &key)? {
                        Some(id) => {
                            conn.execute(
                                "UPDATE playlist_songs
                                 SET playlist_id = ?1, song_id = ?2, position = ?3
                                 WHERE id = ?4",
                                params![playlist_id, song_id, position, id],
                            )?;
                            counts.updated += 1;
                        }
                        None => {
                            conn.execute(
                                "INSERT INTO playlist_songs (sync_id, playlist_id, song_id, position)
                                 VALUES (?1, ?2, ?3, ?4)",
                                params![key, playlist_id, song_id, position],
                            )?;
                            counts.inserted += 1;
                        }
                    }
                }
                ChangeOp::Delete => {
                    counts.deleted += conn
                        .execute("DELETE FROM playlist_songs WHERE sync_id = ?1", [&key])?
                        as u64;
                }
            }
        }

        Ok(counts)
    }
}
