//! Artist merger.

use super::required;
use crate::entity::{ChangeOp, EntityKind};
use crate::error::SyncResult;
use crate::merger::{local_id, MergeCounts, TableMerger};
use medley_store::RowCursor;
use rusqlite::{params, Connection};

/// Merges artist changes into the `artists` table.
///
/// Artists are roots of the dependency order; their changes resolve no
/// parent references.
#[derive(Debug, Default)]
pub struct ArtistMerger;

impl TableMerger for ArtistMerger {
    fn kind(&self) -> EntityKind {
        EntityKind::Artists
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
                    let name: String = required(row, name_col, "artist name")?;
                    match local_id(conn, "artists", &key)? {
                        Some(id) => {
                            conn.execute(
                                "UPDATE artists SET name = ?1 WHERE id = ?2",
                                params![name, id],
                            )?;
                            counts.updated += 1;
                        }
                        None => {
                            conn.execute(
                                "INSERT INTO artists (sync_id, name) VALUES (?1, ?2)",
                                params![key, name],
                            )?;
                            counts.inserted += 1;
                        }
                    }
                }
                ChangeOp::Delete => {
                    counts.deleted +=
                        conn.execute("DELETE FROM artists WHERE sync_id = ?1", [&key])? as u64;
                }
            }
        }

        Ok(counts)
    }
}
