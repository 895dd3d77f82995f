//! Standard mergers for the library's entity kinds.
//!
//! Each merger is bound to one local table and applies its kind's change
//! cursor under the semantics of [`crate::merger::TableMerger`]. Parent
//! references (album → artist, song → album, membership → playlist/song)
//! are carried as the parent's sync key and resolved to local surrogate
//! keys at merge time; a key that fails to resolve is an ordering
//! violation, not a skippable row.

mod album;
mod artist;
mod playlist;
mod playlist_song;
mod song;

pub use album::AlbumMerger;
pub use artist::ArtistMerger;
pub use playlist::PlaylistMerger;
pub use playlist_song::PlaylistSongMerger;
pub use song::SongMerger;

use crate::error::{SyncError, SyncResult};
use rusqlite::types::FromSql;
use rusqlite::Row;

/// Reads a payload column that add/modify changes are required to carry.
fn required<T: FromSql>(row: &Row<'_>, col: usize, what: &str) -> SyncResult<T> {
    row.get::<_, Option<T>>(col)?
        .ok_or_else(|| SyncError::MalformedChange(format!("{what} is missing")))
}
