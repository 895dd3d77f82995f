//! Entity kinds and change operations.

use crate::error::{SyncError, SyncResult};
use std::fmt;

/// The fixed set of synchronized entity kinds.
///
/// Kinds form a dependency partial order: albums reference artists, songs
/// reference albums, playlist memberships reference playlists and songs.
/// [`EntityKind::DEPENDENCY_ORDER`] lists them in an order that satisfies
/// every dependency; the sync engine always merges in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Recording artists.
    Artists,
    /// Albums; each references an artist.
    Albums,
    /// Songs; each references an album.
    Songs,
    /// Playlists.
    Playlists,
    /// Playlist memberships; each references a playlist and a song.
    PlaylistSongs,
}

impl EntityKind {
    /// All kinds, in an order that never merges a child before its parent.
    pub const DEPENDENCY_ORDER: [EntityKind; 5] = [
        EntityKind::Artists,
        EntityKind::Albums,
        EntityKind::Songs,
        EntityKind::Playlists,
        EntityKind::PlaylistSongs,
    ];

    /// The wire name used by change-set producers and the registry.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Artists => "artists",
            EntityKind::Albums => "albums",
            EntityKind::Songs => "songs",
            EntityKind::Playlists => "playlists",
            EntityKind::PlaylistSongs => "playlistSongs",
        }
    }

    /// Exact-name lookup. Unknown names are `None`, not an error, so
    /// callers can skip or report unsupported kinds gracefully.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "artists" => Some(EntityKind::Artists),
            "albums" => Some(EntityKind::Albums),
            "songs" => Some(EntityKind::Songs),
            "playlists" => Some(EntityKind::Playlists),
            "playlistSongs" => Some(EntityKind::PlaylistSongs),
            _ => None,
        }
    }

    /// The local table this kind merges into.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Artists => "artists",
            EntityKind::Albums => "albums",
            EntityKind::Songs => "songs",
            EntityKind::Playlists => "playlists",
            EntityKind::PlaylistSongs => "playlist_songs",
        }
    }

    /// The staging table holding this kind's pending changes.
    pub fn changes_table(&self) -> &'static str {
        match self {
            EntityKind::Artists => "artist_changes",
            EntityKind::Albums => "album_changes",
            EntityKind::Songs => "song_changes",
            EntityKind::Playlists => "playlist_changes",
            EntityKind::PlaylistSongs => "playlist_song_changes",
        }
    }

    /// The columns a staged change row for this kind may carry, besides
    /// the change op itself.
    pub fn staging_columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Artists => &["sync_id", "name"],
            EntityKind::Albums => &["sync_id", "artist", "name"],
            EntityKind::Songs => &["sync_id", "album", "title", "track", "duration"],
            EntityKind::Playlists => &["sync_id", "name"],
            EntityKind::PlaylistSongs => &["sync_id", "playlist", "song", "position"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a single change row reconciles against the local table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// Insert the entity if absent.
    Add,
    /// Update the local row matched by sync key.
    Modify,
    /// Remove the local row matched by sync key.
    Delete,
}

impl ChangeOp {
    /// The textual code stored in a staging table's `op` column.
    pub fn code(&self) -> &'static str {
        match self {
            ChangeOp::Add => "add",
            ChangeOp::Modify => "modify",
            ChangeOp::Delete => "delete",
        }
    }

    /// Parses a textual code read back from a change row.
    ///
    /// # Errors
    ///
    /// Unknown codes are [`SyncError::MalformedChange`]; a change set that
    /// cannot be interpreted must fail the merge, not be guessed at.
    pub fn parse(code: &str) -> SyncResult<Self> {
        match code {
            "add" => Ok(ChangeOp::Add),
            "modify" => Ok(ChangeOp::Modify),
            "delete" => Ok(ChangeOp::Delete),
            other => Err(SyncError::MalformedChange(format!(
                "unknown change op {other:?}"
            ))),
        }
    }
}
