//! The merger registry.

use crate::entity::EntityKind;
use crate::merger::TableMerger;
use crate::meta::{AlbumMerger, ArtistMerger, PlaylistMerger, PlaylistSongMerger, SongMerger};
use std::collections::HashMap;

/// Maps entity kinds to their [`TableMerger`] instances.
///
/// Built once per process (or per sync session) with explicit construction;
/// the mergers it hands out are shared, stateless protocol objects. Unknown
/// kind names resolve to `None` so the engine can skip unsupported kinds
/// instead of failing the whole session.
pub struct MergerRegistry {
    mergers: HashMap<EntityKind, Box<dyn TableMerger>>,
}

impl MergerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            mergers: HashMap::new(),
        }
    }

    /// Creates a registry with the standard merger for every entity kind.
    pub fn with_standard_mergers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ArtistMerger));
        registry.register(Box::new(AlbumMerger));
        registry.register(Box::new(SongMerger));
        registry.register(Box::new(PlaylistMerger));
        registry.register(Box::new(PlaylistSongMerger));
        registry
    }

    /// Registers (or replaces) the merger for its declared kind.
    pub fn register(&mut self, merger: Box<dyn TableMerger>) {
        self.mergers.insert(merger.kind(), merger);
    }

    /// Removes the merger for `kind`, returning it if present.
    pub fn unregister(&mut self, kind: EntityKind) -> Option<Box<dyn TableMerger>> {
        self.mergers.remove(&kind)
    }

    /// Looks up a merger by wire name. Unknown names are `None`.
    pub fn merger_for(&self, name: &str) -> Option<&dyn TableMerger> {
        self.merger_for_kind(EntityKind::from_name(name)?)
    }

    /// Looks up a merger by kind.
    pub fn merger_for_kind(&self, kind: EntityKind) -> Option<&dyn TableMerger> {
        self.mergers.get(&kind).map(|merger| merger.as_ref())
    }
}

impl Default for MergerRegistry {
    fn default() -> Self {
        Self::with_standard_mergers()
    }
}
