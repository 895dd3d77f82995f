//! End-to-end sync session tests: full-library merges, lock handoff at
//! entity-kind boundaries, and cooperative cancellation.

use medley_store::LockableConnection;
use medley_sync::{
    ChangeOp, ChangeSet, EntityKind, MergerRegistry, MetaProvider, SyncEngine, SyncError,
    SyncResult, TableMerger,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Stages one add/modify/delete row per call, in the shape each kind's
/// standard merger reads.
fn stage_library(changes: &ChangeSet) {
    changes
        .stage(
            EntityKind::Artists,
            ChangeOp::Add,
            &[("sync_id", &"a-1"), ("name", &"Holst")],
        )
        .unwrap();
    changes
        .stage(
            EntityKind::Albums,
            ChangeOp::Add,
            &[
                ("sync_id", &"b-1"),
                ("artist", &"a-1"),
                ("name", &"The Planets"),
            ],
        )
        .unwrap();
    changes
        .stage(
            EntityKind::Songs,
            ChangeOp::Add,
            &[
                ("sync_id", &"s-1"),
                ("album", &"b-1"),
                ("title", &"Mars"),
                ("track", &1i64),
            ],
        )
        .unwrap();
    changes
        .stage(
            EntityKind::Playlists,
            ChangeOp::Add,
            &[("sync_id", &"p-1"), ("name", &"Favorites")],
        )
        .unwrap();
    changes
        .stage(
            EntityKind::PlaylistSongs,
            ChangeOp::Add,
            &[
                ("sync_id", &"m-1"),
                ("playlist", &"p-1"),
                ("song", &"s-1"),
                ("position", &0i64),
            ],
        )
        .unwrap();
}

fn table_count(provider: &MetaProvider, table: &str) -> i64 {
    provider
        .lock()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
}

#[test]
fn full_session_then_idempotent_rerun() {
    init_logging();
    let provider = MetaProvider::open_in_memory().unwrap();
    let engine = SyncEngine::new(
        Arc::clone(provider.connection()),
        MergerRegistry::with_standard_mergers(),
    );

    let changes = ChangeSet::in_memory().unwrap();
    stage_library(&changes);

    let report = engine.run(&changes).unwrap();
    assert_eq!(report.totals().inserted, 5);
    assert_eq!(report.totals().updated, 0);
    for table in ["artists", "albums", "songs", "playlists", "playlist_songs"] {
        assert_eq!(table_count(&provider, table), 1, "{table}");
    }

    // Re-running the identical session upserts by key: no duplicates.
    let report = engine.run(&changes).unwrap();
    assert_eq!(report.totals().inserted, 0);
    assert_eq!(report.totals().updated, 5);
    for table in ["artists", "albums", "songs", "playlists", "playlist_songs"] {
        assert_eq!(table_count(&provider, table), 1, "{table}");
    }
}

#[test]
fn on_disk_library_and_change_set_persist_across_reopen() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let library_path = dir.path().join("library.db");
    let changes_path = dir.path().join("changes.db");

    // Stage to disk, as the scanner does, then drop the handle.
    {
        let changes = ChangeSet::open(&changes_path).unwrap();
        stage_library(&changes);
    }

    // Reopen the staged changes and merge them into the on-disk library.
    {
        let provider = MetaProvider::open(&library_path).unwrap();
        let changes = ChangeSet::open(&changes_path).unwrap();
        assert_eq!(changes.pending(EntityKind::Artists).unwrap(), 1);

        let engine = SyncEngine::new(
            Arc::clone(provider.connection()),
            MergerRegistry::with_standard_mergers(),
        );
        let report = engine.run(&changes).unwrap();
        assert_eq!(report.totals().inserted, 5);

        drop(engine);
        provider.close().unwrap();
    }

    // The merged library is there after a fresh open.
    let provider = MetaProvider::open(&library_path).unwrap();
    for table in ["artists", "albums", "songs", "playlists", "playlist_songs"] {
        assert_eq!(table_count(&provider, table), 1, "{table}");
    }
}

#[test]
fn declared_order_succeeds_where_reversed_order_fails() {
    let changes = ChangeSet::in_memory().unwrap();
    changes
        .stage(
            EntityKind::Artists,
            ChangeOp::Add,
            &[("sync_id", &"a-1"), ("name", &"Holst")],
        )
        .unwrap();
    changes
        .stage(
            EntityKind::Albums,
            ChangeOp::Add,
            &[
                ("sync_id", &"b-1"),
                ("artist", &"a-1"),
                ("name", &"The Planets"),
            ],
        )
        .unwrap();

    let registry = MergerRegistry::with_standard_mergers();
    let merge_kind = |provider: &MetaProvider, kind: EntityKind| -> SyncResult<()> {
        let merger = registry.merger_for_kind(kind).unwrap();
        let conn = provider.lock();
        let mut stmt = changes.prepare_changes(kind)?;
        let mut cursor = medley_store::RowCursor::over(&mut stmt)?;
        merger.merge(&conn, &mut cursor)?;
        Ok(())
    };

    // Albums before artists: the album's artist key cannot resolve.
    let provider = MetaProvider::open_in_memory().unwrap();
    assert!(matches!(
        merge_kind(&provider, EntityKind::Albums),
        Err(SyncError::UnresolvedReference {
            kind: EntityKind::Albums,
            parent: EntityKind::Artists,
            ..
        })
    ));

    // Declared order: both merges land.
    let provider = MetaProvider::open_in_memory().unwrap();
    merge_kind(&provider, EntityKind::Artists).unwrap();
    merge_kind(&provider, EntityKind::Albums).unwrap();
    assert_eq!(table_count(&provider, "albums"), 1);
}

/// Wraps a merger so the test can rendezvous with the session mid-merge and
/// hold the merge open until a reader thread is queued on the connection.
struct GatedMerger {
    inner: Box<dyn TableMerger>,
    db: Arc<LockableConnection>,
    started: Arc<Barrier>,
}

impl TableMerger for GatedMerger {
    fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    fn merge(
        &self,
        conn: &rusqlite::Connection,
        changes: &mut medley_store::RowCursor<'_>,
    ) -> SyncResult<medley_sync::MergeCounts> {
        self.started.wait();
        let counts = self.inner.merge(conn, changes)?;
        // Keep this kind's merge open until the reader is waiting, so the
        // handoff below can only happen at the between-kind checkpoint.
        while self.db.waiters() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(counts)
    }
}

#[test]
fn reader_is_granted_the_lock_only_between_kinds() {
    init_logging();
    let provider = MetaProvider::open_in_memory().unwrap();
    let db = Arc::clone(provider.connection());
    let started = Arc::new(Barrier::new(2));

    let mut registry = MergerRegistry::with_standard_mergers();
    let inner = registry.unregister(EntityKind::Albums).unwrap();
    registry.register(Box::new(GatedMerger {
        inner,
        db: Arc::clone(&db),
        started: Arc::clone(&started),
    }));
    let engine = SyncEngine::new(Arc::clone(&db), registry);

    let changes = ChangeSet::in_memory().unwrap();
    changes
        .stage(
            EntityKind::Artists,
            ChangeOp::Add,
            &[("sync_id", &"a-1"), ("name", &"Holst")],
        )
        .unwrap();
    for album in ["b-1", "b-2", "b-3"] {
        changes
            .stage(
                EntityKind::Albums,
                ChangeOp::Add,
                &[("sync_id", &album), ("artist", &"a-1"), ("name", &album)],
            )
            .unwrap();
    }
    changes
        .stage(
            EntityKind::Songs,
            ChangeOp::Add,
            &[("sync_id", &"s-1"), ("album", &"b-1"), ("title", &"Mars")],
        )
        .unwrap();

    let reader = {
        let db = Arc::clone(&db);
        let started = Arc::clone(&started);
        thread::spawn(move || {
            started.wait();
            // Requested while the albums merge is running; granted only at
            // the next checkpoint.
            let conn = db.lock();
            let albums: i64 = conn
                .query_row("SELECT COUNT(*) FROM albums", [], |row| row.get(0))
                .unwrap();
            let songs: i64 = conn
                .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
                .unwrap();
            (albums, songs)
        })
    };

    let report = engine.run(&changes).unwrap();
    let (albums_seen, songs_seen) = reader.join().unwrap();

    // The reader saw the albums merge fully applied and the songs merge not
    // yet begun: the guard changed hands exactly at the kind boundary.
    assert_eq!(albums_seen, 3);
    assert_eq!(songs_seen, 0);
    assert!(report.yields >= 1);
    assert_eq!(report.totals().inserted, 5);
}

/// Holds the artists merge open until the main thread has requested
/// cancellation.
struct HoldUntilCancelled {
    inner: Box<dyn TableMerger>,
    merged: Arc<Barrier>,
    cancelled: Arc<Barrier>,
}

impl TableMerger for HoldUntilCancelled {
    fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    fn merge(
        &self,
        conn: &rusqlite::Connection,
        changes: &mut medley_store::RowCursor<'_>,
    ) -> SyncResult<medley_sync::MergeCounts> {
        let counts = self.inner.merge(conn, changes)?;
        self.merged.wait();
        self.cancelled.wait();
        Ok(counts)
    }
}

#[test]
fn cancellation_lets_the_current_kind_finish() {
    let provider = MetaProvider::open_in_memory().unwrap();
    let merged = Arc::new(Barrier::new(2));
    let cancelled = Arc::new(Barrier::new(2));

    let mut registry = MergerRegistry::with_standard_mergers();
    let inner = registry.unregister(EntityKind::Artists).unwrap();
    registry.register(Box::new(HoldUntilCancelled {
        inner,
        merged: Arc::clone(&merged),
        cancelled: Arc::clone(&cancelled),
    }));
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(provider.connection()),
        registry,
    ));

    let session = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let changes = ChangeSet::in_memory().unwrap();
            changes
                .stage(
                    EntityKind::Artists,
                    ChangeOp::Add,
                    &[("sync_id", &"a-1"), ("name", &"Holst")],
                )
                .unwrap();
            changes
                .stage(
                    EntityKind::Albums,
                    ChangeOp::Add,
                    &[
                        ("sync_id", &"b-1"),
                        ("artist", &"a-1"),
                        ("name", &"The Planets"),
                    ],
                )
                .unwrap();
            engine.run(&changes)
        })
    };

    merged.wait();
    engine.cancel();
    cancelled.wait();

    let result = session.join().unwrap();
    assert!(matches!(result, Err(SyncError::Cancelled)));

    // The kind that was merging ran to completion; later kinds never ran.
    assert_eq!(table_count(&provider, "artists"), 1);
    assert_eq!(table_count(&provider, "albums"), 0);
}
