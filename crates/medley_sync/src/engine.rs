//! The sync engine: dependency-ordered merge sessions over the shared
//! connection.

use crate::changes::ChangeSet;
use crate::entity::EntityKind;
use crate::error::{SyncError, SyncResult};
use crate::merger::MergeCounts;
use crate::registry::MergerRegistry;
use medley_store::{ConnectionGuard, LockableConnection, RowCursor};
use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No session is running.
    Idle,
    /// A session has been claimed and is queued for the connection guard.
    Acquiring,
    /// A session holds the connection guard, between entity kinds.
    Locked,
    /// A session is merging one entity kind.
    Merging,
}

impl SyncState {
    /// A short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Acquiring => "acquiring",
            SyncState::Locked => "locked",
            SyncState::Merging => "merging",
        }
    }
}

/// Cumulative statistics across sync sessions.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Sessions that ran to completion.
    pub sessions_completed: u64,
    /// Total rows inserted by completed sessions.
    pub rows_inserted: u64,
    /// Total rows updated by completed sessions.
    pub rows_updated: u64,
    /// Total rows deleted by completed sessions.
    pub rows_deleted: u64,
    /// Times a session ceded the connection at a checkpoint.
    pub yields: u64,
    /// The most recent session failure, if any.
    pub last_error: Option<String>,
}

/// The outcome of one sync session.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Per-kind merge counts, in the order the kinds were processed.
    pub merged: Vec<(EntityKind, MergeCounts)>,
    /// Kinds skipped because no merger was registered for them.
    pub skipped: Vec<EntityKind>,
    /// Times the session ceded the connection to waiting threads.
    pub yields: u64,
    /// Wall-clock duration of the session.
    pub duration: Duration,
}

impl SyncReport {
    /// Sums the per-kind counts.
    pub fn totals(&self) -> MergeCounts {
        let mut totals = MergeCounts::default();
        for (_, counts) in &self.merged {
            totals.absorb(*counts);
        }
        totals
    }
}

/// Runs sync sessions: for each entity kind, in dependency order, fetches
/// the kind's merger from the registry and applies the staged changes under
/// the fair connection guard.
///
/// # Session shape
///
/// `Idle → Acquiring → Locked → (Merging per kind) → Idle`. The session is
/// claimed first, then queues for the guard; `Locked` is reported only once
/// the guard is actually held. The guard is acquired once
/// at session start and released at session end — including every error
/// path — with a [`FairMutexGuard::yield_if_contended`] checkpoint between
/// entity kinds. Another thread is therefore never granted the connection
/// in the middle of one kind's merge, and never waits longer than one
/// kind's merge for its turn.
///
/// # Ordering guarantee
///
/// Kinds merge strictly in [`EntityKind::DEPENDENCY_ORDER`] and never
/// interleave. Mergers rely on this: a child kind's parent references must
/// already have been merged.
///
/// # Cancellation
///
/// [`SyncEngine::cancel`] may be called from any thread. It is honored only
/// at the between-kind checkpoints, so cancellation latency is bounded by
/// one kind's merge, and no kind is ever left half-applied.
///
/// # Failure policy
///
/// The first failing merge aborts the session and surfaces the error.
/// Kinds already merged stay applied; there is no transaction layer to
/// roll them back. Callers own retry policy.
///
/// [`FairMutexGuard::yield_if_contended`]: medley_store::FairMutexGuard::yield_if_contended
pub struct SyncEngine {
    db: Arc<LockableConnection>,
    registry: MergerRegistry,
    state: Mutex<SyncState>,
    cancelled: AtomicBool,
    stats: RwLock<SyncStats>,
}

impl SyncEngine {
    /// Creates an engine over the shared connection and a merger registry.
    pub fn new(db: Arc<LockableConnection>, registry: MergerRegistry) -> Self {
        Self {
            db,
            registry,
            state: Mutex::new(SyncState::Idle),
            cancelled: AtomicBool::new(false),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// The engine's current state.
    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Requests cancellation of the running session.
    ///
    /// Honored at the next between-kind checkpoint; the kind currently
    /// merging runs to completion first.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock() = state;
    }

    /// Runs one sync session over `changes`.
    ///
    /// # Errors
    ///
    /// [`SyncError::SessionActive`] if a session is already running;
    /// otherwise the first merge failure, with the guard released and the
    /// engine back in [`SyncState::Idle`].
    pub fn run(&self, changes: &ChangeSet) -> SyncResult<SyncReport> {
        {
            let mut state = self.state.lock();
            if *state != SyncState::Idle {
                return Err(SyncError::SessionActive {
                    state: state.name(),
                });
            }
            *state = SyncState::Acquiring;
        }
        self.cancelled.store(false, Ordering::SeqCst);

        let start = Instant::now();
        let mut report = SyncReport::default();

        let mut guard = self.db.lock();
        self.set_state(SyncState::Locked);
        let result = self.merge_all(&mut guard, changes, &mut report);
        drop(guard);
        self.set_state(SyncState::Idle);

        report.duration = start.elapsed();
        match result {
            Ok(()) => {
                let totals = report.totals();
                let mut stats = self.stats.write();
                stats.sessions_completed += 1;
                stats.rows_inserted += totals.inserted;
                stats.rows_updated += totals.updated;
                stats.rows_deleted += totals.deleted;
                stats.yields += report.yields;
                stats.last_error = None;
                drop(stats);
                Ok(report)
            }
            Err(err) => {
                self.stats.write().last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn merge_all(
        &self,
        guard: &mut ConnectionGuard<'_>,
        changes: &ChangeSet,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        for kind in EntityKind::DEPENDENCY_ORDER {
            self.check_cancelled()?;

            let Some(merger) = self.registry.merger_for_kind(kind) else {
                warn!(kind = %kind, "no merger registered, skipping kind");
                report.skipped.push(kind);
                continue;
            };

            self.set_state(SyncState::Merging);
            let counts = {
                let conn: &Connection = &**guard;
                let mut stmt = changes.prepare_changes(kind)?;
                let mut cursor = RowCursor::over(&mut stmt)?;
                merger.merge(conn, &mut cursor)?
            };
            debug!(
                kind = %kind,
                inserted = counts.inserted,
                updated = counts.updated,
                deleted = counts.deleted,
                "merged entity kind"
            );
            report.merged.push((kind, counts));
            self.set_state(SyncState::Locked);

            // Safe checkpoint: the kind just merged is fully applied.
            if guard.yield_if_contended() {
                report.yields += 1;
                debug!(kind = %kind, "ceded connection to waiting threads");
            }
        }

        Ok(())
    }
}
