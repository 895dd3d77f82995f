//! Error types for sync operations.

use crate::entity::EntityKind;
use medley_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while merging change sets.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The access layer or the engine underneath it failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A change referenced a foreign entity that has not been merged.
    ///
    /// This is a referential-ordering violation: it cannot occur when
    /// entity kinds merge in declared dependency order against a
    /// well-formed change set. When observed it indicates either an
    /// ordering bug or a malformed change set, so it is surfaced rather
    /// than dropped.
    #[error("{kind} change references unknown {parent} {reference:?}")]
    UnresolvedReference {
        /// The kind whose change could not be applied.
        kind: EntityKind,
        /// The kind of the missing referenced entity.
        parent: EntityKind,
        /// The sync key that failed to resolve.
        reference: String,
    },

    /// A change row could not be interpreted.
    #[error("malformed change: {0}")]
    MalformedChange(String),

    /// The session was cancelled at an entity-kind boundary.
    #[error("sync session cancelled")]
    Cancelled,

    /// A session was started while another was still active.
    #[error("a sync session is already active (state {state})")]
    SessionActive {
        /// The state the engine was in.
        state: &'static str,
    },

    /// Teardown was requested while the shared connection handle still has
    /// other owners.
    #[error("connection handle still shared at shutdown")]
    HandleShared,
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Store(StoreError::Sqlite(err))
    }
}
