//! # Medley Store
//!
//! Shared-connection access layer for the Medley media library store.
//!
//! Medley funnels every statement through **one** physical SQLite
//! connection, shared by a background scanner, a request-serving layer and
//! the sync engine. The engine offers no transaction isolation that would
//! make concurrent statements safe, so this crate provides the discipline
//! instead:
//!
//! - [`FairMutex`] — a strict-FIFO ticket lock with a cooperative
//!   [`FairMutexGuard::yield_if_contended`] checkpoint, so a long bulk
//!   operation can cede its turn to waiting readers without losing its
//!   place unfairly.
//! - [`LockableConnection`] — the process-wide connection handle brokered by
//!   that lock.
//! - [`ColumnsMap`] — case-insensitive column-name → ordinal resolution,
//!   built once per statement shape.
//! - [`RowCursor`] — a forward-only result stream paired with its
//!   [`ColumnsMap`].
//!
//! ## Invariants
//!
//! - No two threads execute statements on the connection concurrently.
//! - Lock grant order equals lock request order.
//! - Reentrant locking fails fast (panic) instead of deadlocking silently.
//! - Column lookup of an absent name is an error, never a sentinel.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod columns;
mod connection;
mod cursor;
mod error;
mod lock;

pub use columns::ColumnsMap;
pub use connection::{ConnectionGuard, LockableConnection};
pub use cursor::RowCursor;
pub use error::{StoreError, StoreResult};
pub use lock::{FairMutex, FairMutexGuard};

// Re-exported so downstream crates use the same engine version.
pub use rusqlite;
