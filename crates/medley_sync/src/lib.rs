//! # Medley Sync
//!
//! Dependency-ordered merge engine for the Medley media library store.
//!
//! A sync session reconciles staged change sets (from the filesystem
//! scanner or a remote sync source) into the local library tables, one
//! entity kind at a time, while holding the fair connection guard from
//! `medley_store`:
//!
//! - [`EntityKind`] / [`ChangeOp`] — the fixed entity model and its
//!   dependency order.
//! - [`ChangeSet`] — per-kind staging of add/modify/delete rows.
//! - [`TableMerger`] — the merge contract; [`meta`] holds the standard
//!   merger for each kind.
//! - [`MergerRegistry`] — kind-name → merger lookup, with soft misses.
//! - [`SyncEngine`] — the session driver: lock, merge each kind in
//!   dependency order, yield between kinds, unlock.
//!
//! ## Key invariants
//!
//! - Entity kinds always merge in [`EntityKind::DEPENDENCY_ORDER`]; two
//!   kinds' merges never interleave.
//! - No other connection user ever observes a partially merged kind; the
//!   guard is only ceded at between-kind checkpoints.
//! - A parent reference that fails to resolve is surfaced as
//!   [`SyncError::UnresolvedReference`], never dropped.
//! - Cancellation is cooperative and bounded by one kind's merge.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
mod engine;
mod entity;
mod error;
mod merger;
pub mod meta;
mod provider;
mod registry;

pub use changes::ChangeSet;
pub use engine::{SyncEngine, SyncReport, SyncState, SyncStats};
pub use entity::{ChangeOp, EntityKind};
pub use error::{SyncError, SyncResult};
pub use merger::{MergeCounts, TableMerger};
pub use provider::MetaProvider;
pub use registry::MergerRegistry;
