//! # nudge-sync
//!
//! Live, owner-scoped view of the remote reminder collection.
//!
//! [`ReminderSyncEngine`](engine::ReminderSyncEngine) keeps exactly one
//! subscription on a [`RemoteCollection`](collection::RemoteCollection),
//! filtered to the current owner, and republishes each pushed result set
//! wholesale. Creates and deletes go straight to the collection; the snapshot
//! catches up through the subscription. [`MemoryCollection`](memory::MemoryCollection)
//! is the in-process store used by the CLI and tests.

#![deny(unsafe_code)]

pub mod collection;
pub mod engine;
pub mod errors;
pub mod memory;

pub use collection::{OwnerFilter, RemoteCollection, ReminderDraft, SnapshotListener};
pub use engine::ReminderSyncEngine;
pub use errors::SyncError;
pub use memory::MemoryCollection;
