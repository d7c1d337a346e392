//! Remote collection boundary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nudge_core::{IdentityId, Reminder, ReminderId, Subscription};

use crate::errors::SyncError;

/// Callback receiving the full filtered result set, or the failure, on every
/// remote change.
pub type SnapshotListener = Arc<dyn Fn(Result<Vec<Reminder>, SyncError>) + Send + Sync>;

/// Fields written on insert. The store assigns the ID and creation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderDraft {
    /// Current identity at write time.
    pub owner_id: IdentityId,
    /// Non-empty label.
    pub label: String,
    /// Target time.
    pub scheduled_at: DateTime<Utc>,
    /// Whether a local notification was requested.
    pub wants_notification: bool,
}

/// Server-side query: records whose owner equals one identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerFilter {
    /// Owner to match.
    pub owner_id: IdentityId,
}

impl OwnerFilter {
    /// Match records owned by `owner_id`.
    pub fn new(owner_id: IdentityId) -> Self {
        Self { owner_id }
    }

    /// Whether `reminder` passes the filter.
    pub fn matches(&self, reminder: &Reminder) -> bool {
        reminder.owner_id == self.owner_id
    }
}

/// A remotely stored, push-subscribable reminder collection.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Resolved collection path, for diagnostics.
    fn path(&self) -> &str;

    /// Append a record; returns the store-assigned ID.
    async fn insert(&self, draft: ReminderDraft) -> Result<ReminderId, SyncError>;

    /// Delete a record by ID.
    async fn remove(&self, id: &ReminderId) -> Result<(), SyncError>;

    /// Register `listener` for changes to the records matching `filter`.
    ///
    /// Implementations deliver the current result set first and then a full
    /// result set after every change.
    fn subscribe(&self, filter: OwnerFilter, listener: SnapshotListener) -> Subscription;
}
