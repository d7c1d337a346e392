//! Reminder sync engine.
//!
//! Holds at most one live subscription on the remote collection, filtered to
//! the current owner, and republishes every pushed result set as the local
//! snapshot. Each subscription gets a generation number; pushes carrying a
//! generation other than the live one are discarded, so a listener that
//! outlives its teardown can never write another owner's records into the
//! snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nudge_core::{IdentityId, NewReminder, NoticeBoard, Reminder, ReminderId, Subscription};
use nudge_notify::NotificationScheduler;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::collection::{OwnerFilter, RemoteCollection, ReminderDraft, SnapshotListener};
use crate::errors::SyncError;

/// Posted when a label or time is missing or unreadable.
pub const NOTICE_INVALID_INPUT: &str = "Please enter both a label and a time.";
/// Posted after a successful insert.
pub const NOTICE_ADDED: &str = "Reminder added successfully!";
/// Posted when an insert fails.
pub const NOTICE_ADD_FAILED: &str = "Failed to add reminder.";
/// Posted after a successful delete.
pub const NOTICE_DELETED: &str = "Reminder deleted.";
/// Posted when a delete fails.
pub const NOTICE_DELETE_FAILED: &str = "Failed to delete reminder.";
/// Posted when the subscription reports a failure.
pub const NOTICE_FETCH_FAILED: &str = "Error fetching reminders.";

struct ActiveSubscription {
    owner: IdentityId,
    generation: u64,
    subscription: Subscription,
}

/// Owner-scoped live view of the reminder collection.
pub struct ReminderSyncEngine {
    collection: Arc<dyn RemoteCollection>,
    notices: NoticeBoard,
    scheduler: Option<Arc<NotificationScheduler>>,
    active: Mutex<Option<ActiveSubscription>>,
    live_generation: Arc<AtomicU64>,
    snapshot: Arc<watch::Sender<Vec<Reminder>>>,
}

impl ReminderSyncEngine {
    /// Create an idle engine.
    pub fn new(collection: Arc<dyn RemoteCollection>, notices: NoticeBoard) -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        Self {
            collection,
            notices,
            scheduler: None,
            active: Mutex::new(None),
            live_generation: Arc::new(AtomicU64::new(0)),
            snapshot: Arc::new(snapshot),
        }
    }

    /// Hand newly created reminders that want a notification to `scheduler`,
    /// and tell it about deletes.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<NotificationScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Subscribe to `owner`'s reminders.
    ///
    /// No-op when already subscribed for `owner`; otherwise the previous
    /// subscription is torn down first.
    pub fn start(&self, owner: &IdentityId) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|a| &a.owner == owner) {
            debug!(owner_id = %owner, "sync already running for owner");
            return;
        }
        if let Some(old) = active.take() {
            self.teardown(old);
        }

        let generation = self.live_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let listener = self.listener(generation);
        let subscription = self
            .collection
            .subscribe(OwnerFilter::new(owner.clone()), listener);
        info!(
            owner_id = %owner,
            generation,
            path = self.collection.path(),
            "reminder sync started"
        );
        *active = Some(ActiveSubscription {
            owner: owner.clone(),
            generation,
            subscription,
        });
    }

    /// Tear down the live subscription, if any, and clear the snapshot.
    pub fn stop(&self) {
        let old = self.active.lock().take();
        if let Some(old) = old {
            self.teardown(old);
        }
    }

    /// Owner of the live subscription.
    pub fn current_owner(&self) -> Option<IdentityId> {
        self.active.lock().as_ref().map(|a| a.owner.clone())
    }

    /// Whether a subscription is live.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// The last result set received.
    pub fn snapshot(&self) -> Vec<Reminder> {
        self.snapshot.borrow().clone()
    }

    /// Watch the snapshot.
    pub fn watch(&self) -> watch::Receiver<Vec<Reminder>> {
        self.snapshot.subscribe()
    }

    /// Validate raw input and insert a reminder for the current owner.
    ///
    /// Returns once the insert round-trip completes; the snapshot catches up
    /// through the subscription. When `wants_notification` is set, the
    /// submitted label and time go to the scheduler under the new ID.
    pub async fn create(
        &self,
        label: &str,
        scheduled_at: &str,
        wants_notification: bool,
    ) -> Result<ReminderId, SyncError> {
        let reminder = match NewReminder::parse(label, scheduled_at, wants_notification) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "reminder input rejected");
                let _ = self.notices.error(NOTICE_INVALID_INPUT);
                return Err(e.into());
            }
        };
        self.create_validated(reminder).await
    }

    /// Insert an already validated reminder for the current owner.
    pub async fn create_validated(&self, reminder: NewReminder) -> Result<ReminderId, SyncError> {
        let Some(owner_id) = self.current_owner() else {
            warn!("reminder create with no live identity");
            let _ = self.notices.error(NOTICE_ADD_FAILED);
            return Err(SyncError::NoIdentity);
        };

        let draft = ReminderDraft {
            owner_id,
            label: reminder.label.clone(),
            scheduled_at: reminder.scheduled_at,
            wants_notification: reminder.wants_notification,
        };
        match self.collection.insert(draft).await {
            Ok(id) => {
                info!(reminder_id = %id, path = self.collection.path(), "reminder added");
                let scheduler = self
                    .scheduler
                    .as_ref()
                    .filter(|_| reminder.wants_notification);
                if let Some(scheduler) = scheduler {
                    let _ = scheduler.schedule(&id, &reminder.label, reminder.scheduled_at);
                }
                let _ = self.notices.info(NOTICE_ADDED);
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "reminder insert failed");
                let _ = self.notices.error(NOTICE_ADD_FAILED);
                Err(e)
            }
        }
    }

    /// Delete a reminder by ID. Ownership is enforced by the store, not here.
    pub async fn delete(&self, id: &ReminderId) -> Result<(), SyncError> {
        match self.collection.remove(id).await {
            Ok(()) => {
                info!(reminder_id = %id, "reminder deleted");
                if let Some(scheduler) = &self.scheduler {
                    let _ = scheduler.reminder_deleted(id);
                }
                let _ = self.notices.info(NOTICE_DELETED);
                Ok(())
            }
            Err(e) => {
                warn!(reminder_id = %id, error = %e, "reminder delete failed");
                let _ = self.notices.error(NOTICE_DELETE_FAILED);
                Err(e)
            }
        }
    }

    fn listener(&self, generation: u64) -> SnapshotListener {
        let live = Arc::clone(&self.live_generation);
        let snapshot = Arc::clone(&self.snapshot);
        let notices = self.notices.clone();
        Arc::new(move |result: Result<Vec<Reminder>, SyncError>| match result {
            Ok(records) => {
                // The generation check runs under the channel's write lock so
                // it cannot interleave with a teardown's clear.
                let _ = snapshot.send_if_modified(|current| {
                    if live.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *current = records;
                    true
                });
            }
            Err(e) => {
                if live.load(Ordering::SeqCst) != generation {
                    return;
                }
                warn!(error = %e, generation, "reminder subscription failed");
                let _ = notices.error(NOTICE_FETCH_FAILED);
            }
        })
    }

    fn teardown(&self, old: ActiveSubscription) {
        let _ = self.live_generation.fetch_add(1, Ordering::SeqCst);
        old.subscription.unsubscribe();
        self.snapshot.send_modify(Vec::clear);
        info!(owner_id = %old.owner, generation = old.generation, "reminder sync stopped");
    }
}

impl Drop for ReminderSyncEngine {
    fn drop(&mut self) {
        if let Some(old) = self.active.get_mut().take() {
            old.subscription.unsubscribe();
        }
    }
}

impl std::fmt::Debug for ReminderSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderSyncEngine")
            .field("owner", &self.current_owner())
            .field("records", &self.snapshot.borrow().len())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
