//! Deferred reminder notifications.
//!
//! [`NotificationScheduler::schedule`] turns a reminder's absolute time into
//! either a one-shot timer task (time still ahead) or an immediate "missed"
//! delivery (time already past). Permission is checked when the notification
//! actually fires, not when it is scheduled.
//!
//! Pending timers live in a side table keyed by reminder ID, each with its
//! own `CancellationToken` derived from the scheduler's root token, so a
//! delete can cancel one timer and shutdown cancels them all.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nudge_core::{Clock, NoticeBoard, ReminderId};
use nudge_settings::NotificationSettings;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::NotifyError;
use crate::platform::{Notification, NotificationKind, PermissionState, PlatformNotifier};

/// Posted when the prompt was accepted.
pub const NOTICE_PERMISSION_GRANTED: &str = "Notification permission granted!";
/// Posted when the prompt was refused.
pub const NOTICE_PERMISSION_DENIED: &str = "Notification permission denied.";
/// Posted when the platform cannot notify at all.
pub const NOTICE_UNSUPPORTED: &str = "Notifications are not supported on this platform.";

/// What [`NotificationScheduler::schedule`] did with a reminder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduled {
    /// A timer will fire after this long.
    Deferred(Duration),
    /// The time had passed; the missed notification was delivered now.
    MissedDelivered,
    /// The time had passed, but permission was not granted.
    MissedDropped,
}

struct PendingTimer {
    generation: u64,
    token: CancellationToken,
}

type PendingTable = Arc<Mutex<HashMap<ReminderId, PendingTimer>>>;

/// Schedules local notifications for reminders.
pub struct NotificationScheduler {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn PlatformNotifier>,
    settings: NotificationSettings,
    notices: NoticeBoard,
    pending: PendingTable,
    root: CancellationToken,
    generation: AtomicU64,
}

impl NotificationScheduler {
    /// Create a scheduler.
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn PlatformNotifier>,
        settings: NotificationSettings,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            clock,
            notifier,
            settings,
            notices,
            pending: Arc::new(Mutex::new(HashMap::new())),
            root: CancellationToken::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Arrange a notification for `label` at `scheduled_at`.
    ///
    /// A second call for the same `reminder_id` replaces the pending timer.
    /// Must run inside a tokio runtime when the time is in the future.
    pub fn schedule(
        &self,
        reminder_id: &ReminderId,
        label: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Scheduled {
        let now = self.clock.now();
        let delay = (scheduled_at - now)
            .to_std()
            .ok()
            .filter(|d| !d.is_zero());

        let Some(delay) = delay else {
            let notification = self.build(reminder_id, label, NotificationKind::Missed);
            return if deliver_if_permitted(self.notifier.as_ref(), &notification) {
                Scheduled::MissedDelivered
            } else {
                Scheduled::MissedDropped
            };
        };

        let notification = self.build(reminder_id, label, NotificationKind::Active);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        let previous = self.pending.lock().insert(
            reminder_id.clone(),
            PendingTimer {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let notifier = Arc::clone(&self.notifier);
        let pending = Arc::clone(&self.pending);
        let id = reminder_id.clone();
        drop(tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    remove_if_current(&pending, &id, generation);
                    let _ = deliver_if_permitted(notifier.as_ref(), &notification);
                }
                () = token.cancelled() => {
                    debug!(reminder_id = %id, "pending notification cancelled");
                }
            }
        }));

        debug!(
            reminder_id = %reminder_id,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "notification scheduled"
        );
        Scheduled::Deferred(delay)
    }

    /// Cancel the pending timer for `reminder_id`. Returns whether one existed.
    pub fn cancel(&self, reminder_id: &ReminderId) -> bool {
        let removed = self.pending.lock().remove(reminder_id);
        match removed {
            Some(timer) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Called when a reminder is deleted. Cancels its timer only when
    /// `cancel_on_delete` is set.
    pub fn reminder_deleted(&self, reminder_id: &ReminderId) -> bool {
        self.settings.cancel_on_delete && self.cancel(reminder_id)
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&self) {
        let drained: Vec<PendingTimer> = self.pending.lock().drain().map(|(_, t)| t).collect();
        for timer in &drained {
            timer.token.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "pending notifications cancelled");
        }
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether a timer is pending for `reminder_id`.
    pub fn is_pending(&self, reminder_id: &ReminderId) -> bool {
        self.pending.lock().contains_key(reminder_id)
    }

    /// Current platform permission.
    pub fn permission_state(&self) -> PermissionState {
        self.notifier.permission_state()
    }

    /// Ask the user for permission and post the outcome as a notice.
    pub async fn request_permission(&self) -> Result<PermissionState, NotifyError> {
        if self.notifier.permission_state() == PermissionState::Unsupported {
            let _ = self.notices.error(NOTICE_UNSUPPORTED);
            return Err(NotifyError::Unsupported);
        }
        let state = self.notifier.request_permission().await;
        info!(permission = %state, "notification permission answered");
        if state == PermissionState::Granted {
            let _ = self.notices.info(NOTICE_PERMISSION_GRANTED);
        } else {
            let _ = self.notices.error(NOTICE_PERMISSION_DENIED);
        }
        Ok(state)
    }

    /// Cancel every pending timer; later schedules still work.
    pub fn shutdown(&self) {
        self.cancel_all();
    }

    fn build(&self, reminder_id: &ReminderId, label: &str, kind: NotificationKind) -> Notification {
        let s = &self.settings;
        let (title, prefix, icon) = match kind {
            NotificationKind::Active => (&s.active_title, &s.active_body_prefix, &s.active_icon),
            NotificationKind::Missed => (&s.missed_title, &s.missed_body_prefix, &s.missed_icon),
        };
        Notification {
            reminder_id: reminder_id.clone(),
            kind,
            title: title.clone(),
            body: format!("{prefix}{label}"),
            icon: icon.clone(),
        }
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

impl std::fmt::Debug for NotificationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationScheduler")
            .field("pending", &self.pending_count())
            .field("cancel_on_delete", &self.settings.cancel_on_delete)
            .finish_non_exhaustive()
    }
}

fn remove_if_current(pending: &PendingTable, id: &ReminderId, generation: u64) {
    let mut table = pending.lock();
    if table.get(id).is_some_and(|t| t.generation == generation) {
        let _ = table.remove(id);
    }
}

fn deliver_if_permitted(notifier: &dyn PlatformNotifier, notification: &Notification) -> bool {
    let permission = notifier.permission_state();
    if permission != PermissionState::Granted {
        debug!(
            reminder_id = %notification.reminder_id,
            kind = ?notification.kind,
            %permission,
            "notification dropped"
        );
        return false;
    }
    notifier.deliver(notification);
    info!(
        reminder_id = %notification.reminder_id,
        kind = ?notification.kind,
        "notification delivered"
    );
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
