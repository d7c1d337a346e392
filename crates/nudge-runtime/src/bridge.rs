//! Identity → sync bridge.

use std::sync::Arc;

use nudge_auth::SessionObserver;
use nudge_core::Identity;
use nudge_sync::ReminderSyncEngine;

/// Starts the sync engine for each new session and stops it when the
/// session ends. The session manager calls `session_ended` before
/// `session_started` on a switch, so the old owner's subscription is always
/// gone before the new one opens.
pub struct SyncBridge {
    sync: Arc<ReminderSyncEngine>,
}

impl SyncBridge {
    /// Bridge sessions to `sync`.
    pub fn new(sync: Arc<ReminderSyncEngine>) -> Self {
        Self { sync }
    }
}

impl SessionObserver for SyncBridge {
    fn session_started(&self, identity: &Identity) {
        self.sync.start(&identity.id);
    }

    fn session_ended(&self, _identity: &Identity) {
        self.sync.stop();
    }
}
