//! The assembled application.
//!
//! [`ReminderApp`] constructs each component once from settings and the
//! supplied [`Backends`], connects the session manager to the sync engine,
//! and exposes the presentation boundary: intents in, watch channels out.

use std::sync::Arc;
use std::time::Duration;

use nudge_auth::{
    AuthError, AuthSessionManager, AuthSnapshot, IdentityProvider, MemoryIdentityProvider,
};
use nudge_core::{
    Clock, Identity, Notice, NoticeBoard, Reminder, ReminderId, SystemClock, VerificationHandle,
};
use nudge_notify::{NotificationScheduler, NotifyError, PermissionState, PlatformNotifier};
use nudge_settings::NudgeSettings;
use nudge_sync::{MemoryCollection, ReminderSyncEngine, RemoteCollection, SyncError};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bridge::SyncBridge;

/// External collaborators the application runs against.
#[derive(Clone)]
pub struct Backends {
    /// Sign-in service.
    pub identity: Arc<dyn IdentityProvider>,
    /// Reminder store.
    pub collection: Arc<dyn RemoteCollection>,
    /// Notification primitive.
    pub notifier: Arc<dyn PlatformNotifier>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// In-process backends on the system clock.
    ///
    /// The identity provider is passed in so the caller can keep a handle for
    /// solving visible challenges.
    pub fn in_memory(
        settings: &NudgeSettings,
        identity: Arc<MemoryIdentityProvider>,
        notifier: Arc<dyn PlatformNotifier>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let collection = MemoryCollection::new(settings.collection_path(), Arc::clone(&clock));
        Self {
            identity,
            collection: Arc::new(collection),
            notifier,
            clock,
        }
    }
}

/// Everything the presentation layer renders, read at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Session and phone verification.
    pub auth: AuthSnapshot,
    /// The current owner's reminders.
    pub reminders: Vec<Reminder>,
    /// The visible notice.
    pub notice: Option<Notice>,
}

/// The running application.
pub struct ReminderApp {
    notices: NoticeBoard,
    auth: Arc<AuthSessionManager>,
    sync: Arc<ReminderSyncEngine>,
    scheduler: Arc<NotificationScheduler>,
    bootstrap_token: Option<String>,
    bootstrap: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderApp {
    /// Build and connect all components. Nothing runs until [`start`](Self::start).
    pub fn new(settings: &NudgeSettings, backends: Backends) -> Self {
        let notices = NoticeBoard::new(
            Duration::from_millis(settings.notices.ttl_ms),
            Arc::clone(&backends.clock),
        );
        let scheduler = Arc::new(NotificationScheduler::new(
            Arc::clone(&backends.clock),
            backends.notifier,
            settings.notifications.clone(),
            notices.clone(),
        ));
        let sync = Arc::new(
            ReminderSyncEngine::new(backends.collection, notices.clone())
                .with_scheduler(Arc::clone(&scheduler)),
        );
        let auth = Arc::new(AuthSessionManager::new(
            backends.identity,
            notices.clone(),
            settings.auth.challenge_size,
        ));
        auth.add_observer(Arc::new(SyncBridge::new(Arc::clone(&sync))));

        Self {
            notices,
            auth,
            sync,
            scheduler,
            bootstrap_token: settings.app.bootstrap_token().map(str::to_owned),
            bootstrap: Mutex::new(None),
        }
    }

    /// Attach to the identity feed and issue the background sign-in.
    pub fn start(&self) {
        self.auth.attach();
        let handle = self.auth.spawn_bootstrap(self.bootstrap_token.clone());
        if let Some(old) = self.bootstrap.lock().replace(handle) {
            old.abort();
        }
        info!(token = self.bootstrap_token.is_some(), "reminder app started");
    }

    /// Wait for the background sign-in issued by [`start`](Self::start).
    pub async fn bootstrapped(&self) {
        let handle = self.bootstrap.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Detach from the identity feed, stop sync, and cancel pending
    /// notifications. The session ends with the feed; a later
    /// [`start`](Self::start) picks the provider's identity up again.
    pub fn shutdown(&self) {
        if let Some(handle) = self.bootstrap.lock().take() {
            handle.abort();
        }
        self.auth.detach();
        self.sync.stop();
        self.scheduler.shutdown();
        info!("reminder app shut down");
    }

    // ── Intents ─────────────────────────────────────────────────────────

    /// Request an OTP for `phone_number`.
    pub async fn submit_phone(&self, phone_number: &str) -> Result<VerificationHandle, AuthError> {
        debug!("submit phone");
        self.auth.request_otp(phone_number.trim()).await
    }

    /// Confirm the OTP `code`.
    pub async fn submit_otp(&self, code: &str) -> Result<Identity, AuthError> {
        debug!("submit OTP");
        self.auth.verify_otp(code.trim()).await
    }

    /// Create a reminder from raw form input.
    pub async fn add_reminder(
        &self,
        label: &str,
        scheduled_at: &str,
        wants_notification: bool,
    ) -> Result<ReminderId, SyncError> {
        self.sync.create(label, scheduled_at, wants_notification).await
    }

    /// Delete a reminder.
    pub async fn delete_reminder(&self, id: &ReminderId) -> Result<(), SyncError> {
        self.sync.delete(id).await
    }

    /// Ask for notification permission.
    pub async fn enable_notifications(&self) -> Result<PermissionState, NotifyError> {
        self.scheduler.request_permission().await
    }

    // ── Outbound state ──────────────────────────────────────────────────

    /// Current session snapshot.
    pub fn auth_snapshot(&self) -> AuthSnapshot {
        self.auth.snapshot()
    }

    /// Current reminders.
    pub fn reminders(&self) -> Vec<Reminder> {
        self.sync.snapshot()
    }

    /// The visible notice.
    pub fn notice(&self) -> Option<Notice> {
        self.notices.current()
    }

    /// All three outputs at once.
    pub fn state(&self) -> AppState {
        AppState {
            auth: self.auth_snapshot(),
            reminders: self.reminders(),
            notice: self.notice(),
        }
    }

    /// Watch the session.
    pub fn watch_auth(&self) -> watch::Receiver<AuthSnapshot> {
        self.auth.watch()
    }

    /// Watch the reminder snapshot.
    pub fn watch_reminders(&self) -> watch::Receiver<Vec<Reminder>> {
        self.sync.watch()
    }

    /// Watch the visible notice.
    pub fn watch_notice(&self) -> watch::Receiver<Option<Notice>> {
        self.notices.watch()
    }

    /// Every notice as it is posted.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Current notification permission.
    pub fn permission_state(&self) -> PermissionState {
        self.scheduler.permission_state()
    }

    /// Number of notifications waiting for their time.
    pub fn pending_notifications(&self) -> usize {
        self.scheduler.pending_count()
    }
}

impl Drop for ReminderApp {
    fn drop(&mut self) {
        if let Some(handle) = self.bootstrap.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ReminderApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderApp")
            .field("auth", &self.auth)
            .field("sync", &self.sync)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use nudge_auth::{AuthState, MemoryProviderConfig};
    use nudge_notify::RecordingNotifier;

    fn app(settings: &NudgeSettings, fail_anonymous: bool) -> ReminderApp {
        let identity = MemoryIdentityProvider::new(MemoryProviderConfig {
            fail_anonymous,
            ..MemoryProviderConfig::from_settings(&settings.auth)
        });
        let backends = Backends::in_memory(
            settings,
            Arc::new(identity),
            Arc::new(RecordingNotifier::granted()),
        );
        ReminderApp::new(settings, backends)
    }

    #[tokio::test]
    async fn start_signs_in_anonymously_and_starts_sync() {
        let settings = NudgeSettings::default();
        let app = app(&settings, false);
        app.start();
        app.bootstrapped().await;

        let identity = app.auth_snapshot().identity().cloned().unwrap();
        assert!(!identity.authenticated);
        let id = app.add_reminder("x", "2999-01-01T00:00:00Z", false).await.unwrap();
        assert_eq!(app.reminders()[0].id, id);
        assert_eq!(app.reminders()[0].owner_id, identity.id);
    }

    #[tokio::test]
    async fn bootstrap_token_selects_token_sign_in() {
        let mut settings = NudgeSettings::default();
        settings.app.bootstrap_token = Some("abc".into());
        let app = app(&settings, false);
        app.start();
        app.bootstrapped().await;
        assert!(app.auth_snapshot().identity().unwrap().authenticated);
    }

    #[tokio::test]
    async fn failed_bootstrap_leaves_phone_flow_available() {
        let settings = NudgeSettings::default();
        let app = app(&settings, true);
        app.start();
        app.bootstrapped().await;
        assert_eq!(app.auth_snapshot().state, AuthState::Unauthenticated);
        assert!(app.submit_phone(" +15551234567 ").await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_stops_everything() {
        let settings = NudgeSettings::default();
        let app = app(&settings, false);
        app.start();
        app.bootstrapped().await;
        let _ = app.add_reminder("x", "2999-01-01T00:00:00Z", true).await.unwrap();
        assert_eq!(app.pending_notifications(), 1);

        app.shutdown();
        assert!(app.reminders().is_empty());
        assert_eq!(app.pending_notifications(), 0);
        assert_matches!(
            app.add_reminder("y", "2999-01-01T00:00:00Z", false).await,
            Err(SyncError::NoIdentity)
        );
    }

    #[tokio::test]
    async fn restart_resumes_sync_for_the_same_identity() {
        let mut settings = NudgeSettings::default();
        settings.app.bootstrap_token = Some("tok".into());
        let app = app(&settings, false);
        app.start();
        app.bootstrapped().await;
        let _ = app.add_reminder("kept", "2999-01-01T00:00:00Z", false).await.unwrap();

        app.shutdown();
        assert_eq!(app.auth_snapshot().state, AuthState::Unauthenticated);

        app.start();
        app.bootstrapped().await;
        let owner = app.auth_snapshot().identity().cloned().unwrap();
        assert_eq!(owner.id.as_str(), "token:tok");
        let labels: Vec<_> = app.reminders().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["kept"]);
        assert!(app.add_reminder("again", "2999-01-01T00:00:00Z", false).await.is_ok());
    }

    #[tokio::test]
    async fn state_combines_outputs() {
        let settings = NudgeSettings::default();
        let app = app(&settings, false);
        app.start();
        app.bootstrapped().await;
        let _ = app.add_reminder("x", "2999-01-01T00:00:00Z", false).await.unwrap();
        let state = app.state();
        assert!(state.auth.is_authenticated());
        assert_eq!(state.reminders.len(), 1);
        assert_eq!(state.notice.unwrap().text, "Reminder added successfully!");
    }
}
