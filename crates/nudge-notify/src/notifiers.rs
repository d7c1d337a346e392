//! Concrete notifiers.
//!
//! [`TracingNotifier`] writes deliveries to the log and stands in for an OS
//! notification center in the CLI. [`RecordingNotifier`] keeps every
//! delivery in memory for assertions.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::platform::{Notification, PermissionState, PlatformNotifier};

/// Shared permission bookkeeping for the in-process notifiers.
#[derive(Debug)]
struct Permission {
    state: Mutex<PermissionState>,
    prompt_answer: PermissionState,
}

impl Permission {
    fn new(initial: PermissionState, prompt_answer: PermissionState) -> Self {
        Self {
            state: Mutex::new(initial),
            prompt_answer,
        }
    }

    fn get(&self) -> PermissionState {
        *self.state.lock()
    }

    /// Only an unanswered prompt changes the state.
    fn prompt(&self) -> PermissionState {
        let mut state = self.state.lock();
        if *state == PermissionState::Default {
            *state = self.prompt_answer;
        }
        *state
    }
}

/// Notifier that logs each delivery at `info`.
#[derive(Debug)]
pub struct TracingNotifier {
    permission: Permission,
}

impl TracingNotifier {
    /// Start in `initial`; an unanswered prompt resolves to `prompt_answer`.
    pub fn new(initial: PermissionState, prompt_answer: PermissionState) -> Self {
        Self {
            permission: Permission::new(initial, prompt_answer),
        }
    }
}

#[async_trait]
impl PlatformNotifier for TracingNotifier {
    fn permission_state(&self) -> PermissionState {
        self.permission.get()
    }

    async fn request_permission(&self) -> PermissionState {
        self.permission.prompt()
    }

    fn deliver(&self, notification: &Notification) {
        info!(
            target: "nudge::notification",
            reminder_id = %notification.reminder_id,
            kind = ?notification.kind,
            title = %notification.title,
            icon = %notification.icon,
            "{}",
            notification.body
        );
    }
}

/// Notifier that records deliveries.
#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Permission,
    delivered: Mutex<Vec<Notification>>,
    prompts: Mutex<u32>,
}

impl RecordingNotifier {
    /// Permission already granted.
    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, PermissionState::Granted)
    }

    /// Permission already denied.
    pub fn denied() -> Self {
        Self::new(PermissionState::Denied, PermissionState::Denied)
    }

    /// Start in `initial`; an unanswered prompt resolves to `prompt_answer`.
    pub fn new(initial: PermissionState, prompt_answer: PermissionState) -> Self {
        Self {
            permission: Permission::new(initial, prompt_answer),
            delivered: Mutex::new(Vec::new()),
            prompts: Mutex::new(0),
        }
    }

    /// Force the permission, e.g. to revoke it before a deferred fire.
    pub fn set_permission(&self, state: PermissionState) {
        *self.permission.state.lock() = state;
    }

    /// Everything delivered so far.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().clone()
    }

    /// Number of permission prompts shown.
    pub fn prompts(&self) -> u32 {
        *self.prompts.lock()
    }
}

#[async_trait]
impl PlatformNotifier for RecordingNotifier {
    fn permission_state(&self) -> PermissionState {
        self.permission.get()
    }

    async fn request_permission(&self) -> PermissionState {
        *self.prompts.lock() += 1;
        self.permission.prompt()
    }

    fn deliver(&self, notification: &Notification) {
        self.delivered.lock().push(notification.clone());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
