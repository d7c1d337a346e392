//! Platform notification boundary.

use async_trait::async_trait;
use nudge_core::ReminderId;
use serde::{Deserialize, Serialize};

/// Permission to show notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The platform has no notification capability.
    Unsupported,
    /// The user has not been asked yet.
    #[default]
    Default,
    /// Notifications may be shown.
    Granted,
    /// The user refused.
    Denied,
}

impl PermissionState {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the notification fired on time or for a time already past.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Fired at the scheduled time.
    Active,
    /// Scheduled time had already passed when the reminder was scheduled.
    Missed,
}

/// A notification ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Reminder that produced it.
    pub reminder_id: ReminderId,
    /// On time or missed.
    pub kind: NotificationKind,
    /// Title line.
    pub title: String,
    /// Body text; contains the reminder label.
    pub body: String,
    /// Icon URL.
    pub icon: String,
}

/// The platform's notification primitive.
#[async_trait]
pub trait PlatformNotifier: Send + Sync {
    /// Current permission.
    fn permission_state(&self) -> PermissionState;

    /// Prompt the user. Returns the resulting permission, normally
    /// [`PermissionState::Granted`] or [`PermissionState::Denied`].
    async fn request_permission(&self) -> PermissionState;

    /// Show `notification` now. Delivery is best effort.
    fn deliver(&self, notification: &Notification);
}
