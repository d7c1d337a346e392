//! Notice and local-notification settings.

use serde::{Deserialize, Serialize};

/// Transient notice behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoticeSettings {
    /// How long a notice stays visible, in milliseconds.
    pub ttl_ms: u64,
}

impl Default for NoticeSettings {
    fn default() -> Self {
        Self { ttl_ms: 3_000 }
    }
}

/// Local notification content and scheduling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    /// Title of a notification fired on time.
    pub active_title: String,
    /// Title of a notification for a time already past when scheduled.
    pub missed_title: String,
    /// Text placed before the label in an on-time body.
    pub active_body_prefix: String,
    /// Text placed before the label in a missed body.
    pub missed_body_prefix: String,
    /// Icon URL for on-time notifications.
    pub active_icon: String,
    /// Icon URL for missed notifications.
    pub missed_icon: String,
    /// Cancel a pending notification when its reminder is deleted.
    pub cancel_on_delete: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            active_title: "Reminder".to_string(),
            missed_title: "Reminder (Missed)".to_string(),
            active_body_prefix: "Don't forget: ".to_string(),
            missed_body_prefix: "You missed the reminder: ".to_string(),
            active_icon: "https://placehold.co/60x60/88B87B/fff?text=R".to_string(),
            missed_icon: "https://placehold.co/60x60/FF6347/fff?text=R".to_string(),
            cancel_on_delete: true,
        }
    }
}
