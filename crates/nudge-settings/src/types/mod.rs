//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Each type implements [`Default`] with production default values
//! and is marked `#[serde(default)]` so partial JSON fills in the rest.

mod auth;
mod notifications;

pub use auth::*;
pub use notifications::*;

use serde::{Deserialize, Serialize};

/// Placeholder substituted with [`AppSettings::app_id`] in the collection path.
pub const APP_ID_PLACEHOLDER: &str = "{appId}";

/// Root settings type for Nudge.
///
/// Loaded from `~/.nudge/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "app": { "appId": "prod" },
///   "notices": { "ttlMs": 5000 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NudgeSettings {
    /// Settings schema version.
    pub version: String,
    /// Deployment identity and bootstrap credentials.
    pub app: AppSettings,
    /// Remote collection addressing.
    pub collection: CollectionSettings,
    /// Transient notice behavior.
    pub notices: NoticeSettings,
    /// Local notification content and scheduling.
    pub notifications: NotificationSettings,
    /// Sign-in and phone verification.
    pub auth: AuthSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for NudgeSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            app: AppSettings::default(),
            collection: CollectionSettings::default(),
            notices: NoticeSettings::default(),
            notifications: NotificationSettings::default(),
            auth: AuthSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl NudgeSettings {
    /// Resolved path of the reminders collection for this deployment.
    pub fn collection_path(&self) -> String {
        self.collection
            .path_template
            .replace(APP_ID_PLACEHOLDER, &self.app.app_id)
    }
}

/// Deployment identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Deployment ID; scopes the collection path.
    pub app_id: String,
    /// Token for token-based sign-in at startup. Anonymous sign-in when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_token: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_id: "default-app-id".to_string(),
            bootstrap_token: None,
        }
    }
}

impl AppSettings {
    /// The bootstrap token, ignoring empty strings.
    pub fn bootstrap_token(&self) -> Option<&str> {
        self.bootstrap_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Remote collection addressing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionSettings {
    /// Path template; `{appId}` is replaced with the deployment ID.
    pub path_template: String,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            path_template: "artifacts/{appId}/public/data/reminders".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
