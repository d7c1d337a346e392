//! Error taxonomy shared by every Nudge crate.
//!
//! Each crate defines its own `thiserror` enum (`AuthError`, `SyncError`,
//! `NotifyError`, ...) and maps its variants onto an [`ErrorCategory`].
//! Every category is recoverable at the boundary where it occurs: errors
//! are surfaced as short-lived notices and never retried automatically.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, used for logging and for choosing
/// the notice shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Input rejected before any remote call (empty label, bad time).
    Validation,
    /// Sign-in, OTP request, or OTP verification failed.
    Auth,
    /// The live subscription reported a failure.
    Sync,
    /// An insert or delete round-trip failed.
    Write,
    /// The platform has no notification capability.
    NotificationUnsupported,
}

impl ErrorCategory {
    /// Whether the user can recover by repeating the intent.
    ///
    /// No failure in Nudge is fatal to the process.
    pub fn is_recoverable(self) -> bool {
        true
    }

    /// Stable lowercase name for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Sync => "sync",
            Self::Write => "write",
            Self::NotificationUnsupported => "notification_unsupported",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while validating user input into domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The reminder label was empty or whitespace.
    #[error("reminder label must not be empty")]
    EmptyLabel,

    /// The scheduled time was empty.
    #[error("reminder time must not be empty")]
    EmptyTime,

    /// The scheduled time could not be parsed.
    #[error("unrecognized reminder time: {0}")]
    InvalidTime(String),
}

impl CoreError {
    /// All core errors are input validation failures.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_is_recoverable() {
        for category in [
            ErrorCategory::Validation,
            ErrorCategory::Auth,
            ErrorCategory::Sync,
            ErrorCategory::Write,
            ErrorCategory::NotificationUnsupported,
        ] {
            assert!(category.is_recoverable(), "{category} should be recoverable");
        }
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::NotificationUnsupported).unwrap();
        assert_eq!(json, "\"notification_unsupported\"");
    }

    #[test]
    fn invalid_time_display() {
        let err = CoreError::InvalidTime("tomorrow-ish".into());
        assert_eq!(err.to_string(), "unrecognized reminder time: tomorrow-ish");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
