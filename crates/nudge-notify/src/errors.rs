//! Notification error types.

use nudge_core::ErrorCategory;

/// Errors from the notification layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The platform cannot show notifications at all.
    #[error("notifications are not supported on this platform")]
    Unsupported,
}

impl NotifyError {
    /// Taxonomy bucket for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unsupported => ErrorCategory::NotificationUnsupported,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_category() {
        let err = NotifyError::Unsupported;
        assert_eq!(err.category(), ErrorCategory::NotificationUnsupported);
        assert!(err.category().is_recoverable());
    }
}
