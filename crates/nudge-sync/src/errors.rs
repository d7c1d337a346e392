//! Sync error types.

use nudge_core::{CoreError, ErrorCategory};

/// Errors raised by the reminder sync engine and remote collections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// User input rejected before any remote call.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// A write was attempted with no live identity.
    #[error("no signed-in identity")]
    NoIdentity,

    /// An insert or remove round-trip failed.
    #[error("write failed: {0}")]
    Write(String),

    /// The live subscription reported a failure.
    #[error("subscription failed: {0}")]
    Subscription(String),
}

impl SyncError {
    /// Taxonomy bucket for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(e) => e.category(),
            Self::NoIdentity | Self::Write(_) => ErrorCategory::Write,
            Self::Subscription(_) => ErrorCategory::Sync,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
