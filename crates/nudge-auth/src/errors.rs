//! Auth error types.

use nudge_core::ErrorCategory;

/// Errors that can occur during sign-in and phone verification.
///
/// Every variant is recoverable: the user retries by repeating the intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Anonymous or token sign-in failed.
    #[error("sign-in failed: {0}")]
    SignIn(String),

    /// The provider refused to send an OTP (bad number, quota, network).
    #[error("OTP request failed: {0}")]
    OtpRequest(String),

    /// The human-verification challenge was missing or unsolved.
    #[error("verification challenge not solved: {0}")]
    Challenge(String),

    /// The submitted code did not match.
    #[error("invalid OTP code")]
    InvalidCode,

    /// The verification handle is unknown or already used.
    #[error("unknown verification handle: {0}")]
    UnknownHandle(String),

    /// The intent is not valid in the current session state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// Session state at the time.
        state: &'static str,
    },
}

impl AuthError {
    /// Taxonomy bucket for this error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Auth
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
