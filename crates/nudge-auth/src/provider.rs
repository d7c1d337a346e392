//! Identity provider abstraction.
//!
//! [`IdentityProvider`] is the boundary to whatever service actually signs
//! users in. The session manager only needs the five operations below plus
//! a way to create the human-verification challenge that gates OTP requests.

use std::sync::Arc;

use async_trait::async_trait;
use nudge_core::ids::ChallengeId;
use nudge_core::{Identity, Subscription, VerificationHandle};
use nudge_settings::ChallengeSize;

use crate::errors::AuthError;

/// Callback invoked with the provider's current identity on every change.
pub type IdentityListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// A human-verification challenge instance.
///
/// Opaque to client code: it is created once and passed to every OTP request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    /// Provider-side handle.
    pub id: ChallengeId,
    /// Presentation size the challenge was created with.
    pub size: ChallengeSize,
}

/// Sign-in and phone verification service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in without credentials.
    async fn sign_in_anonymously(&self) -> Result<Identity, AuthError>;

    /// Sign in with a bootstrap token issued by the hosting environment.
    async fn sign_in_with_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// Register `listener` for identity changes.
    ///
    /// Providers may invoke the listener immediately with the current identity.
    fn subscribe_identity_changes(&self, listener: IdentityListener) -> Subscription;

    /// Create the human-verification challenge.
    fn create_challenge(&self, size: ChallengeSize) -> Result<Challenge, AuthError>;

    /// Solve `challenge` and send an OTP to `phone_number`.
    async fn request_phone_otp(
        &self,
        phone_number: &str,
        challenge: &Challenge,
    ) -> Result<VerificationHandle, AuthError>;

    /// Complete verification. On success the provider also pushes the new
    /// identity through the change feed.
    async fn confirm_otp(
        &self,
        handle: &VerificationHandle,
        code: &str,
    ) -> Result<Identity, AuthError>;
}
