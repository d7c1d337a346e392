//! In-process identity provider.
//!
//! Backs the CLI and the test suites. Phone numbers must look like E.164
//! (`+` followed by 8 to 15 digits); every OTP is checked against one
//! configured code. Each phone number maps to a stable identity so signing
//! in twice with the same number lands in the same reminder scope.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nudge_core::ids::ChallengeId;
use nudge_core::{Identity, IdentityId, Subscription, VerificationHandle};
use nudge_settings::{AuthSettings, ChallengeSize};
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::AuthError;
use crate::provider::{Challenge, IdentityListener, IdentityProvider};

/// Behavior knobs for [`MemoryIdentityProvider`].
#[derive(Clone, Debug)]
pub struct MemoryProviderConfig {
    /// The only OTP code accepted.
    pub accepted_code: String,
    /// Make anonymous sign-in fail, to exercise the phone flow.
    pub fail_anonymous: bool,
}

impl Default for MemoryProviderConfig {
    fn default() -> Self {
        Self {
            accepted_code: AuthSettings::default().dev_otp_code,
            fail_anonymous: false,
        }
    }
}

impl MemoryProviderConfig {
    /// Take the accepted code from auth settings.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            accepted_code: settings.dev_otp_code.clone(),
            fail_anonymous: false,
        }
    }
}

#[derive(Default)]
struct State {
    current: Option<Identity>,
    listeners: HashMap<u64, IdentityListener>,
    next_listener: u64,
    challenges: HashMap<ChallengeId, bool>,
    pending: HashMap<VerificationHandle, String>,
    phone_ids: HashMap<String, IdentityId>,
}

/// Identity provider that keeps everything in memory.
pub struct MemoryIdentityProvider {
    config: MemoryProviderConfig,
    state: Arc<Mutex<State>>,
    challenges_created: AtomicUsize,
}

impl MemoryIdentityProvider {
    /// Create a provider with no identity.
    pub fn new(config: MemoryProviderConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(State::default())),
            challenges_created: AtomicUsize::new(0),
        }
    }

    /// Replace the current identity and notify listeners.
    pub fn switch_to(&self, identity: Option<Identity>) {
        let listeners: Vec<IdentityListener> = {
            let mut state = self.state.lock();
            state.current.clone_from(&identity);
            state.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(identity.clone());
        }
    }

    /// Drop the current identity.
    pub fn sign_out(&self) {
        self.switch_to(None);
    }

    /// The current identity.
    pub fn current(&self) -> Option<Identity> {
        self.state.lock().current.clone()
    }

    /// Mark every issued challenge as solved, as if the user completed the
    /// widget. A `Normal` challenge stays solved for one OTP request.
    pub fn solve_pending_challenges(&self) {
        for solved in self.state.lock().challenges.values_mut() {
            *solved = true;
        }
    }

    /// Number of challenges created so far.
    pub fn challenges_created(&self) -> usize {
        self.challenges_created.load(Ordering::Relaxed)
    }

    /// Number of registered identity listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

fn is_phone_number(s: &str) -> bool {
    s.strip_prefix('+').is_some_and(|digits| {
        (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
    })
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<Identity, AuthError> {
        if self.config.fail_anonymous {
            return Err(AuthError::SignIn("anonymous sign-in is disabled".into()));
        }
        let identity = Identity::anonymous(IdentityId::new());
        self.switch_to(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Identity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::SignIn("empty token".into()));
        }
        let identity = Identity::verified(format!("token:{token}"));
        self.switch_to(Some(identity.clone()));
        Ok(identity)
    }

    fn subscribe_identity_changes(&self, listener: IdentityListener) -> Subscription {
        let (key, current) = {
            let mut state = self.state.lock();
            let key = state.next_listener;
            state.next_listener += 1;
            let _ = state.listeners.insert(key, Arc::clone(&listener));
            (key, state.current.clone())
        };
        listener(current);

        let state = Arc::clone(&self.state);
        Subscription::new("identity", move || {
            let _ = state.lock().listeners.remove(&key);
        })
    }

    fn create_challenge(&self, size: ChallengeSize) -> Result<Challenge, AuthError> {
        let challenge = Challenge {
            id: ChallengeId::new(),
            size,
        };
        let solved = size == ChallengeSize::Invisible;
        let _ = self
            .state
            .lock()
            .challenges
            .insert(challenge.id.clone(), solved);
        let _ = self.challenges_created.fetch_add(1, Ordering::Relaxed);
        Ok(challenge)
    }

    async fn request_phone_otp(
        &self,
        phone_number: &str,
        challenge: &Challenge,
    ) -> Result<VerificationHandle, AuthError> {
        let mut state = self.state.lock();
        match state.challenges.get(&challenge.id) {
            None => return Err(AuthError::Challenge("unknown challenge".into())),
            Some(false) => return Err(AuthError::Challenge("challenge not solved".into())),
            Some(true) => {}
        }
        if !is_phone_number(phone_number) {
            return Err(AuthError::OtpRequest(format!(
                "invalid phone number: {phone_number}"
            )));
        }
        // A visible challenge must be solved again before the next request.
        if challenge.size == ChallengeSize::Normal {
            let _ = state.challenges.insert(challenge.id.clone(), false);
        }
        let handle = VerificationHandle::new();
        let _ = state.pending.insert(handle.clone(), phone_number.to_string());
        debug!(handle = %handle, "OTP issued");
        Ok(handle)
    }

    async fn confirm_otp(
        &self,
        handle: &VerificationHandle,
        code: &str,
    ) -> Result<Identity, AuthError> {
        let identity = {
            let mut state = self.state.lock();
            if !state.pending.contains_key(handle) {
                return Err(AuthError::UnknownHandle(handle.to_string()));
            }
            if code.trim() != self.config.accepted_code {
                return Err(AuthError::InvalidCode);
            }
            let phone = state.pending.remove(handle).unwrap_or_default();
            let id = state
                .phone_ids
                .entry(phone)
                .or_insert_with(IdentityId::new)
                .clone();
            Identity::verified(id)
        };
        self.switch_to(Some(identity.clone()));
        Ok(identity)
    }
}

impl std::fmt::Debug for MemoryIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIdentityProvider")
            .field("current", &self.current())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
