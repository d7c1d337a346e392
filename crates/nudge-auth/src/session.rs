//! Session state machine.
//!
//! [`AuthSessionManager`] sits between the presentation layer and the
//! [`IdentityProvider`]. It tracks whether an identity is live, drives the
//! two-step phone verification flow, and tells registered
//! [`SessionObserver`]s when a session begins or ends so dependent
//! subscriptions follow the identity.
//!
//! ```text
//! Unauthenticated
//!   Idle ──request_otp──▶ AwaitingChallengeSolve ──ok──▶ OtpRequested(h)
//!    ▲                           │ err                      │ verify_otp
//!    └───────────────────────────┘                          ▼
//!    ◀────────────────ok──────────────────────────── Verifying(h)
//!                     OtpRequested(h) ◀──err────────────────┘
//!
//! identity feed: Some(id) ──▶ Authenticated(id)   None ──▶ Unauthenticated
//! ```

use std::sync::{Arc, Weak};

use nudge_core::{Identity, NoticeBoard, Subscription, VerificationHandle};
use nudge_settings::ChallengeSize;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::AuthError;
use crate::provider::{Challenge, IdentityListener, IdentityProvider};

/// Posted before an OTP request goes out.
pub const NOTICE_OTP_SENDING: &str = "Sending OTP...";
/// Posted when the provider accepted the OTP request.
pub const NOTICE_OTP_SENT: &str = "OTP sent successfully!";
/// Posted when the OTP request failed.
pub const NOTICE_OTP_SEND_FAILED: &str = "Error sending OTP. Please try again.";
/// Posted when the code was accepted.
pub const NOTICE_OTP_VERIFIED: &str = "Phone number verified. You are now logged in!";
/// Posted when the code was rejected.
pub const NOTICE_OTP_INVALID: &str = "Invalid OTP. Please try again.";

/// Whether an identity is live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AuthState {
    /// No identity.
    Unauthenticated,
    /// An identity is live; reminders are scoped to it.
    Authenticated(Identity),
}

/// Progress of the phone verification flow.
///
/// Only meaningful while [`AuthState::Unauthenticated`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "handle", rename_all = "camelCase")]
pub enum PhoneVerification {
    /// Nothing in flight.
    #[default]
    Idle,
    /// The OTP request (challenge solve plus send) is in flight.
    AwaitingChallengeSolve,
    /// An OTP was sent; the handle awaits a code.
    OtpRequested(VerificationHandle),
    /// A code is being confirmed against the handle.
    Verifying(VerificationHandle),
}

impl PhoneVerification {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingChallengeSolve => "awaiting challenge solve",
            Self::OtpRequested(_) => "OTP requested",
            Self::Verifying(_) => "verifying",
        }
    }
}

/// Read-only view of the session published to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    /// Session state.
    pub state: AuthState,
    /// Phone verification progress.
    pub verification: PhoneVerification,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            verification: PhoneVerification::Idle,
        }
    }
}

impl AuthSnapshot {
    /// The live identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            AuthState::Authenticated(identity) => Some(identity),
            AuthState::Unauthenticated => None,
        }
    }

    /// Whether an identity is live.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    /// The pending verification handle, if an OTP was sent.
    pub fn pending_handle(&self) -> Option<&VerificationHandle> {
        match &self.verification {
            PhoneVerification::OtpRequested(h) | PhoneVerification::Verifying(h) => Some(h),
            PhoneVerification::Idle | PhoneVerification::AwaitingChallengeSolve => None,
        }
    }
}

/// Notified synchronously when the live identity changes.
///
/// On a switch from one identity to another, `session_ended` for the old
/// identity always runs before `session_started` for the new one.
pub trait SessionObserver: Send + Sync {
    /// An identity became live.
    fn session_started(&self, identity: &Identity);
    /// The identity is no longer live.
    fn session_ended(&self, identity: &Identity);
}

/// Owns the session state machine.
pub struct AuthSessionManager {
    provider: Arc<dyn IdentityProvider>,
    notices: NoticeBoard,
    challenge_size: ChallengeSize,
    challenge: Mutex<Option<Challenge>>,
    state: watch::Sender<AuthSnapshot>,
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
    feed: Mutex<Option<Subscription>>,
}

impl AuthSessionManager {
    /// Create a manager in the `Unauthenticated`/`Idle` state.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        notices: NoticeBoard,
        challenge_size: ChallengeSize,
    ) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            provider,
            notices,
            challenge_size,
            challenge: Mutex::new(None),
            state,
            observers: Mutex::new(Vec::new()),
            feed: Mutex::new(None),
        }
    }

    /// Register an observer for session start and end.
    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.lock().push(observer);
    }

    /// Subscribe to the provider's identity feed. A second call replaces the
    /// first subscription.
    pub fn attach(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let listener: IdentityListener = Arc::new(move |identity| {
            if let Some(manager) = weak.upgrade() {
                manager.identity_changed(identity);
            }
        });
        let sub = self.provider.subscribe_identity_changes(listener);
        let old = self.feed.lock().replace(sub);
        if let Some(old) = old {
            old.unsubscribe();
        }
        debug!("identity feed attached");
    }

    /// Unsubscribe from the identity feed, end the live session, and discard
    /// any pending verification handle.
    ///
    /// Without the feed nothing keeps the identity current, so observers see
    /// `session_ended` here and a later [`attach`](Self::attach) replays the
    /// provider's identity as a fresh session.
    pub fn detach(&self) {
        let sub = self.feed.lock().take();
        if let Some(sub) = sub {
            sub.unsubscribe();
            debug!("identity feed detached");
        }
        self.identity_changed(None);
        self.state.send_modify(|s| s.verification = PhoneVerification::Idle);
    }

    /// Issue the background sign-in: token-based when `token` is set,
    /// anonymous otherwise. Failure is logged and otherwise ignored; the
    /// identity itself arrives through the feed.
    pub async fn bootstrap(&self, token: Option<&str>) {
        let result = match token {
            Some(token) => self.provider.sign_in_with_token(token).await,
            None => self.provider.sign_in_anonymously().await,
        };
        match result {
            Ok(identity) => {
                debug!(identity_id = %identity.id, token = token.is_some(), "bootstrap sign-in complete");
            }
            Err(e) => {
                warn!(error = %e, token = token.is_some(), "bootstrap sign-in failed");
            }
        }
    }

    /// [`bootstrap`](Self::bootstrap) on a background task.
    pub fn spawn_bootstrap(self: &Arc<Self>, token: Option<String>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.bootstrap(token.as_deref()).await })
    }

    /// Apply an identity-feed event.
    pub fn identity_changed(&self, identity: Option<Identity>) {
        let mut previous = None;
        let _ = self.state.send_if_modified(|s| {
            previous = s.identity().cloned();
            let next = match &identity {
                Some(id) => AuthState::Authenticated(id.clone()),
                None => AuthState::Unauthenticated,
            };
            if s.state == next {
                return false;
            }
            s.state = next;
            if identity.is_some() {
                s.verification = PhoneVerification::Idle;
            }
            true
        });

        let same_session = match (&previous, &identity) {
            (Some(a), Some(b)) => a.id == b.id,
            (None, None) => true,
            _ => false,
        };
        if same_session {
            return;
        }

        let observers = self.observers.lock().clone();
        if let Some(prev) = &previous {
            info!(identity_id = %prev.id, "session ended");
            for observer in &observers {
                observer.session_ended(prev);
            }
        }
        if let Some(next) = &identity {
            info!(identity_id = %next.id, authenticated = next.authenticated, "session started");
            for observer in &observers {
                observer.session_started(next);
            }
        }
    }

    /// Request an OTP for `phone_number`.
    ///
    /// Valid only while unauthenticated and no request or confirmation is in
    /// flight. A previously sent handle is discarded.
    pub async fn request_otp(&self, phone_number: &str) -> Result<VerificationHandle, AuthError> {
        let mut rejected = None;
        let _ = self.state.send_if_modified(|s| {
            if s.is_authenticated() {
                rejected = Some("authenticated");
                return false;
            }
            if matches!(
                s.verification,
                PhoneVerification::Idle | PhoneVerification::OtpRequested(_)
            ) {
                s.verification = PhoneVerification::AwaitingChallengeSolve;
                true
            } else {
                rejected = Some(s.verification.name());
                false
            }
        });
        if let Some(state) = rejected {
            debug!(state, "OTP request rejected");
            return Err(AuthError::InvalidState {
                operation: "request OTP",
                state,
            });
        }

        let _ = self.notices.info(NOTICE_OTP_SENDING);
        let result = match self.challenge() {
            Ok(challenge) => self.provider.request_phone_otp(phone_number, &challenge).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(handle) => {
                let _ = self.state.send_if_modified(|s| {
                    if s.verification == PhoneVerification::AwaitingChallengeSolve {
                        s.verification = PhoneVerification::OtpRequested(handle.clone());
                        true
                    } else {
                        false
                    }
                });
                info!(handle = %handle, "OTP sent");
                let _ = self.notices.info(NOTICE_OTP_SENT);
                Ok(handle)
            }
            Err(e) => {
                let _ = self.state.send_if_modified(|s| {
                    if s.verification == PhoneVerification::AwaitingChallengeSolve {
                        s.verification = PhoneVerification::Idle;
                        true
                    } else {
                        false
                    }
                });
                warn!(error = %e, "OTP request failed");
                let _ = self.notices.error(NOTICE_OTP_SEND_FAILED);
                Err(e)
            }
        }
    }

    /// Confirm `code` against the pending handle.
    ///
    /// On success the identity arrives through the feed; on failure the same
    /// handle stays pending so the user can retry.
    pub async fn verify_otp(&self, code: &str) -> Result<Identity, AuthError> {
        let mut pending = None;
        let mut current = "idle";
        let _ = self.state.send_if_modified(|s| {
            current = s.verification.name();
            if let PhoneVerification::OtpRequested(handle) = &s.verification {
                let handle = handle.clone();
                s.verification = PhoneVerification::Verifying(handle.clone());
                pending = Some(handle);
                true
            } else {
                false
            }
        });
        let Some(handle) = pending else {
            debug!(state = current, "OTP verification rejected");
            return Err(AuthError::InvalidState {
                operation: "verify OTP",
                state: current,
            });
        };

        match self.provider.confirm_otp(&handle, code).await {
            Ok(identity) => {
                let _ = self.state.send_if_modified(|s| {
                    if s.verification == PhoneVerification::Idle {
                        return false;
                    }
                    s.verification = PhoneVerification::Idle;
                    true
                });
                info!(identity_id = %identity.id, "phone number verified");
                let _ = self.notices.info(NOTICE_OTP_VERIFIED);
                Ok(identity)
            }
            Err(e) => {
                let _ = self.state.send_if_modified(|s| {
                    if s.verification == PhoneVerification::Verifying(handle.clone()) {
                        s.verification = PhoneVerification::OtpRequested(handle.clone());
                        true
                    } else {
                        false
                    }
                });
                warn!(error = %e, "OTP verification failed");
                let _ = self.notices.error(NOTICE_OTP_INVALID);
                Err(e)
            }
        }
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Watch the session snapshot.
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// The live identity, if any.
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// The challenge, created on first use and reused afterwards.
    fn challenge(&self) -> Result<Challenge, AuthError> {
        let mut slot = self.challenge.lock();
        if let Some(challenge) = slot.as_ref() {
            return Ok(challenge.clone());
        }
        let challenge = self.provider.create_challenge(self.challenge_size)?;
        debug!(challenge_id = %challenge.id, size = ?challenge.size, "verification challenge created");
        *slot = Some(challenge.clone());
        Ok(challenge)
    }
}

impl Drop for AuthSessionManager {
    fn drop(&mut self) {
        if let Some(sub) = self.feed.get_mut().take() {
            sub.unsubscribe();
        }
    }
}

impl std::fmt::Debug for AuthSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionManager")
            .field("state", &*self.state.borrow())
            .field("challenge_size", &self.challenge_size)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryIdentityProvider, MemoryProviderConfig};
    use assert_matches::assert_matches;
    use nudge_core::logging::capture::capture_logs;

    const PHONE: &str = "+15551234567";

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recorder {
        fn session_started(&self, identity: &Identity) {
            self.events.lock().push(format!("start:{}", identity.id));
        }
        fn session_ended(&self, identity: &Identity) {
            self.events.lock().push(format!("end:{}", identity.id));
        }
    }

    fn setup(
        config: MemoryProviderConfig,
    ) -> (Arc<MemoryIdentityProvider>, Arc<AuthSessionManager>, NoticeBoard) {
        let provider = Arc::new(MemoryIdentityProvider::new(config));
        let notices = NoticeBoard::default();
        let manager = Arc::new(AuthSessionManager::new(
            provider.clone(),
            notices.clone(),
            ChallengeSize::Invisible,
        ));
        manager.attach();
        (provider, manager, notices)
    }

    fn texts(rx: &mut tokio::sync::broadcast::Receiver<nudge_core::Notice>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n.text);
        }
        out
    }

    #[test]
    fn starts_unauthenticated_idle() {
        let (_, manager, _) = setup(MemoryProviderConfig::default());
        let snap = manager.snapshot();
        assert_eq!(snap.state, AuthState::Unauthenticated);
        assert_eq!(snap.verification, PhoneVerification::Idle);
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn anonymous_bootstrap_authenticates_through_feed() {
        let (_, manager, _) = setup(MemoryProviderConfig::default());
        manager.bootstrap(None).await;
        let identity = manager.current_identity().unwrap();
        assert!(!identity.authenticated);
        assert_matches!(manager.snapshot().state, AuthState::Authenticated(_));
    }

    #[tokio::test]
    async fn token_bootstrap_yields_verified_identity() {
        let (_, manager, _) = setup(MemoryProviderConfig::default());
        manager.bootstrap(Some("tok-1")).await;
        assert!(manager.current_identity().unwrap().authenticated);
    }

    #[tokio::test]
    async fn failed_bootstrap_is_logged_only() {
        let (logs, _guard) = capture_logs();
        let (_, manager, _) = setup(MemoryProviderConfig {
            fail_anonymous: true,
            ..MemoryProviderConfig::default()
        });
        manager.bootstrap(None).await;
        assert!(manager.current_identity().is_none());
        assert!(logs.has_event(tracing::Level::WARN, "bootstrap sign-in failed"));
    }

    #[tokio::test]
    async fn request_otp_moves_to_otp_requested() {
        let (_, manager, notices) = setup(MemoryProviderConfig::default());
        let mut rx = notices.subscribe();
        let handle = manager.request_otp(PHONE).await.unwrap();
        assert_eq!(
            manager.snapshot().verification,
            PhoneVerification::OtpRequested(handle)
        );
        assert_eq!(texts(&mut rx), vec![NOTICE_OTP_SENDING, NOTICE_OTP_SENT]);
    }

    #[tokio::test]
    async fn failed_request_returns_to_idle() {
        let (_, manager, notices) = setup(MemoryProviderConfig::default());
        let mut rx = notices.subscribe();
        let err = manager.request_otp("not-a-number").await.unwrap_err();
        assert_matches!(err, AuthError::OtpRequest(_));
        assert_eq!(manager.snapshot().verification, PhoneVerification::Idle);
        assert_eq!(texts(&mut rx), vec![NOTICE_OTP_SENDING, NOTICE_OTP_SEND_FAILED]);

        // Retryable.
        assert!(manager.request_otp(PHONE).await.is_ok());
    }

    #[tokio::test]
    async fn request_while_authenticated_is_rejected() {
        let (_, manager, _) = setup(MemoryProviderConfig::default());
        manager.bootstrap(None).await;
        let err = manager.request_otp(PHONE).await.unwrap_err();
        assert_matches!(
            err,
            AuthError::InvalidState {
                state: "authenticated",
                ..
            }
        );
    }

    #[tokio::test]
    async fn verify_without_handle_is_rejected() {
        let (_, manager, _) = setup(MemoryProviderConfig::default());
        let err = manager.verify_otp("123456").await.unwrap_err();
        assert_matches!(err, AuthError::InvalidState { state: "idle", .. });
    }

    #[tokio::test]
    async fn wrong_code_keeps_same_handle() {
        let (_, manager, notices) = setup(MemoryProviderConfig::default());
        let handle = manager.request_otp(PHONE).await.unwrap();
        let mut rx = notices.subscribe();

        let err = manager.verify_otp("000000").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCode);
        assert_eq!(
            manager.snapshot().verification,
            PhoneVerification::OtpRequested(handle)
        );
        assert!(!manager.snapshot().is_authenticated());
        assert_eq!(texts(&mut rx), vec![NOTICE_OTP_INVALID]);
    }

    #[tokio::test]
    async fn right_code_authenticates_once() {
        let (_, manager, notices) = setup(MemoryProviderConfig::default());
        let recorder = Arc::new(Recorder::default());
        manager.add_observer(recorder.clone());

        let _ = manager.request_otp(PHONE).await.unwrap();
        let _ = manager.verify_otp("000000").await.unwrap_err();
        let mut rx = notices.subscribe();
        let identity = manager.verify_otp("123456").await.unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.state, AuthState::Authenticated(identity.clone()));
        assert_eq!(snap.verification, PhoneVerification::Idle);
        assert_eq!(
            *recorder.events.lock(),
            vec![format!("start:{}", identity.id)]
        );
        assert_eq!(texts(&mut rx), vec![NOTICE_OTP_VERIFIED]);
    }

    #[tokio::test]
    async fn identity_switch_ends_old_session_first() {
        let (provider, manager, _) = setup(MemoryProviderConfig::default());
        let recorder = Arc::new(Recorder::default());
        manager.add_observer(recorder.clone());

        manager.bootstrap(None).await;
        let first = manager.current_identity().unwrap();
        let second = Identity::verified("user-2");
        provider.switch_to(Some(second.clone()));
        provider.switch_to(None);

        assert_eq!(
            *recorder.events.lock(),
            vec![
                format!("start:{}", first.id),
                format!("end:{}", first.id),
                format!("start:{}", second.id),
                format!("end:{}", second.id),
            ]
        );
        assert_eq!(manager.snapshot().state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn repeated_identity_is_not_a_new_session() {
        let (provider, manager, _) = setup(MemoryProviderConfig::default());
        let recorder = Arc::new(Recorder::default());
        manager.add_observer(recorder.clone());
        let who = Identity::verified("same");
        provider.switch_to(Some(who.clone()));
        provider.switch_to(Some(who));
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn challenge_is_created_once() {
        let (provider, manager, _) = setup(MemoryProviderConfig::default());
        let _ = manager.request_otp(PHONE).await.unwrap();
        let _ = manager.request_otp(PHONE).await.unwrap();
        assert_eq!(provider.challenges_created(), 1);
    }

    #[tokio::test]
    async fn unsolved_normal_challenge_blocks_request() {
        let provider = Arc::new(MemoryIdentityProvider::new(MemoryProviderConfig::default()));
        let manager = Arc::new(AuthSessionManager::new(
            provider.clone(),
            NoticeBoard::default(),
            ChallengeSize::Normal,
        ));
        manager.attach();

        let err = manager.request_otp(PHONE).await.unwrap_err();
        assert_matches!(err, AuthError::Challenge(_));
        assert_eq!(manager.snapshot().verification, PhoneVerification::Idle);

        provider.solve_pending_challenges();
        assert!(manager.request_otp(PHONE).await.is_ok());

        // The solution was spent on that request.
        assert_matches!(
            manager.request_otp(PHONE).await,
            Err(AuthError::Challenge(_))
        );
        provider.solve_pending_challenges();
        assert!(manager.request_otp(PHONE).await.is_ok());
        assert_eq!(provider.challenges_created(), 1);
    }

    #[tokio::test]
    async fn detach_discards_handle_and_stops_feed() {
        let (provider, manager, _) = setup(MemoryProviderConfig::default());
        let _ = manager.request_otp(PHONE).await.unwrap();
        manager.detach();
        assert_eq!(manager.snapshot().verification, PhoneVerification::Idle);

        provider.switch_to(Some(Identity::verified("late")));
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn detach_ends_session_and_reattach_restarts_it() {
        let (_, manager, _) = setup(MemoryProviderConfig::default());
        let recorder = Arc::new(Recorder::default());
        manager.add_observer(recorder.clone());
        manager.bootstrap(Some("tok")).await;
        let who = manager.current_identity().unwrap();

        manager.detach();
        assert_eq!(manager.snapshot().state, AuthState::Unauthenticated);

        manager.attach();
        assert_eq!(manager.current_identity(), Some(who.clone()));
        assert_eq!(
            *recorder.events.lock(),
            vec![
                format!("start:{}", who.id),
                format!("end:{}", who.id),
                format!("start:{}", who.id),
            ]
        );
    }

    #[test]
    fn snapshot_serializes_tagged() {
        let snap = AuthSnapshot {
            state: AuthState::Authenticated(Identity::verified("u1")),
            verification: PhoneVerification::Idle,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"]["state"], "authenticated");
        assert_eq!(json["verification"]["step"], "idle");
    }
}
