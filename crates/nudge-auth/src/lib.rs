//! # nudge-auth
//!
//! Sign-in and phone verification for Nudge.
//!
//! - [`IdentityProvider`](provider::IdentityProvider): the external sign-in
//!   service, with a push feed of identity changes
//! - [`AuthSessionManager`](session::AuthSessionManager): the session state
//!   machine and the phone OTP flow gated by a verification challenge
//! - [`MemoryIdentityProvider`](memory::MemoryIdentityProvider): in-process
//!   provider for the CLI and tests
//!
//! The manager never stores identities of its own; it mirrors the provider's
//! feed and notifies [`SessionObserver`](session::SessionObserver)s so that
//! owner-scoped subscriptions are torn down before a new identity's start.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod provider;
pub mod session;

pub use errors::AuthError;
pub use memory::{MemoryIdentityProvider, MemoryProviderConfig};
pub use provider::{Challenge, IdentityListener, IdentityProvider};
pub use session::{AuthSessionManager, AuthSnapshot, AuthState, PhoneVerification, SessionObserver};
