//! # nudge-runtime
//!
//! Application assembly for Nudge.
//!
//! - **App**: [`ReminderApp`](app::ReminderApp) builds the notice board,
//!   scheduler, sync engine, and session manager from settings, then exposes
//!   the presentation intents and watch channels
//! - **Bridge**: [`SyncBridge`](bridge::SyncBridge) follows session start and
//!   end with sync start and stop
//!
//! Control flow: intent → `AuthSessionManager` → `IdentityProvider`; identity
//! feed → `AuthSessionManager` → `SyncBridge` → `ReminderSyncEngine` →
//! `RemoteCollection`; pushed result set → snapshot channel; created
//! reminder → `NotificationScheduler` → platform notifier.

#![deny(unsafe_code)]

pub mod app;
pub mod bridge;

pub use app::{AppState, Backends, ReminderApp};
pub use bridge::SyncBridge;
