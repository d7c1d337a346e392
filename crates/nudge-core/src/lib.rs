//! # nudge-core
//!
//! Foundation types, errors, branded IDs, and utilities for Nudge.
//!
//! This crate provides the shared vocabulary that all other Nudge crates depend on:
//!
//! - **Branded IDs**: `IdentityId`, `ReminderId`, `VerificationHandle` as newtypes
//! - **Domain types**: [`Identity`](types::Identity), [`Reminder`](types::Reminder),
//!   [`NewReminder`](types::NewReminder) and scheduled-time parsing
//! - **Subscriptions**: [`Subscription`](subscription::Subscription), the
//!   unsubscribe handle returned by every push-style feed
//! - **Notices**: [`NoticeBoard`](notice::NoticeBoard) for short-lived user messages
//! - **Clock**: [`Clock`](clock::Clock) so wall-clock reads can be pinned in tests
//! - **Errors**: [`ErrorCategory`](errors::ErrorCategory) taxonomy and `CoreError`
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod clock;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod notice;
pub mod subscription;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{CoreError, ErrorCategory};
pub use ids::{ChallengeId, IdentityId, ReminderId, VerificationHandle};
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use subscription::Subscription;
pub use types::{Identity, NewReminder, Reminder, parse_scheduled_at};
