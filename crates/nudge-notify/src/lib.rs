//! # nudge-notify
//!
//! Local notifications for reminders.
//!
//! - [`PlatformNotifier`](platform::PlatformNotifier): permission query,
//!   permission prompt, and delivery, implemented per platform
//! - [`NotificationScheduler`](scheduler::NotificationScheduler): turns a
//!   reminder time into a cancellable one-shot timer or an immediate
//!   "missed" delivery, gated on permission at fire time
//! - [`TracingNotifier`](notifiers::TracingNotifier) and
//!   [`RecordingNotifier`](notifiers::RecordingNotifier): in-process notifiers

#![deny(unsafe_code)]

pub mod errors;
pub mod notifiers;
pub mod platform;
pub mod scheduler;

pub use errors::NotifyError;
pub use notifiers::{RecordingNotifier, TracingNotifier};
pub use platform::{Notification, NotificationKind, PermissionState, PlatformNotifier};
pub use scheduler::{NotificationScheduler, Scheduled};
