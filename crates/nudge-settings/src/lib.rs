//! # nudge-settings
//!
//! Configuration management with layered sources for Nudge.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`NudgeSettings::default()`]
//! 2. **User file**: `~/.nudge/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `NUDGE_*` overrides (highest priority)
//!
//! There is no process-wide settings singleton: the binary loads settings
//! once and passes the relevant sections to each component's constructor.
//!
//! # Usage
//!
//! ```no_run
//! use nudge_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("collection: {}", settings.collection_path());
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
