//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NudgeSettings::default()`]
//! 2. If `~/.nudge/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::NudgeSettings;

/// Resolve the path to the settings file (`~/.nudge/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".nudge").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NudgeSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<NudgeSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
fn load_file_layer(path: &Path) -> Result<NudgeSettings> {
    let defaults = serde_json::to_value(NudgeSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Reject values no component can work with.
fn validate(settings: &NudgeSettings) -> Result<()> {
    if settings.notices.ttl_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "notices.ttlMs must be positive".into(),
        ));
    }
    if settings.app.app_id.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "app.appId must not be empty".into(),
        ));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `NUDGE_*` environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut NudgeSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Each variable has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_overrides_from(settings: &mut NudgeSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── App settings ────────────────────────────────────────────────
    if let Some(v) = env.string("NUDGE_APP_ID") {
        settings.app.app_id = v;
    }
    if let Some(v) = env.string("NUDGE_AUTH_TOKEN") {
        settings.app.bootstrap_token = Some(v);
    }

    // ── Notices / notifications ─────────────────────────────────────
    if let Some(v) = env.u64_in("NUDGE_NOTICE_TTL_MS", 100, 60_000) {
        settings.notices.ttl_ms = v;
    }
    if let Some(v) = env.bool("NUDGE_CANCEL_ON_DELETE") {
        settings.notifications.cancel_on_delete = v;
    }

    // ── Auth / logging ──────────────────────────────────────────────
    if let Some(v) = env.string("NUDGE_DEV_OTP_CODE") {
        settings.auth.dev_otp_code = v;
    }
    if let Some(v) = env.string("NUDGE_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "notifications": {"activeTitle": "Reminder", "cancelOnDelete": true}
        });
        let source = serde_json::json!({
            "notifications": {"cancelOnDelete": false}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["notifications"]["cancelOnDelete"], false);
        assert_eq!(merged["notifications"]["activeTitle"], "Reminder");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_file_layer / load_settings_from_path ───────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.app.app_id, "default-app-id");
        assert_eq!(settings.notices.ttl_ms, 3_000);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"app": {"appId": "prod", "bootstrapToken": "tok"}, "notices": {"ttlMs": 1500}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.app.app_id, "prod");
        assert_eq!(settings.app.bootstrap_token(), Some("tok"));
        assert_eq!(settings.notices.ttl_ms, 1500);
        assert_eq!(settings.notifications.active_title, "Reminder");
        assert_eq!(
            settings.collection_path(),
            "artifacts/prod/public/data/reminders"
        );
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_file_layer(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut settings = NudgeSettings::default();
        settings.notices.ttl_ms = 0;
        assert!(matches!(
            validate(&settings),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn blank_app_id_is_rejected() {
        let mut settings = NudgeSettings::default();
        settings.app.app_id = "  ".into();
        assert!(validate(&settings).is_err());
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply_over_file_values() {
        let mut settings = NudgeSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup(&[
                ("NUDGE_APP_ID", "staging"),
                ("NUDGE_AUTH_TOKEN", "bootstrap"),
                ("NUDGE_NOTICE_TTL_MS", "5000"),
                ("NUDGE_CANCEL_ON_DELETE", "off"),
                ("NUDGE_LOG_LEVEL", "debug"),
                ("NUDGE_DEV_OTP_CODE", "654321"),
            ]),
        );
        assert_eq!(settings.app.app_id, "staging");
        assert_eq!(settings.app.bootstrap_token(), Some("bootstrap"));
        assert_eq!(settings.notices.ttl_ms, 5000);
        assert!(!settings.notifications.cancel_on_delete);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.auth.dev_otp_code, "654321");
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = NudgeSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup(&[
                ("NUDGE_NOTICE_TTL_MS", "5"),
                ("NUDGE_CANCEL_ON_DELETE", "maybe"),
                ("NUDGE_APP_ID", ""),
            ]),
        );
        assert_eq!(settings.notices.ttl_ms, 3_000);
        assert!(settings.notifications.cancel_on_delete);
        assert_eq!(settings.app.app_id, "default-app-id");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE", "On"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in &["false", "0", "no", "off", "NO"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("3000", 100, 60_000), Some(3000));
        assert_eq!(parse_u64_range("99", 100, 60_000), None);
        assert_eq!(parse_u64_range("60001", 100, 60_000), None);
        assert_eq!(parse_u64_range("abc", 100, 60_000), None);
    }
}
