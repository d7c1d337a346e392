//! Domain types: identities, reminders, and scheduled-time parsing.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::{IdentityId, ReminderId};

/// `datetime-local` input forms accepted in addition to RFC 3339.
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// The principal associated with the live session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable for the lifetime of one session; the only reminder scoping key.
    pub id: IdentityId,
    /// Whether a credential (phone or token) backs this identity.
    /// Anonymous principals report `false`.
    pub authenticated: bool,
}

impl Identity {
    /// Identity created by anonymous sign-in.
    pub fn anonymous(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            authenticated: false,
        }
    }

    /// Identity backed by a verified credential.
    pub fn verified(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            authenticated: true,
        }
    }
}

/// A stored reminder as seen through the owner-scoped subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Store-assigned record ID.
    pub id: ReminderId,
    /// Identity that created the record.
    pub owner_id: IdentityId,
    /// Non-empty user label.
    pub label: String,
    /// Target time.
    pub scheduled_at: DateTime<Utc>,
    /// Whether a local notification was requested.
    pub wants_notification: bool,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// Validated user fields for a reminder that has not been written yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReminder {
    /// Trimmed, non-empty label.
    pub label: String,
    /// Parsed target time.
    pub scheduled_at: DateTime<Utc>,
    /// Whether a local notification was requested.
    pub wants_notification: bool,
}

impl NewReminder {
    /// Validate raw form input. `time` is interpreted in the local time zone
    /// when it carries no offset.
    pub fn parse(label: &str, time: &str, wants_notification: bool) -> Result<Self, CoreError> {
        Self::parse_in(label, time, wants_notification, &Local)
    }

    /// Like [`NewReminder::parse`], with an explicit zone for offset-less input.
    pub fn parse_in<Tz: TimeZone>(
        label: &str,
        time: &str,
        wants_notification: bool,
        tz: &Tz,
    ) -> Result<Self, CoreError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(CoreError::EmptyLabel);
        }
        let scheduled_at = parse_scheduled_at_in(time, tz)?;
        Ok(Self {
            label: label.to_owned(),
            scheduled_at,
            wants_notification,
        })
    }
}

/// Parse a scheduled time in the local time zone.
///
/// See [`parse_scheduled_at_in`].
pub fn parse_scheduled_at(input: &str) -> Result<DateTime<Utc>, CoreError> {
    parse_scheduled_at_in(input, &Local)
}

/// Parse a scheduled time.
///
/// Accepts RFC 3339 (`2026-03-01T09:30:00Z`) and the `datetime-local` forms
/// `YYYY-MM-DDTHH:MM` and `YYYY-MM-DDTHH:MM:SS`, which are read as wall-clock
/// time in `tz`. A wall-clock time skipped by a DST transition is rejected;
/// an ambiguous one resolves to the earlier instant.
pub fn parse_scheduled_at_in<Tz: TimeZone>(
    input: &str,
    tz: &Tz,
) -> Result<DateTime<Utc>, CoreError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoreError::EmptyTime);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::InvalidTime(input.to_owned()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::FixedOffset;
    use proptest::prelude::*;

    #[test]
    fn parses_rfc3339() {
        let at = parse_scheduled_at_in("2026-03-01T09:30:00+02:00", &Utc).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap());
    }

    #[test]
    fn parses_datetime_local_in_zone() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let at = parse_scheduled_at_in("2026-03-01T09:30", &tz).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn parses_datetime_local_with_seconds() {
        let at = parse_scheduled_at_in("2026-03-01T09:30:15", &Utc).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 15).unwrap());
    }

    #[test]
    fn rejects_empty_and_garbage_time() {
        assert_matches!(parse_scheduled_at_in("  ", &Utc), Err(CoreError::EmptyTime));
        assert_matches!(
            parse_scheduled_at_in("next tuesday", &Utc),
            Err(CoreError::InvalidTime(s)) if s == "next tuesday"
        );
    }

    #[test]
    fn new_reminder_trims_label() {
        let r = NewReminder::parse_in("  Call mom ", "2026-03-01T09:30", true, &Utc).unwrap();
        assert_eq!(r.label, "Call mom");
        assert!(r.wants_notification);
    }

    #[test]
    fn new_reminder_rejects_blank_label_before_time() {
        assert_matches!(
            NewReminder::parse_in("   ", "garbage", false, &Utc),
            Err(CoreError::EmptyLabel)
        );
    }

    #[test]
    fn reminder_serializes_camel_case() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let r = Reminder {
            id: ReminderId::from("r1"),
            owner_id: IdentityId::from("u1"),
            label: "x".into(),
            scheduled_at: at,
            wants_notification: false,
            created_at: at,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["wantsNotification"], false);
        assert!(json.get("scheduledAt").is_some());
    }

    #[test]
    fn identity_constructors() {
        assert!(!Identity::anonymous("a").authenticated);
        assert!(Identity::verified("b").authenticated);
    }

    proptest! {
        #[test]
        fn any_non_blank_label_is_accepted(label in "[a-zA-Z0-9 ]{0,8}[a-zA-Z0-9][a-zA-Z0-9 ]{0,8}") {
            let r = NewReminder::parse_in(&label, "2026-03-01T09:30", false, &Utc).unwrap();
            prop_assert_eq!(r.label, label.trim());
        }

        #[test]
        fn whitespace_labels_are_rejected(label in "[ \t]{0,6}") {
            prop_assert_eq!(
                NewReminder::parse_in(&label, "2026-03-01T09:30", false, &Utc),
                Err(CoreError::EmptyLabel)
            );
        }

        #[test]
        fn rfc3339_roundtrips(secs in 0i64..4_000_000_000) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            prop_assert_eq!(parse_scheduled_at_in(&at.to_rfc3339(), &Utc).unwrap(), at);
        }
    }
}
