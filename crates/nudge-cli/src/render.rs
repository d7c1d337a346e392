//! Plain-text rendering of application state.

use chrono::{DateTime, Local, Utc};
use nudge_auth::{AuthSnapshot, AuthState, PhoneVerification};
use nudge_core::{Notice, NoticeKind, Reminder};

/// One-line session summary.
pub fn session(snapshot: &AuthSnapshot) -> String {
    match &snapshot.state {
        AuthState::Authenticated(identity) => {
            let kind = if identity.authenticated {
                "verified"
            } else {
                "anonymous"
            };
            format!("signed in ({kind}) as {}", identity.id)
        }
        AuthState::Unauthenticated => match &snapshot.verification {
            PhoneVerification::Idle => "signed out; use `phone <number>`".to_string(),
            PhoneVerification::AwaitingChallengeSolve => "signed out; sending OTP".to_string(),
            PhoneVerification::OtpRequested(_) => "signed out; enter `otp <code>`".to_string(),
            PhoneVerification::Verifying(_) => "signed out; verifying code".to_string(),
        },
    }
}

/// Notice line, tagged by kind.
pub fn notice(notice: &Notice) -> String {
    match notice.kind {
        NoticeKind::Info => format!("[info] {}", notice.text),
        NoticeKind::Error => format!("[error] {}", notice.text),
    }
}

/// Reminder table sorted by time, with local timestamps.
pub fn reminders(reminders: &[Reminder], now: DateTime<Utc>) -> String {
    if reminders.is_empty() {
        return "no reminders".to_string();
    }
    let mut sorted: Vec<&Reminder> = reminders.iter().collect();
    sorted.sort_by_key(|r| r.scheduled_at);

    let mut out = String::new();
    for r in sorted {
        let when = r.scheduled_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        let bell = if r.wants_notification { "*" } else { " " };
        let past = if r.scheduled_at <= now { " (past)" } else { "" };
        out.push_str(&format!("{bell} {when}  {}{past}  [{}]\n", r.label, r.id));
    }
    out.pop();
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nudge_core::{Identity, ReminderId, VerificationHandle};

    fn reminder(id: &str, label: &str, hour: u32, notify: bool) -> Reminder {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap();
        Reminder {
            id: ReminderId::from(id),
            owner_id: "u1".into(),
            label: label.into(),
            scheduled_at: at,
            wants_notification: notify,
            created_at: at,
        }
    }

    #[test]
    fn session_lines() {
        let snap = AuthSnapshot {
            state: AuthState::Authenticated(Identity::anonymous("u1")),
            verification: PhoneVerification::Idle,
        };
        assert_eq!(session(&snap), "signed in (anonymous) as u1");

        let snap = AuthSnapshot {
            state: AuthState::Unauthenticated,
            verification: PhoneVerification::OtpRequested(VerificationHandle::from("h")),
        };
        assert!(session(&snap).contains("otp <code>"));
    }

    #[test]
    fn reminders_sorted_and_marked() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0).unwrap();
        let text = reminders(
            &[reminder("b", "later", 12, true), reminder("a", "earlier", 9, false)],
            now,
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("earlier") && lines[0].contains("(past)"));
        assert!(lines[1].starts_with('*') && lines[1].contains("[b]"));
    }

    #[test]
    fn empty_list() {
        assert_eq!(reminders(&[], Utc::now()), "no reminders");
    }
}
