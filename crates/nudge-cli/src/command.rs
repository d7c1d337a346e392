//! REPL command parsing.

use nudge_core::ReminderId;
use nudge_settings::loader::parse_bool;

/// One line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `phone <number>`
    Phone(String),
    /// `otp <code>`
    Otp(String),
    /// `solve`: complete the visible verification challenge.
    Solve,
    /// `add <time> <yes|no> <label…>`
    Add {
        /// Scheduled time as typed.
        time: String,
        /// Whether to schedule a notification.
        notify: bool,
        /// Label; may contain spaces.
        label: String,
    },
    /// `del <id>`
    Delete(ReminderId),
    /// `list`
    List,
    /// `notify`
    EnableNotifications,
    /// `whoami`
    WhoAmI,
    /// `state`
    State,
    /// `help`
    Help,
    /// `quit` / `exit`
    Quit,
}

/// Usage text printed by `help`.
pub const HELP: &str = "\
commands:
  phone <number>                request an OTP, e.g. phone +15551234567
  otp <code>                    confirm the OTP
  solve                         complete the verification challenge (challengeSize normal)
  add <time> <yes|no> <label>   add a reminder; time is RFC 3339 or YYYY-MM-DDTHH:MM
  del <id>                      delete a reminder
  list                          show reminders
  notify                        ask for notification permission
  whoami                        show the session
  state                         dump the full state as JSON
  quit                          exit";

impl Command {
    /// Parse a line. Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let Some((word, rest)) = split_word(line) else {
            return Ok(None);
        };

        let cmd = match word {
            "phone" => Self::Phone(required(rest, "phone <number>")?.to_owned()),
            "otp" => Self::Otp(required(rest, "otp <code>")?.to_owned()),
            "solve" => Self::Solve,
            "add" => parse_add(rest)?,
            "del" | "delete" => Self::Delete(ReminderId::from(required(rest, "del <id>")?)),
            "list" | "ls" => Self::List,
            "notify" => Self::EnableNotifications,
            "whoami" => Self::WhoAmI,
            "state" => Self::State,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command: {other} (try `help`)")),
        };
        Ok(Some(cmd))
    }
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    })
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    let rest = rest.trim();
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest)
    }
}

fn parse_add(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "usage: add <time> <yes|no> <label>";
    let (time, rest) = split_word(rest).ok_or(USAGE)?;
    let (flag, label) = split_word(rest).ok_or(USAGE)?;
    let notify = parse_bool(flag).ok_or_else(|| format!("expected yes or no, got {flag}"))?;
    // An empty label goes through so validation can report it.
    Ok(Command::Add {
        time: time.to_owned(),
        notify,
        label: label.trim().to_owned(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
