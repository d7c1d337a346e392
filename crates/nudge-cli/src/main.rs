//! # nudge
//!
//! Line-oriented front end over in-memory backends. Reads commands from
//! stdin, prints notices, session changes, and reminder updates as they
//! happen, and logs delivered notifications to stderr.

#![deny(unsafe_code)]

mod command;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use nudge_auth::{MemoryIdentityProvider, MemoryProviderConfig};
use nudge_notify::{PermissionState, TracingNotifier};
use nudge_runtime::{Backends, ReminderApp};
use nudge_settings::NudgeSettings;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::command::{Command, HELP};

/// Starting notification permission for the simulated platform.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PermissionArg {
    /// Not asked yet; the `notify` prompt grants it.
    Default,
    Granted,
    Denied,
    /// The platform has no notifications.
    Unsupported,
}

impl PermissionArg {
    fn initial(self) -> PermissionState {
        match self {
            Self::Default => PermissionState::Default,
            Self::Granted => PermissionState::Granted,
            Self::Denied => PermissionState::Denied,
            Self::Unsupported => PermissionState::Unsupported,
        }
    }
}

/// Personal reminders with phone sign-in and local notifications.
#[derive(Parser, Debug)]
#[command(name = "nudge", version, about)]
struct Cli {
    /// Settings file (defaults to `~/.nudge/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, overriding the settings file. `RUST_LOG` still wins.
    #[arg(long)]
    log_level: Option<String>,

    /// Initial notification permission.
    #[arg(long, value_enum, default_value = "default")]
    permission: PermissionArg,

    /// Make the startup anonymous sign-in fail so the phone flow is needed.
    #[arg(long)]
    anonymous_fails: bool,
}

fn load_settings(path: Option<&PathBuf>) -> Result<NudgeSettings> {
    match path {
        Some(path) => nudge_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => nudge_settings::load_settings().context("Failed to load settings"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = load_settings(args.settings.as_ref())?;

    let level = args.log_level.as_deref().unwrap_or(&settings.logging.level);
    nudge_core::logging::init_subscriber(level);
    tracing::debug!(path = %settings.collection_path(), "settings loaded");

    let notifier = Arc::new(TracingNotifier::new(
        args.permission.initial(),
        PermissionState::Granted,
    ));
    let identity = Arc::new(MemoryIdentityProvider::new(MemoryProviderConfig {
        fail_anonymous: args.anonymous_fails,
        ..MemoryProviderConfig::from_settings(&settings.auth)
    }));
    let backends = Backends::in_memory(&settings, Arc::clone(&identity), notifier);
    let app = ReminderApp::new(&settings, backends);

    let result = run(&app, &identity).await;
    app.shutdown();
    result
}

async fn run(app: &ReminderApp, identity: &MemoryIdentityProvider) -> Result<()> {
    let mut notices = app.subscribe_notices();
    let mut auth = app.watch_auth();
    let mut reminders = app.watch_reminders();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    app.start();
    println!("nudge {} (type `help`)", nudge_core::constants::VERSION);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(cmd)) => execute(app, identity, cmd).await?,
                    Ok(None) => {}
                    Err(msg) => println!("{msg}"),
                }
            }
            notice = notices.recv() => match notice {
                Ok(n) => println!("{}", render::notice(&n)),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "notice stream lagged"),
                Err(RecvError::Closed) => break,
            },
            Ok(()) = auth.changed() => {
                let snapshot = auth.borrow_and_update().clone();
                println!("session: {}", render::session(&snapshot));
            }
            Ok(()) = reminders.changed() => {
                let count = reminders.borrow_and_update().len();
                println!("reminders: {count}");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

/// Run one command. Intent failures are already reported as notices.
async fn execute(
    app: &ReminderApp,
    identity: &MemoryIdentityProvider,
    cmd: Command,
) -> Result<()> {
    match cmd {
        Command::Solve => {
            identity.solve_pending_challenges();
            println!("challenge solved; the next `phone` request may proceed");
        }
        Command::Phone(number) => {
            let _ = app.submit_phone(&number).await;
        }
        Command::Otp(code) => {
            if let Err(e) = app.submit_otp(&code).await {
                tracing::debug!(error = %e, "OTP not accepted");
            }
        }
        Command::Add {
            time,
            notify,
            label,
        } => {
            if let Ok(id) = app.add_reminder(&label, &time, notify).await {
                println!("added {id}");
            }
        }
        Command::Delete(id) => {
            let _ = app.delete_reminder(&id).await;
        }
        Command::List => println!("{}", render::reminders(&app.reminders(), Utc::now())),
        Command::EnableNotifications => {
            let _ = app.enable_notifications().await;
        }
        Command::WhoAmI => {
            println!("{}", render::session(&app.auth_snapshot()));
            println!(
                "notifications: {} ({} pending)",
                app.permission_state(),
                app.pending_notifications()
            );
        }
        Command::State => {
            let json = serde_json::to_string_pretty(&app.state())
                .context("Failed to serialize state")?;
            println!("{json}");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}
