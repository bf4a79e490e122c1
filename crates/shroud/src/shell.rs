// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shroud shell` command implementation.
//!
//! An interactive REPL with readline history. Unlocked secrets stay in the
//! session manager until their TTL runs out, they are locked, or the shell
//! exits. Auto-lock notices are printed as they happen.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use secrecy::ExposeSecret;
use shroud_bus::{LockReason, VaultEvent};
use shroud_core::{KeyId, ShroudError};
use shroud_keyring::Keyring;
use shroud_session::SessionTtl;
use shroud_vault::{mask_secret, prompt};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::commands::{confirm, format_entry, format_remaining, print_wipe_report};

const HELP: &str = "\
commands:
  list                    stored credentials
  unlock <id> [ttl]       decrypt and hold in a session (15m, 1h, 24h, persistent, 90s)
  secret <id> [reveal]    show the held secret, masked unless 'reveal'
  sessions                active sessions and time left
  lock <id>               end one session
  lock-all                end every session
  wipe                    erase everything
  quit                    leave (all sessions end)";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Help,
    List,
    Unlock { key_id: KeyId, ttl: Option<SessionTtl> },
    Secret { key_id: KeyId, reveal: bool },
    Sessions,
    Lock { key_id: KeyId },
    LockAll,
    Wipe,
    Quit,
}

fn parse_command(line: &str) -> Result<ShellCommand, ShroudError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(ShroudError::InvalidInput("empty command".to_string()));
    };
    let args: Vec<&str> = words.collect();
    let key_arg = |usage: &str| -> Result<KeyId, ShroudError> {
        args.first()
            .map(|id| KeyId::from(*id))
            .ok_or_else(|| ShroudError::InvalidInput(format!("usage: {usage}")))
    };

    let command = match verb.trim_start_matches('/') {
        "help" | "?" => ShellCommand::Help,
        "list" | "ls" => ShellCommand::List,
        "unlock" => ShellCommand::Unlock {
            key_id: key_arg("unlock <id> [ttl]")?,
            ttl: args.get(1).map(|t| t.parse()).transpose()?,
        },
        "secret" => ShellCommand::Secret {
            key_id: key_arg("secret <id> [reveal]")?,
            reveal: args.get(1).is_some_and(|a| *a == "reveal"),
        },
        "sessions" => ShellCommand::Sessions,
        "lock" => ShellCommand::Lock {
            key_id: key_arg("lock <id>")?,
        },
        "lock-all" => ShellCommand::LockAll,
        "wipe" => ShellCommand::Wipe,
        "quit" | "exit" => ShellCommand::Quit,
        other => {
            return Err(ShroudError::InvalidInput(format!(
                "unknown command `{other}` (try `help`)"
            )));
        }
    };
    Ok(command)
}

/// Runs the `shroud shell` interactive REPL.
pub async fn run_shell(keyring: &Keyring) -> Result<(), ShroudError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| ShroudError::Internal(format!("failed to initialize readline: {e}")))?;

    let mut events = keyring.subscribe();
    let notifier = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let VaultEvent::SessionLocked {
                        key_id,
                        reason: LockReason::Expired,
                    } = event.event
                    {
                        eprintln!("{}", format!("[auto-locked {key_id}]").dimmed());
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}", "shroud shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    let prompt = format!("{}> ", "shroud".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match parse_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}: {e}", "error".red());
                        continue;
                    }
                };
                if command == ShellCommand::Quit {
                    break;
                }
                if let Err(e) = handle_command(keyring, command).await {
                    match &e {
                        ShroudError::DecryptionFailed => eprintln!("{}", e.to_string().yellow()),
                        _ => eprintln!("{}: {e}", "error".red()),
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    notifier.abort();
    let locked = keyring.lock_all();
    debug!(locked, "shell exiting");
    println!("{}", "all sessions locked, goodbye".dimmed());
    Ok(())
}

async fn handle_command(keyring: &Keyring, command: ShellCommand) -> Result<(), ShroudError> {
    match command {
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::List => {
            let entries = keyring.list_credentials().await?;
            if entries.is_empty() {
                println!("{}", "vault is empty".dimmed());
            }
            for entry in &entries {
                let marker = if keyring.sessions().is_active(&entry.key_id) {
                    "unlocked".green()
                } else {
                    "locked".dimmed()
                };
                println!("{}  {marker}", format_entry(entry));
            }
        }
        ShellCommand::Unlock { key_id, ttl } => {
            let password = prompt::read_password(&format!("Password for {key_id}"))?;
            let info = keyring.unlock_and_start(&key_id, &password, ttl).await?;
            let remaining = info.remaining_secs(keyring.sessions().now());
            println!(
                "{} {key_id} for {}",
                "unlocked".green(),
                format_remaining(remaining)
            );
        }
        ShellCommand::Secret { key_id, reveal } => {
            let secret = keyring.require_active_secret(&key_id)?;
            if reveal {
                println!("{}", secret.expose_secret());
            } else {
                println!("{}", mask_secret(secret.expose_secret()));
            }
        }
        ShellCommand::Sessions => {
            let now = keyring.sessions().now();
            let sessions = keyring.list_active_sessions();
            if sessions.is_empty() {
                println!("{}", "no active sessions".dimmed());
            }
            for info in sessions {
                println!(
                    "{}  {} left",
                    info.key_id,
                    format_remaining(info.remaining_secs(now)).yellow()
                );
            }
        }
        ShellCommand::Lock { key_id } => {
            if keyring.lock(&key_id) {
                println!("{} {key_id}", "locked".yellow());
            } else {
                println!("{}", format!("{key_id} was not unlocked").dimmed());
            }
        }
        ShellCommand::LockAll => {
            let n = keyring.lock_all();
            println!("{} {n} session(s)", "locked".yellow());
        }
        ShellCommand::Wipe => {
            if confirm("Erase ALL credentials, sessions and caches?")? {
                let report = keyring.wipe_everything().await;
                print_wipe_report(&report);
            } else {
                println!("{}", "aborted".dimmed());
            }
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}
