// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands.

use std::io::{BufRead, IsTerminal, Write};

use colored::Colorize;
use secrecy::ExposeSecret;
use shroud_core::{KeyId, ShroudError, VaultIndexEntry};
use shroud_keyring::{BackendOutcome, Keyring, WipeReport};
use shroud_vault::{ImportOptions, mask_secret, prompt};

pub async fn run_import(
    keyring: &Keyring,
    name: Option<String>,
    color: Option<String>,
) -> Result<(), ShroudError> {
    let secret = prompt::read_secret("Secret to import")?;
    let password = prompt::read_new_password("Password for this credential")?;
    let entry = keyring
        .import_credential(
            &secret,
            &password,
            ImportOptions {
                display_name: name,
                color_tag: color,
            },
        )
        .await?;
    println!(
        "{} {} ({})",
        "imported".green(),
        entry.display_name.bold(),
        entry.key_id
    );
    Ok(())
}

pub async fn run_list(keyring: &Keyring, json: bool) -> Result<(), ShroudError> {
    let entries = keyring.list_credentials().await?;
    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| ShroudError::Internal(format!("failed to serialize listing: {e}")))?;
        println!("{out}");
        return Ok(());
    }
    if entries.is_empty() {
        println!("{}", "vault is empty".dimmed());
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

pub async fn run_unlock(keyring: &Keyring, key_id: &KeyId, reveal: bool) -> Result<(), ShroudError> {
    let entry = require_entry(keyring, key_id).await?;
    let password = prompt::read_password(&format!("Password for {}", entry.display_name))?;
    let secret = keyring.unlock_credential(key_id, &password).await?;
    if reveal {
        println!("{}", secret.expose_secret());
    } else {
        println!("{}", mask_secret(secret.expose_secret()));
    }
    Ok(())
}

pub async fn run_rename(keyring: &Keyring, key_id: &KeyId, name: &str) -> Result<(), ShroudError> {
    let entry = keyring.rename_credential(key_id, name).await?;
    println!("{} {}", "renamed".green(), format_entry(&entry));
    Ok(())
}

pub async fn run_remove(keyring: &Keyring, key_id: &KeyId, yes: bool) -> Result<(), ShroudError> {
    let entry = require_entry(keyring, key_id).await?;
    if !yes && !confirm(&format!("Delete {} permanently?", entry.display_name))? {
        println!("{}", "aborted".dimmed());
        return Ok(());
    }
    keyring.remove_credential(key_id).await?;
    println!("{} {}", "removed".yellow(), entry.display_name);
    Ok(())
}

pub async fn run_passwd(keyring: &Keyring, key_id: &KeyId) -> Result<(), ShroudError> {
    let entry = require_entry(keyring, key_id).await?;
    let old = prompt::read_password(&format!("Current password for {}", entry.display_name))?;
    let new = prompt::read_new_password("New password")?;
    keyring.change_password(key_id, &old, &new).await?;
    println!("{} {}", "password changed for".green(), entry.display_name);
    Ok(())
}

pub async fn run_wipe(keyring: &Keyring, yes: bool) -> Result<(), ShroudError> {
    if !yes && !confirm("Erase ALL credentials, sessions and caches? This cannot be undone.")? {
        println!("{}", "aborted".dimmed());
        return Ok(());
    }
    let report = keyring.wipe_everything().await;
    print_wipe_report(&report);
    if report.is_complete() {
        Ok(())
    } else {
        Err(ShroudError::persistence(format!(
            "could not clear: {}",
            report.failed_backends().join(", ")
        )))
    }
}

pub(crate) fn print_wipe_report(report: &WipeReport) {
    for result in report.results() {
        match &result.outcome {
            BackendOutcome::Cleared => println!("  {} {}", "cleared".green(), result.backend),
            BackendOutcome::Failed { reason } => {
                println!("  {} {}: {reason}", "FAILED".red().bold(), result.backend)
            }
        }
    }
}

pub(crate) fn format_entry(entry: &VaultIndexEntry) -> String {
    format!(
        "{}  {}  {}  {}",
        entry.key_id.as_str().dimmed(),
        entry.display_name.bold(),
        entry.color_tag,
        entry.created_at.format("%Y-%m-%d %H:%M")
    )
}

/// Format seconds into a short human-readable duration.
pub(crate) fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {}s", secs % 60)
    } else {
        format!("{secs}s")
    }
}

async fn require_entry(keyring: &Keyring, key_id: &KeyId) -> Result<VaultIndexEntry, ShroudError> {
    keyring
        .vault()
        .get_credential(key_id)
        .await?
        .ok_or_else(|| ShroudError::CredentialNotFound {
            key_id: key_id.to_string(),
        })
}

/// Asks a yes/no question. Without a terminal the answer is no.
pub(crate) fn confirm(question: &str) -> Result<bool, ShroudError> {
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }
    eprint!("{question} [y/N] ");
    std::io::stderr()
        .flush()
        .map_err(|e| ShroudError::Internal(format!("failed to write prompt: {e}")))?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| ShroudError::InvalidInput(format!("failed to read answer: {e}")))?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_formats() {
        assert_eq!(format_remaining(-5), "0s");
        assert_eq!(format_remaining(42), "42s");
        assert_eq!(format_remaining(14 * 60 + 59), "14m 59s");
        assert_eq!(format_remaining(3600 + 120), "1h 2m");
        assert_eq!(format_remaining(3 * 86400 + 7200), "3d 2h");
    }
}
