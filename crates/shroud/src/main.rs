// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shroud - a local encrypted credential vault.
//!
//! This is the binary entry point.

mod commands;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use shroud_config::ShroudConfig;
use shroud_keyring::Keyring;

/// Shroud - a local encrypted credential vault.
#[derive(Parser, Debug)]
#[command(name = "shroud", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a secret read from the terminal (or one line of stdin).
    Import {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// List stored credentials. Never shows secrets.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Decrypt a credential and print it, masked unless --reveal.
    Unlock {
        key_id: String,
        #[arg(long)]
        reveal: bool,
    },
    /// Change a credential's display name.
    Rename { key_id: String, name: String },
    /// Delete a credential permanently.
    Remove {
        key_id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Re-encrypt a credential under a new password.
    Passwd { key_id: String },
    /// Erase every credential, session and cache. Irreversible.
    Wipe {
        #[arg(long)]
        yes: bool,
    },
    /// Interactive shell where unlock sessions last for the process lifetime.
    Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => shroud_config::load_and_validate_path(path),
        None => shroud_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            shroud_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging.level);

    let Some(command) = cli.command else {
        println!("shroud: use --help for available commands");
        return;
    };

    if let Err(e) = run(command, &config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &ShroudConfig) -> Result<(), shroud_core::ShroudError> {
    let keyring = Keyring::open(config).await?;
    match command {
        Commands::Import { name, color } => commands::run_import(&keyring, name, color).await,
        Commands::List { json } => commands::run_list(&keyring, json).await,
        Commands::Unlock { key_id, reveal } => {
            commands::run_unlock(&keyring, &key_id.into(), reveal).await
        }
        Commands::Rename { key_id, name } => {
            commands::run_rename(&keyring, &key_id.into(), &name).await
        }
        Commands::Remove { key_id, yes } => {
            commands::run_remove(&keyring, &key_id.into(), yes).await
        }
        Commands::Passwd { key_id } => commands::run_passwd(&keyring, &key_id.into()).await,
        Commands::Wipe { yes } => commands::run_wipe(&keyring, yes).await,
        Commands::Shell => shell::run_shell(&keyring).await,
    }
}

/// Initialize tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shroud={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_unlock_with_reveal() {
        let cli = Cli::try_parse_from(["shroud", "unlock", "key_1_deadbeef", "--reveal"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Unlock { ref key_id, reveal: true }) if key_id == "key_1_deadbeef"
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["shroud", "list", "--json", "--config", "/tmp/s.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
    }
}
