// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key is
//! a startup error instead of a silently ignored setting.

use serde::{Deserialize, Serialize};

/// Top-level Shroud configuration. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShroudConfig {
    /// Key-derivation settings for newly written blobs.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Session lifetime defaults.
    #[serde(default)]
    pub session: SessionConfig,

    /// Durable storage locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification bus settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which key-derivation function new blobs are written with.
///
/// Existing blobs are always read with the function recorded in their
/// version tag, regardless of this setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KdfAlgorithm {
    /// PBKDF2-HMAC-SHA256 (blob version 1).
    #[default]
    Pbkdf2Sha256,
    /// Argon2id v0x13 (blob version 2).
    Argon2id,
}

/// Credential vault configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    #[serde(default)]
    pub kdf: KdfAlgorithm,

    /// PBKDF2 iteration count (default: 250000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_argon2_memory_cost")]
    pub argon2_memory_cost: u32,

    /// Argon2id pass count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2id lanes (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf: KdfAlgorithm::default(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            argon2_memory_cost: default_argon2_memory_cost(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

fn default_pbkdf2_iterations() -> u32 {
    250_000
}

fn default_argon2_memory_cost() -> u32 {
    65536
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// TTL applied when the caller does not pick one (default: 15 minutes).
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    900
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite vault database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding structured on-disk caches. Erased by the panic wipe.
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Enable WAL journaling for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cache_dir: None,
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("shroud").join("vault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("vault.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Notification bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Broadcast buffer size. Slow subscribers beyond this lag and skip events.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    64
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
