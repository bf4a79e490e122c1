// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::ShroudConfig;

/// Lowest PBKDF2 iteration count accepted for new blobs.
pub const MIN_PBKDF2_ITERATIONS: u32 = 200_000;
/// Lowest Argon2id memory cost (KiB) accepted for new blobs.
pub const MIN_ARGON2_MEMORY_COST: u32 = 32768;
pub const MIN_ARGON2_ITERATIONS: u32 = 2;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &ShroudConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let vault = &config.vault;
    if vault.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
        errors.push(ConfigError::validation(format!(
            "vault.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
            vault.pbkdf2_iterations
        )));
    }
    if vault.argon2_memory_cost < MIN_ARGON2_MEMORY_COST {
        errors.push(ConfigError::validation(format!(
            "vault.argon2_memory_cost must be at least {MIN_ARGON2_MEMORY_COST} (32 MiB), got {}",
            vault.argon2_memory_cost
        )));
    }
    if vault.argon2_iterations < MIN_ARGON2_ITERATIONS {
        errors.push(ConfigError::validation(format!(
            "vault.argon2_iterations must be at least {MIN_ARGON2_ITERATIONS}, got {}",
            vault.argon2_iterations
        )));
    }
    if vault.argon2_parallelism == 0 {
        errors.push(ConfigError::validation(
            "vault.argon2_parallelism must be at least 1",
        ));
    }

    if config.session.default_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "session.default_ttl_secs must be greater than zero",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }
    if let Some(dir) = &config.storage.cache_dir {
        if dir.trim().is_empty() {
            errors.push(ConfigError::validation(
                "storage.cache_dir must not be empty when set",
            ));
        }
    }

    if config.events.capacity == 0 {
        errors.push(ConfigError::validation(
            "events.capacity must be greater than zero",
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
