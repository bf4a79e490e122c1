// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-based layered loading.
//!
//! Lookup order: `/etc/shroud/shroud.toml`, `~/.config/shroud/shroud.toml`,
//! `./shroud.toml`, then `SHROUD_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ShroudConfig;

/// Config file name looked up in each directory of the hierarchy.
pub const CONFIG_FILE_NAME: &str = "shroud.toml";

/// Paths searched for config files, lowest precedence first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/shroud").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("shroud").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Builds the full figment (defaults, every file in the hierarchy, env vars)
/// without extracting it.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(ShroudConfig::default()));
    for path in config_search_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Loads configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<ShroudConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from one explicit file, still honouring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShroudConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShroudConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Loads configuration from an inline TOML string (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ShroudConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShroudConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `SHROUD_<SECTION>_<KEY>` maps to `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `SHROUD_SESSION_DEFAULT_TTL_SECS` lands on `session.default_ttl_secs`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("SHROUD_")
        .ignore(&["vault_password"])
        .map(|key| map_env_key(key.as_str()).into())
}

const SECTIONS: [&str; 5] = ["vault", "session", "storage", "events", "logging"];

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
