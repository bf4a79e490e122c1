// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Shroud credential vault.
//!
//! TOML files from the usual hierarchy, `SHROUD_*` environment overrides,
//! strict unknown-key rejection, and miette diagnostics on failure.
//!
//! ```no_run
//! let config = shroud_config::load_and_validate().expect("config errors");
//! println!("vault at {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    EventsConfig, KdfAlgorithm, LoggingConfig, SessionConfig, ShroudConfig, StorageConfig,
    VaultConfig,
};

/// Loads from the standard hierarchy, then validates.
pub fn load_and_validate() -> Result<ShroudConfig, Vec<ConfigError>> {
    finish(loader::load_config(), read_sources)
}

/// Loads one explicit file (plus env overrides), then validates.
pub fn load_and_validate_path(path: &Path) -> Result<ShroudConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Loads from an inline TOML string, then validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<ShroudConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<ShroudConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<ShroudConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_sources() -> Vec<(String, String)> {
    loader::config_search_paths()
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
