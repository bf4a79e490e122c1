// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Unknown keys get a "did you mean" hint from Jaro-Winkler similarity and,
//! when the offending file is known, a labelled span into its source.

#![allow(unused_assignments)] // generated by the miette Diagnostic derive

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity below this produces no suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A single configuration problem, renderable with miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(shroud::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), expected))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        expected: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid value for `{key}`: found {found}")]
    #[diagnostic(code(shroud::config::invalid_value), help("expected {expected}"))]
    InvalidValue {
        key: String,
        found: String,
        expected: String,
    },

    /// A value parsed fine but violates a semantic constraint.
    #[error("{message}")]
    #[diagnostic(code(shroud::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(shroud::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, expected: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? expected one of: {expected}"),
        None => format!("expected one of: {expected}"),
    }
}

/// Splits a figment error (which may hold several) into diagnostics.
///
/// `sources` pairs a file path with that file's contents so unknown-key
/// errors can point at the exact line.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let dotted = error.path.join(".");
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, field, sources);
                    ConfigError::UnknownKey {
                        key: if dotted.is_empty() {
                            field.clone()
                        } else {
                            format!("{dotted}.{field}")
                        },
                        suggestion: suggest_key(field, expected),
                        expected: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(found, expected) => ConfigError::InvalidValue {
                    key: dotted,
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                Kind::InvalidValue(found, expected) => ConfigError::InvalidValue {
                    key: dotted,
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                Kind::UnknownVariant(found, expected) => ConfigError::InvalidValue {
                    key: dotted,
                    found: format!("`{found}`"),
                    expected: format!("one of: {}", expected.join(", ")),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn locate(
    error: &figment::error::Error,
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => path.display().to_string(),
        // Inline strings have no file source; fall back to the only source given.
        _ if sources.len() == 1 => sources[0].0.clone(),
        _ => return (None, None),
    };

    let Some((name, content)) = sources.iter().find(|(p, _)| *p == origin) else {
        return (None, None);
    };

    match find_key_offset(content, error.path.first().map(String::as_str), field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside `[section]` (or the top level).
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let start = match section {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && section.is_some() && offset > start {
            // Walked into the next table.
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(field) {
            if rest.trim_start().starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid: &[&str]) -> Option<String> {
    valid
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Prints each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_key() {
        let valid = ["pbkdf2_iterations", "argon2_memory_cost", "kdf"];
        assert_eq!(
            suggest_key("pbkdf2_iteration", &valid).as_deref(),
            Some("pbkdf2_iterations")
        );
    }

    #[test]
    fn no_suggestion_for_unrelated_key() {
        let valid = ["default_ttl_secs"];
        assert_eq!(suggest_key("qqqq", &valid), None);
    }

    #[test]
    fn finds_key_inside_its_section() {
        let content = "[storage]\nwal_mode = true\n\n[session]\ndefault_tl_secs = 5\n";
        let offset = find_key_offset(content, Some("session"), "default_tl_secs").unwrap();
        assert_eq!(&content[offset..offset + 15], "default_tl_secs");
    }

    #[test]
    fn stops_at_next_table() {
        let content = "[storage]\nwal_mode = true\n[session]\nwal_mode = 1\n";
        let offset = find_key_offset(content, Some("storage"), "wal_mode").unwrap();
        assert_eq!(offset, "[storage]\n".len());
        assert_eq!(find_key_offset(content, Some("logging"), "wal_mode"), None);
    }
}
