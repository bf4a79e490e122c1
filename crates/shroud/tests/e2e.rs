// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests that drive the `shroud` binary.
//!
//! Each test writes its own config pointing at a temp database, so tests are
//! independent and order-insensitive. Passwords come from the environment.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const PASSWORD: &str = "correct-horse";

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("shroud.toml");
    let toml = format!(
        r#"
[vault]
pbkdf2_iterations = 200000

[storage]
database_path = "{}"
cache_dir = "{}"

[logging]
level = "warn"
"#,
        dir.join("vault.db").display(),
        dir.join("cache").display(),
    );
    std::fs::write(&path, toml).unwrap();
    path
}

fn shroud(config: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_shroud"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("SHROUD_VAULT_PASSWORD", PASSWORD)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn listed_ids(config: &Path) -> Vec<String> {
    let out = shroud(config, &["list", "--json"], None);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let entries: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key_id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn import_list_unlock_remove() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let out = shroud(
        &config,
        &["import", "--name", "Main wallet"],
        Some("ufvk-abc123-long-viewing-key\n"),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("Main wallet"));

    let ids = listed_ids(&config);
    assert_eq!(ids.len(), 1);
    let id = ids[0].as_str();

    let masked = shroud(&config, &["unlock", id], None);
    assert!(masked.status.success());
    assert_eq!(stdout(&masked).trim(), "ufvk...-key");

    let revealed = shroud(&config, &["unlock", id, "--reveal"], None);
    assert_eq!(stdout(&revealed).trim(), "ufvk-abc123-long-viewing-key");

    let removed = shroud(&config, &["remove", id, "--yes"], None);
    assert!(removed.status.success());
    assert!(listed_ids(&config).is_empty());
}

#[test]
fn wrong_password_is_reported_generically() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    shroud(&config, &["import"], Some("secret-value\n"));
    let id = listed_ids(&config).remove(0);

    let out = Command::new(env!("CARGO_BIN_EXE_shroud"))
        .arg("--config")
        .arg(&config)
        .args(["unlock", &id])
        .env("SHROUD_VAULT_PASSWORD", "wrong")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("incorrect password or corrupted key"));
}

#[test]
fn wipe_requires_confirmation_and_then_clears() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    shroud(&config, &["import"], Some("secret-value\n"));

    // No terminal, no --yes: nothing happens.
    let declined = shroud(&config, &["wipe"], None);
    assert!(declined.status.success());
    assert_eq!(listed_ids(&config).len(), 1);

    let wiped = shroud(&config, &["wipe", "--yes"], None);
    assert!(wiped.status.success(), "{}", String::from_utf8_lossy(&wiped.stderr));
    let report = stdout(&wiped);
    for backend in ["sessions", "vault", "query-cache", "cache-dir"] {
        assert!(report.contains(backend), "missing {backend} in {report}");
    }
    assert!(listed_ids(&config).is_empty());
}

#[test]
fn unknown_config_key_fails_with_suggestion() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("shroud.toml");
    std::fs::write(&config, "[session]\ndefault_tll_secs = 60\n").unwrap();

    let out = shroud(&config, &["list"], None);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("default_ttl_secs"));
}
