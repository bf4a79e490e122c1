// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password and secret acquisition via TTY prompt or environment variable.

use std::io::IsTerminal;

use secrecy::SecretString;
use shroud_core::ShroudError;

/// Headless password source (CI, scripts, containers).
pub const VAULT_PASSWORD_ENV_VAR: &str = "SHROUD_VAULT_PASSWORD";

fn from_env() -> Option<SecretString> {
    std::env::var(VAULT_PASSWORD_ENV_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

fn read_hidden(label: &str) -> Result<String, ShroudError> {
    eprint!("{label}: ");
    rpassword::read_password()
        .map_err(|e| ShroudError::InvalidInput(format!("failed to read from terminal: {e}")))
}

fn no_terminal() -> ShroudError {
    ShroudError::InvalidInput(format!(
        "no password available: set {VAULT_PASSWORD_ENV_VAR} or run interactively"
    ))
}

/// Password for an existing credential.
///
/// `SHROUD_VAULT_PASSWORD` wins; otherwise prompts on the terminal.
pub fn read_password(label: &str) -> Result<SecretString, ShroudError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_terminal());
    }
    let password = read_hidden(label)?;
    if password.is_empty() {
        return Err(ShroudError::InvalidInput("empty password not allowed".to_string()));
    }
    Ok(SecretString::from(password))
}

/// New password, typed twice on a terminal. The env var needs no confirmation.
pub fn read_new_password(label: &str) -> Result<SecretString, ShroudError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_terminal());
    }
    let first = read_hidden(label)?;
    let second = read_hidden("Confirm")?;
    if first != second {
        return Err(ShroudError::InvalidInput("passwords do not match".to_string()));
    }
    if first.is_empty() {
        return Err(ShroudError::InvalidInput("empty password not allowed".to_string()));
    }
    Ok(SecretString::from(first))
}

/// The secret being imported. Hidden on a terminal, one line from a pipe.
pub fn read_secret(label: &str) -> Result<SecretString, ShroudError> {
    if std::io::stdin().is_terminal() {
        return read_hidden(label).map(SecretString::from);
    }
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| ShroudError::InvalidInput(format!("failed to read secret from stdin: {e}")))?;
    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(SecretString::from(line))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn env_var_supplies_password() {
        // SAFETY: serialized; no other test thread touches the environment.
        unsafe { std::env::set_var(VAULT_PASSWORD_ENV_VAR, "from-env") };
        let pw = read_password("Password");
        let new_pw = read_new_password("New password");
        unsafe { std::env::remove_var(VAULT_PASSWORD_ENV_VAR) };

        assert_eq!(pw.unwrap().expose_secret(), "from-env");
        assert_eq!(new_pw.unwrap().expose_secret(), "from-env");
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        // SAFETY: serialized; no other test thread touches the environment.
        unsafe { std::env::set_var(VAULT_PASSWORD_ENV_VAR, "") };
        let env = from_env();
        unsafe { std::env::remove_var(VAULT_PASSWORD_ENV_VAR) };
        assert!(env.is_none());
    }
}
