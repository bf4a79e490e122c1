// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Records shared between the vault, the storage backends, and the session manager.
//!
//! Nothing in this module may hold secret material. The only secret-bearing
//! value in a [`BlobRecord`] is the ciphertext, which is opaque without the
//! user's password.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Globally unique identifier of a stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(pub String);

impl KeyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        KeyId(s.to_string())
    }
}

impl From<String> for KeyId {
    fn from(s: String) -> Self {
        KeyId(s)
    }
}

impl AsRef<str> for KeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plaintext metadata describing one credential. Safe to list without a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultIndexEntry {
    pub key_id: KeyId,
    pub display_name: String,
    pub color_tag: String,
    pub created_at: DateTime<Utc>,
}

/// One encrypted-at-rest record exactly as a backend persists it.
///
/// `version` selects the decoder; `kdf_params` is the JSON parameter object
/// for that version's key-derivation function. Backends never interpret
/// these fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    pub key_id: KeyId,
    pub version: u32,
    pub kdf_params: String,
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_serializes_as_bare_string() {
        let id = KeyId::from("key_1700000000000_0badcafe");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"key_1700000000000_0badcafe\"");
        let back: KeyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn index_entry_json_has_no_secret_fields() {
        let entry = VaultIndexEntry {
            key_id: KeyId::from("key_1_00000001"),
            display_name: "Main wallet".into(),
            color_tag: "#f4b728".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["color_tag", "created_at", "display_name", "key_id"]);
    }
}
