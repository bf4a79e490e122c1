// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! After `clear`, no ciphertext bytes survive in the database file or its WAL.

use chrono::Utc;
use shroud_core::{BlobRecord, CredentialStore, KeyId, VaultIndexEntry};
use shroud_storage::{Database, SqliteCredentialStore};

const MARKER: &[u8] = b"SHROUD-CIPHERTEXT-MARKER-0123456789";

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn read_all(path: &std::path::Path) -> Vec<u8> {
    let mut bytes = std::fs::read(path).unwrap_or_default();
    let mut wal = path.as_os_str().to_owned();
    wal.push("-wal");
    bytes.extend(std::fs::read(std::path::PathBuf::from(wal)).unwrap_or_default());
    bytes
}

#[tokio::test]
async fn cleared_ciphertext_is_not_recoverable_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    let store = SqliteCredentialStore::new(db.clone());

    for i in 0..8 {
        let key_id = KeyId::from(format!("key_{i}"));
        store
            .put_blob(&BlobRecord {
                key_id: key_id.clone(),
                version: 1,
                kdf_params: "{}".into(),
                salt: vec![0; 16],
                nonce: vec![0; 12],
                ciphertext: MARKER.to_vec(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .put_index_entry(&VaultIndexEntry {
                key_id,
                display_name: format!("Key {i}"),
                color_tag: "#000000".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }
    db.checkpoint().await.unwrap();
    assert!(contains(&read_all(&path), MARKER));

    store.clear().await.unwrap();
    db.close().await.unwrap();

    assert!(!contains(&read_all(&path), MARKER));
}
