// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! VaultStore behaviour over the SQLite backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use secrecy::{ExposeSecret, SecretString};
use shroud_bus::EventBus;
use shroud_core::{BlobRecord, CredentialStore, KeyId, ShroudError, VaultIndexEntry};
use shroud_storage::{Database, SqliteCredentialStore};
use shroud_vault::{ImportOptions, KdfParams, VaultStore};

const V1: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 1_000 };
const V2: KdfParams = KdfParams::Argon2id {
    memory_cost: 1024,
    iterations: 1,
    parallelism: 1,
};

fn s(v: &str) -> SecretString {
    SecretString::from(v.to_string())
}

async fn sqlite() -> Arc<SqliteCredentialStore> {
    Arc::new(SqliteCredentialStore::new(
        Database::open_in_memory().await.unwrap(),
    ))
}

/// Flips one ciphertext bit on the next blob write, simulating a bad disk.
struct CorruptOnce {
    inner: Arc<SqliteCredentialStore>,
    armed: AtomicBool,
}

#[async_trait]
impl CredentialStore for CorruptOnce {
    fn backend_name(&self) -> &str {
        "corrupt-once"
    }
    async fn put_blob(&self, record: &BlobRecord) -> Result<(), ShroudError> {
        let mut record = record.clone();
        if self.armed.swap(false, Ordering::SeqCst) {
            record.ciphertext[0] ^= 0x80;
        }
        self.inner.put_blob(&record).await
    }
    async fn get_blob(&self, key_id: &KeyId) -> Result<Option<BlobRecord>, ShroudError> {
        self.inner.get_blob(key_id).await
    }
    async fn delete_blob(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        self.inner.delete_blob(key_id).await
    }
    async fn put_index_entry(&self, entry: &VaultIndexEntry) -> Result<(), ShroudError> {
        self.inner.put_index_entry(entry).await
    }
    async fn get_index_entry(&self, key_id: &KeyId) -> Result<Option<VaultIndexEntry>, ShroudError> {
        self.inner.get_index_entry(key_id).await
    }
    async fn list_index(&self) -> Result<Vec<VaultIndexEntry>, ShroudError> {
        self.inner.list_index().await
    }
    async fn rename(&self, key_id: &KeyId, name: &str) -> Result<bool, ShroudError> {
        self.inner.rename(key_id, name).await
    }
    async fn recolor(&self, key_id: &KeyId, color: &str) -> Result<bool, ShroudError> {
        self.inner.recolor(key_id, color).await
    }
    async fn delete_credential(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        self.inner.delete_credential(key_id).await
    }
    async fn sweep_orphans(&self) -> Result<usize, ShroudError> {
        self.inner.sweep_orphans().await
    }
    async fn clear(&self) -> Result<(), ShroudError> {
        self.inner.clear().await
    }
}

#[tokio::test]
async fn corrupted_write_is_rolled_back() {
    let inner = sqlite().await;
    let store = Arc::new(CorruptOnce {
        inner: inner.clone(),
        armed: AtomicBool::new(true),
    });
    let bus = EventBus::new(8);
    let mut rx = bus.subscribe();
    let vault = VaultStore::new(store, V1, bus);

    let err = vault
        .import_credential(&s("secret"), &s("pw"), ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ShroudError::ImportVerificationFailed { .. }));

    // Nothing discoverable, nothing left behind, nothing announced.
    assert!(vault.list_credentials().await.unwrap().is_empty());
    assert_eq!(inner.sweep_orphans().await.unwrap(), 0);
    assert!(rx.try_recv().is_err());

    // The next import goes through normally.
    let entry = vault
        .import_credential(&s("secret"), &s("pw"), ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(
        vault.unlock_credential(&entry.key_id, &s("pw")).await.unwrap().expose_secret(),
        "secret"
    );
}

#[tokio::test]
async fn old_versions_stay_readable_after_kdf_switch() {
    let backend = sqlite().await;
    let v1_vault = VaultStore::new(backend.clone(), V1, EventBus::default());
    let old = v1_vault
        .import_credential(&s("legacy"), &s("pw"), ImportOptions::default())
        .await
        .unwrap();

    let v2_vault = VaultStore::new(backend.clone(), V2, EventBus::default());
    let new = v2_vault
        .import_credential(&s("modern"), &s("pw"), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(backend.get_blob(&old.key_id).await.unwrap().unwrap().version, 1);
    assert_eq!(backend.get_blob(&new.key_id).await.unwrap().unwrap().version, 2);
    assert_eq!(
        v2_vault.unlock_credential(&old.key_id, &s("pw")).await.unwrap().expose_secret(),
        "legacy"
    );

    // Re-keying upgrades to the configured KDF.
    v2_vault.change_password(&old.key_id, &s("pw"), &s("pw2")).await.unwrap();
    assert_eq!(backend.get_blob(&old.key_id).await.unwrap().unwrap().version, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_imports_get_distinct_ids() {
    let vault = Arc::new(VaultStore::new(sqlite().await, V1, EventBus::default()));
    let mut handles = Vec::new();
    for i in 0..8 {
        let vault = vault.clone();
        handles.push(tokio::spawn(async move {
            vault
                .import_credential(&s(&format!("secret-{i}")), &s("pw"), ImportOptions::default())
                .await
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().key_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(vault.list_credentials().await.unwrap().len(), 8);
}

#[tokio::test]
async fn wrong_password_never_reveals_which_part_failed() {
    let vault = VaultStore::new(sqlite().await, V1, EventBus::default());
    let entry = vault
        .import_credential(&s("secret"), &s("right"), ImportOptions::default())
        .await
        .unwrap();
    let err = vault.unlock_credential(&entry.key_id, &s("wrong")).await.unwrap_err();
    assert!(matches!(err, ShroudError::DecryptionFailed));
    assert_eq!(err.to_string(), "incorrect password or corrupted key");
}

#[tokio::test]
async fn failed_rekey_restores_previous_blob() {
    let inner = sqlite().await;
    let store = Arc::new(CorruptOnce {
        inner: inner.clone(),
        armed: AtomicBool::new(false),
    });
    let vault = VaultStore::new(store.clone(), V1, EventBus::default());
    let entry = vault
        .import_credential(&s("secret"), &s("old"), ImportOptions::default())
        .await
        .unwrap();
    let before = inner.get_blob(&entry.key_id).await.unwrap().unwrap();

    store.armed.store(true, Ordering::SeqCst);
    let err = vault
        .change_password(&entry.key_id, &s("old"), &s("new"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShroudError::ImportVerificationFailed { .. }));

    let after = inner.get_blob(&entry.key_id).await.unwrap().unwrap();
    assert_eq!(after.salt, before.salt);
    assert_eq!(after.ciphertext, before.ciphertext);
    assert_eq!(
        vault.unlock_credential(&entry.key_id, &s("old")).await.unwrap().expose_secret(),
        "secret"
    );
    assert!(matches!(
        vault.unlock_credential(&entry.key_id, &s("new")).await,
        Err(ShroudError::DecryptionFailed)
    ));
}

/// Reports the key id of the first blob write, then stalls the writer.
struct AnnounceFirstWrite {
    inner: Arc<SqliteCredentialStore>,
    written: Mutex<Option<oneshot::Sender<KeyId>>>,
}

#[async_trait]
impl CredentialStore for AnnounceFirstWrite {
    fn backend_name(&self) -> &str {
        "announce-first-write"
    }
    async fn put_blob(&self, record: &BlobRecord) -> Result<(), ShroudError> {
        self.inner.put_blob(record).await?;
        let tx = self.written.lock().unwrap().take();
        if let Some(tx) = tx {
            let _ = tx.send(record.key_id.clone());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(())
    }
    async fn get_blob(&self, key_id: &KeyId) -> Result<Option<BlobRecord>, ShroudError> {
        self.inner.get_blob(key_id).await
    }
    async fn delete_blob(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        self.inner.delete_blob(key_id).await
    }
    async fn put_index_entry(&self, entry: &VaultIndexEntry) -> Result<(), ShroudError> {
        self.inner.put_index_entry(entry).await
    }
    async fn get_index_entry(&self, key_id: &KeyId) -> Result<Option<VaultIndexEntry>, ShroudError> {
        self.inner.get_index_entry(key_id).await
    }
    async fn list_index(&self) -> Result<Vec<VaultIndexEntry>, ShroudError> {
        self.inner.list_index().await
    }
    async fn rename(&self, key_id: &KeyId, name: &str) -> Result<bool, ShroudError> {
        self.inner.rename(key_id, name).await
    }
    async fn recolor(&self, key_id: &KeyId, color: &str) -> Result<bool, ShroudError> {
        self.inner.recolor(key_id, color).await
    }
    async fn delete_credential(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        self.inner.delete_credential(key_id).await
    }
    async fn sweep_orphans(&self) -> Result<usize, ShroudError> {
        self.inner.sweep_orphans().await
    }
    async fn clear(&self) -> Result<(), ShroudError> {
        self.inner.clear().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn remove_during_import_waits_for_verification() {
    let inner = sqlite().await;
    let (tx, rx) = oneshot::channel();
    let store = Arc::new(AnnounceFirstWrite {
        inner: inner.clone(),
        written: Mutex::new(Some(tx)),
    });
    let vault = Arc::new(VaultStore::new(store, V1, EventBus::default()));

    let importer = {
        let vault = vault.clone();
        tokio::spawn(async move {
            vault
                .import_credential(&s("secret"), &s("pw"), ImportOptions::default())
                .await
        })
    };
    let key_id = rx.await.unwrap();
    // The blob is written but not yet verified or indexed.
    vault.remove_credential(&key_id).await.unwrap();

    let imported = importer.await.unwrap().unwrap();
    assert_eq!(imported.key_id, key_id);
    assert!(vault.list_credentials().await.unwrap().is_empty());
    assert!(inner.get_blob(&key_id).await.unwrap().is_none());
    assert_eq!(inner.sweep_orphans().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_imports_get_distinct_default_names() {
    let vault = Arc::new(VaultStore::new(sqlite().await, V1, EventBus::default()));
    let mut handles = Vec::new();
    for _ in 0..6 {
        let vault = vault.clone();
        handles.push(tokio::spawn(async move {
            vault
                .import_credential(&s("secret"), &s("pw"), ImportOptions::default())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let mut names: Vec<String> = vault
        .list_credentials()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    names.sort();
    assert_eq!(names, ["Key 1", "Key 2", "Key 3", "Key 4", "Key 5", "Key 6"]);
}
