// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault lifecycle: import, unlock, list, rename, re-key and delete credentials.
//!
//! Blobs and index entries live in any [`CredentialStore`]. A credential is
//! only discoverable once its index entry exists, and the index entry is
//! only written after the freshly stored blob has been read back and
//! decrypted to the exact imported secret.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use shroud_bus::{EventBus, VaultEvent};
use shroud_core::{BlobRecord, CredentialStore, KeyId, ShroudError, VaultIndexEntry, WipeTarget};
use tokio::sync::{OwnedMutexGuard, RwLock, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

use crate::blob::EncryptedBlob;
use crate::engine;
use crate::kdf::KdfParams;

/// Longest accepted display name, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Colours assigned round-robin when an import does not pick one.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
];

const KEY_ID_ATTEMPTS: usize = 8;

/// Optional metadata for [`VaultStore::import_credential`].
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub display_name: Option<String>,
    pub color_tag: Option<String>,
}

pub struct VaultStore {
    store: Arc<dyn CredentialStore>,
    kdf: KdfParams,
    bus: EventBus,
    key_locks: Mutex<HashMap<KeyId, Arc<tokio::sync::Mutex<()>>>>,
    /// Shared by per-key operations, exclusive for sweep and clear.
    gate: RwLock<()>,
    /// Serializes default-name assignment across concurrent imports.
    naming: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("backend", &self.store.backend_name())
            .field("kdf", &self.kdf.algorithm_name())
            .finish()
    }
}

impl VaultStore {
    pub fn new(store: Arc<dyn CredentialStore>, kdf: KdfParams, bus: EventBus) -> Self {
        Self {
            store,
            kdf,
            bus,
            key_locks: Mutex::new(HashMap::new()),
            gate: RwLock::new(()),
            naming: tokio::sync::Mutex::new(()),
        }
    }

    /// Builds the store and removes anything a crashed import left behind.
    pub async fn open(
        store: Arc<dyn CredentialStore>,
        kdf: KdfParams,
        bus: EventBus,
    ) -> Result<Self, ShroudError> {
        let vault = Self::new(store, kdf, bus);
        vault.sweep_orphans().await?;
        Ok(vault)
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn backend(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Encrypts, stores, verifies and indexes a new credential.
    pub async fn import_credential(
        &self,
        secret: &SecretString,
        password: &SecretString,
        options: ImportOptions,
    ) -> Result<VaultIndexEntry, ShroudError> {
        if secret.expose_secret().trim().is_empty() {
            return Err(ShroudError::InvalidInput("secret must not be empty".to_string()));
        }
        if password.expose_secret().is_empty() {
            return Err(ShroudError::InvalidInput("password must not be empty".to_string()));
        }
        let display_name = options
            .display_name
            .as_deref()
            .map(validate_display_name)
            .transpose()?;
        let color_tag = options
            .color_tag
            .as_deref()
            .map(validate_color_tag)
            .transpose()?;

        let _gate = self.gate.read().await;
        let key_id = self.fresh_key_id().await?;
        let _guard = self.lock_key(&key_id).await;

        let blob = self.encrypt_blocking(secret, password).await?;
        let record = blob
            .to_record(&key_id)
            .map_err(|e| ShroudError::Internal(format!("failed to encode blob: {e}")))?;
        self.store.put_blob(&record).await?;

        if let Err(e) = self.verify_stored(&key_id, secret, password).await {
            self.rollback_blob(&key_id).await;
            return Err(e);
        }

        let _naming = self.naming.lock().await;
        let entry = match self.store.list_index().await {
            Ok(existing) => VaultIndexEntry {
                key_id: key_id.clone(),
                display_name: display_name.unwrap_or_else(|| default_name(&existing)),
                color_tag: color_tag.unwrap_or_else(|| {
                    DEFAULT_PALETTE[existing.len() % DEFAULT_PALETTE.len()].to_string()
                }),
                created_at: record.created_at,
            },
            Err(e) => {
                self.rollback_blob(&key_id).await;
                return Err(e);
            }
        };
        if let Err(e) = self.store.put_index_entry(&entry).await {
            self.rollback_blob(&key_id).await;
            return Err(e);
        }

        info!(key_id = %key_id, version = record.version, "credential imported");
        self.bus.publish(VaultEvent::CredentialAdded {
            key_id,
            display_name: entry.display_name.clone(),
            color_tag: entry.color_tag.clone(),
        });
        Ok(entry)
    }

    /// Decrypts a credential. Does not start a session.
    pub async fn unlock_credential(
        &self,
        key_id: &KeyId,
        password: &SecretString,
    ) -> Result<SecretString, ShroudError> {
        self.unlock_with(key_id, password, Ok).await
    }

    /// Decrypts a credential and passes the secret to `hold`.
    ///
    /// The credential stays pinned until `hold` returns: removal, re-keying
    /// and clearing wait for it, so whatever `hold` keeps can be revoked by
    /// them afterwards.
    pub async fn unlock_with<R>(
        &self,
        key_id: &KeyId,
        password: &SecretString,
        hold: impl FnOnce(SecretString) -> Result<R, ShroudError>,
    ) -> Result<R, ShroudError> {
        let _gate = self.gate.read().await;
        let _guard = self.lock_key(key_id).await;
        if self.store.get_index_entry(key_id).await?.is_none() {
            return Err(not_found(key_id));
        }
        let record = self
            .store
            .get_blob(key_id)
            .await?
            .ok_or_else(|| not_found(key_id))?;
        let secret = self.decrypt_blocking(record, password).await?;
        debug!(key_id = %key_id, "credential unlocked");
        hold(secret)
    }

    /// Runs `hold` while `key_id` is pinned in the index.
    pub async fn with_credential<R>(
        &self,
        key_id: &KeyId,
        hold: impl FnOnce() -> Result<R, ShroudError>,
    ) -> Result<R, ShroudError> {
        let _gate = self.gate.read().await;
        let _guard = self.lock_key(key_id).await;
        if self.store.get_index_entry(key_id).await?.is_none() {
            return Err(not_found(key_id));
        }
        hold()
    }

    /// Metadata only, oldest first.
    pub async fn list_credentials(&self) -> Result<Vec<VaultIndexEntry>, ShroudError> {
        let mut entries = self.store.list_index().await?;
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key_id.cmp(&b.key_id)));
        Ok(entries)
    }

    pub async fn get_credential(&self, key_id: &KeyId) -> Result<Option<VaultIndexEntry>, ShroudError> {
        self.store.get_index_entry(key_id).await
    }

    /// Deletes the blob and the index entry.
    pub async fn remove_credential(&self, key_id: &KeyId) -> Result<(), ShroudError> {
        let _gate = self.gate.read().await;
        let guard = self.lock_key(key_id).await;
        let existed = self.store.delete_credential(key_id).await?;
        drop(guard);
        self.forget_lock(key_id);

        if !existed {
            return Err(not_found(key_id));
        }
        info!(key_id = %key_id, "credential removed");
        self.bus.publish(VaultEvent::CredentialRemoved {
            key_id: key_id.clone(),
        });
        Ok(())
    }

    pub async fn rename_credential(
        &self,
        key_id: &KeyId,
        display_name: &str,
    ) -> Result<VaultIndexEntry, ShroudError> {
        let display_name = validate_display_name(display_name)?;
        let _gate = self.gate.read().await;
        let _guard = self.lock_key(key_id).await;
        if !self.store.rename(key_id, &display_name).await? {
            return Err(not_found(key_id));
        }
        self.publish_renamed(key_id).await
    }

    pub async fn recolor_credential(
        &self,
        key_id: &KeyId,
        color_tag: &str,
    ) -> Result<VaultIndexEntry, ShroudError> {
        let color_tag = validate_color_tag(color_tag)?;
        let _gate = self.gate.read().await;
        let _guard = self.lock_key(key_id).await;
        if !self.store.recolor(key_id, &color_tag).await? {
            return Err(not_found(key_id));
        }
        self.publish_renamed(key_id).await
    }

    /// Re-encrypts a credential under a new password with a fresh salt and
    /// nonce, using the currently configured KDF.
    ///
    /// The previous blob is restored if the new one cannot be verified.
    pub async fn change_password(
        &self,
        key_id: &KeyId,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ShroudError> {
        if new_password.expose_secret().is_empty() {
            return Err(ShroudError::InvalidInput("password must not be empty".to_string()));
        }
        let _gate = self.gate.read().await;
        let _guard = self.lock_key(key_id).await;

        if self.store.get_index_entry(key_id).await?.is_none() {
            return Err(not_found(key_id));
        }
        let old_record = self
            .store
            .get_blob(key_id)
            .await?
            .ok_or_else(|| not_found(key_id))?;
        let secret = self.decrypt_blocking(old_record.clone(), old_password).await?;

        let blob = self.encrypt_blocking(&secret, new_password).await?;
        let record = blob
            .to_record(key_id)
            .map_err(|e| ShroudError::Internal(format!("failed to encode blob: {e}")))?;
        self.store.put_blob(&record).await?;

        if let Err(e) = self.verify_stored(key_id, &secret, new_password).await {
            error!(key_id = %key_id, error = %e, "re-keyed blob failed verification; restoring");
            self.store.put_blob(&old_record).await?;
            return Err(e);
        }

        info!(key_id = %key_id, version = record.version, "credential password changed");
        Ok(())
    }

    /// Removes blobs without an index entry and entries without a blob.
    pub async fn sweep_orphans(&self) -> Result<usize, ShroudError> {
        let _gate = self.gate.write().await;
        let removed = self.store.sweep_orphans().await?;
        if removed > 0 {
            warn!(removed, "removed orphaned vault records");
        }
        Ok(removed)
    }

    /// Drops every credential.
    pub async fn clear(&self) -> Result<(), ShroudError> {
        self.exclusive().await.clear().await
    }

    /// Waits for in-flight imports, unlocks and removals, then holds the
    /// vault until the returned guard is dropped.
    pub async fn exclusive(&self) -> ExclusiveVault<'_> {
        ExclusiveVault {
            vault: self,
            _gate: self.gate.write().await,
        }
    }

    async fn publish_renamed(&self, key_id: &KeyId) -> Result<VaultIndexEntry, ShroudError> {
        let entry = self
            .store
            .get_index_entry(key_id)
            .await?
            .ok_or_else(|| not_found(key_id))?;
        self.bus.publish(VaultEvent::CredentialRenamed {
            key_id: key_id.clone(),
            display_name: entry.display_name.clone(),
            color_tag: entry.color_tag.clone(),
        });
        Ok(entry)
    }

    /// Reads the blob back and checks it decrypts to `expected`.
    ///
    /// Storage errors pass through unchanged; anything else is an
    /// [`ShroudError::ImportVerificationFailed`].
    async fn verify_stored(
        &self,
        key_id: &KeyId,
        expected: &SecretString,
        password: &SecretString,
    ) -> Result<(), ShroudError> {
        let failed = || ShroudError::ImportVerificationFailed {
            key_id: key_id.to_string(),
        };
        let Some(stored) = self.store.get_blob(key_id).await? else {
            warn!(key_id = %key_id, "written blob is missing on read-back");
            return Err(failed());
        };
        match self.decrypt_blocking(stored, password).await {
            Ok(roundtrip) if roundtrip.expose_secret() == expected.expose_secret() => Ok(()),
            Ok(_) => {
                warn!(key_id = %key_id, "read-back plaintext differs from imported secret");
                Err(failed())
            }
            Err(ShroudError::DecryptionFailed) => {
                warn!(key_id = %key_id, "read-back blob does not decrypt");
                Err(failed())
            }
            Err(e) => Err(e),
        }
    }

    async fn rollback_blob(&self, key_id: &KeyId) {
        match self.store.delete_blob(key_id).await {
            Ok(_) => debug!(key_id = %key_id, "rolled back unverified blob"),
            // The orphan sweep on next open removes it.
            Err(e) => error!(key_id = %key_id, error = %e, "failed to roll back unverified blob"),
        }
    }

    async fn fresh_key_id(&self) -> Result<KeyId, ShroudError> {
        for _ in 0..KEY_ID_ATTEMPTS {
            let candidate = generate_key_id();
            if self.store.get_blob(&candidate).await?.is_none()
                && self.store.get_index_entry(&candidate).await?.is_none()
            {
                return Ok(candidate);
            }
            debug!(key_id = %candidate, "generated key id already taken");
        }
        Err(ShroudError::Internal("could not allocate a unique key id".to_string()))
    }

    async fn lock_key(&self, key_id: &KeyId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.key_locks.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(locks.entry(key_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    fn forget_lock(&self, key_id: &KeyId) {
        let mut locks = self.key_locks.lock().unwrap_or_else(|p| p.into_inner());
        if locks.get(key_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key_id);
        }
    }

    async fn encrypt_blocking(
        &self,
        secret: &SecretString,
        password: &SecretString,
    ) -> Result<EncryptedBlob, ShroudError> {
        let (secret, password, kdf) = (secret.clone(), password.clone(), self.kdf);
        run_blocking(move || engine::encrypt(&secret, &password, &kdf)).await
    }

    async fn decrypt_blocking(
        &self,
        record: BlobRecord,
        password: &SecretString,
    ) -> Result<SecretString, ShroudError> {
        let password = password.clone();
        run_blocking(move || engine::decrypt_record(&record, &password)).await
    }
}

/// Exclusive hold on a [`VaultStore`], taken by the panic wipe so nothing
/// can be unlocked between clearing sessions and clearing the vault.
pub struct ExclusiveVault<'a> {
    vault: &'a VaultStore,
    _gate: RwLockWriteGuard<'a, ()>,
}

impl std::fmt::Debug for ExclusiveVault<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExclusiveVault").field(self.vault).finish()
    }
}

impl ExclusiveVault<'_> {
    pub async fn clear(&self) -> Result<(), ShroudError> {
        let vault = self.vault;
        vault.store.clear().await?;
        vault.key_locks.lock().unwrap_or_else(|p| p.into_inner()).clear();
        info!(backend = vault.store.backend_name(), "vault cleared");
        Ok(())
    }
}

#[async_trait]
impl WipeTarget for ExclusiveVault<'_> {
    fn target_name(&self) -> &str {
        "vault"
    }

    async fn wipe(&self) -> Result<(), ShroudError> {
        self.clear().await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ShroudError>
where
    F: FnOnce() -> Result<T, ShroudError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ShroudError::Internal(format!("crypto task failed: {e}")))?
}

/// `key_<unix-millis>_<8 hex>`.
pub fn generate_key_id() -> KeyId {
    KeyId(format!(
        "key_{}_{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    ))
}

fn not_found(key_id: &KeyId) -> ShroudError {
    ShroudError::CredentialNotFound {
        key_id: key_id.to_string(),
    }
}

/// `Key N` with the smallest N past the current count that is not taken.
fn default_name(existing: &[VaultIndexEntry]) -> String {
    let mut ordinal = existing.len() + 1;
    loop {
        let name = format!("Key {ordinal}");
        if !existing.iter().any(|e| e.display_name == name) {
            return name;
        }
        ordinal += 1;
    }
}

fn validate_display_name(name: &str) -> Result<String, ShroudError> {
    let name = name.trim();
    let chars = name.chars().count();
    if chars == 0 || chars > MAX_DISPLAY_NAME_CHARS {
        return Err(ShroudError::InvalidInput(format!(
            "display name must be 1-{MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_color_tag(color: &str) -> Result<String, ShroudError> {
    let color = color.trim();
    if color.is_empty() || color.chars().count() > 32 {
        return Err(ShroudError::InvalidInput(
            "color tag must be 1-32 characters".to_string(),
        ));
    }
    Ok(color.to_string())
}

/// Preview of a secret for display: first and last four characters.
///
/// Values shorter than 12 characters are fully masked.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
