// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential store with fault injection.
//!
//! `MemoryStore` implements `CredentialStore` over two hash maps, enabling
//! fast tests of the vault's failure paths without touching disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shroud_core::{BlobRecord, CredentialStore, KeyId, ShroudError, VaultIndexEntry};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    index: HashMap<KeyId, VaultIndexEntry>,
    blobs: HashMap<KeyId, BlobRecord>,
}

/// A `CredentialStore` that lives in memory and can be told to misbehave.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    corrupt_next_blob: AtomicBool,
    fail_writes: AtomicBool,
    fail_clear: AtomicBool,
    fail_listing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a ciphertext bit on the next `put_blob`, then behave normally.
    pub fn corrupt_next_blob_write(&self) {
        self.corrupt_next_blob.store(true, Ordering::SeqCst);
    }

    /// Make every write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `clear` fail until switched off again.
    pub fn set_fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    /// Make `list_index` fail until switched off again.
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub async fn blob_count(&self) -> usize {
        self.tables.lock().await.blobs.len()
    }

    pub async fn index_count(&self) -> usize {
        self.tables.lock().await.index.len()
    }

    /// Plants a blob with no index entry, as a crash mid-import would.
    pub async fn insert_orphan_blob(&self, record: BlobRecord) {
        self.tables
            .lock()
            .await
            .blobs
            .insert(record.key_id.clone(), record);
    }

    fn check_writable(&self) -> Result<(), ShroudError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ShroudError::persistence("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn put_blob(&self, record: &BlobRecord) -> Result<(), ShroudError> {
        self.check_writable()?;
        let mut record = record.clone();
        if self.corrupt_next_blob.swap(false, Ordering::SeqCst) {
            if let Some(byte) = record.ciphertext.first_mut() {
                *byte ^= 0x01;
            }
        }
        self.tables
            .lock()
            .await
            .blobs
            .insert(record.key_id.clone(), record);
        Ok(())
    }

    async fn get_blob(&self, key_id: &KeyId) -> Result<Option<BlobRecord>, ShroudError> {
        Ok(self.tables.lock().await.blobs.get(key_id).cloned())
    }

    async fn delete_blob(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        self.check_writable()?;
        Ok(self.tables.lock().await.blobs.remove(key_id).is_some())
    }

    async fn put_index_entry(&self, entry: &VaultIndexEntry) -> Result<(), ShroudError> {
        self.check_writable()?;
        self.tables
            .lock()
            .await
            .index
            .insert(entry.key_id.clone(), entry.clone());
        Ok(())
    }

    async fn get_index_entry(
        &self,
        key_id: &KeyId,
    ) -> Result<Option<VaultIndexEntry>, ShroudError> {
        Ok(self.tables.lock().await.index.get(key_id).cloned())
    }

    async fn list_index(&self) -> Result<Vec<VaultIndexEntry>, ShroudError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ShroudError::persistence("injected listing failure"));
        }
        let mut entries: Vec<VaultIndexEntry> =
            self.tables.lock().await.index.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.key_id.cmp(&b.key_id))
        });
        Ok(entries)
    }

    async fn rename(&self, key_id: &KeyId, display_name: &str) -> Result<bool, ShroudError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        Ok(match tables.index.get_mut(key_id) {
            Some(entry) => {
                entry.display_name = display_name.to_string();
                true
            }
            None => false,
        })
    }

    async fn recolor(&self, key_id: &KeyId, color_tag: &str) -> Result<bool, ShroudError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        Ok(match tables.index.get_mut(key_id) {
            Some(entry) => {
                entry.color_tag = color_tag.to_string();
                true
            }
            None => false,
        })
    }

    async fn delete_credential(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let index = tables.index.remove(key_id).is_some();
        let blob = tables.blobs.remove(key_id).is_some();
        Ok(index || blob)
    }

    async fn sweep_orphans(&self) -> Result<usize, ShroudError> {
        let mut tables = self.tables.lock().await;
        let Tables { index, blobs } = &mut *tables;
        let before = index.len() + blobs.len();
        blobs.retain(|id, _| index.contains_key(id));
        index.retain(|id, _| blobs.contains_key(id));
        Ok(before - index.len() - blobs.len())
    }

    async fn clear(&self) -> Result<(), ShroudError> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(ShroudError::persistence("injected clear failure"));
        }
        let mut tables = self.tables.lock().await;
        tables.index.clear();
        tables.blobs.clear();
        Ok(())
    }
}
