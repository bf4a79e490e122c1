// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable credential store trait (SQLite, in-memory, ...).

use async_trait::async_trait;

use crate::error::ShroudError;
use crate::types::{BlobRecord, KeyId, VaultIndexEntry};

/// Durable storage for encrypted blobs and the plaintext vault index.
///
/// Implementations must surface every write failure as
/// [`ShroudError::PersistenceFailed`]; silently dropping a write is never
/// acceptable. Ordering and verification are the vault's job, not the
/// store's.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Short backend name used in logs and wipe reports.
    fn backend_name(&self) -> &str;

    /// Inserts or replaces the blob for `record.key_id`.
    async fn put_blob(&self, record: &BlobRecord) -> Result<(), ShroudError>;

    async fn get_blob(&self, key_id: &KeyId) -> Result<Option<BlobRecord>, ShroudError>;

    /// Returns `true` if a blob was deleted.
    async fn delete_blob(&self, key_id: &KeyId) -> Result<bool, ShroudError>;

    /// Inserts or replaces an index entry.
    async fn put_index_entry(&self, entry: &VaultIndexEntry) -> Result<(), ShroudError>;

    async fn get_index_entry(&self, key_id: &KeyId)
    -> Result<Option<VaultIndexEntry>, ShroudError>;

    async fn list_index(&self) -> Result<Vec<VaultIndexEntry>, ShroudError>;

    /// Returns `true` if the entry existed.
    async fn rename(&self, key_id: &KeyId, display_name: &str) -> Result<bool, ShroudError>;

    /// Returns `true` if the entry existed.
    async fn recolor(&self, key_id: &KeyId, color_tag: &str) -> Result<bool, ShroudError>;

    /// Deletes the index entry and the blob together.
    ///
    /// Backends with transactions must do this atomically. Returns `true`
    /// if either half existed.
    async fn delete_credential(&self, key_id: &KeyId) -> Result<bool, ShroudError>;

    /// Removes blobs without an index entry and index entries without a blob.
    /// Returns the number of removed rows.
    async fn sweep_orphans(&self) -> Result<usize, ShroudError>;

    /// Removes every blob and index entry.
    async fn clear(&self) -> Result<(), ShroudError>;
}
