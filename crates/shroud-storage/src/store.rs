// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`CredentialStore`].

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use shroud_config::StorageConfig;
use shroud_core::{BlobRecord, CredentialStore, KeyId, ShroudError, VaultIndexEntry};
use tracing::{debug, info};

use crate::database::{Database, map_tr_err};

/// Blobs and index rows in the vault database.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    db: Database,
}

impl SqliteCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database named by `config` and wraps it.
    pub async fn open(config: &StorageConfig) -> Result<Self, ShroudError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn row_to_blob(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlobRecord> {
    Ok(BlobRecord {
        key_id: KeyId(row.get(0)?),
        version: row.get(1)?,
        kdf_params: row.get(2)?,
        salt: row.get(3)?,
        nonce: row.get(4)?,
        ciphertext: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<VaultIndexEntry> {
    Ok(VaultIndexEntry {
        key_id: KeyId(row.get(0)?),
        display_name: row.get(1)?,
        color_tag: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn put_blob(&self, record: &BlobRecord) -> Result<(), ShroudError> {
        let record = record.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO vault_blobs
                        (key_id, version, kdf_params, salt, nonce, ciphertext, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        record.key_id.as_str(),
                        record.version,
                        record.kdf_params,
                        record.salt,
                        record.nonce,
                        record.ciphertext,
                        record.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_blob(&self, key_id: &KeyId) -> Result<Option<BlobRecord>, ShroudError> {
        let key_id = key_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<_, rusqlite::Error> {
                conn.query_row(
                    "SELECT key_id, version, kdf_params, salt, nonce, ciphertext, created_at
                     FROM vault_blobs WHERE key_id = ?1",
                    params![key_id],
                    row_to_blob,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_blob(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        let key_id = key_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n = conn.execute("DELETE FROM vault_blobs WHERE key_id = ?1", params![key_id])?;
                Ok(n > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn put_index_entry(&self, entry: &VaultIndexEntry) -> Result<(), ShroudError> {
        let entry = entry.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO vault_index (key_id, display_name, color_tag, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        entry.key_id.as_str(),
                        entry.display_name,
                        entry.color_tag,
                        entry.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_index_entry(
        &self,
        key_id: &KeyId,
    ) -> Result<Option<VaultIndexEntry>, ShroudError> {
        let key_id = key_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<_, rusqlite::Error> {
                conn.query_row(
                    "SELECT key_id, display_name, color_tag, created_at
                     FROM vault_index WHERE key_id = ?1",
                    params![key_id],
                    row_to_entry,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_index(&self) -> Result<Vec<VaultIndexEntry>, ShroudError> {
        self.db
            .connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_id, display_name, color_tag, created_at
                     FROM vault_index ORDER BY created_at ASC, key_id ASC",
                )?;
                let entries = stmt
                    .query_map([], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn rename(&self, key_id: &KeyId, display_name: &str) -> Result<bool, ShroudError> {
        let key_id = key_id.to_string();
        let display_name = display_name.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n = conn.execute(
                    "UPDATE vault_index SET display_name = ?2 WHERE key_id = ?1",
                    params![key_id, display_name],
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn recolor(&self, key_id: &KeyId, color_tag: &str) -> Result<bool, ShroudError> {
        let key_id = key_id.to_string();
        let color_tag = color_tag.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n = conn.execute(
                    "UPDATE vault_index SET color_tag = ?2 WHERE key_id = ?1",
                    params![key_id, color_tag],
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_credential(&self, key_id: &KeyId) -> Result<bool, ShroudError> {
        let key_id = key_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                let index = tx.execute("DELETE FROM vault_index WHERE key_id = ?1", params![key_id])?;
                let blobs = tx.execute("DELETE FROM vault_blobs WHERE key_id = ?1", params![key_id])?;
                tx.commit()?;
                Ok(index + blobs > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn sweep_orphans(&self) -> Result<usize, ShroudError> {
        let removed = self
            .db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let blobs = tx.execute(
                    "DELETE FROM vault_blobs
                     WHERE key_id NOT IN (SELECT key_id FROM vault_index)",
                    [],
                )?;
                let entries = tx.execute(
                    "DELETE FROM vault_index
                     WHERE key_id NOT IN (SELECT key_id FROM vault_blobs)",
                    [],
                )?;
                tx.commit()?;
                Ok(blobs + entries)
            })
            .await
            .map_err(map_tr_err)?;
        if removed > 0 {
            info!(removed, "swept orphaned vault rows");
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), ShroudError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM vault_index", [])?;
                tx.execute("DELETE FROM vault_blobs", [])?;
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;
        // Old page images may still sit in the WAL until it is truncated.
        self.db.checkpoint().await?;
        debug!("credential tables cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    async fn store() -> SqliteCredentialStore {
        SqliteCredentialStore::new(Database::open_in_memory().await.unwrap())
    }

    fn blob(id: &str) -> BlobRecord {
        BlobRecord {
            key_id: KeyId::from(id),
            version: 1,
            kdf_params: r#"{"algorithm":"pbkdf2-sha256","iterations":1000}"#.into(),
            salt: vec![1; 16],
            nonce: vec![2; 12],
            ciphertext: vec![3; 48],
            created_at: Utc::now(),
        }
    }

    fn entry(id: &str, offset_secs: i64) -> VaultIndexEntry {
        VaultIndexEntry {
            key_id: KeyId::from(id),
            display_name: format!("Key {id}"),
            color_tag: "#3b82f6".into(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn blob_roundtrip_and_delete() {
        let store = store().await;
        let record = blob("a");
        store.put_blob(&record).await.unwrap();

        let loaded = store.get_blob(&record.key_id).await.unwrap().unwrap();
        assert_eq!(loaded.ciphertext, record.ciphertext);
        assert_eq!(loaded.kdf_params, record.kdf_params);

        assert!(store.delete_blob(&record.key_id).await.unwrap());
        assert!(!store.delete_blob(&record.key_id).await.unwrap());
        assert!(store.get_blob(&record.key_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_index_is_sorted_by_creation() {
        let store = store().await;
        store.put_index_entry(&entry("late", 10)).await.unwrap();
        store.put_index_entry(&entry("early", -10)).await.unwrap();

        let ids: Vec<String> = store
            .list_index()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key_id.0)
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[tokio::test]
    async fn rename_and_recolor_report_missing() {
        let store = store().await;
        store.put_index_entry(&entry("a", 0)).await.unwrap();

        assert!(store.rename(&KeyId::from("a"), "Savings").await.unwrap());
        assert!(store.recolor(&KeyId::from("a"), "#ef4444").await.unwrap());
        assert!(!store.rename(&KeyId::from("missing"), "x").await.unwrap());

        let e = store.get_index_entry(&KeyId::from("a")).await.unwrap().unwrap();
        assert_eq!(e.display_name, "Savings");
        assert_eq!(e.color_tag, "#ef4444");
    }

    #[tokio::test]
    async fn delete_credential_removes_both_halves() {
        let store = store().await;
        store.put_blob(&blob("a")).await.unwrap();
        store.put_index_entry(&entry("a", 0)).await.unwrap();

        assert!(store.delete_credential(&KeyId::from("a")).await.unwrap());
        assert!(store.get_blob(&KeyId::from("a")).await.unwrap().is_none());
        assert!(store.get_index_entry(&KeyId::from("a")).await.unwrap().is_none());
        assert!(!store.delete_credential(&KeyId::from("a")).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_both_kinds_of_orphan() {
        let store = store().await;
        store.put_blob(&blob("whole")).await.unwrap();
        store.put_index_entry(&entry("whole", 0)).await.unwrap();
        store.put_blob(&blob("blob-only")).await.unwrap();
        store.put_index_entry(&entry("index-only", 0)).await.unwrap();

        assert_eq!(store.sweep_orphans().await.unwrap(), 2);
        assert_eq!(store.list_index().await.unwrap().len(), 1);
        assert!(store.get_blob(&KeyId::from("whole")).await.unwrap().is_some());
        assert!(store.get_blob(&KeyId::from("blob-only")).await.unwrap().is_none());
        assert_eq!(store.sweep_orphans().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = store().await;
        store.put_blob(&blob("a")).await.unwrap();
        store.put_index_entry(&entry("a", 0)).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list_index().await.unwrap().is_empty());
        assert!(store.get_blob(&KeyId::from("a")).await.unwrap().is_none());
    }
}
