// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end keyring tests.
//!
//! `TestHarness` assembles a keyring over either a fault-injecting
//! [`MemoryStore`] or a temp SQLite file, with a [`ManualClock`] and cheap
//! KDF parameters so tests run in milliseconds.

use std::sync::Arc;

use secrecy::SecretString;
use shroud_core::{ShroudError, VaultIndexEntry, WipeTarget};
use shroud_keyring::Keyring;
use shroud_session::ManualClock;
use shroud_storage::{CacheDir, Database, QueryCache, SqliteCredentialStore};
use shroud_vault::{ImportOptions, KdfParams};

use crate::memory_store::MemoryStore;

/// PBKDF2 with a token iteration count. Never use outside tests.
pub const FAST_KDF: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 1_000 };

pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    sqlite: bool,
    cache_dir: bool,
    kdf: KdfParams,
    extra_targets: Vec<Arc<dyn WipeTarget>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            sqlite: false,
            cache_dir: false,
            kdf: FAST_KDF,
            extra_targets: Vec::new(),
        }
    }

    /// Back the keyring with a temp SQLite file plus its query cache.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Give the keyring an on-disk cache directory inside the temp dir.
    pub fn with_cache_dir(mut self) -> Self {
        self.cache_dir = true;
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_wipe_target(mut self, target: Arc<dyn WipeTarget>) -> Self {
        self.extra_targets.push(target);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ShroudError> {
        let temp_dir = tempfile::TempDir::new().map_err(ShroudError::persistence)?;
        let clock = Arc::new(ManualClock::default());

        let (builder, memory) = if self.sqlite {
            let db_path = temp_dir.path().join("vault.db");
            let db = Database::open(&db_path.to_string_lossy()).await?;
            let builder = Keyring::builder(Arc::new(SqliteCredentialStore::new(db.clone())))
                .query_cache(QueryCache::new(db));
            (builder, None)
        } else {
            let memory = Arc::new(MemoryStore::new());
            (Keyring::builder(memory.clone()), Some(memory))
        };

        let mut builder = builder.clock(clock.clone()).kdf(self.kdf);
        if self.cache_dir {
            builder = builder.cache_dir(CacheDir::new(temp_dir.path().join("cache")));
        }
        for target in self.extra_targets {
            builder = builder.wipe_target(target);
        }
        let keyring = builder.build().await?;

        Ok(TestHarness {
            keyring,
            clock,
            memory,
            temp_dir,
        })
    }
}

/// A fully wired keyring plus the handles tests need to poke at it.
pub struct TestHarness {
    pub keyring: Keyring,
    pub clock: Arc<ManualClock>,
    memory: Option<Arc<MemoryStore>>,
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Memory-backed harness with defaults.
    pub async fn new() -> Result<Self, ShroudError> {
        Self::builder().build().await
    }

    /// The in-memory backend, when the harness is not SQLite-backed.
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        self.memory.as_deref()
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }

    pub async fn import(
        &self,
        value: &str,
        password: &str,
    ) -> Result<VaultIndexEntry, ShroudError> {
        self.keyring
            .import_credential(&secret(value), &secret(password), ImportOptions::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn memory_harness_roundtrips() {
        let harness = TestHarness::new().await.unwrap();
        let entry = harness.import("token", "pw").await.unwrap();
        let out = harness
            .keyring
            .unlock_credential(&entry.key_id, &secret("pw"))
            .await
            .unwrap();
        assert_eq!(out.expose_secret(), "token");
        assert_eq!(harness.memory_store().unwrap().blob_count().await, 1);
    }

    #[tokio::test]
    async fn sqlite_harness_has_query_cache() {
        let harness = TestHarness::builder()
            .with_sqlite()
            .with_cache_dir()
            .build()
            .await
            .unwrap();
        assert!(harness.memory_store().is_none());
        assert!(harness.keyring.query_cache().is_some());
        assert!(harness.keyring.cache_dir().is_some());
    }
}
