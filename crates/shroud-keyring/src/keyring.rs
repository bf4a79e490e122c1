// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The call boundary collaborators use: vault, sessions and wipe in one place.

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::SecretString;
use shroud_bus::{BusEvent, EventBus, LockReason};
use shroud_config::ShroudConfig;
use shroud_core::{CredentialStore, KeyId, ShroudError, VaultIndexEntry, WipeTarget};
use shroud_session::{Clock, SessionInfo, SessionManager, SessionTtl, SystemClock};
use shroud_storage::{CacheDir, QueryCache, SqliteCredentialStore};
use shroud_vault::{ImportOptions, KdfParams, VaultStore};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::wipe::{self, WipeReport};

/// Builder for a [`Keyring`] over any [`CredentialStore`].
pub struct KeyringBuilder {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    kdf: KdfParams,
    bus: Option<EventBus>,
    default_ttl: SessionTtl,
    query_cache: Option<QueryCache>,
    cache_dir: Option<CacheDir>,
    extra_targets: Vec<Arc<dyn WipeTarget>>,
}

impl KeyringBuilder {
    fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            kdf: KdfParams::default(),
            bus: None,
            default_ttl: SessionTtl::default(),
            query_cache: None,
            cache_dir: None,
            extra_targets: Vec::new(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn default_ttl(mut self, ttl: SessionTtl) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn query_cache(mut self, cache: QueryCache) -> Self {
        self.query_cache = Some(cache);
        self
    }

    pub fn cache_dir(mut self, dir: CacheDir) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    /// Another backend for the panic wipe, swept after the built-in ones.
    pub fn wipe_target(mut self, target: Arc<dyn WipeTarget>) -> Self {
        self.extra_targets.push(target);
        self
    }

    /// Opens the vault (sweeping orphaned rows) and assembles the keyring.
    pub async fn build(self) -> Result<Keyring, ShroudError> {
        let bus = self.bus.unwrap_or_default();
        let vault = VaultStore::open(self.store, self.kdf, bus.clone()).await?;
        let sessions = SessionManager::with_default_ttl(self.clock, bus.clone(), self.default_ttl);
        info!(
            backend = vault.backend().backend_name(),
            kdf = vault.kdf().algorithm_name(),
            "keyring ready"
        );
        Ok(Keyring {
            vault,
            sessions,
            bus,
            query_cache: self.query_cache,
            cache_dir: self.cache_dir,
            extra_targets: self.extra_targets,
        })
    }
}

/// Everything a client needs to manage credentials and unlock sessions.
pub struct Keyring {
    vault: VaultStore,
    sessions: SessionManager,
    bus: EventBus,
    query_cache: Option<QueryCache>,
    cache_dir: Option<CacheDir>,
    extra_targets: Vec<Arc<dyn WipeTarget>>,
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("vault", &self.vault)
            .field("sessions", &self.sessions)
            .field("query_cache", &self.query_cache.is_some())
            .field("cache_dir", &self.cache_dir)
            .field("extra_targets", &self.extra_targets.len())
            .finish()
    }
}

impl Keyring {
    pub fn builder(store: Arc<dyn CredentialStore>) -> KeyringBuilder {
        KeyringBuilder::new(store)
    }

    /// Opens the configured SQLite vault with its query cache and cache dir.
    pub async fn open(config: &ShroudConfig) -> Result<Self, ShroudError> {
        let store = SqliteCredentialStore::open(&config.storage).await?;
        let query_cache = QueryCache::new(store.database().clone());
        let mut builder = Self::builder(Arc::new(store))
            .kdf(KdfParams::from_config(&config.vault))
            .bus(EventBus::new(config.events.capacity))
            .default_ttl(SessionTtl::from_secs(config.session.default_ttl_secs)?)
            .query_cache(query_cache);
        if let Some(dir) = &config.storage.cache_dir {
            builder = builder.cache_dir(CacheDir::new(dir));
        }
        builder.build().await
    }

    pub fn vault(&self) -> &VaultStore {
        &self.vault
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn query_cache(&self) -> Option<&QueryCache> {
        self.query_cache.as_ref()
    }

    pub fn cache_dir(&self) -> Option<&CacheDir> {
        self.cache_dir.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.bus.subscribe()
    }

    pub async fn import_credential(
        &self,
        secret: &SecretString,
        password: &SecretString,
        options: ImportOptions,
    ) -> Result<VaultIndexEntry, ShroudError> {
        self.vault.import_credential(secret, password, options).await
    }

    pub async fn unlock_credential(
        &self,
        key_id: &KeyId,
        password: &SecretString,
    ) -> Result<SecretString, ShroudError> {
        self.vault.unlock_credential(key_id, password).await
    }

    /// Decrypts and immediately holds the secret in a session.
    ///
    /// The session starts before the credential is released, so a removal or
    /// wipe that was waiting on it still ends the session.
    pub async fn unlock_and_start(
        &self,
        key_id: &KeyId,
        password: &SecretString,
        ttl: Option<SessionTtl>,
    ) -> Result<SessionInfo, ShroudError> {
        let ttl = ttl.unwrap_or(self.sessions.default_ttl());
        self.vault
            .unlock_with(key_id, password, |secret| {
                self.sessions.start_session(key_id, secret, ttl)
            })
            .await
    }

    /// Holds an already-decrypted secret. The credential must still exist.
    pub async fn start_session(
        &self,
        key_id: &KeyId,
        secret: SecretString,
        ttl: Option<SessionTtl>,
    ) -> Result<SessionInfo, ShroudError> {
        let entries = self.vault.list_credentials().await?;
        self.drop_orphaned_sessions(&entries);
        let ttl = ttl.unwrap_or(self.sessions.default_ttl());
        self.vault
            .with_credential(key_id, || self.sessions.start_session(key_id, secret, ttl))
            .await
    }

    pub fn get_active_secret(&self, key_id: &KeyId) -> Option<SecretString> {
        self.sessions.active_secret(key_id)
    }

    pub fn require_active_secret(&self, key_id: &KeyId) -> Result<SecretString, ShroudError> {
        self.sessions.require_secret(key_id)
    }

    pub fn list_active_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.list_active_sessions()
    }

    /// Index entries, oldest first. Sessions for vanished entries are dropped.
    pub async fn list_credentials(&self) -> Result<Vec<VaultIndexEntry>, ShroudError> {
        let entries = self.vault.list_credentials().await?;
        self.drop_orphaned_sessions(&entries);
        Ok(entries)
    }

    pub fn lock(&self, key_id: &KeyId) -> bool {
        self.sessions.lock(key_id)
    }

    pub fn lock_all(&self) -> usize {
        self.sessions.lock_all()
    }

    /// Locks the session, deletes the credential, then drops cached results
    /// derived from it.
    pub async fn remove_credential(&self, key_id: &KeyId) -> Result<(), ShroudError> {
        self.sessions
            .lock_with_reason(key_id, LockReason::CredentialRemoved);
        self.vault.remove_credential(key_id).await?;
        // An unlock that held the credential before the delete may have
        // started a session in the meantime.
        self.sessions
            .lock_with_reason(key_id, LockReason::CredentialRemoved);
        if let Some(cache) = &self.query_cache {
            let dropped = cache.invalidate_owner(key_id).await?;
            debug!(key_id = %key_id, dropped, "cached results invalidated");
        }
        Ok(())
    }

    pub async fn rename_credential(
        &self,
        key_id: &KeyId,
        display_name: &str,
    ) -> Result<VaultIndexEntry, ShroudError> {
        self.vault.rename_credential(key_id, display_name).await
    }

    pub async fn recolor_credential(
        &self,
        key_id: &KeyId,
        color_tag: &str,
    ) -> Result<VaultIndexEntry, ShroudError> {
        self.vault.recolor_credential(key_id, color_tag).await
    }

    pub async fn change_password(
        &self,
        key_id: &KeyId,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ShroudError> {
        self.vault
            .change_password(key_id, old_password, new_password)
            .await
    }

    /// Irreversibly clears sessions, the vault, caches and any extra targets.
    ///
    /// Waits for in-flight unlocks to finish and blocks new ones until the
    /// sweep is done. Never returns an error: per-backend failures are in
    /// the report.
    pub async fn wipe_everything(&self) -> WipeReport {
        let vault = self.vault.exclusive().await;
        let mut targets: Vec<&dyn WipeTarget> = Vec::new();
        targets.push(&self.sessions);
        targets.push(&vault);
        if let Some(cache) = &self.query_cache {
            targets.push(cache);
        }
        if let Some(dir) = &self.cache_dir {
            targets.push(dir);
        }
        for extra in &self.extra_targets {
            targets.push(extra.as_ref());
        }
        wipe::wipe_all(&targets, &self.bus).await
    }

    fn drop_orphaned_sessions(&self, entries: &[VaultIndexEntry]) {
        let known: HashSet<KeyId> = entries.iter().map(|e| e.key_id.clone()).collect();
        self.sessions.purge_orphans(&known);
    }
}
