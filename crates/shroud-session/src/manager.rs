// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory unlock sessions with automatic expiry.
//!
//! A session maps a [`KeyId`] to its decrypted secret until a deadline. At
//! most one background timer is armed at any time, always for the earliest
//! deadline, and it holds only a weak reference to the manager so dropping
//! the last handle stops it. Reads also check the deadline, so an expired
//! secret is never returned even if the timer has not fired yet.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use shroud_bus::{EventBus, LockReason, VaultEvent};
use shroud_core::{KeyId, ShroudError, WipeTarget};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::ttl::SessionTtl;

/// Public view of an active session. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub key_id: KeyId,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionInfo {
    /// Whole seconds left at `now`, floored at zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

struct SessionEntry {
    secret: SecretString,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn info(&self, key_id: &KeyId) -> SessionInfo {
        SessionInfo {
            key_id: key_id.clone(),
            started_at: self.started_at,
            expires_at: self.expires_at,
        }
    }
}

struct ArmedTimer {
    deadline: DateTime<Utc>,
    handle: JoinHandle<()>,
}

struct Inner {
    clock: Arc<dyn Clock>,
    bus: EventBus,
    default_ttl: SessionTtl,
    sessions: Mutex<HashMap<KeyId, SessionEntry>>,
    timer: Mutex<Option<ArmedTimer>>,
}

impl Inner {
    fn sessions(&self) -> MutexGuard<'_, HashMap<KeyId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn timer(&self) -> MutexGuard<'_, Option<ArmedTimer>> {
        self.timer.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publish_locked(&self, ids: &[KeyId], reason: LockReason) {
        for key_id in ids {
            self.bus.publish(VaultEvent::SessionLocked {
                key_id: key_id.clone(),
                reason,
            });
        }
    }

    /// Removes every expired session and announces each one.
    fn purge_expired(&self) -> Vec<KeyId> {
        let now = self.clock.now();
        let expired: Vec<KeyId> = {
            let mut sessions = self.sessions();
            let ids: Vec<KeyId> = sessions
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                sessions.remove(id);
            }
            ids
        };
        if !expired.is_empty() {
            debug!(count = expired.len(), "expired sessions purged");
        }
        self.publish_locked(&expired, LockReason::Expired);
        expired
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(armed) = self.timer().take() {
            armed.handle.abort();
        }
    }
}

/// Points the single background timer at the earliest remaining deadline.
///
/// Lock order is timer, then sessions: the minimum is read while the slot is
/// held, so concurrent callers cannot arm a stale deadline.
fn rearm(inner: &Arc<Inner>) {
    let mut timer = inner.timer();
    let next = inner.sessions().values().map(|e| e.expires_at).min();

    if let Some(armed) = timer.as_ref() {
        if Some(armed.deadline) == next && !armed.handle.is_finished() {
            return;
        }
    }
    if let Some(old) = timer.take() {
        old.handle.abort();
    }
    let Some(deadline) = next else {
        return;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        debug!("no async runtime, relying on lazy expiry");
        return;
    };

    let wait = (deadline - inner.clock.now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let handle = runtime.spawn(async move {
        tokio::time::sleep(wait).await;
        if let Some(inner) = weak.upgrade() {
            {
                let mut slot = inner.timer();
                if slot.as_ref().is_some_and(|armed| armed.deadline == deadline) {
                    slot.take();
                }
            }
            inner.purge_expired();
            rearm(&inner);
        }
    });
    *timer = Some(ArmedTimer { deadline, handle });
}

/// Owns every unlocked secret in the process.
///
/// Cloning is cheap and shares state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active", &self.inner.sessions().len())
            .field("default_ttl", &self.inner.default_ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(clock: Arc<dyn Clock>, bus: EventBus) -> Self {
        Self::with_default_ttl(clock, bus, SessionTtl::default())
    }

    pub fn with_default_ttl(clock: Arc<dyn Clock>, bus: EventBus, default_ttl: SessionTtl) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                bus,
                default_ttl,
                sessions: Mutex::new(HashMap::new()),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn default_ttl(&self) -> SessionTtl {
        self.inner.default_ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Starts or replaces the session for `key_id`. A replaced session's
    /// secret is dropped (and zeroized) immediately.
    pub fn start_session(
        &self,
        key_id: &KeyId,
        secret: SecretString,
        ttl: SessionTtl,
    ) -> Result<SessionInfo, ShroudError> {
        let ttl = chrono::Duration::from_std(ttl.as_duration())
            .map_err(|_| ShroudError::InvalidInput(format!("session TTL {ttl} is too large")))?;
        let started_at = self.inner.clock.now();
        let expires_at = started_at
            .checked_add_signed(ttl)
            .ok_or_else(|| ShroudError::InvalidInput("session TTL is too large".to_string()))?;

        let entry = SessionEntry {
            secret,
            started_at,
            expires_at,
        };
        let info = entry.info(key_id);
        let replaced = self.inner.sessions().insert(key_id.clone(), entry).is_some();

        info!(key_id = %key_id, %expires_at, replaced, "session started");
        self.inner.bus.publish(VaultEvent::SessionStarted {
            key_id: key_id.clone(),
            expires_at,
        });
        rearm(&self.inner);
        Ok(info)
    }

    /// The secret for an active session, or `None` if locked or expired.
    pub fn active_secret(&self, key_id: &KeyId) -> Option<SecretString> {
        self.require_secret(key_id).ok()
    }

    /// Like [`active_secret`](Self::active_secret) but says why nothing came back.
    pub fn require_secret(&self, key_id: &KeyId) -> Result<SecretString, ShroudError> {
        let now = self.inner.clock.now();
        let expired = {
            let mut sessions = self.inner.sessions();
            match sessions.get(key_id) {
                None => {
                    return Err(ShroudError::Locked {
                        key_id: key_id.to_string(),
                    });
                }
                Some(entry) if !entry.is_expired(now) => return Ok(entry.secret.clone()),
                Some(_) => sessions.remove(key_id).is_some(),
            }
        };
        if expired {
            debug!(key_id = %key_id, "session expired on read");
            self.inner
                .publish_locked(std::slice::from_ref(key_id), LockReason::Expired);
            rearm(&self.inner);
        }
        Err(ShroudError::SessionExpired {
            key_id: key_id.to_string(),
        })
    }

    pub fn is_active(&self, key_id: &KeyId) -> bool {
        let now = self.inner.clock.now();
        self.inner
            .sessions()
            .get(key_id)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Active sessions ordered by expiry, soonest first. Expired entries are
    /// purged on the way.
    pub fn list_active_sessions(&self) -> Vec<SessionInfo> {
        if !self.inner.purge_expired().is_empty() {
            rearm(&self.inner);
        }
        let mut infos: Vec<SessionInfo> = self
            .inner
            .sessions()
            .iter()
            .map(|(id, entry)| entry.info(id))
            .collect();
        infos.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.key_id.cmp(&b.key_id))
        });
        infos
    }

    /// Ends one session. Returns whether there was one to end.
    pub fn lock(&self, key_id: &KeyId) -> bool {
        self.lock_with_reason(key_id, LockReason::Explicit)
    }

    pub fn lock_with_reason(&self, key_id: &KeyId, reason: LockReason) -> bool {
        let removed = self.inner.sessions().remove(key_id).is_some();
        if removed {
            info!(key_id = %key_id, %reason, "session locked");
            self.inner
                .publish_locked(std::slice::from_ref(key_id), reason);
            rearm(&self.inner);
        }
        removed
    }

    /// Ends every session. Returns how many were ended.
    pub fn lock_all(&self) -> usize {
        let ids: Vec<KeyId> = self.inner.sessions().drain().map(|(id, _)| id).collect();
        if !ids.is_empty() {
            info!(count = ids.len(), "all sessions locked");
        }
        self.inner.publish_locked(&ids, LockReason::LockAll);
        rearm(&self.inner);
        ids.len()
    }

    pub fn purge_expired(&self) -> Vec<KeyId> {
        let expired = self.inner.purge_expired();
        if !expired.is_empty() {
            rearm(&self.inner);
        }
        expired
    }

    /// Drops sessions whose credential no longer exists in `known`.
    pub fn purge_orphans(&self, known: &HashSet<KeyId>) -> Vec<KeyId> {
        let orphans: Vec<KeyId> = {
            let mut sessions = self.inner.sessions();
            let ids: Vec<KeyId> = sessions
                .keys()
                .filter(|id| !known.contains(*id))
                .cloned()
                .collect();
            for id in &ids {
                sessions.remove(id);
            }
            ids
        };
        if !orphans.is_empty() {
            info!(count = orphans.len(), "orphaned sessions dropped");
            self.inner.publish_locked(&orphans, LockReason::Orphaned);
            rearm(&self.inner);
        }
        orphans
    }

    /// Earliest deadline among stored sessions, expired or not.
    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.inner.sessions().values().map(|e| e.expires_at).min()
    }

    /// Deadline the background timer is currently waiting on.
    pub fn armed_deadline(&self) -> Option<DateTime<Utc>> {
        self.inner
            .timer()
            .as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline)
    }

    /// Drops every session without announcing them individually.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut sessions = self.inner.sessions();
            let n = sessions.len();
            sessions.clear();
            n
        };
        if let Some(armed) = self.inner.timer().take() {
            armed.handle.abort();
        }
        dropped
    }
}

#[async_trait]
impl WipeTarget for SessionManager {
    fn target_name(&self) -> &str {
        "sessions"
    }

    async fn wipe(&self) -> Result<(), ShroudError> {
        let dropped = self.clear();
        debug!(dropped, "sessions wiped");
        Ok(())
    }
}
