// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached derivative query results (balances, lookups, ...) keyed by string.
//!
//! Entries may name an owning credential so removing that credential drops
//! everything derived from it. Expired entries are deleted lazily on read.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};
use shroud_core::{KeyId, ShroudError, WipeTarget};
use tracing::debug;

use crate::database::{Database, map_tr_err};

#[derive(Debug, Clone)]
pub struct QueryCache {
    db: Database,
}

impl QueryCache {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stores `value` as JSON under `cache_key`, replacing any previous entry.
    ///
    /// `ttl = None` keeps the entry until it is invalidated or wiped.
    pub async fn put<T: Serialize>(
        &self,
        cache_key: &str,
        owner: Option<&KeyId>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ShroudError> {
        let payload = serde_json::to_string(value).map_err(ShroudError::persistence)?;
        let cache_key = cache_key.to_string();
        let owner = owner.map(|k| k.to_string());
        let now = Utc::now();
        let expires_at = ttl.map(|ttl| now + ttl);
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO query_cache
                        (cache_key, owner_key_id, payload, expires_at, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![cache_key, owner, payload, expires_at, now],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Returns the cached value, or `None` if absent or expired.
    pub async fn get<T: DeserializeOwned>(&self, cache_key: &str) -> Result<Option<T>, ShroudError> {
        let key = cache_key.to_string();
        let row = self
            .db
            .connection()
            .call(move |conn| -> Result<_, rusqlite::Error> {
                conn.query_row(
                    "SELECT payload, expires_at FROM query_cache WHERE cache_key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<DateTime<Utc>>>(1)?,
                        ))
                    },
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        match row {
            None => Ok(None),
            Some((_, Some(expires_at))) if expires_at <= Utc::now() => {
                debug!(cache_key, "query cache entry expired");
                self.remove(cache_key).await?;
                Ok(None)
            }
            Some((payload, _)) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(ShroudError::persistence),
        }
    }

    pub async fn remove(&self, cache_key: &str) -> Result<bool, ShroudError> {
        let key = cache_key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                Ok(conn.execute("DELETE FROM query_cache WHERE cache_key = ?1", params![key])? > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Drops every entry derived from `owner`. Returns how many were removed.
    pub async fn invalidate_owner(&self, owner: &KeyId) -> Result<usize, ShroudError> {
        let owner = owner.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM query_cache WHERE owner_key_id = ?1",
                    params![owner],
                )
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn len(&self) -> Result<usize, ShroudError> {
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM query_cache", [], |row| row.get(0))
            })
            .await
            .map(|n| n as usize)
            .map_err(map_tr_err)
    }

    pub async fn is_empty(&self) -> Result<bool, ShroudError> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> Result<(), ShroudError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM query_cache", [])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.db.checkpoint().await
    }
}

#[async_trait]
impl WipeTarget for QueryCache {
    fn target_name(&self) -> &str {
        "query-cache"
    }

    async fn wipe(&self) -> Result<(), ShroudError> {
        self.clear().await
    }
}
