// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification payloads.
//!
//! Every variant carries identifiers and display metadata only. There is no
//! field that can hold a password, a plaintext secret or a derived key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shroud_core::KeyId;
use strum::{AsRefStr, Display, EnumString};

/// Why a session ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LockReason {
    /// The caller locked this one session.
    Explicit,
    /// The TTL elapsed.
    Expired,
    /// The caller locked every session at once.
    LockAll,
    /// The credential behind the session was deleted.
    CredentialRemoved,
    /// The session outlived its index entry.
    Orphaned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VaultEvent {
    CredentialAdded {
        key_id: KeyId,
        display_name: String,
        color_tag: String,
    },
    CredentialRemoved {
        key_id: KeyId,
    },
    CredentialRenamed {
        key_id: KeyId,
        display_name: String,
        color_tag: String,
    },
    SessionStarted {
        key_id: KeyId,
        expires_at: DateTime<Utc>,
    },
    SessionLocked {
        key_id: KeyId,
        reason: LockReason,
    },
    /// Emitted once at the end of a panic wipe, even when some backends failed.
    VaultCleared {
        failed_backends: Vec<String>,
    },
}

impl VaultEvent {
    /// Wire name of the notification, e.g. `session-locked`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CredentialAdded { .. } => "credential-added",
            Self::CredentialRemoved { .. } => "credential-removed",
            Self::CredentialRenamed { .. } => "credential-renamed",
            Self::SessionStarted { .. } => "session-started",
            Self::SessionLocked { .. } => "session-locked",
            Self::VaultCleared { .. } => "vault-cleared",
        }
    }

    /// The credential this event concerns, if any.
    pub fn key_id(&self) -> Option<&KeyId> {
        match self {
            Self::CredentialAdded { key_id, .. }
            | Self::CredentialRemoved { key_id }
            | Self::CredentialRenamed { key_id, .. }
            | Self::SessionStarted { key_id, .. }
            | Self::SessionLocked { key_id, .. } => Some(key_id),
            Self::VaultCleared { .. } => None,
        }
    }
}
