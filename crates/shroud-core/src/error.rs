// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Shroud credential vault.

use thiserror::Error;

/// The error type shared by every Shroud crate boundary.
///
/// `DecryptionFailed` deliberately carries no detail: a wrong password, a
/// tampered ciphertext and a malformed blob all look the same to callers.
/// The specific cause is only ever written to the tracing log.
#[derive(Debug, Error)]
pub enum ShroudError {
    /// Wrong password or corrupted ciphertext (intentionally indistinguishable).
    #[error("incorrect password or corrupted key")]
    DecryptionFailed,

    /// No credential with this id exists in the vault.
    #[error("credential not found: {key_id}")]
    CredentialNotFound { key_id: String },

    /// The freshly written blob did not decrypt back to the imported secret.
    /// The partial write has already been rolled back.
    #[error("import verification failed for {key_id}; the credential was not saved")]
    ImportVerificationFailed { key_id: String },

    /// A durable or on-disk backend rejected a read or write.
    #[error("storage error: {source}")]
    PersistenceFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A session existed for this credential but its TTL has elapsed.
    #[error("session expired for {key_id}")]
    SessionExpired { key_id: String },

    /// The credential has no active session.
    #[error("credential is locked: {key_id}")]
    Locked { key_id: String },

    /// Caller supplied an unusable argument (empty secret, zero TTL, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or is semantically invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors (RNG failure, task join failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShroudError {
    /// Wraps any backend error as [`ShroudError::PersistenceFailed`].
    pub fn persistence<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ShroudError::PersistenceFailed {
            source: source.into(),
        }
    }

    /// Whether retrying the same call could succeed without user input.
    ///
    /// Storage failures (disk full, busy database) are transient from the
    /// caller's point of view; everything else needs a different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShroudError::PersistenceFailed { .. })
    }
}
