// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless password-based encryption of credential secrets.
//!
//! These functions are CPU-bound (the KDF dominates). Async callers should
//! run them on a blocking thread.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use shroud_core::{BlobRecord, ShroudError};
use tracing::{debug, warn};

use crate::blob::{EncryptedBlob, aad_for_version};
use crate::crypto;
use crate::kdf::{self, KdfParams};

/// Encrypts `plaintext` under a key derived from `password`.
///
/// A fresh salt and nonce are drawn on every call, so encrypting the same
/// input twice never yields the same blob.
pub fn encrypt(
    plaintext: &SecretString,
    password: &SecretString,
    kdf: &KdfParams,
) -> Result<EncryptedBlob, ShroudError> {
    let salt = kdf::generate_salt()?;
    let key = kdf::derive_key(password.expose_secret().as_bytes(), &salt, kdf)?;
    let aad = aad_for_version(kdf.blob_version());
    let (ciphertext, nonce) = crypto::seal(&key, plaintext.expose_secret().as_bytes(), &aad)?;
    Ok(EncryptedBlob {
        kdf: *kdf,
        salt,
        nonce,
        ciphertext,
        created_at: Utc::now(),
    })
}

/// Recovers the plaintext. Wrong password and corruption both yield
/// [`ShroudError::DecryptionFailed`].
pub fn decrypt(blob: &EncryptedBlob, password: &SecretString) -> Result<SecretString, ShroudError> {
    let key = kdf::derive_key(password.expose_secret().as_bytes(), &blob.salt, &blob.kdf)?;
    let plaintext = crypto::open(&key, &blob.nonce, &blob.ciphertext, &blob.aad()).inspect_err(
        |_| debug!(version = blob.version(), "blob authentication failed"),
    )?;
    match std::str::from_utf8(&plaintext) {
        Ok(text) => Ok(SecretString::from(text.to_owned())),
        Err(_) => {
            warn!("authenticated plaintext is not UTF-8; treating blob as corrupt");
            Err(ShroudError::DecryptionFailed)
        }
    }
}

/// Decodes a stored record and decrypts it.
///
/// Format problems are logged with their specific cause but reported to the
/// caller as [`ShroudError::DecryptionFailed`].
pub fn decrypt_record(record: &BlobRecord, password: &SecretString) -> Result<SecretString, ShroudError> {
    let blob = EncryptedBlob::from_record(record).map_err(|e| {
        warn!(key_id = %record.key_id, version = record.version, error = %e, "stored blob is malformed");
        ShroudError::DecryptionFailed
    })?;
    decrypt(&blob, password)
}
