// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned encrypted blob format.
//!
//! | version | KDF                 | cipher      |
//! |---------|---------------------|-------------|
//! | 1       | PBKDF2-HMAC-SHA256  | AES-256-GCM |
//! | 2       | Argon2id v0x13      | AES-256-GCM |
//!
//! Readers always branch on the stored version. Each version has its own
//! decoder so a future v3 can change the layout without touching v1/v2.

use chrono::{DateTime, Utc};
use ring::aead::NONCE_LEN;
use shroud_core::{BlobRecord, KeyId};
use thiserror::Error;

use crate::crypto::TAG_LEN;
use crate::kdf::{KdfParams, SALT_LEN};

/// Why a stored record could not be turned into an [`EncryptedBlob`].
#[derive(Debug, Error)]
pub enum BlobFormatError {
    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u32),

    #[error("{field} must be {expected} bytes, found {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("ciphertext of {0} bytes is shorter than the authentication tag")]
    Truncated(usize),

    #[error("malformed KDF parameters: {0}")]
    KdfParams(#[from] serde_json::Error),

    #[error("blob version {version} cannot use {algorithm}")]
    KdfMismatch {
        version: u32,
        algorithm: &'static str,
    },
}

/// An encrypted credential, independent of where it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    pub kdf: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// AES-256-GCM output including the trailing tag.
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl EncryptedBlob {
    pub fn version(&self) -> u32 {
        self.kdf.blob_version()
    }

    /// Associated data bound into the GCM tag.
    pub fn aad(&self) -> Vec<u8> {
        aad_for_version(self.version())
    }

    pub fn to_record(&self, key_id: &KeyId) -> Result<BlobRecord, BlobFormatError> {
        Ok(BlobRecord {
            key_id: key_id.clone(),
            version: self.version(),
            kdf_params: serde_json::to_string(&self.kdf)?,
            salt: self.salt.to_vec(),
            nonce: self.nonce.to_vec(),
            ciphertext: self.ciphertext.clone(),
            created_at: self.created_at,
        })
    }

    pub fn from_record(record: &BlobRecord) -> Result<Self, BlobFormatError> {
        match record.version {
            1 => decode_v1(record),
            2 => decode_v2(record),
            other => Err(BlobFormatError::UnsupportedVersion(other)),
        }
    }
}

pub(crate) fn aad_for_version(version: u32) -> Vec<u8> {
    format!("shroud-blob/v{version}").into_bytes()
}

fn decode_v1(record: &BlobRecord) -> Result<EncryptedBlob, BlobFormatError> {
    let kdf: KdfParams = serde_json::from_str(&record.kdf_params)?;
    if !matches!(kdf, KdfParams::Pbkdf2Sha256 { .. }) {
        return Err(BlobFormatError::KdfMismatch {
            version: 1,
            algorithm: kdf.algorithm_name(),
        });
    }
    decode_aes_gcm_body(record, kdf)
}

fn decode_v2(record: &BlobRecord) -> Result<EncryptedBlob, BlobFormatError> {
    let kdf: KdfParams = serde_json::from_str(&record.kdf_params)?;
    if !matches!(kdf, KdfParams::Argon2id { .. }) {
        return Err(BlobFormatError::KdfMismatch {
            version: 2,
            algorithm: kdf.algorithm_name(),
        });
    }
    decode_aes_gcm_body(record, kdf)
}

/// Salt, nonce and ciphertext layout shared by v1 and v2.
fn decode_aes_gcm_body(record: &BlobRecord, kdf: KdfParams) -> Result<EncryptedBlob, BlobFormatError> {
    if record.ciphertext.len() < TAG_LEN {
        return Err(BlobFormatError::Truncated(record.ciphertext.len()));
    }
    Ok(EncryptedBlob {
        kdf,
        salt: fixed("salt", &record.salt)?,
        nonce: fixed("nonce", &record.nonce)?,
        ciphertext: record.ciphertext.clone(),
        created_at: record.created_at,
    })
}

fn fixed<const N: usize>(field: &'static str, bytes: &[u8]) -> Result<[u8; N], BlobFormatError> {
    bytes.try_into().map_err(|_| BlobFormatError::FieldLength {
        field,
        expected: N,
        actual: bytes.len(),
    })
}
