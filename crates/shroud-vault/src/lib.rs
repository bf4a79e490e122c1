// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-encrypted credential vault.
//!
//! Each credential is its own AES-256-GCM blob under a key derived from the
//! user's password (PBKDF2-SHA256 or Argon2id) with a per-blob salt. There is
//! no master key: forgetting a password loses exactly one credential.

pub mod blob;
pub mod crypto;
pub mod engine;
pub mod kdf;
pub mod prompt;
pub mod store;

pub use blob::{BlobFormatError, EncryptedBlob};
pub use engine::{decrypt, decrypt_record, encrypt};
pub use kdf::KdfParams;
pub use store::{ExclusiveVault, ImportOptions, VaultStore, generate_key_id, mask_secret};
