// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-based key derivation.
//!
//! Two functions are supported, each tied to a blob version:
//! PBKDF2-HMAC-SHA256 (v1) and Argon2id v0x13 (v2). Both produce a 32-byte
//! AES-256 key wrapped in [`Zeroizing`].

use std::num::NonZeroU32;

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use shroud_config::{KdfAlgorithm, VaultConfig};
use shroud_core::ShroudError;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// Parameters recorded alongside every blob so it can be re-derived later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfParams {
    Pbkdf2Sha256 {
        iterations: u32,
    },
    Argon2id {
        /// KiB.
        memory_cost: u32,
        iterations: u32,
        parallelism: u32,
    },
}

impl KdfParams {
    /// Parameters for newly written blobs, as configured.
    pub fn from_config(config: &VaultConfig) -> Self {
        match config.kdf {
            KdfAlgorithm::Pbkdf2Sha256 => Self::Pbkdf2Sha256 {
                iterations: config.pbkdf2_iterations,
            },
            KdfAlgorithm::Argon2id => Self::Argon2id {
                memory_cost: config.argon2_memory_cost,
                iterations: config.argon2_iterations,
                parallelism: config.argon2_parallelism,
            },
        }
    }

    /// The blob format version this KDF belongs to.
    pub fn blob_version(&self) -> u32 {
        match self {
            Self::Pbkdf2Sha256 { .. } => 1,
            Self::Argon2id { .. } => 2,
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 { .. } => "pbkdf2-sha256",
            Self::Argon2id { .. } => "argon2id",
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from_config(&VaultConfig::default())
    }
}

/// Derives a 32-byte key from `password` and `salt`.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, ShroudError> {
    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    match *params {
        KdfParams::Pbkdf2Sha256 { iterations } => {
            let iterations = NonZeroU32::new(iterations).ok_or_else(|| {
                ShroudError::InvalidInput("PBKDF2 iteration count must be non-zero".to_string())
            })?;
            ring::pbkdf2::derive(
                ring::pbkdf2::PBKDF2_HMAC_SHA256,
                iterations,
                salt,
                password,
                output.as_mut(),
            );
        }
        KdfParams::Argon2id {
            memory_cost,
            iterations,
            parallelism,
        } => {
            let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(KEY_LEN))
                .map_err(|e| ShroudError::InvalidInput(format!("invalid Argon2id parameters: {e}")))?;
            argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
                .hash_password_into(password, salt, output.as_mut())
                .map_err(|e| ShroudError::Internal(format!("Argon2id key derivation failed: {e}")))?;
        }
    }
    Ok(output)
}

/// Generates a fresh random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], ShroudError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| ShroudError::Internal("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST_PBKDF2: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 1_000 };
    const FAST_ARGON2: KdfParams = KdfParams::Argon2id {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn derivation_is_deterministic() {
        for params in [FAST_PBKDF2, FAST_ARGON2] {
            let a = derive_key(b"pw", &[7; 16], &params).unwrap();
            let b = derive_key(b"pw", &[7; 16], &params).unwrap();
            assert_eq!(*a, *b);
        }
    }

    #[test]
    fn salt_password_and_algorithm_all_matter() {
        let base = derive_key(b"pw", &[1; 16], &FAST_PBKDF2).unwrap();
        assert_ne!(*base, *derive_key(b"pw", &[2; 16], &FAST_PBKDF2).unwrap());
        assert_ne!(*base, *derive_key(b"pw2", &[1; 16], &FAST_PBKDF2).unwrap());
        assert_ne!(*base, *derive_key(b"pw", &[1; 16], &FAST_ARGON2).unwrap());
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = derive_key(b"pw", &[0; 16], &KdfParams::Pbkdf2Sha256 { iterations: 0 });
        assert!(matches!(err, Err(ShroudError::InvalidInput(_))));
    }

    #[test]
    fn params_serialize_with_algorithm_tag() {
        let json = serde_json::to_string(&FAST_ARGON2).unwrap();
        assert!(json.contains(r#""algorithm":"argon2id""#));
        let back: KdfParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FAST_ARGON2);
        assert_eq!(back.blob_version(), 2);
        assert_eq!(FAST_PBKDF2.blob_version(), 1);
    }

    #[test]
    fn default_follows_config_default() {
        assert_eq!(
            KdfParams::default(),
            KdfParams::Pbkdf2Sha256 {
                iterations: 250_000
            }
        );
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }
}
