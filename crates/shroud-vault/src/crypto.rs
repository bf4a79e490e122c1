// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM seal/open.
//!
//! Every [`seal`] draws a fresh 96-bit nonce from the system CSPRNG. Reusing
//! a nonce under the same key breaks GCM, and since each blob also gets its
//! own salt the derived key is never shared between blobs either.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use shroud_core::ShroudError;
use zeroize::Zeroizing;

use crate::kdf::KEY_LEN;

/// Authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, ShroudError> {
    UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| ShroudError::Internal("failed to build AES-256-GCM key".to_string()))
}

/// Encrypts `plaintext`, binding `aad`. Returns `(ciphertext || tag, nonce)`.
pub fn seal(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), ShroudError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| ShroudError::Internal("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::from(aad),
        &mut in_out,
    )
    .map_err(|_| ShroudError::Internal("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypts and authenticates. Any failure is [`ShroudError::DecryptionFailed`].
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ShroudError> {
    let key = aead_key(key)?;

    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let len = key
        .open_in_place(Nonce::assume_unique_for_key(*nonce), Aad::from(aad), &mut in_out)
        .map_err(|_| ShroudError::DecryptionFailed)?
        .len();
    in_out.truncate(len);
    Ok(in_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];

    #[test]
    fn seal_open_roundtrip() {
        let (ct, nonce) = seal(&KEY, b"seed words", b"aad").unwrap();
        assert_eq!(ct.len(), b"seed words".len() + TAG_LEN);
        assert_eq!(&open(&KEY, &nonce, &ct, b"aad").unwrap()[..], b"seed words");
    }

    #[test]
    fn nonces_are_fresh() {
        let (ct1, n1) = seal(&KEY, b"same", b"").unwrap();
        let (ct2, n2) = seal(&KEY, b"same", b"").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn wrong_key_tamper_and_wrong_aad_all_fail_the_same_way() {
        let (ct, nonce) = seal(&KEY, b"secret", b"shroud-blob/v1").unwrap();

        let wrong_key = open(&[0x43; 32], &nonce, &ct, b"shroud-blob/v1");
        assert!(matches!(wrong_key, Err(ShroudError::DecryptionFailed)));

        let mut tampered = ct.clone();
        tampered[0] ^= 0x01;
        let tampered = open(&KEY, &nonce, &tampered, b"shroud-blob/v1");
        assert!(matches!(tampered, Err(ShroudError::DecryptionFailed)));

        let wrong_aad = open(&KEY, &nonce, &ct, b"shroud-blob/v2");
        assert!(matches!(wrong_aad, Err(ShroudError::DecryptionFailed)));
    }

    #[test]
    fn truncated_ciphertext_fails() {
        let (ct, nonce) = seal(&KEY, b"secret", b"").unwrap();
        assert!(open(&KEY, &nonce, &ct[..TAG_LEN - 1], b"").is_err());
    }
}
