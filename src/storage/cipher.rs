// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! At-rest encryption for vault records.
//!
//! Records are sealed with XChaCha20-Poly1305 under a per-vault 256-bit key.
//! Each record carries its own random 24-byte nonce, prefixed to the
//! ciphertext: `nonce || ciphertext+tag`. Authentication failure on open
//! means the record was tampered with or the vault key changed.

use base64ct::{Base64UrlUnpadded, Encoding};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{WalletError, WalletResult};

/// XChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 24;

/// Vault encryption key (256-bit).
///
/// Generated once per vault instance and persisted locally; never
/// transmitted. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey([u8; 32]);

impl VaultKey {
    /// Generate a new random vault key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Encode the key for persistence (base64url).
    pub fn encode(&self) -> String {
        Base64UrlUnpadded::encode_string(&self.0)
    }

    /// Decode a persisted key.
    pub fn decode(encoded: &str) -> WalletResult<Self> {
        let bytes = Base64UrlUnpadded::decode_vec(encoded.trim())
            .map_err(|_| WalletError::DecryptionFailed("vault key file is corrupt".to_string()))?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| {
            WalletError::DecryptionFailed("vault key has the wrong length".to_string())
        })?;
        Ok(Self(key))
    }

    /// Seal plaintext into a `nonce || ciphertext` record.
    pub fn seal(&self, plaintext: &[u8]) -> WalletResult<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|_| WalletError::DecryptionFailed("invalid vault key".to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| WalletError::DecryptionFailed("encryption failed".to_string()))?;

        let mut record = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        record.extend_from_slice(&nonce_bytes);
        record.extend_from_slice(&ciphertext);
        Ok(record)
    }

    /// Open a `nonce || ciphertext` record back into plaintext.
    pub fn open(&self, record: &[u8]) -> WalletResult<Vec<u8>> {
        if record.len() <= NONCE_SIZE {
            return Err(WalletError::DecryptionFailed(
                "record is too short to hold a nonce".to_string(),
            ));
        }
        let (nonce_bytes, ciphertext) = record.split_at(NONCE_SIZE);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|_| WalletError::DecryptionFailed("invalid vault key".to_string()))?;

        cipher
            .decrypt(XNonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                WalletError::DecryptionFailed(
                    "authentication failed (tampered record or wrong vault key)".to_string(),
                )
            })
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey").field("key", &"[REDACTED]").finish()
    }
}
