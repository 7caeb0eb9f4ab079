// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic primitives for the vault.
//!
//! - PBKDF2-HMAC-SHA256 turns a passphrase into a 256-bit key
//! - AES-256-GCM encrypts the serialized ledger with a random 96-bit nonce
//! - Key material is zeroized on drop
//!
//! Authenticated decryption is the only passphrase check: there is no stored
//! password hash, a wrong key simply fails the GCM tag.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the PBKDF2 salt minted on enable.
pub const SALT_SIZE: usize = 16;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Symmetric key held in memory while the vault is unlocked.
///
/// Never serialized; the bytes are wiped when the last clone is dropped.
#[derive(Clone)]
pub struct SessionKey(Zeroizing<[u8; KEY_SIZE]>);

impl SessionKey {
    fn cipher(&self) -> VaultResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.0.as_slice())
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Key derivation parameters persisted next to the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl KdfParams {
    /// Fresh random salt with the given iteration count.
    pub fn generate(iterations: u32) -> Self {
        Self {
            salt: generate_salt().to_vec(),
            iterations,
        }
    }
}

/// Output of a single encryption: the nonce and the ciphertext (tag included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Derive a key from a passphrase with PBKDF2-HMAC-SHA256.
///
/// Deterministic: the same passphrase, salt and iteration count always yield
/// the same key.
pub fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> VaultResult<SessionKey> {
    if iterations == 0 {
        return Err(VaultError::KeyDerivation(
            "iteration count must be positive".to_string(),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, key.as_mut_slice());
    Ok(SessionKey(key))
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> VaultResult<CipherEnvelope> {
    let nonce = generate_nonce();
    let ciphertext = key
        .cipher()?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    Ok(CipherEnvelope {
        nonce: nonce.to_vec(),
        ciphertext,
    })
}

/// Decrypt an envelope, failing on a wrong key, wrong nonce or tampering.
pub fn decrypt(envelope: &CipherEnvelope, key: &SessionKey) -> VaultResult<Vec<u8>> {
    if envelope.nonce.len() != NONCE_SIZE {
        return Err(VaultError::DecryptionError);
    }

    key.cipher()?
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
        .map_err(|_| VaultError::DecryptionError)
}

/// Generate a cryptographically secure random salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Generate a cryptographically secure random nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}
