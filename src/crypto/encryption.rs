//! # Shared-Key Cipher
//!
//! AES-256-GCM under a key both envelope parties can derive independently.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FIELD ENCRYPTION FLOW                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER (root identity)                                                │
//! │                                                                         │
//! │  Step 1: Shared secret                                                 │
//! │    sender X25519 private × recipient X25519 public → dh (32 bytes)     │
//! │                                                                         │
//! │  Step 2: Field key                                                     │
//! │    HKDF-SHA256(ikm = dh, salt = domain tag,                            │
//! │                info = "cdm-shared-key-v1") → key (32 bytes)            │
//! │                                                                         │
//! │  Step 3: Encrypt                                                       │
//! │    nonce  = 12 random bytes                                            │
//! │    sealed = nonce || AES-256-GCM(key, nonce, plaintext)                │
//! │                                                                         │
//! │  RECIPIENT (client identity)                                           │
//! │                                                                         │
//! │    recipient private × sender public → same dh → same key              │
//! │    split nonce, open, or DecryptionFailed if anything was altered      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nonces are random per call, so encrypting the same plaintext twice gives
//! two unrelated ciphertexts even without randomization suffixes.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::derive_shared_key;
use super::{KeyPair, PublicKey};
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce for AES-GCM encryption
///
/// **Never reuse a nonce with the same key.** Nonces are drawn from the OS
/// RNG, which keeps collisions negligible well past any realistic number of
/// fields per key pair.
#[derive(Clone, Copy, Debug)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Symmetric key shared by two identities under one domain tag
///
/// Recomputed for every encrypt/decrypt call and never serialized.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    key: [u8; KEY_SIZE],
}

impl SharedSecret {
    /// Derive the secret from our key pair and the counterpart's public key
    ///
    /// `derive(a, B, tag) == derive(b, A, tag)` for any two identities.
    pub fn derive(ours: &KeyPair, counterpart: &PublicKey, domain_tag: &str) -> Result<Self> {
        let mut dh_output = ours.encryption.diffie_hellman(counterpart)?;
        let key = derive_shared_key(&dh_output, domain_tag);
        dh_output.zeroize();

        Ok(Self { key: key? })
    }

    /// Create from raw key bytes
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.key
            .iter()
            .zip(other.key.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Encrypt bytes under a shared secret
///
/// Returns `nonce || ciphertext || tag`.
pub fn encrypt(secret: &SharedSecret, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = Nonce::random();
    let cipher = Aes256Gcm::new_from_slice(&secret.key)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(nonce.as_bytes());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt bytes produced by [`encrypt`]
///
/// ## Errors
///
/// `DecryptionFailed` if the input is too short to hold a nonce and tag,
/// the key is wrong, or any byte was altered.
pub fn decrypt(secret: &SharedSecret, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::DecryptionFailed(format!(
            "Ciphertext too short: {} bytes",
            sealed.len()
        )));
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new_from_slice(&secret.key)
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .decrypt(AesNonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            Error::DecryptionFailed("Decryption failed: authentication tag mismatch".into())
        })
}

/// Encrypt for a counterpart in one call
///
/// The shared secret lives only for the duration of this call.
pub fn encrypt_for(
    ours: &KeyPair,
    counterpart: &PublicKey,
    domain_tag: &str,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let secret = SharedSecret::derive(ours, counterpart, domain_tag)?;
    encrypt(&secret, plaintext)
}

/// Decrypt from a counterpart in one call
pub fn decrypt_from(
    ours: &KeyPair,
    counterpart: &PublicKey,
    domain_tag: &str,
    sealed: &[u8],
) -> Result<Vec<u8>> {
    let secret = SharedSecret::derive(ours, counterpart, domain_tag)?;
    decrypt(&secret, sealed)
}

// ============================================================================
// TESTS
// ============================================================================
