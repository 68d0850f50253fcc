//! # Cryptography Module
//!
//! All cryptographic primitives used by CDM Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Seed string                                                           │
//! │      │  SHA-256 + HKDF-SHA256                                          │
//! │      ▼                                                                  │
//! │  ┌─────────────────┐         ┌─────────────────┐                       │
//! │  │ Encryption Key  │         │  Signing Key    │                       │
//! │  │ (X25519)        │         │  (Ed25519)      │                       │
//! │  │ • Party id      │         │ • Origin        │                       │
//! │  │ • Shared secret │         │   signatures    │                       │
//! │  └─────────────────┘         └─────────────────┘                       │
//! │                                                                         │
//! │  Field encryption:                                                     │
//! │    X25519(ours, theirs) → HKDF(salt = domain tag) → AES-256-GCM        │
//! │                                                                         │
//! │  Field digest:                                                         │
//! │    hex(SHA-256(plaintext)) travels next to the ciphertext              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | X25519 | Pairwise key agreement |
//! | HKDF-SHA256 | Seed expansion, domain-separated field keys |
//! | AES-256-GCM | Field confidentiality + integrity |
//! | SHA-256 | Public digests, randomization suffixes |
//! | Ed25519 | Origin signatures |

mod encryption;
mod kdf;
mod keys;
mod signing;

pub use encryption::{
    decrypt, decrypt_from, encrypt, encrypt_for, Nonce, SharedSecret, KEY_SIZE, NONCE_SIZE,
    TAG_SIZE,
};
pub use kdf::{derive_keys_from_seed, derive_shared_key, master_seed, DerivedKeys};
pub use keys::{EncryptionKeyPair, KeyPair, PublicKey, SigningKeyPair};
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};

use sha2::{Digest, Sha256};

/// Size of public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Hex-encoded SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
