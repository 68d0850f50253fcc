//! # Key Management
//!
//! Deterministic key pairs derived from seed strings.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KeyPair (derived from one seed string)                                │
//! │  ┌───────────────────────────┐    ┌───────────────────────────┐        │
//! │  │ EncryptionKeyPair (X25519)│    │ SigningKeyPair (Ed25519)  │        │
//! │  │                           │    │                           │        │
//! │  │ • Party identifier        │    │ • Origin signatures       │        │
//! │  │ • Pairwise shared secrets │    │                           │        │
//! │  └───────────────────────────┘    └───────────────────────────┘        │
//! │                                                                         │
//! │  PublicKey: the X25519 public key, written as base58 on the wire.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Private halves are zeroized on drop. Callers derive a `KeyPair` for one
//! operation and let it go out of scope afterwards.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::ZeroizeOnDrop;

use super::kdf::derive_keys_from_seed_str;
use super::PUBLIC_KEY_SIZE;
use crate::error::{Error, Result};

/// Combined keypair derived from a seed string
///
/// Identical seeds always produce identical key pairs.
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    /// Ed25519 keypair for origin signatures
    pub signing: SigningKeyPair,
    /// X25519 keypair for key agreement
    pub encryption: EncryptionKeyPair,
}

impl KeyPair {
    /// Derive a keypair from a seed string
    ///
    /// ```text
    /// seed ──► SHA-256 ──┬──► HKDF("cdm-signing-key-v1")    → Ed25519
    ///                    └──► HKDF("cdm-encryption-key-v1") → X25519
    /// ```
    ///
    /// Fails with `InvalidSeed` for a blank seed.
    pub fn from_seed(seed: &str) -> Result<Self> {
        let derived = derive_keys_from_seed_str(seed)?;

        Ok(Self {
            signing: SigningKeyPair::from_bytes(&derived.signing_key),
            encryption: EncryptionKeyPair::from_bytes(&derived.encryption_key),
        })
    }

    /// The public party identifier
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.encryption.public_bytes())
    }

    /// The Ed25519 key that verifies this party's origin signatures
    pub fn signing_public_key(&self) -> [u8; 32] {
        self.signing.public_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Ed25519 signing keypair
#[derive(ZeroizeOnDrop)]
pub struct SigningKeyPair {
    #[zeroize(skip)] // ed25519_dalek::SigningKey handles its own zeroization
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            secret: SigningKey::from_bytes(bytes),
        }
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.secret.verifying_key().to_bytes()
    }

    /// Get the verifying key for signature verification
    pub fn verifying_key(&self) -> VerifyingKey {
        self.secret.verifying_key()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

/// X25519 encryption keypair for key exchange
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKeyPair {
    #[zeroize(skip)] // x25519_dalek handles its own zeroization
    secret: StaticSecret,
    #[zeroize(skip)]
    public: X25519PublicKey,
}

impl EncryptionKeyPair {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Perform Diffie-Hellman key exchange
    ///
    /// Both parties compute the same output:
    /// - A: a_secret × b_public
    /// - B: b_secret × a_public
    ///
    /// Low-order counterpart keys produce an all-zero output and are
    /// rejected with `InvalidKey`.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> Result<[u8; 32]> {
        let their_public = X25519PublicKey::from(their_public.0);
        let shared = self.secret.diffie_hellman(&their_public);

        if !shared.was_contributory() {
            return Err(Error::InvalidKey(
                "counterpart public key is a low-order point".into(),
            ));
        }

        Ok(shared.to_bytes())
    }
}

/// A party's public identifier (X25519 public key)
///
/// Rendered as base58 text in envelopes and thread items.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Encode as base58
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Decode from base58
    pub fn from_base58(text: &str) -> Result<Self> {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|e| Error::InvalidKey(format!("Invalid base58 public key: {}", e)))?;

        let bytes: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidKey(format!(
                "Public key must be {} bytes, got {}",
                PUBLIC_KEY_SIZE,
                v.len()
            ))
        })?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
