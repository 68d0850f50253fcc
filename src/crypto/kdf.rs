//! # Key Derivation Functions
//!
//! Key derivation from identity seeds and from X25519 shared secrets.
//!
//! ## Key Derivation Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY DERIVATION HIERARCHY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Seed string ("root-seed", "client seed words ...")                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  SHA-256(seed bytes)  → 32-byte master seed                            │
//! │        │                                                                │
//! │        ├──► HKDF(info="cdm-signing-key-v1")    → Ed25519 seed          │
//! │        │                                                                │
//! │        └──► HKDF(info="cdm-encryption-key-v1") → X25519 secret         │
//! │                                                                         │
//! │  X25519 DH output                                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  HKDF-SHA256(                                                          │
//! │    ikm  = dh_output,                                                   │
//! │    salt = domain tag,       ← scopes the key to one application        │
//! │    info = "cdm-shared-key-v1"                                          │
//! │  )  → 32-byte AES-256-GCM key                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Domain separation strings for HKDF
pub mod domain {
    /// Domain for signing key derivation
    pub const SIGNING_KEY: &[u8] = b"cdm-signing-key-v1";

    /// Domain for encryption key derivation
    pub const ENCRYPTION_KEY: &[u8] = b"cdm-encryption-key-v1";

    /// Domain for the pairwise field encryption key
    pub const SHARED_KEY: &[u8] = b"cdm-shared-key-v1";
}

/// Keys derived from a master seed
#[derive(ZeroizeOnDrop)]
pub struct DerivedKeys {
    /// Ed25519 signing key (32 bytes)
    pub signing_key: [u8; 32],

    /// X25519 encryption key (32 bytes)
    pub encryption_key: [u8; 32],
}

/// Hash a seed string into 32 bytes of master seed material.
///
/// Empty and whitespace-only seeds are `InvalidSeed`.
pub fn master_seed(seed: &str) -> Result<[u8; 32]> {
    if seed.trim().is_empty() {
        return Err(Error::InvalidSeed("seed must not be empty".into()));
    }

    let mut master = [0u8; 32];
    master.copy_from_slice(&Sha256::digest(seed.as_bytes()));
    Ok(master)
}

/// Derive signing and encryption keys from a master seed
///
/// ```text
/// Master Seed (32 bytes)
///       │
///       ├──► HKDF(info="cdm-signing-key-v1")    → Signing Key
///       │
///       └──► HKDF(info="cdm-encryption-key-v1") → Encryption Key
/// ```
pub fn derive_keys_from_seed(seed: &[u8; 32]) -> Result<DerivedKeys> {
    let hkdf = Hkdf::<Sha256>::new(None, seed);

    Ok(DerivedKeys {
        signing_key: expand(&hkdf, domain::SIGNING_KEY, "signing")?,
        encryption_key: expand(&hkdf, domain::ENCRYPTION_KEY, "encryption")?,
    })
}

/// Derive the symmetric field key from raw X25519 output.
///
/// The domain tag is the HKDF salt, so the same pair of identities gets
/// unrelated keys under different tags.
pub fn derive_shared_key(dh_output: &[u8; 32], domain_tag: &str) -> Result<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(Some(domain_tag.as_bytes()), dh_output);
    expand(&hkdf, domain::SHARED_KEY, "shared")
}

fn expand(hkdf: &Hkdf<Sha256>, info: &[u8], what: &str) -> Result<[u8; 32]> {
    let mut okm = [0u8; 32];
    hkdf.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivationFailed(format!("HKDF expand failed for {} key", what)))?;
    Ok(okm)
}

/// Derive keys straight from a seed string, wiping the intermediate seed.
pub(crate) fn derive_keys_from_seed_str(seed: &str) -> Result<DerivedKeys> {
    let mut master = master_seed(seed)?;
    let derived = derive_keys_from_seed(&master);
    master.zeroize();
    derived
}

// ============================================================================
// TESTS
// ============================================================================
