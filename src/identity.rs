//! # Identity
//!
//! Maps seed strings to key pairs.
//!
//! Builders and readers never hold a [`KeyPair`] between calls. They keep the
//! seed and ask an [`IdentityResolver`] for the pair whenever a field is
//! encrypted or decrypted, and drop it straight after.

use crate::crypto::{KeyPair, PublicKey};
use crate::error::Result;

/// Source of deterministic key pairs
///
/// Implementations must be pure: the same seed always yields the same pair.
pub trait IdentityResolver: Send + Sync {
    /// Derive the key pair for `seed`
    fn resolve(&self, seed: &str) -> Result<KeyPair>;

    /// Derive only the public identifier for `seed`
    fn public_key(&self, seed: &str) -> Result<PublicKey> {
        Ok(self.resolve(seed)?.public_key())
    }
}

/// Default resolver: SHA-256 + HKDF over the seed bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedIdentityResolver;

impl IdentityResolver for SeedIdentityResolver {
    fn resolve(&self, seed: &str) -> Result<KeyPair> {
        derive_key_pair(seed)
    }
}

/// Derive a key pair from a seed string
///
/// Fails with `InvalidSeed` for blank seeds.
pub fn derive_key_pair(seed: &str) -> Result<KeyPair> {
    KeyPair::from_seed(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_resolver_is_deterministic() {
        let resolver = SeedIdentityResolver;

        let a = resolver.public_key("seedA").unwrap();
        let b = resolver.public_key("seedA").unwrap();

        assert_eq!(a, b);
        assert_eq!(a, derive_key_pair("seedA").unwrap().public_key());
    }

    #[test]
    fn test_resolver_rejects_blank_seed() {
        let resolver = SeedIdentityResolver;
        assert!(matches!(resolver.resolve(" "), Err(Error::InvalidSeed(_))));
    }
}
