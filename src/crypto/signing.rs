//! # Origin Signatures
//!
//! Ed25519 signatures over an operation's canonical signing bytes.
//!
//! Ed25519 signatures are deterministic: the same key and message always
//! produce the same signature, so re-serializing an envelope never changes
//! its signatures.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, Verifier, VerifyingKey};

use super::SigningKeyPair;
use crate::error::{Error, Result};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 origin signature
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Wrap raw signature bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Hex text as written inside `<signature>`
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Read the hex text of a `<signature>` element
    ///
    /// Anything but exactly 128 hex digits is `InvalidKey`.
    pub fn from_hex(text: &str) -> Result<Self> {
        let mut bytes = [0u8; SIGNATURE_SIZE];
        hex::decode_to_slice(text, &mut bytes).map_err(|e| {
            Error::InvalidKey(format!(
                "Expected {} hex-encoded signature bytes: {}",
                SIGNATURE_SIZE, e
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Sign `message` with the origin's Ed25519 key
pub fn sign(origin: &SigningKeyPair, message: &[u8]) -> Signature {
    Signature(origin.signing_key().sign(message).to_bytes())
}

/// Check an origin signature against the origin's Ed25519 public key
///
/// A key that is not a valid curve point is `InvalidKey`; any other failure
/// is `VerificationFailed`.
pub fn verify(origin_key: &[u8; 32], message: &[u8], signature: &Signature) -> Result<()> {
    let origin_key = VerifyingKey::from_bytes(origin_key)
        .map_err(|e| Error::InvalidKey(format!("Invalid origin signing key: {}", e)))?;

    origin_key
        .verify(message, &Ed25519Signature::from_bytes(&signature.0))
        .map_err(|_| Error::VerificationFailed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_origin_signature_verifies() {
        let keypair = KeyPair::from_seed("root").unwrap();
        let message = b"table|columns|recipient";

        let signature = sign(&keypair.signing, message);
        assert!(verify(&keypair.signing_public_key(), message, &signature).is_ok());
    }

    #[test]
    fn test_altered_operation_rejected() {
        let keypair = KeyPair::from_seed("root").unwrap();

        let signature = sign(&keypair.signing, b"create|t1|c1");
        let result = verify(&keypair.signing_public_key(), b"create|t1|c2", &signature);

        assert!(matches!(result, Err(Error::VerificationFailed)));
    }

    #[test]
    fn test_other_origin_rejected() {
        let root = KeyPair::from_seed("root").unwrap();
        let client = KeyPair::from_seed("client").unwrap();

        let signature = sign(&root.signing, b"operation");
        assert!(verify(&client.signing_public_key(), b"operation", &signature).is_err());
    }

    #[test]
    fn test_resigning_is_stable() {
        let keypair = KeyPair::from_seed("root").unwrap();
        assert_eq!(sign(&keypair.signing, b"m"), sign(&keypair.signing, b"m"));
    }

    #[test]
    fn test_signature_hex() {
        let keypair = KeyPair::from_seed("root").unwrap();
        let signature = sign(&keypair.signing, b"m");

        let text = signature.to_hex();
        assert_eq!(text.len(), 2 * SIGNATURE_SIZE);
        assert_eq!(Signature::from_hex(&text).unwrap(), signature);
        assert!(Signature::from_hex("abcd").is_err());
        assert!(Signature::from_hex("signature").is_err());
    }
}
