//! # Error Handling
//!
//! Error types for CDM Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Identity Errors                                                   │
//! │  │   ├── InvalidSeed           - Seed cannot derive a key pair         │
//! │  │   ├── KeyDerivationFailed   - HKDF expansion failed                 │
//! │  │   └── InvalidKey            - Malformed public key / signature      │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── EncryptionFailed      - AEAD encryption failed                │
//! │  │   ├── DecryptionFailed      - Wrong key, corruption, tampering      │
//! │  │   └── VerificationFailed    - Origin signature does not verify      │
//! │  │                                                                      │
//! │  ├── Envelope Errors                                                   │
//! │  │   ├── MalformedEnvelope     - Document structure is wrong           │
//! │  │   ├── UnsupportedVersion    - Document version differs              │
//! │  │   ├── DigestMismatch        - Plaintext does not match sha256       │
//! │  │   └── NotAddressedToLocal   - Operation is for another recipient    │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      └── DeserializationError                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//!
//! Structural and derivation failures abort the calling operation.
//! Per-field failures (`DecryptionFailed`, `DigestMismatch`) are absorbed by
//! the reader, which substitutes a placeholder so the rest of a thread still
//! renders. See [`Error::is_recoverable`].

use thiserror::Error;

/// Result type alias for CDM Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CDM Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Identity Errors (200-299)
    // ========================================================================

    /// The seed cannot be mapped to a key pair
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Key derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    VerificationFailed,

    // ========================================================================
    // Envelope Errors (400-499)
    // ========================================================================

    /// The document does not match the expected nested structure
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The document carries a version this reader does not accept
    #[error("Unsupported CDM version: {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the document
        found: String,
        /// Version this side is configured for
        expected: String,
    },

    /// A decrypted plaintext does not hash to the attached digest
    #[error("Digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch {
        /// Digest carried by the field
        expected: String,
        /// Digest of the decrypted plaintext
        computed: String,
    },

    /// An envelope operation names a recipient other than the local identity
    #[error("Operation is addressed to {recipient}, not the local identity")]
    NotAddressedToLocal {
        /// Base58 public key the operation is addressed to
        recipient: String,
    },

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 200-299: Identity
    /// - 300-399: Crypto
    /// - 400-499: Envelope
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Identity (200-299)
            Error::InvalidSeed(_) => 200,
            Error::KeyDerivationFailed(_) => 201,
            Error::InvalidKey(_) => 202,

            // Crypto (300-399)
            Error::EncryptionFailed(_) => 300,
            Error::DecryptionFailed(_) => 301,
            Error::VerificationFailed => 303,

            // Envelope (400-499)
            Error::MalformedEnvelope(_) => 400,
            Error::UnsupportedVersion { .. } => 401,
            Error::DigestMismatch { .. } => 402,
            Error::NotAddressedToLocal { .. } => 403,

            // Internal (900-999)
            Error::DeserializationError(_) => 901,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors affect a single field. The reader replaces the
    /// field with a placeholder and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DecryptionFailed(_) | Error::DigestMismatch { .. }
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DeserializationError(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedEnvelope(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidSeed("empty".into()).code(), 200);
        assert_eq!(Error::DecryptionFailed("test".into()).code(), 301);
        assert_eq!(Error::MalformedEnvelope("test".into()).code(), 400);
        assert_eq!(
            Error::NotAddressedToLocal {
                recipient: "abc".into()
            }
            .code(),
            403
        );
        assert_eq!(Error::DeserializationError("test".into()).code(), 901);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::DecryptionFailed("bad tag".into()).is_recoverable());
        assert!(Error::DigestMismatch {
            expected: "a".into(),
            computed: "b".into(),
        }
        .is_recoverable());
        assert!(!Error::InvalidSeed("empty".into()).is_recoverable());
        assert!(!Error::MalformedEnvelope("no root".into()).is_recoverable());
        assert!(!Error::NotAddressedToLocal {
            recipient: "abc".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: Error = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert_eq!(err.code(), 901);
    }

    #[test]
    fn test_unsupported_version_message() {
        let err = Error::UnsupportedVersion {
            found: "0.6".into(),
            expected: "0.7".into(),
        };
        assert!(err.to_string().contains("0.6"));
        assert!(err.to_string().contains("0.7"));
    }
}
