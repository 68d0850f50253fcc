//! # CDM Envelopes
//!
//! The typed model of a Crypto Data Model document, plus its builder and
//! wire codec.
//!
//! ## Document Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CDM ENVELOPE                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  version ─ blockchain ─ network (Title-case)                           │
//! │                                                                         │
//! │  operations (input order, no dedup)                                    │
//! │  ┌─────────────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │ CreateTable                     │  │ InsertRow                   │  │
//! │  │  table:   EncryptedField        │  │  table:   reference         │  │
//! │  │  columns: [EncryptedField]      │  │  columns: [(reference,      │  │
//! │  │  origin:  publickey + signature │  │             EncryptedField)]│  │
//! │  │  recipient: publickey           │  │  origin / recipient         │  │
//! │  └─────────────────────────────────┘  └─────────────────────────────┘  │
//! │                                                                         │
//! │  EncryptedField = base58(nonce || AES-GCM) + hex(SHA-256(plaintext))   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Envelopes are immutable once built: [`EnvelopeBuilder`] and
//! [`wire::parse`] are the only ways to obtain one.

mod builder;
pub mod wire;

pub use builder::{
    compose_envelope, encrypt_field, CreateSpec, EnvelopeBuilder, InsertCell, InsertSpec,
    LogicalOperation,
};

use serde::{Deserialize, Serialize};

use crate::config::title_case;
use crate::crypto::{self, sha256_hex, PublicKey, Signature};
use crate::error::{Error, Result};

/// Text written in place of a real origin signature
pub const SIGNATURE_PLACEHOLDER: &str = "signature";

/// An encrypted value with the digest of its plaintext
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedField {
    /// Base58 of `nonce || ciphertext || tag`
    pub ciphertext: String,
    /// Hex SHA-256 of the plaintext (including any randomization suffix)
    #[serde(rename = "sha256", alias = "hash", default)]
    pub digest: String,
}

impl EncryptedField {
    /// Wrap an already-encoded ciphertext and digest
    pub fn new(ciphertext: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            digest: digest.into(),
        }
    }

    /// Decode the base58 ciphertext
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>> {
        bs58::decode(&self.ciphertext)
            .into_vec()
            .map_err(|e| Error::DecryptionFailed(format!("Invalid base58 ciphertext: {}", e)))
    }

    /// Whether the field carries a digest at all
    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }

    /// Check a decrypted plaintext against the attached digest
    pub fn verify_plaintext(&self, plaintext: &str) -> Result<()> {
        let computed = sha256_hex(plaintext.as_bytes());
        if computed.eq_ignore_ascii_case(&self.digest) {
            Ok(())
        } else {
            Err(Error::DigestMismatch {
                expected: self.digest.clone(),
                computed,
            })
        }
    }
}

/// Signature slot of an operation's origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginSignature {
    /// The literal `signature` text; proves nothing
    Placeholder,
    /// Ed25519 signature over [`Operation::signing_bytes`]
    Ed25519(Signature),
}

impl OriginSignature {
    /// Text written inside `<signature>`
    pub fn to_wire(&self) -> String {
        match self {
            OriginSignature::Placeholder => SIGNATURE_PLACEHOLDER.to_string(),
            OriginSignature::Ed25519(sig) => sig.to_hex(),
        }
    }

    /// Read the text inside `<signature>`
    pub fn from_wire(text: &str) -> Result<Self> {
        if text == SIGNATURE_PLACEHOLDER {
            return Ok(OriginSignature::Placeholder);
        }
        Signature::from_hex(text)
            .map(OriginSignature::Ed25519)
            .map_err(|_| Error::MalformedEnvelope(format!("Unrecognized signature '{}'", text)))
    }
}

/// Who created an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Origin's public identifier
    pub public_key: PublicKey,
    /// Origin's claim over the operation
    pub signature: OriginSignature,
}

/// A table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    /// Encrypted table name
    pub table: EncryptedField,
    /// Encrypted column names, in definition order
    pub columns: Vec<EncryptedField>,
    /// Creator
    pub origin: Origin,
    /// Intended reader
    pub recipient: PublicKey,
}

/// One cell of a row insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertColumn {
    /// Reference to the column's encrypted name, copied from its definition
    pub column: EncryptedField,
    /// Encrypted cell value
    pub value: EncryptedField,
}

/// A row insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRow {
    /// Reference to the table's encrypted name, copied from its definition
    pub table: EncryptedField,
    /// Cells, in caller order
    pub columns: Vec<InsertColumn>,
    /// Creator
    pub origin: Origin,
    /// Intended reader
    pub recipient: PublicKey,
}

/// One operation inside an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `<create>`
    CreateTable(CreateTable),
    /// `<insert>`
    InsertRow(InsertRow),
}

impl Operation {
    /// Wire tag of this operation
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::CreateTable(_) => "create",
            Operation::InsertRow(_) => "insert",
        }
    }

    /// Origin block
    pub fn origin(&self) -> &Origin {
        match self {
            Operation::CreateTable(op) => &op.origin,
            Operation::InsertRow(op) => &op.origin,
        }
    }

    /// Recipient public key
    pub fn recipient(&self) -> &PublicKey {
        match self {
            Operation::CreateTable(op) => &op.recipient,
            Operation::InsertRow(op) => &op.recipient,
        }
    }

    /// Encrypted table field (definition or reference)
    pub fn table(&self) -> &EncryptedField {
        match self {
            Operation::CreateTable(op) => &op.table,
            Operation::InsertRow(op) => &op.table,
        }
    }

    /// Bytes covered by an Ed25519 origin signature
    ///
    /// Every ciphertext and digest in the operation, in wire order, followed
    /// by the origin and recipient keys. The signature itself is excluded.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut push = |part: &str| {
            out.extend_from_slice(part.as_bytes());
            out.push(b'\n');
        };

        push(self.tag());
        push(&self.table().ciphertext);
        push(&self.table().digest);

        match self {
            Operation::CreateTable(op) => {
                for column in &op.columns {
                    push(&column.ciphertext);
                    push(&column.digest);
                }
            }
            Operation::InsertRow(op) => {
                for cell in &op.columns {
                    push(&cell.column.ciphertext);
                    push(&cell.column.digest);
                    push(&cell.value.ciphertext);
                    push(&cell.value.digest);
                }
            }
        }

        push(&self.origin().public_key.to_base58());
        push(&self.recipient().to_base58());
        out
    }

    /// Verify the origin's Ed25519 signature
    ///
    /// `signing_public_key` is the origin's Ed25519 key, obtained out of
    /// band. Placeholder signatures always fail with `VerificationFailed`.
    pub fn verify_origin(&self, signing_public_key: &[u8; 32]) -> Result<()> {
        match &self.origin().signature {
            OriginSignature::Placeholder => Err(Error::VerificationFailed),
            OriginSignature::Ed25519(sig) => {
                crypto::verify(signing_public_key, &self.signing_bytes(), sig)
            }
        }
    }

    pub(crate) fn set_signature(&mut self, signature: OriginSignature) {
        match self {
            Operation::CreateTable(op) => op.origin.signature = signature,
            Operation::InsertRow(op) => op.origin.signature = signature,
        }
    }
}

/// A complete CDM document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdmEnvelope {
    version: String,
    blockchain: String,
    network: String,
    operations: Vec<Operation>,
}

impl CdmEnvelope {
    pub(crate) fn new(
        version: impl Into<String>,
        blockchain: impl Into<String>,
        network: &str,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            version: version.into(),
            blockchain: blockchain.into(),
            network: title_case(network),
            operations,
        }
    }

    /// Document version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Ledger name
    pub fn blockchain(&self) -> &str {
        &self.blockchain
    }

    /// Network name, always title-case
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Operations in document order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Reject documents written for another protocol version
    pub fn ensure_version(&self, expected: &str) -> Result<()> {
        if self.version == expected {
            Ok(())
        } else {
            Err(Error::UnsupportedVersion {
                found: self.version.clone(),
                expected: expected.to_string(),
            })
        }
    }

    /// Wire text of this envelope
    pub fn to_wire(&self) -> String {
        wire::serialize(self)
    }

    /// Hex SHA-256 of the wire text
    pub fn document_hash(&self) -> String {
        sha256_hex(self.to_wire().as_bytes())
    }
}

// ============================================================================
// TESTS
// ============================================================================
