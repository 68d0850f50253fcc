//! # Envelope Reader
//!
//! Decrypts what the local identity receives.
//!
//! ## Counterpart Resolution
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      WHICH SHARED SECRET?                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  direction = outgoing   ──►  counterpart = recipient                   │
//! │  direction = incoming   ──►  counterpart = logical sender              │
//! │                                                                         │
//! │  secret = HKDF(X25519(local private, counterpart public), domain tag)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Isolation
//!
//! A field that cannot be decrypted becomes [`DECODING_ERROR_PLACEHOLDER`]
//! and processing moves on. Only failures to derive the local identity
//! abort a call, since nothing after that could succeed either.
//!
//! Inputs are never mutated: every call returns new values.

use serde::{Deserialize, Serialize};

use crate::config::{CdmConfig, SignatureScheme};
use crate::crypto::{self, PublicKey};
use crate::envelope::{CdmEnvelope, EncryptedField, Operation};
use crate::error::{Error, Result};
use crate::identity::{IdentityResolver, SeedIdentityResolver};
use crate::randomize::strip_randomization;
use crate::store::{ColumnEntry, TableEntry, ValueEntry};

/// Text shown in place of a field that could not be decrypted
pub const DECODING_ERROR_PLACEHOLDER: &str = "⚠️ Decoding error";

// ============================================================================
// TYPES
// ============================================================================

/// Whether the local identity sent or received an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from `logical_sender`
    Incoming,
    /// Sent to `recipient`
    Outgoing,
}

/// One encrypted message in a thread, as delivered by the network client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItem {
    /// Sent or received
    pub direction: Direction,
    /// Party that wrote the item
    pub logical_sender: PublicKey,
    /// Party the item was written for
    pub recipient: PublicKey,
    /// Encrypted subject line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<EncryptedField>,
    /// Encrypted body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<EncryptedField>,
}

/// A thread item after decryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedThreadItem {
    /// Sent or received
    pub direction: Direction,
    /// Party that wrote the item
    pub logical_sender: PublicKey,
    /// Party the item was written for
    pub recipient: PublicKey,
    /// Subject with any randomization suffix removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Body with any randomization suffix removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Subject exactly as decrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_subject: Option<String>,
    /// Body exactly as decrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_message: Option<String>,
}

/// Result of opening one encrypted field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Decrypted, and the plaintext matches the digest
    Verified(String),
    /// Decrypted, but the field carried no digest to check against
    Unchecked(String),
    /// Decrypted, but the plaintext does not match the digest
    DigestMismatch(String),
    /// Wrong key, corrupted ciphertext, or tampering
    Undecryptable,
}

impl FieldOutcome {
    /// Decrypted text, if any
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            FieldOutcome::Verified(text)
            | FieldOutcome::Unchecked(text)
            | FieldOutcome::DigestMismatch(text) => Some(text),
            FieldOutcome::Undecryptable => None,
        }
    }

    /// Decrypted text, or the placeholder when decryption failed
    pub fn into_text(self) -> String {
        match self {
            FieldOutcome::Verified(text)
            | FieldOutcome::Unchecked(text)
            | FieldOutcome::DigestMismatch(text) => text,
            FieldOutcome::Undecryptable => DECODING_ERROR_PLACEHOLDER.to_string(),
        }
    }
}

/// A decrypted table name from the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedTable {
    /// Digest the store lists the table under
    pub hash: String,
    /// Table name
    pub name: String,
}

/// A decrypted column from the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedColumn {
    /// Digest of the owning table
    pub table_hash: String,
    /// Owning table's name
    pub table: String,
    /// Digest of the column
    pub column_hash: String,
    /// Column name
    pub column: String,
}

/// A decrypted cell value from the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedValue {
    /// Digest of the column
    pub column_hash: String,
    /// Column name
    pub column: String,
    /// Digest of the value
    pub value_hash: String,
    /// Value
    pub value: String,
}

/// A cell of a decrypted operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedCell {
    /// Column name
    pub column: String,
    /// Cell value; `None` for table definitions
    pub value: Option<String>,
}

/// An envelope operation as the recipient sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedOperation {
    /// `create` or `insert`
    pub kind: &'static str,
    /// Table name
    pub table: String,
    /// Columns (and values for inserts), in document order
    pub columns: Vec<DecryptedCell>,
    /// Origin public key
    pub origin: PublicKey,
}

/// Resolve which public key the local identity shares a secret with
pub fn resolve_counterpart_key(item: &ThreadItem) -> PublicKey {
    match item.direction {
        Direction::Outgoing => item.recipient,
        Direction::Incoming => item.logical_sender,
    }
}

// ============================================================================
// READER
// ============================================================================

/// Decrypts fields, thread items and store catalogs for the local identity
///
/// The local identity is the configured client seed. Its key pair is derived
/// for every field and dropped straight after.
#[derive(Debug, Clone)]
pub struct EnvelopeReader<R: IdentityResolver = SeedIdentityResolver> {
    config: CdmConfig,
    resolver: R,
}

impl EnvelopeReader {
    /// Reader using seed-derived identities
    pub fn new(config: CdmConfig) -> Self {
        Self::with_resolver(config, SeedIdentityResolver)
    }
}

impl<R: IdentityResolver> EnvelopeReader<R> {
    /// Reader using a custom identity resolver
    pub fn with_resolver(config: CdmConfig, resolver: R) -> Self {
        Self { config, resolver }
    }

    /// Active configuration
    pub fn config(&self) -> &CdmConfig {
        &self.config
    }

    /// Open one field shared with `counterpart`
    ///
    /// Only a failure to derive the local identity is an error. Everything
    /// that goes wrong with the field itself is reported in the outcome.
    pub fn open_field(&self, field: &EncryptedField, counterpart: &PublicKey) -> Result<FieldOutcome> {
        let local = self.resolver.resolve(&self.config.client_seed)?;

        let plaintext = field.ciphertext_bytes().and_then(|sealed| {
            crypto::decrypt_from(&local, counterpart, &self.config.domain_tag, &sealed)
        });
        drop(local);

        let text = match plaintext.and_then(|bytes| {
            String::from_utf8(bytes)
                .map_err(|_| Error::DecryptionFailed("Plaintext is not UTF-8".into()))
        }) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(code = e.code(), "Failed to decrypt field: {}", e);
                return Ok(FieldOutcome::Undecryptable);
            }
        };

        if !field.has_digest() {
            return Ok(FieldOutcome::Unchecked(text));
        }
        match field.verify_plaintext(&text) {
            Ok(()) => Ok(FieldOutcome::Verified(text)),
            Err(e) => {
                tracing::warn!(code = e.code(), "Decrypted field does not match its digest");
                Ok(FieldOutcome::DigestMismatch(text))
            }
        }
    }

    /// Decrypt one field, substituting the placeholder on failure
    ///
    /// The returned text still carries any randomization suffix.
    pub fn decrypt_field(&self, field: &EncryptedField, counterpart: &PublicKey) -> Result<String> {
        Ok(self.open_field(field, counterpart)?.into_text())
    }

    /// Decrypt subject and body of one item
    pub fn decrypt_item(&self, item: &ThreadItem) -> Result<DecryptedThreadItem> {
        let counterpart = resolve_counterpart_key(item);

        let raw_subject = item
            .subject
            .as_ref()
            .map(|field| self.decrypt_field(field, &counterpart))
            .transpose()?;
        let raw_message = item
            .message
            .as_ref()
            .map(|field| self.decrypt_field(field, &counterpart))
            .transpose()?;

        Ok(DecryptedThreadItem {
            direction: item.direction,
            logical_sender: item.logical_sender,
            recipient: item.recipient,
            subject: raw_subject.as_deref().map(strip_randomization),
            message: raw_message.as_deref().map(strip_randomization),
            raw_subject,
            raw_message,
        })
    }

    /// Decrypt a thread and return it oldest-first
    ///
    /// `items` are expected newest-first, as the network delivers them; the
    /// result is exactly that order reversed.
    pub fn decrypt_thread(&self, items: &[ThreadItem]) -> Result<Vec<DecryptedThreadItem>> {
        let mut decrypted = items
            .iter()
            .map(|item| self.decrypt_item(item))
            .collect::<Result<Vec<_>>>()?;
        decrypted.reverse();

        tracing::debug!("Decrypted thread of {} items", decrypted.len());
        Ok(decrypted)
    }

    /// Decrypt every operation of a received envelope
    ///
    /// Rejects envelopes with another version and operations not addressed
    /// to the local identity. Under [`SignatureScheme::Ed25519`] every
    /// operation must also carry a valid signature by the root identity.
    /// Fields are opened with the origin as counterpart and returned with
    /// suffixes stripped.
    pub fn decrypt_envelope(&self, envelope: &CdmEnvelope) -> Result<Vec<DecryptedOperation>> {
        envelope.ensure_version(&self.config.version).map_err(|e| {
            tracing::warn!("Skipping envelope: {}", e);
            e
        })?;

        let local = self.resolver.public_key(&self.config.client_seed)?;
        let origin_key = match self.config.signature_scheme {
            SignatureScheme::Ed25519 => Some(
                self.resolver
                    .resolve(&self.config.root_seed)?
                    .signing_public_key(),
            ),
            SignatureScheme::Placeholder => None,
        };

        envelope
            .operations()
            .iter()
            .map(|operation| {
                if operation.recipient() != &local {
                    return Err(Error::NotAddressedToLocal {
                        recipient: operation.recipient().to_base58(),
                    });
                }
                if let Some(origin_key) = &origin_key {
                    operation.verify_origin(origin_key).map_err(|e| {
                        tracing::warn!(code = e.code(), "Rejecting {} operation", operation.tag());
                        e
                    })?;
                }
                self.decrypt_operation(operation)
            })
            .collect()
    }

    fn decrypt_operation(&self, operation: &Operation) -> Result<DecryptedOperation> {
        let origin = operation.origin().public_key;
        let open = |field: &EncryptedField| -> Result<String> {
            Ok(strip_randomization(&self.decrypt_field(field, &origin)?))
        };

        let columns = match operation {
            Operation::CreateTable(op) => op
                .columns
                .iter()
                .map(|column| {
                    Ok(DecryptedCell {
                        column: open(column)?,
                        value: None,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Operation::InsertRow(op) => op
                .columns
                .iter()
                .map(|cell| {
                    Ok(DecryptedCell {
                        column: open(&cell.column)?,
                        value: Some(open(&cell.value)?),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(DecryptedOperation {
            kind: operation.tag(),
            table: open(operation.table())?,
            columns,
            origin,
        })
    }

    // ========================================================================
    // Remote store catalogs
    // ========================================================================

    /// Decrypt table names listed by the remote store
    pub fn decrypt_tables(&self, tables: &[TableEntry]) -> Result<Vec<DecryptedTable>> {
        let root = self.root_public_key()?;
        tables
            .iter()
            .map(|entry| {
                Ok(DecryptedTable {
                    hash: entry.hash.clone(),
                    name: self.open_catalog_field(&entry.field(), &root)?,
                })
            })
            .collect()
    }

    /// Decrypt columns (and their tables) listed by the remote store
    pub fn decrypt_columns(&self, columns: &[ColumnEntry]) -> Result<Vec<DecryptedColumn>> {
        let root = self.root_public_key()?;
        columns
            .iter()
            .map(|entry| {
                Ok(DecryptedColumn {
                    table_hash: entry.table_hash.clone(),
                    table: self.open_catalog_field(&entry.table_ref(), &root)?,
                    column_hash: entry.column_hash.clone(),
                    column: self.open_catalog_field(&entry.column_ref(), &root)?,
                })
            })
            .collect()
    }

    /// Decrypt cell values (and their columns) listed by the remote store
    pub fn decrypt_values(&self, values: &[ValueEntry]) -> Result<Vec<DecryptedValue>> {
        let root = self.root_public_key()?;
        values
            .iter()
            .map(|entry| {
                Ok(DecryptedValue {
                    column_hash: entry.column_hash.clone(),
                    column: self.open_catalog_field(&entry.column_ref(), &root)?,
                    value_hash: entry.value_hash.clone(),
                    value: self.open_catalog_field(&entry.value_field(), &root)?,
                })
            })
            .collect()
    }

    fn root_public_key(&self) -> Result<PublicKey> {
        self.resolver.public_key(&self.config.root_seed)
    }

    fn open_catalog_field(&self, field: &EncryptedField, root: &PublicKey) -> Result<String> {
        Ok(strip_randomization(&self.decrypt_field(field, root)?))
    }
}

// ============================================================================
// TESTS
// ============================================================================
