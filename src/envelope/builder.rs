//! Envelope builder.
//!
//! Turns logical operations into encrypted [`Operation`]s and folds them into
//! a [`CdmEnvelope`]. Every field is encrypted under the (root → client)
//! channel from [`CdmConfig`]; key pairs are resolved per field and dropped
//! as soon as the field is sealed.

use serde::{Deserialize, Serialize};

use super::{
    CdmEnvelope, CreateTable, EncryptedField, InsertColumn, InsertRow, Operation, Origin,
    OriginSignature,
};
use crate::config::{CdmConfig, SignatureScheme};
use crate::crypto::{self, sha256_hex, PublicKey};
use crate::error::Result;
use crate::identity::{IdentityResolver, SeedIdentityResolver};
use crate::randomize::randomize;

// ============================================================================
// LOGICAL OPERATIONS
// ============================================================================

/// Plaintext table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSpec {
    /// Table name
    pub table: String,
    /// Column names, in definition order
    pub columns: Vec<String>,
}

/// One cell of a row insert: an existing column reference and a plaintext value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertCell {
    /// Encrypted column name, as stored by the remote store
    pub column: EncryptedField,
    /// Cell value to encrypt
    pub value: String,
}

/// Row insert against an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertSpec {
    /// Encrypted table name, as stored by the remote store
    pub table: EncryptedField,
    /// Cells, in caller order
    pub cells: Vec<InsertCell>,
}

/// An operation as supplied by the query layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperation {
    /// Define a table
    Create(CreateSpec),
    /// Insert a row
    Insert(InsertSpec),
}

// ============================================================================
// FREE FUNCTIONS
// ============================================================================

/// Encrypt `plaintext` from one identity to another
///
/// Both key pairs are resolved, the shared secret is derived from
/// (sender private, recipient public, `domain_tag`), and everything is dropped
/// before returning. The digest covers `plaintext` exactly as given.
pub fn encrypt_field<R: IdentityResolver + ?Sized>(
    resolver: &R,
    from_seed: &str,
    to_seed: &str,
    domain_tag: &str,
    plaintext: &str,
) -> Result<EncryptedField> {
    let sender = resolver.resolve(from_seed)?;
    let recipient = resolver.public_key(to_seed)?;

    let sealed = crypto::encrypt_for(&sender, &recipient, domain_tag, plaintext.as_bytes())?;

    Ok(EncryptedField::new(
        bs58::encode(sealed).into_string(),
        sha256_hex(plaintext.as_bytes()),
    ))
}

/// Fold operations into an envelope, keeping their order
pub fn compose_envelope(
    version: &str,
    ledger_network_name: &str,
    network: &str,
    operations: Vec<Operation>,
) -> CdmEnvelope {
    let envelope = CdmEnvelope::new(version, ledger_network_name, network, operations);

    tracing::debug!(
        "Composed CDM envelope v{} with {} operations",
        envelope.version(),
        envelope.operations().len()
    );

    envelope
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builds envelopes for the configured (root → client) channel
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder<R: IdentityResolver = SeedIdentityResolver> {
    config: CdmConfig,
    resolver: R,
}

impl EnvelopeBuilder {
    /// Builder using seed-derived identities
    pub fn new(config: CdmConfig) -> Self {
        Self::with_resolver(config, SeedIdentityResolver)
    }
}

impl<R: IdentityResolver> EnvelopeBuilder<R> {
    /// Builder using a custom identity resolver
    pub fn with_resolver(config: CdmConfig, resolver: R) -> Self {
        Self { config, resolver }
    }

    /// Active configuration
    pub fn config(&self) -> &CdmConfig {
        &self.config
    }

    /// Encrypt one field from root to client, without randomization
    pub fn encrypt_field(&self, plaintext: &str) -> Result<EncryptedField> {
        encrypt_field(
            &self.resolver,
            &self.config.root_seed,
            &self.config.client_seed,
            &self.config.domain_tag,
            plaintext,
        )
    }

    /// Build a single encrypted operation
    pub fn build_operation(&self, operation: &LogicalOperation) -> Result<Operation> {
        let origin_key = self.resolver.public_key(&self.config.root_seed)?;
        let recipient = self.resolver.public_key(&self.config.client_seed)?;

        let mut built = match operation {
            LogicalOperation::Create(spec) => Operation::CreateTable(CreateTable {
                table: self.seal(&spec.table, self.config.randomize_fields.structural())?,
                columns: spec
                    .columns
                    .iter()
                    .map(|name| self.seal(name, self.config.randomize_fields.structural()))
                    .collect::<Result<Vec<_>>>()?,
                origin: placeholder_origin(origin_key),
                recipient,
            }),
            LogicalOperation::Insert(spec) => Operation::InsertRow(InsertRow {
                table: spec.table.clone(),
                columns: spec
                    .cells
                    .iter()
                    .map(|cell| {
                        Ok(InsertColumn {
                            column: cell.column.clone(),
                            value: self.seal(&cell.value, self.config.randomize_fields.values())?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                origin: placeholder_origin(origin_key),
                recipient,
            }),
        };

        if self.config.signature_scheme == SignatureScheme::Ed25519 {
            self.sign_origin(&mut built)?;
        }

        Ok(built)
    }

    /// Build every operation, in order
    pub fn build_operations(&self, operations: &[LogicalOperation]) -> Result<Vec<Operation>> {
        operations.iter().map(|op| self.build_operation(op)).collect()
    }

    /// Build and fold operations into an envelope
    ///
    /// Any failure aborts the whole envelope; partial envelopes are never
    /// returned.
    pub fn compose(&self, operations: &[LogicalOperation]) -> Result<CdmEnvelope> {
        let built = self.build_operations(operations)?;

        Ok(compose_envelope(
            &self.config.version,
            &self.config.ledger_network_name,
            &self.config.network,
            built,
        ))
    }

    /// Build an envelope and render its wire text
    pub fn compose_document(&self, operations: &[LogicalOperation]) -> Result<String> {
        Ok(self.compose(operations)?.to_wire())
    }

    fn seal(&self, plaintext: &str, randomized: bool) -> Result<EncryptedField> {
        if randomized {
            self.encrypt_field(&randomize(plaintext))
        } else {
            self.encrypt_field(plaintext)
        }
    }

    fn sign_origin(&self, operation: &mut Operation) -> Result<()> {
        let root = self.resolver.resolve(&self.config.root_seed)?;
        let signature = crypto::sign(&root.signing, &operation.signing_bytes());
        operation.set_signature(OriginSignature::Ed25519(signature));
        Ok(())
    }
}

fn placeholder_origin(public_key: PublicKey) -> Origin {
    Origin {
        public_key,
        signature: OriginSignature::Placeholder,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldRandomization;
    use crate::crypto::KeyPair;
    use crate::error::Error;
    use crate::randomize::{is_randomized, strip_randomization};

    fn config() -> CdmConfig {
        CdmConfig::with_seeds("root seed", "client seed")
    }

    fn open(field: &EncryptedField) -> String {
        let client = KeyPair::from_seed("client seed").unwrap();
        let root = KeyPair::from_seed("root seed").unwrap();
        let sealed = field.ciphertext_bytes().unwrap();
        let plain = crypto::decrypt_from(&client, &root.public_key(), "cdm", &sealed).unwrap();
        String::from_utf8(plain).unwrap()
    }

    fn create(table: &str, columns: &[&str]) -> LogicalOperation {
        LogicalOperation::Create(CreateSpec {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    #[test]
    fn test_encrypt_field_digest_and_round_trip() {
        let builder = EnvelopeBuilder::new(config());
        let field = builder.encrypt_field("tweets").unwrap();

        assert_eq!(field.digest, sha256_hex(b"tweets"));
        assert_eq!(open(&field), "tweets");
    }

    #[test]
    fn test_encrypt_field_fresh_nonce_same_digest() {
        let builder = EnvelopeBuilder::new(config());
        let a = builder.encrypt_field("x").unwrap();
        let b = builder.encrypt_field("x").unwrap();

        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_encrypt_field_rejects_blank_seed() {
        let result = encrypt_field(&SeedIdentityResolver, "", "client", "cdm", "x");
        assert!(matches!(result, Err(Error::InvalidSeed(_))));
    }

    #[test]
    fn test_create_table_keeps_column_order() {
        let builder = EnvelopeBuilder::new(config());
        let op = builder
            .build_operation(&create("tweets", &["id", "author", "message"]))
            .unwrap();

        let Operation::CreateTable(table) = op else {
            panic!("expected create");
        };
        assert_eq!(open(&table.table), "tweets");
        let names: Vec<String> = table.columns.iter().map(open).collect();
        assert_eq!(names, vec!["id", "author", "message"]);

        assert_eq!(
            table.origin.public_key,
            KeyPair::from_seed("root seed").unwrap().public_key()
        );
        assert_eq!(
            table.recipient,
            KeyPair::from_seed("client seed").unwrap().public_key()
        );
        assert_eq!(table.origin.signature, OriginSignature::Placeholder);
    }

    #[test]
    fn test_insert_reuses_references() {
        let builder = EnvelopeBuilder::new(config());
        let table = builder.encrypt_field("tweets").unwrap();
        let id = builder.encrypt_field("id").unwrap();
        let message = builder.encrypt_field("message").unwrap();

        let op = builder
            .build_operation(&LogicalOperation::Insert(InsertSpec {
                table: table.clone(),
                cells: vec![
                    InsertCell {
                        column: message.clone(),
                        value: "hello".into(),
                    },
                    InsertCell {
                        column: id.clone(),
                        value: "1".into(),
                    },
                ],
            }))
            .unwrap();

        let Operation::InsertRow(row) = op else {
            panic!("expected insert");
        };
        assert_eq!(row.table, table);
        assert_eq!(row.columns[0].column, message);
        assert_eq!(row.columns[1].column, id);
        assert_eq!(open(&row.columns[0].value), "hello");
        assert_eq!(open(&row.columns[1].value), "1");
    }

    #[test]
    fn test_compose_keeps_operation_order() {
        let builder = EnvelopeBuilder::new(config());
        let envelope = builder
            .compose(&[create("a", &[]), create("b", &["x"]), create("a", &[])])
            .unwrap();

        let tables: Vec<String> = envelope
            .operations()
            .iter()
            .map(|op| open(op.table()))
            .collect();
        assert_eq!(tables, vec!["a", "b", "a"]);
        assert_eq!(envelope.network(), "Testnet");
        assert_eq!(envelope.blockchain(), "Waves");
    }

    #[test]
    fn test_compose_empty() {
        let envelope = EnvelopeBuilder::new(config()).compose(&[]).unwrap();
        assert!(envelope.operations().is_empty());
    }

    #[test]
    fn test_compose_aborts_on_bad_seed() {
        let builder = EnvelopeBuilder::new(CdmConfig::with_seeds("", "client"));
        assert!(matches!(
            builder.compose(&[create("a", &[])]),
            Err(Error::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_ed25519_origin_signature() {
        let builder = EnvelopeBuilder::new(CdmConfig {
            signature_scheme: SignatureScheme::Ed25519,
            ..config()
        });
        let op = builder.build_operation(&create("t", &["c"])).unwrap();

        let root = KeyPair::from_seed("root seed").unwrap();
        let other = KeyPair::from_seed("someone else").unwrap();

        assert!(op.verify_origin(&root.signing_public_key()).is_ok());
        assert!(op.verify_origin(&other.signing_public_key()).is_err());
    }

    #[test]
    fn test_value_randomization() {
        let builder = EnvelopeBuilder::new(CdmConfig {
            randomize_fields: FieldRandomization::Values,
            ..config()
        });
        let table = builder.encrypt_field("t").unwrap();
        let column = builder.encrypt_field("c").unwrap();
        let insert = LogicalOperation::Insert(InsertSpec {
            table,
            cells: vec![InsertCell {
                column,
                value: "same".into(),
            }],
        });

        let first = builder.build_operation(&insert).unwrap();
        let second = builder.build_operation(&insert).unwrap();
        let (Operation::InsertRow(a), Operation::InsertRow(b)) = (first, second) else {
            panic!("expected inserts");
        };

        let raw = open(&a.columns[0].value);
        assert!(is_randomized(&raw));
        assert_eq!(strip_randomization(&raw), "same");
        assert_ne!(a.columns[0].value.digest, b.columns[0].value.digest);

        let Operation::CreateTable(created) = builder.build_operation(&create("t", &[])).unwrap()
        else {
            panic!("expected create");
        };
        assert_eq!(open(&created.table), "t");
    }

    #[test]
    fn test_logical_operation_json() {
        let op: LogicalOperation =
            serde_json::from_str(r#"{"create":{"table":"tweets","columns":["id"]}}"#).unwrap();
        assert_eq!(op, create("tweets", &["id"]));
    }
}
