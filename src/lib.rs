//! # CDM Core
//!
//! The Crypto Data Model envelope protocol: confidential, tamper-evident
//! table/column/row records exchanged between two identities over an
//! untrusted transport.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CDM CORE MODULES                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  query layer ──LogicalOperation──►┌──────────────────┐                  │
//! │                                   │ EnvelopeBuilder  │──► wire text ──► │
//! │                                   │ - encrypt fields │    network       │
//! │                                   │ - sign origin    │                  │
//! │                                   └────────┬─────────┘                  │
//! │                                            │                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────┴─────┐  ┌──────────────┐   │
//! │  │  Identity   │  │   Crypto    │  │ Randomizer  │  │   Envelope   │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Seed → KP │  │ - X25519    │  │ - @suffix   │  │ - Model      │   │
//! │  │ - Resolver  │  │ - AES-GCM   │  │ - Strip     │  │ - Wire codec │   │
//! │  └─────────────┘  │ - Ed25519   │  └───────┬─────┘  └──────────────┘   │
//! │                   └─────────────┘          │                            │
//! │                                   ┌────────┴─────────┐                  │
//! │  network ──ThreadItem / store────►│  EnvelopeReader  │──► UI            │
//! │                                   │ - counterpart    │                  │
//! │                                   │ - placeholder    │                  │
//! │                                   │ - reverse thread │                  │
//! │                                   └──────────────────┘                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Version, ledger, network, domain tag and seeds
//! - [`crypto`] - Key derivation, shared-key encryption, signatures
//! - [`identity`] - Seed to key pair resolution
//! - [`randomize`] - Randomization suffixes
//! - [`envelope`] - Envelope model, builder and wire codec
//! - [`reader`] - Field, thread and envelope decryption
//! - [`store`] - Remote store catalog entries
//!
//! ## Example
//!
//! ```
//! use cdm_core::{CdmConfig, CreateSpec, EnvelopeBuilder, EnvelopeReader, LogicalOperation};
//!
//! let config = CdmConfig::with_seeds("root seed", "client seed");
//! let envelope = EnvelopeBuilder::new(config.clone())
//!     .compose(&[LogicalOperation::Create(CreateSpec {
//!         table: "tweets".into(),
//!         columns: vec!["id".into(), "message".into()],
//!     })])
//!     .unwrap();
//!
//! let received = cdm_core::envelope::wire::parse(&envelope.to_wire()).unwrap();
//! let ops = EnvelopeReader::new(config).decrypt_envelope(&received).unwrap();
//! assert_eq!(ops[0].table, "tweets");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod randomize;
pub mod reader;
pub mod store;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{CdmConfig, FieldRandomization, SignatureScheme};
pub use crypto::{KeyPair, PublicKey, SharedSecret};
pub use envelope::{
    CdmEnvelope, CreateSpec, EncryptedField, EnvelopeBuilder, InsertCell, InsertSpec,
    LogicalOperation, Operation,
};
pub use error::{Error, Result};
pub use identity::{derive_key_pair, IdentityResolver, SeedIdentityResolver};
pub use randomize::{randomize, strip_randomization};
pub use reader::{
    resolve_counterpart_key, DecryptedThreadItem, Direction, EnvelopeReader, FieldOutcome,
    ThreadItem, DECODING_ERROR_PLACEHOLDER,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
