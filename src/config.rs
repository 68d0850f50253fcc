//! CDM configuration.
//!
//! Everything the builder and reader need to agree on: document version,
//! ledger and network names, the key-derivation domain tag, and the two
//! seeds that define the (root → client) channel.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::Result;

/// Default CDM document version
pub const DEFAULT_VERSION: &str = "0.7";

/// Default ledger name written to `<blockchain>`
pub const DEFAULT_LEDGER: &str = "Waves";

/// Default network id written (title-cased) to `<network>`
pub const DEFAULT_NETWORK: &str = "testnet";

/// Default domain tag mixed into every shared secret
pub const DEFAULT_DOMAIN_TAG: &str = "cdm";

/// What goes into `<origin><signature>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    /// The literal text `signature`
    #[default]
    Placeholder,
    /// Hex Ed25519 signature by the origin over the operation
    Ed25519,
}

/// Which fields get a randomization suffix before encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRandomization {
    /// Encrypt fields exactly as given
    #[default]
    Never,
    /// Randomize cell values of row inserts only
    Values,
    /// Randomize table names, column names and values
    All,
}

impl FieldRandomization {
    /// Whether structural fields (table and column names) are randomized
    pub fn structural(self) -> bool {
        matches!(self, FieldRandomization::All)
    }

    /// Whether row values are randomized
    pub fn values(self) -> bool {
        matches!(self, FieldRandomization::Values | FieldRandomization::All)
    }
}

/// Configuration shared by [`EnvelopeBuilder`](crate::EnvelopeBuilder) and
/// [`EnvelopeReader`](crate::EnvelopeReader)
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdmConfig {
    /// Document version written to `<version>`
    pub version: String,
    /// Domain tag for shared-secret derivation
    pub domain_tag: String,
    /// Ledger name written to `<blockchain>`
    pub ledger_network_name: String,
    /// Network id, rendered title-case in `<network>`
    pub network: String,
    /// Seed of the origin identity
    #[serde(with = "zeroizing_string")]
    pub root_seed: Zeroizing<String>,
    /// Seed of the recipient identity
    #[serde(with = "zeroizing_string")]
    pub client_seed: Zeroizing<String>,
    /// Origin signature mode
    pub signature_scheme: SignatureScheme,
    /// Field randomization mode
    pub randomize_fields: FieldRandomization,
}

impl Default for CdmConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            domain_tag: DEFAULT_DOMAIN_TAG.to_string(),
            ledger_network_name: DEFAULT_LEDGER.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            root_seed: Zeroizing::new(String::new()),
            client_seed: Zeroizing::new(String::new()),
            signature_scheme: SignatureScheme::default(),
            randomize_fields: FieldRandomization::default(),
        }
    }
}

impl CdmConfig {
    /// Config with the given seeds and defaults for everything else
    pub fn with_seeds(root_seed: impl Into<String>, client_seed: impl Into<String>) -> Self {
        Self {
            root_seed: Zeroizing::new(root_seed.into()),
            client_seed: Zeroizing::new(client_seed.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `CDM_VERSION` | `version` |
    /// | `CDM_DOMAIN_TAG` | `domain_tag` |
    /// | `CDM_LEDGER` | `ledger_network_name` |
    /// | `CDM_NETWORK` | `network` |
    /// | `CDM_ROOT_SEED` | `root_seed` |
    /// | `CDM_CLIENT_SEED` | `client_seed` |
    /// | `CDM_SIGNATURE_SCHEME` | `placeholder` or `ed25519` |
    /// | `CDM_RANDOMIZE_FIELDS` | `never`, `values` or `all` |
    ///
    /// Unset or unrecognized values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let signature_scheme = match env::var("CDM_SIGNATURE_SCHEME").ok().as_deref() {
            Some("ed25519") => SignatureScheme::Ed25519,
            Some("placeholder") | None => SignatureScheme::Placeholder,
            Some(other) => {
                tracing::warn!("Unknown CDM_SIGNATURE_SCHEME '{}', using placeholder", other);
                SignatureScheme::Placeholder
            }
        };

        let randomize_fields = match env::var("CDM_RANDOMIZE_FIELDS").ok().as_deref() {
            Some("values") => FieldRandomization::Values,
            Some("all") => FieldRandomization::All,
            Some("never") | None => FieldRandomization::Never,
            Some(other) => {
                tracing::warn!("Unknown CDM_RANDOMIZE_FIELDS '{}', using never", other);
                FieldRandomization::Never
            }
        };

        Self {
            version: env::var("CDM_VERSION").unwrap_or(defaults.version.clone()),
            domain_tag: env::var("CDM_DOMAIN_TAG").unwrap_or(defaults.domain_tag.clone()),
            ledger_network_name: env::var("CDM_LEDGER")
                .unwrap_or(defaults.ledger_network_name.clone()),
            network: env::var("CDM_NETWORK").unwrap_or(defaults.network.clone()),
            root_seed: Zeroizing::new(env::var("CDM_ROOT_SEED").unwrap_or_default()),
            client_seed: Zeroizing::new(env::var("CDM_CLIENT_SEED").unwrap_or_default()),
            signature_scheme,
            randomize_fields,
        }
    }

    /// Parse configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Network id with the first character upper-cased and the rest lower-cased
    ///
    /// `"TESTNET"`, `"testnet"` and `"tEsTnEt"` all render as `"Testnet"`.
    pub fn network_title(&self) -> String {
        title_case(&self.network)
    }
}

impl fmt::Debug for CdmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdmConfig")
            .field("version", &self.version)
            .field("domain_tag", &self.domain_tag)
            .field("ledger_network_name", &self.ledger_network_name)
            .field("network", &self.network)
            .field("signature_scheme", &self.signature_scheme)
            .field("randomize_fields", &self.randomize_fields)
            .finish_non_exhaustive()
    }
}

pub(crate) fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

mod zeroizing_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use zeroize::Zeroizing;

    pub fn serialize<S>(value: &Zeroizing<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Zeroizing<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Zeroizing::new)
    }
}
