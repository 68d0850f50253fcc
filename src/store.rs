//! Remote store catalog entries.
//!
//! The network client lists tables, columns and values as JSON records of
//! ciphertext/hash pairs. These types mirror that JSON and convert entries
//! back into the [`EncryptedField`] references that row inserts reuse.

use serde::{Deserialize, Serialize};

use crate::envelope::EncryptedField;

/// A table listed by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Digest of the table name
    pub hash: String,
    /// Encrypted table name
    pub ciphertext: String,
}

impl TableEntry {
    /// The table reference
    pub fn field(&self) -> EncryptedField {
        EncryptedField::new(&self.ciphertext, &self.hash)
    }
}

/// A column listed by the remote store, with its table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnEntry {
    /// Digest of the column name
    pub column_hash: String,
    /// Encrypted column name
    pub column_ciphertext: String,
    /// Digest of the table name
    pub table_hash: String,
    /// Encrypted table name
    pub table_ciphertext: String,
}

impl ColumnEntry {
    /// The column reference
    pub fn column_ref(&self) -> EncryptedField {
        EncryptedField::new(&self.column_ciphertext, &self.column_hash)
    }

    /// The owning table reference
    pub fn table_ref(&self) -> EncryptedField {
        EncryptedField::new(&self.table_ciphertext, &self.table_hash)
    }
}

/// A cell value listed by the remote store, with its column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueEntry {
    /// Digest of the column name
    pub column_hash: String,
    /// Encrypted column name
    pub column_ciphertext: String,
    /// Digest of the value
    pub value_hash: String,
    /// Encrypted value
    pub value_ciphertext: String,
}

impl ValueEntry {
    /// The column reference
    pub fn column_ref(&self) -> EncryptedField {
        EncryptedField::new(&self.column_ciphertext, &self.column_hash)
    }

    /// The encrypted value
    pub fn value_field(&self) -> EncryptedField {
        EncryptedField::new(&self.value_ciphertext, &self.value_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_entry_json() {
        let entry: ColumnEntry = serde_json::from_str(
            r#"{"columnHash":"ch","columnCiphertext":"cc","tableHash":"th","tableCiphertext":"tc"}"#,
        )
        .unwrap();

        assert_eq!(entry.column_ref(), EncryptedField::new("cc", "ch"));
        assert_eq!(entry.table_ref(), EncryptedField::new("tc", "th"));
    }

    #[test]
    fn test_value_entry_json() {
        let entry: ValueEntry = serde_json::from_str(
            r#"{"columnHash":"ch","columnCiphertext":"cc","valueHash":"vh","valueCiphertext":"vc"}"#,
        )
        .unwrap();

        assert_eq!(entry.value_field(), EncryptedField::new("vc", "vh"));
        assert_eq!(entry.column_ref().digest, "ch");
    }

    #[test]
    fn test_table_entry_json() {
        let entry: TableEntry =
            serde_json::from_str(r#"{"hash":"h","ciphertext":"c"}"#).unwrap();
        assert_eq!(entry.field(), EncryptedField::new("c", "h"));
    }
}
