//! # Envelope Demo
//!
//! Builds a create-table and an insert-row envelope, prints the wire text,
//! parses it back and decrypts it as the recipient.
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=cdm_core=debug cargo run --example envelope_demo
//! ```

use cdm_core::envelope::{wire, InsertCell, InsertSpec, Operation};
use cdm_core::{
    CdmConfig, CreateSpec, EnvelopeBuilder, EnvelopeReader, LogicalOperation, SignatureScheme,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdm_core=debug".into()),
        )
        .init();

    println!("=== CDM Core: Envelope Demo ===\n");

    let config = CdmConfig {
        signature_scheme: SignatureScheme::Ed25519,
        ..CdmConfig::with_seeds("demo root seed", "demo client seed")
    };
    let builder = EnvelopeBuilder::new(config.clone());
    let reader = EnvelopeReader::new(config);

    // Step 1: Define a table
    println!("Step 1: Composing a create-table envelope...");
    let created = builder
        .compose(&[LogicalOperation::Create(CreateSpec {
            table: "tweets".into(),
            columns: vec!["id".into(), "message".into()],
        })])
        .expect("Failed to compose create envelope");

    println!("{}\n", created.to_wire());
    println!("  Document hash: {}\n", created.document_hash());

    // Step 2: Insert a row, reusing the encrypted table and column names
    println!("Step 2: Composing an insert-row envelope...");
    let Operation::CreateTable(table) = &created.operations()[0] else {
        unreachable!("first operation is a create");
    };
    let inserted = builder
        .compose(&[LogicalOperation::Insert(InsertSpec {
            table: table.table.clone(),
            cells: vec![
                InsertCell {
                    column: table.columns[0].clone(),
                    value: "1".into(),
                },
                InsertCell {
                    column: table.columns[1].clone(),
                    value: "hello, ledger".into(),
                },
            ],
        })])
        .expect("Failed to compose insert envelope");
    let text = inserted.to_wire();
    println!("  {} bytes of wire text\n", text.len());

    // Step 3: Read it back as the recipient
    println!("Step 3: Parsing and decrypting as the recipient...");
    let parsed = wire::parse(&text).expect("Failed to parse envelope");
    for op in reader
        .decrypt_envelope(&parsed)
        .expect("Failed to decrypt envelope")
    {
        println!("  {} into '{}' from {}", op.kind, op.table, op.origin);
        for cell in op.columns {
            println!(
                "    {} = {}",
                cell.column,
                cell.value.unwrap_or_default()
            );
        }
    }
    println!();

    println!("=== Example Complete ===");
}
