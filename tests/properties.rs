//! Property tests for the protocol invariants.

use cdm_core::crypto::{decrypt, encrypt, KeyPair, SharedSecret};
use cdm_core::envelope::{wire, Operation};
use cdm_core::randomize::{is_randomized, randomize, strip_randomization};
use cdm_core::{
    CdmConfig, CreateSpec, Direction, EnvelopeBuilder, EnvelopeReader, InsertCell, InsertSpec,
    LogicalOperation, SeedIdentityResolver, ThreadItem,
};
use proptest::prelude::*;

fn seed() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,24}".prop_filter("non-blank", |s| !s.trim().is_empty())
}

fn name() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn shared_secret_is_symmetric(s1 in seed(), s2 in seed(), tag in ".{0,16}") {
        let a = KeyPair::from_seed(&s1).unwrap();
        let b = KeyPair::from_seed(&s2).unwrap();

        let ab = SharedSecret::derive(&a, &b.public_key(), &tag).unwrap();
        let ba = SharedSecret::derive(&b, &a.public_key(), &tag).unwrap();

        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn encryption_round_trips(
        s1 in seed(),
        s2 in seed(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let a = KeyPair::from_seed(&s1).unwrap();
        let b = KeyPair::from_seed(&s2).unwrap();
        let sending = SharedSecret::derive(&a, &b.public_key(), "cdm").unwrap();
        let receiving = SharedSecret::derive(&b, &a.public_key(), "cdm").unwrap();

        let sealed = encrypt(&sending, &plaintext).unwrap();
        prop_assert_eq!(decrypt(&receiving, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn randomization_strips_back(message in ".*") {
        let first = randomize(&message);
        let second = randomize(&message);

        prop_assert_ne!(&first, &second);
        prop_assert!(is_randomized(&first));
        prop_assert_eq!(strip_randomization(&first), message);
    }

    #[test]
    fn compose_preserves_operation_order(tables in proptest::collection::vec(name(), 0..6)) {
        let config = CdmConfig::with_seeds("root", "client");
        let operations: Vec<LogicalOperation> = tables
            .iter()
            .map(|t| LogicalOperation::Create(CreateSpec { table: t.clone(), columns: vec![] }))
            .collect();

        let envelope = EnvelopeBuilder::new(config.clone()).compose(&operations).unwrap();
        let parsed = wire::parse(&envelope.to_wire()).unwrap();
        prop_assert_eq!(&parsed, &envelope);

        let decrypted = EnvelopeReader::new(config).decrypt_envelope(&parsed).unwrap();
        let names: Vec<String> = decrypted.into_iter().map(|op| op.table).collect();
        prop_assert_eq!(names, tables);
    }

    #[test]
    fn create_preserves_column_order(columns in proptest::collection::vec(name(), 0..8)) {
        let config = CdmConfig::with_seeds("root", "client");
        let op = EnvelopeBuilder::new(config.clone())
            .build_operation(&LogicalOperation::Create(CreateSpec {
                table: "t".into(),
                columns: columns.clone(),
            }))
            .unwrap();
        prop_assert!(matches!(op, Operation::CreateTable(_)));

        let envelope = cdm_core::envelope::compose_envelope("0.7", "Waves", "testnet", vec![op]);
        let decrypted = EnvelopeReader::new(config).decrypt_envelope(&envelope).unwrap();
        let names: Vec<String> = decrypted[0].columns.iter().map(|c| c.column.clone()).collect();
        prop_assert_eq!(names, columns);
    }

    #[test]
    fn insert_preserves_cell_order(values in proptest::collection::vec(name(), 0..8)) {
        let config = CdmConfig::with_seeds("root", "client");
        let builder = EnvelopeBuilder::new(config.clone());
        let columns: Vec<String> = (0..values.len()).map(|i| format!("col{}", i)).collect();
        let cells: Vec<InsertCell> = columns
            .iter()
            .zip(&values)
            .map(|(column, value)| InsertCell {
                column: builder.encrypt_field(column).unwrap(),
                value: value.clone(),
            })
            .collect();
        let refs: Vec<_> = cells.iter().map(|c| c.column.clone()).collect();

        let op = builder
            .build_operation(&LogicalOperation::Insert(InsertSpec {
                table: builder.encrypt_field("t").unwrap(),
                cells,
            }))
            .unwrap();
        let Operation::InsertRow(row) = &op else {
            panic!("expected an insert, got <{}>", op.tag());
        };
        let stored: Vec<_> = row.columns.iter().map(|c| c.column.clone()).collect();
        prop_assert_eq!(stored, refs);

        let envelope = cdm_core::envelope::compose_envelope("0.7", "Waves", "testnet", vec![op]);
        let parsed = wire::parse(&envelope.to_wire()).unwrap();
        let decrypted = EnvelopeReader::new(config).decrypt_envelope(&parsed).unwrap();
        let got_columns: Vec<String> = decrypted[0].columns.iter().map(|c| c.column.clone()).collect();
        let got_values: Vec<String> = decrypted[0]
            .columns
            .iter()
            .filter_map(|c| c.value.clone())
            .collect();
        prop_assert_eq!(got_columns, columns);
        prop_assert_eq!(got_values, values);
    }

    #[test]
    fn thread_is_reversed(bodies in proptest::collection::vec(".{0,20}", 0..6)) {
        let root = KeyPair::from_seed("root").unwrap().public_key();
        let client = KeyPair::from_seed("client").unwrap().public_key();
        let items: Vec<ThreadItem> = bodies
            .iter()
            .map(|body| ThreadItem {
                direction: Direction::Incoming,
                logical_sender: root,
                recipient: client,
                subject: None,
                message: Some(
                    cdm_core::envelope::encrypt_field(
                        &SeedIdentityResolver, "root", "client", "cdm", body,
                    )
                    .unwrap(),
                ),
            })
            .collect();

        let thread = EnvelopeReader::new(CdmConfig::with_seeds("root", "client"))
            .decrypt_thread(&items)
            .unwrap();

        let mut expected = bodies.clone();
        expected.reverse();
        let got: Vec<String> = thread.into_iter().filter_map(|i| i.message).collect();
        prop_assert_eq!(got, expected);
    }
}
