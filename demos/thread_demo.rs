//! # Thread Demo
//!
//! Decrypts a newest-first thread for display, including one item that was
//! encrypted for somebody else.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example thread_demo
//! ```

use cdm_core::envelope::encrypt_field;
use cdm_core::{
    derive_key_pair, randomize, CdmConfig, Direction, EnvelopeReader, SeedIdentityResolver,
    ThreadItem,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdm_core=info".into()),
        )
        .init();

    println!("=== CDM Core: Thread Demo ===\n");

    let me = "alice seed";
    let peer = "bob seed";
    let tag = "cdm";

    let my_key = derive_key_pair(me).expect("Failed to derive key").public_key();
    let peer_key = derive_key_pair(peer).expect("Failed to derive key").public_key();

    println!("  Local identity: {}", my_key);
    println!("  Peer identity:  {}\n", peer_key);

    let seal = |from: &str, to: &str, text: &str| {
        encrypt_field(&SeedIdentityResolver, from, to, tag, &randomize(text))
            .expect("Failed to encrypt field")
    };

    // Newest first, as delivered by the network
    let items = vec![
        ThreadItem {
            direction: Direction::Incoming,
            logical_sender: peer_key,
            recipient: my_key,
            subject: None,
            message: Some(seal(peer, "carol seed", "meant for carol")),
        },
        ThreadItem {
            direction: Direction::Outgoing,
            logical_sender: my_key,
            recipient: peer_key,
            subject: None,
            message: Some(seal(me, peer, "see you there")),
        },
        ThreadItem {
            direction: Direction::Incoming,
            logical_sender: peer_key,
            recipient: my_key,
            subject: Some(seal(peer, me, "meeting")),
            message: Some(seal(peer, me, "tomorrow at ten?")),
        },
    ];

    let reader = EnvelopeReader::new(CdmConfig::with_seeds(peer, me));
    let thread = reader
        .decrypt_thread(&items)
        .expect("Failed to decrypt thread");

    println!("Thread, oldest first:");
    for item in &thread {
        let arrow = match item.direction {
            Direction::Incoming => "<-",
            Direction::Outgoing => "->",
        };
        println!(
            "  {} [{}] {}",
            arrow,
            item.subject.as_deref().unwrap_or("-"),
            item.message.as_deref().unwrap_or("")
        );
    }
    println!();

    println!("=== Example Complete ===");
}
