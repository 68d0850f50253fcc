//! # Randomizer
//!
//! Suffixes that make repeated plaintexts unlinkable.
//!
//! ```text
//! "alice"  ──randomize──►  "alice@" + hex(SHA-256(64 random bytes))
//!                                     └──────── 64 hex chars ───────┘
//! ```
//!
//! The suffix is part of the plaintext that gets encrypted and hashed, so two
//! fields carrying the same logical value end up with different digests as
//! well as different ciphertexts. [`strip_randomization`] removes it again
//! after decryption.

use rand::RngCore;

use crate::crypto::sha256_hex;

/// Bytes of OS entropy hashed into each suffix
pub const ENTROPY_BYTES: usize = 64;

/// Separator between the value and its suffix
pub const SUFFIX_SEPARATOR: char = '@';

/// Length of the hex part of a suffix
pub const SUFFIX_HEX_LEN: usize = 64;

/// Append a random `@<64 hex>` suffix to `message`
pub fn randomize(message: &str) -> String {
    let mut entropy = [0u8; ENTROPY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut entropy);

    format!("{}{}{}", message, SUFFIX_SEPARATOR, sha256_hex(&entropy))
}

/// Remove a trailing `@<64 hex>` suffix, if there is one
///
/// Anything else is returned unchanged, including text that merely contains
/// an `@` or ends in a shorter hex run.
pub fn strip_randomization(text: &str) -> String {
    match suffix_start(text) {
        Some(idx) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Whether `text` ends in a randomization suffix
pub fn is_randomized(text: &str) -> bool {
    suffix_start(text).is_some()
}

fn suffix_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.len() < SUFFIX_HEX_LEN + 1 {
        return None;
    }

    let sep = bytes.len() - SUFFIX_HEX_LEN - 1;
    let tail = &bytes[sep + 1..];

    // The separator is ASCII, so `sep` is always a char boundary when it matches.
    (bytes[sep] == SUFFIX_SEPARATOR as u8 && tail.iter().all(u8::is_ascii_hexdigit))
        .then_some(sep)
}

// ============================================================================
// TESTS
// ============================================================================
