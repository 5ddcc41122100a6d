//! SHA-256 hashing for workspace files and API tokens.
//!
//! Implements the `ContentHasher` trait from `atelier-core` using the
//! `sha2` crate (RustCrypto ecosystem).

use sha2::{Digest, Sha256};

use atelier_core::service::hash::ContentHasher;

/// SHA-256 implementation of `ContentHasher`.
///
/// File hashes are handed to the editor on read and echoed back on save, so
/// a concurrent change by an agent shows up as a conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ContentHasher;

impl Sha256ContentHasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &str) -> String {
        sha256_hex(content.as_bytes())
    }
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compare two secrets by digest, so the comparison time does not depend on
/// where the inputs first differ.
pub fn digest_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
