//! ContentHasher trait for computing content hashes.
//!
//! Defined in atelier-core so services can hash content without coupling to
//! a specific hashing algorithm. The `Sha256ContentHasher` adapter lives in
//! atelier-infra.

/// Abstraction over content hashing.
///
/// Used by ProjectService to fingerprint workspace files so concurrent
/// editor saves can be detected.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
