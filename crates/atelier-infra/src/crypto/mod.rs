//! Cryptographic helpers for Atelier.
//!
//! - `hash`: SHA-256 content hashing for editor conflict detection and API
//!   token comparison

pub mod hash;
