//! Secret resolution for Atelier.
//!
//! Provider API keys come from the environment only; they are never written
//! to `config.toml` or the data directory.

pub mod env;

pub use env::EnvSecretProvider;
