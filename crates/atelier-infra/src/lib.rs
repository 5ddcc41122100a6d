//! Infrastructure layer for Atelier.
//!
//! Contains implementations of the ports defined in `atelier-core`:
//! flat-file project, log, and workspace storage, SHA-256 hashing, LLM
//! provider clients, configuration loading, and workspace file watching.

pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod llm;
pub mod secret;
pub mod watch;
