//! Shared domain types for Atelier.
//!
//! Projects, the agent roster, the workflow log and its derived state,
//! notification events, workspace files, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod file;
pub mod llm;
pub mod project;
pub mod workflow;
