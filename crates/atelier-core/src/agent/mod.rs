//! Scripted agents for Atelier.
//!
//! - `AgentScript`: per-role request, template fallback, and artifact assembly
//! - `AgentContext`: the project plus earlier artifacts a step reads
//! - `Generator`: asks the provider for the primary document, falling back to templates

pub mod context;
pub mod generator;
pub mod prompt;
pub mod script;

pub use context::AgentContext;
pub use generator::{Generation, GenerationSettings, Generator};
pub use script::{AgentScript, script_for};
