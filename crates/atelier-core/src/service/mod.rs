//! Business logic services (use cases).
//!
//! Services orchestrate repository calls, workspace files, and business
//! rules. They depend on traits (ports), never on concrete infrastructure
//! implementations.

pub mod hash;
pub mod project;

pub use project::ProjectService;
