//! Workflow engine: agent ordering, state derivation, and the runner.
//!
//! - `sequence` -- fixed agent order and next-step selection
//! - `state` -- pure fold from the workflow log to `ProjectState`
//! - `runner` -- background execution, cancellation, and active-run slots

pub mod runner;
pub mod sequence;
pub mod state;

pub use runner::{ActiveRun, ActiveRuns, WorkflowRunner};
