//! HTTP request handlers.

pub mod agents;
pub mod events;
pub mod files;
pub mod preview;
pub mod project;
pub mod workflow;
pub mod ws;
