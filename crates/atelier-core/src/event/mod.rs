//! Publish/subscribe plumbing for project events.
//!
//! `EventBus` carries every event; `ConnectionRegistry` fans events out to
//! the connections watching a single project.

pub mod bus;
pub mod registry;

pub use bus::EventBus;
pub use registry::{ConnectionRegistry, Subscription};
