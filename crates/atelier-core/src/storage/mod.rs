//! Workspace storage abstractions for Atelier.
//!
//! Defines the artifact store trait and MIME detection shared by the
//! store implementation and the preview endpoint.
//! Implementations live in atelier-infra.

pub mod artifact_store;
pub mod mime;

pub use artifact_store::ArtifactStore;
pub use mime::mime_type_for;
