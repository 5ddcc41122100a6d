//! HTTP layer for Atelier.
//!
//! Axum-based JSON API at `/api/v1/`, per-project WebSocket and SSE event
//! streams, and raw workspace previews. JSON responses use the envelope
//! format in [`response`].

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
