//! Business logic and port definitions for Atelier.
//!
//! This crate defines the "ports" (repository and storage traits) that the
//! infrastructure layer implements, the agent scripts and templates, the
//! event registry, and the workflow runner. It depends only on
//! `atelier-types`, never on `atelier-infra` or any IO crate.

pub mod agent;
pub mod event;
pub mod llm;
pub mod repository;
pub mod service;
pub mod storage;
pub mod templates;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
