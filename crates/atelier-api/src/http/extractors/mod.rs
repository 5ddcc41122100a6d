//! Request extractors: token authentication and query/body shapes.

pub mod auth;
pub mod query;
