//! Workflow log trait definition.

use atelier_types::error::RepositoryError;
use atelier_types::project::ProjectId;
use atelier_types::workflow::LogEntry;

/// Append-only per-project workflow log.
///
/// The log is the source of truth for workflow state; see
/// [`crate::workflow::state::derive_state`].
pub trait WorkflowLog: Send + Sync {
    /// Append one entry. Appends to the same project are serialized.
    fn append(
        &self,
        project_id: &ProjectId,
        entry: &LogEntry,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All entries in append order. A missing log reads as empty.
    fn entries(
        &self,
        project_id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<Vec<LogEntry>, RepositoryError>> + Send;

    /// Drop the whole log.
    fn clear(
        &self,
        project_id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
