//! Project repository trait definition.

use atelier_types::error::RepositoryError;
use atelier_types::project::{Project, ProjectId};

/// Repository trait for project metadata persistence.
///
/// Implementations live in atelier-infra (e.g., FsProjectRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ProjectRepository: Send + Sync {
    /// Persist a new project. Fails with `Conflict` if the id exists.
    fn create(
        &self,
        project: &Project,
    ) -> impl std::future::Future<Output = Result<Project, RepositoryError>> + Send;

    fn get(
        &self,
        id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<Option<Project>, RepositoryError>> + Send;

    /// List all projects, newest first.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Project>, RepositoryError>> + Send;

    /// Overwrite an existing project. Fails with `NotFound` if absent.
    fn update(
        &self,
        project: &Project,
    ) -> impl std::future::Future<Output = Result<Project, RepositoryError>> + Send;

    /// Remove a project and everything stored under it.
    fn delete(
        &self,
        id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
