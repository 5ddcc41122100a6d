//! Artifact store trait.
//!
//! Defines the interface for reading and writing files in a project's
//! workspace directory. Paths are workspace-relative and validated with
//! [`atelier_types::file::normalize_path`] by every implementation.

use atelier_types::error::FileError;
use atelier_types::file::FileNode;
use atelier_types::project::ProjectId;

/// Trait for per-project workspace file storage.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait ArtifactStore: Send + Sync {
    /// Create the (empty) workspace for a project.
    fn init_workspace(
        &self,
        project_id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<(), FileError>> + Send;

    /// Write a text file, creating parent directories. Returns the size in bytes.
    fn write(
        &self,
        project_id: &ProjectId,
        path: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<u64, FileError>> + Send;

    /// Read a file as UTF-8 text.
    fn read(
        &self,
        project_id: &ProjectId,
        path: &str,
    ) -> impl std::future::Future<Output = Result<String, FileError>> + Send;

    /// Read a file's raw bytes (preview of non-text assets).
    fn read_bytes(
        &self,
        project_id: &ProjectId,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, FileError>> + Send;

    /// Delete a single file.
    fn delete(
        &self,
        project_id: &ProjectId,
        path: &str,
    ) -> impl std::future::Future<Output = Result<(), FileError>> + Send;

    /// Recursive tree rooted at the workspace directory.
    fn tree(
        &self,
        project_id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<FileNode, FileError>> + Send;

    fn exists(
        &self,
        project_id: &ProjectId,
        path: &str,
    ) -> impl std::future::Future<Output = bool> + Send;
}
