//! Flat-file storage for Atelier.
//!
//! Everything lives under one data directory:
//! ```text
//! {data_dir}/
//!   config.toml
//!   projects/
//!     {project_id}/
//!       project.json      # project metadata
//!       workflow.log      # JSON lines, append only
//!       workspace/        # files produced by agents and edited by users
//! ```

pub mod artifact_store;
pub mod log_store;
pub mod project_store;

use std::path::{Path, PathBuf};

use atelier_types::project::ProjectId;

pub use artifact_store::LocalArtifactStore;
pub use log_store::JsonlWorkflowLog;
pub use project_store::FsProjectRepository;

/// Directory holding every project.
pub const PROJECTS_DIR: &str = "projects";
/// Per-project directory holding the generated files.
pub const WORKSPACE_DIR: &str = "workspace";

const PROJECT_FILE: &str = "project.json";
const LOG_FILE: &str = "workflow.log";

/// Path arithmetic for the data directory layout.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{data_dir}/projects/`
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    /// `{data_dir}/projects/{id}/`
    pub fn project_dir(&self, id: &ProjectId) -> PathBuf {
        self.projects_dir().join(id.to_string())
    }

    pub fn project_file(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join(PROJECT_FILE)
    }

    pub fn log_file(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join(LOG_FILE)
    }

    pub fn workspace_dir(&self, id: &ProjectId) -> PathBuf {
        self.project_dir(id).join(WORKSPACE_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `ATELIER_DATA_DIR` environment variable
/// 2. `~/.atelier`
/// 3. `./.atelier` when no home directory is known
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ATELIER_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".atelier");
    }

    PathBuf::from(".atelier")
}

/// Write a file by writing a sibling temp file and renaming it over the
/// target, creating parent directories as needed.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::now_v7().simple()));

    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
