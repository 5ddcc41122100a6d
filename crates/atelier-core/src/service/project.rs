//! Project management service.
//!
//! Orchestrates project creation, update, and deletion, plus the editor's
//! view of a project's workspace. Workflow execution lives in
//! [`crate::workflow::runner`]; this service only consults its active-run
//! slots so it never deletes a project out from under a run.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use atelier_types::error::{FileError, ProjectError};
use atelier_types::event::{ChangeOrigin, ProjectEvent};
use atelier_types::file::{
    FileContent, FileNode, MAX_FILE_SIZE_BYTES, WriteFileRequest, normalize_path,
};
use atelier_types::project::{
    CreateProjectRequest, Project, ProjectId, ProjectSummary, UpdateProjectRequest, slugify,
    validate_name, validate_requirement,
};
use atelier_types::workflow::{LogEntry, LogKind, ProjectState, RunMode};

use crate::event::ConnectionRegistry;
use crate::repository::{ProjectRepository, WorkflowLog};
use crate::service::hash::ContentHasher;
use crate::storage::{ArtifactStore, mime_type_for};
use crate::workflow::runner::ActiveRuns;
use crate::workflow::state::{derive_state, reconcile};

/// Service owning the project lifecycle and workspace file access.
///
/// Generic over the storage ports so atelier-core never depends on
/// atelier-infra.
pub struct ProjectService<P, L, A, H> {
    projects: Arc<P>,
    log: Arc<L>,
    artifacts: Arc<A>,
    hasher: H,
    registry: ConnectionRegistry,
    runs: ActiveRuns,
    /// Serializes editor writes per project so a hash check and the write
    /// it guards are never split by another save.
    edit_locks: DashMap<ProjectId, Arc<Mutex<()>>>,
}

impl<P, L, A, H> ProjectService<P, L, A, H>
where
    P: ProjectRepository,
    L: WorkflowLog,
    A: ArtifactStore,
    H: ContentHasher,
{
    pub fn new(
        projects: Arc<P>,
        log: Arc<L>,
        artifacts: Arc<A>,
        hasher: H,
        registry: ConnectionRegistry,
        runs: ActiveRuns,
    ) -> Self {
        Self {
            projects,
            log,
            artifacts,
            hasher,
            registry,
            runs,
            edit_locks: DashMap::new(),
        }
    }

    /// Create a project with an empty workspace.
    pub async fn create(&self, request: CreateProjectRequest) -> Result<ProjectSummary, ProjectError> {
        let name = validate_name(&request.name).map_err(ProjectError::InvalidName)?;
        let requirement =
            validate_requirement(&request.requirement).map_err(ProjectError::InvalidRequirement)?;

        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            slug: slugify(&name),
            name,
            requirement,
            created_at: now,
            updated_at: now,
        };

        let project = self.projects.create(&project).await?;
        self.artifacts.init_workspace(&project.id).await?;

        let note = LogEntry::info(
            None,
            LogKind::Note,
            format!("Project created: {}", project.name),
        );
        self.log.append(&project.id, &note).await?;

        tracing::info!(project_id = %project.id, slug = %project.slug, "project created");

        let state = derive_state(&[note]);
        Ok(ProjectSummary { project, state })
    }

    pub async fn get(&self, id: &ProjectId) -> Result<ProjectSummary, ProjectError> {
        let project = self.require(id).await?;
        let state = self.state_of(id).await?;
        Ok(ProjectSummary { project, state })
    }

    /// All projects, newest first.
    pub async fn list(&self) -> Result<Vec<ProjectSummary>, ProjectError> {
        let projects = self.projects.list().await?;
        let mut summaries = Vec::with_capacity(projects.len());
        for project in projects {
            let state = self.state_of(&project.id).await?;
            summaries.push(ProjectSummary { project, state });
        }
        Ok(summaries)
    }

    /// Current derived workflow state.
    pub async fn state(&self, id: &ProjectId) -> Result<ProjectState, ProjectError> {
        self.require(id).await?;
        self.state_of(id).await
    }

    /// Apply the changed fields. The slug follows the name.
    pub async fn update(
        &self,
        id: &ProjectId,
        request: UpdateProjectRequest,
    ) -> Result<ProjectSummary, ProjectError> {
        let mut project = self.require(id).await?;

        if let Some(name) = request.name {
            project.name = validate_name(&name).map_err(ProjectError::InvalidName)?;
            project.slug = slugify(&project.name);
        }
        if let Some(requirement) = request.requirement {
            project.requirement =
                validate_requirement(&requirement).map_err(ProjectError::InvalidRequirement)?;
        }
        project.updated_at = Utc::now();

        let project = self.projects.update(&project).await?;
        tracing::info!(project_id = %project.id, "project updated");

        let state = self.state_of(id).await?;
        Ok(ProjectSummary { project, state })
    }

    /// Delete a project, its log, and its workspace.
    ///
    /// Refused while a workflow run is active.
    pub async fn delete(&self, id: &ProjectId) -> Result<(), ProjectError> {
        let _slot = self
            .runs
            .try_reserve(*id, RunMode::Auto)
            .ok_or(ProjectError::Busy)?;

        self.require(id).await?;
        self.log.clear(id).await?;
        self.projects.delete(id).await?;
        self.edit_locks.remove(id);

        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    /// The most recent log entries, oldest first. `None` returns all.
    pub async fn log(&self, id: &ProjectId, limit: Option<usize>) -> Result<Vec<LogEntry>, ProjectError> {
        self.require(id).await?;
        let mut entries = self.log.entries(id).await?;
        if let Some(limit) = limit {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Workspace files
    // -----------------------------------------------------------------------

    pub async fn tree(&self, id: &ProjectId) -> Result<FileNode, ProjectError> {
        self.require(id).await?;
        Ok(self.artifacts.tree(id).await?)
    }

    pub async fn read_file(&self, id: &ProjectId, path: &str) -> Result<FileContent, ProjectError> {
        self.require(id).await?;
        let path = normalize_path(path)?;
        let content = self.artifacts.read(id, &path).await?;
        Ok(self.file_content(path, content))
    }

    /// Save an editor change.
    ///
    /// With `expected_hash`, the write only happens if the file still has
    /// that hash; a missing file hashes as the empty string.
    pub async fn write_file(
        &self,
        id: &ProjectId,
        path: &str,
        request: WriteFileRequest,
    ) -> Result<FileContent, ProjectError> {
        self.require(id).await?;
        let path = normalize_path(path)?;

        let size = request.content.len() as u64;
        if size > MAX_FILE_SIZE_BYTES {
            return Err(FileError::TooLarge {
                size,
                max: MAX_FILE_SIZE_BYTES,
            }
            .into());
        }

        let lock = self.edit_lock(id);
        let _guard = lock.lock().await;

        if let Some(expected) = request.expected_hash {
            let current = match self.artifacts.read(id, &path).await {
                Ok(content) => content,
                Err(FileError::NotFound(_)) => String::new(),
                Err(e) => return Err(e.into()),
            };
            let actual = self.hasher.compute_hash(&current);
            if actual != expected {
                return Err(FileError::Conflict { expected, actual }.into());
            }
        }

        self.artifacts.write(id, &path, &request.content).await?;

        let entry = LogEntry::info(
            None,
            LogKind::ArtifactEdited { path: path.clone() },
            format!("{path} edited"),
        );
        self.log.append(id, &entry).await?;
        self.registry.publish(ProjectEvent::LogAppended {
            project_id: *id,
            entry,
        });
        self.registry.publish(ProjectEvent::ArtifactChanged {
            project_id: *id,
            path: path.clone(),
            origin: ChangeOrigin::Editor,
        });

        tracing::debug!(project_id = %id, %path, size, "workspace file saved");
        Ok(self.file_content(path, request.content))
    }

    pub async fn delete_file(&self, id: &ProjectId, path: &str) -> Result<(), ProjectError> {
        self.require(id).await?;
        let path = normalize_path(path)?;
        let lock = self.edit_lock(id);
        let _guard = lock.lock().await;
        self.artifacts.delete(id, &path).await?;
        self.registry.publish(ProjectEvent::ArtifactDeleted {
            project_id: *id,
            path,
            origin: ChangeOrigin::Editor,
        });
        Ok(())
    }

    /// Raw bytes and content type for the preview server.
    pub async fn preview(&self, id: &ProjectId, path: &str) -> Result<(Vec<u8>, &'static str), ProjectError> {
        self.require(id).await?;
        let path = normalize_path(path)?;
        let bytes = self.artifacts.read_bytes(id, &path).await?;
        Ok((bytes, mime_type_for(&path)))
    }

    /// First preview entry point present in the workspace.
    pub async fn preview_entry(&self, id: &ProjectId) -> Result<Option<&'static str>, ProjectError> {
        self.require(id).await?;
        for candidate in PREVIEW_ENTRIES {
            if self.artifacts.exists(id, candidate).await {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------

    fn edit_lock(&self, id: &ProjectId) -> Arc<Mutex<()>> {
        Arc::clone(self.edit_locks.entry(*id).or_default().value())
    }

    async fn require(&self, id: &ProjectId) -> Result<Project, ProjectError> {
        self.projects.get(id).await?.ok_or(ProjectError::NotFound)
    }

    async fn state_of(&self, id: &ProjectId) -> Result<ProjectState, ProjectError> {
        let entries = self.log.entries(id).await?;
        Ok(reconcile(derive_state(&entries), self.runs.is_active(id)))
    }

    fn file_content(&self, path: String, content: String) -> FileContent {
        FileContent {
            mime_type: mime_type_for(&path).to_string(),
            size: content.len() as u64,
            hash: self.hasher.compute_hash(&content),
            path,
            content,
        }
    }
}

/// Preview entry points, in preference order.
pub const PREVIEW_ENTRIES: [&str; 3] = ["src/index.html", "index.html", "slides/index.html"];
