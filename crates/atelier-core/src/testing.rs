//! In-memory port implementations for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use atelier_types::error::{FileError, RepositoryError};
use atelier_types::file::{FileNode, FileNodeKind, normalize_path};
use atelier_types::project::{Project, ProjectId};
use atelier_types::workflow::LogEntry;

use crate::repository::{ProjectRepository, WorkflowLog};
use crate::service::hash::ContentHasher;
use crate::storage::ArtifactStore;

#[derive(Default)]
pub struct InMemoryProjects {
    projects: Mutex<BTreeMap<ProjectId, Project>>,
}

impl ProjectRepository for InMemoryProjects {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        let mut projects = self.projects.lock().unwrap();
        if projects.contains_key(&project.id) {
            return Err(RepositoryError::Conflict(project.id.to_string()));
        }
        projects.insert(project.id, project.clone());
        Ok(project.clone())
    }

    async fn get(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.projects.lock().unwrap().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let mut list: Vec<Project> = self.projects.lock().unwrap().values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn update(&self, project: &Project) -> Result<Project, RepositoryError> {
        let mut projects = self.projects.lock().unwrap();
        match projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project.clone();
                Ok(project.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &ProjectId) -> Result<(), RepositoryError> {
        self.projects
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub struct InMemoryLog {
    entries: Mutex<HashMap<ProjectId, Vec<LogEntry>>>,
}

impl WorkflowLog for InMemoryLog {
    async fn append(&self, project_id: &ProjectId, entry: &LogEntry) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .unwrap()
            .entry(*project_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn entries(&self, project_id: &ProjectId) -> Result<Vec<LogEntry>, RepositoryError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, project_id: &ProjectId) -> Result<(), RepositoryError> {
        self.entries.lock().unwrap().remove(project_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryArtifacts {
    files: Mutex<HashMap<ProjectId, BTreeMap<String, String>>>,
    fail_writes: AtomicBool,
}

impl InMemoryArtifacts {
    /// Make every later write fail with an I/O error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, project_id: &ProjectId, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(project_id)
            .and_then(|files| files.get(path).cloned())
    }

    pub fn paths(&self, project_id: &ProjectId) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .get(project_id)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ArtifactStore for InMemoryArtifacts {
    async fn init_workspace(&self, project_id: &ProjectId) -> Result<(), FileError> {
        self.files.lock().unwrap().entry(*project_id).or_default();
        Ok(())
    }

    async fn write(&self, project_id: &ProjectId, path: &str, content: &str) -> Result<u64, FileError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FileError::Io("disk full".to_string()));
        }
        let path = normalize_path(path)?;
        self.files
            .lock()
            .unwrap()
            .entry(*project_id)
            .or_default()
            .insert(path, content.to_string());
        Ok(content.len() as u64)
    }

    async fn read(&self, project_id: &ProjectId, path: &str) -> Result<String, FileError> {
        let path = normalize_path(path)?;
        self.get(project_id, &path).ok_or(FileError::NotFound(path))
    }

    async fn read_bytes(&self, project_id: &ProjectId, path: &str) -> Result<Vec<u8>, FileError> {
        self.read(project_id, path).await.map(String::into_bytes)
    }

    async fn delete(&self, project_id: &ProjectId, path: &str) -> Result<(), FileError> {
        let path = normalize_path(path)?;
        self.files
            .lock()
            .unwrap()
            .get_mut(project_id)
            .and_then(|files| files.remove(&path))
            .map(|_| ())
            .ok_or(FileError::NotFound(path))
    }

    async fn tree(&self, project_id: &ProjectId) -> Result<FileNode, FileError> {
        let children = self
            .files
            .lock()
            .unwrap()
            .get(project_id)
            .map(|files| {
                files
                    .iter()
                    .map(|(path, content)| FileNode {
                        name: path.rsplit('/').next().unwrap_or_default().to_string(),
                        path: path.clone(),
                        kind: FileNodeKind::File,
                        size: content.len() as u64,
                        children: Vec::new(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(FileNode {
            name: String::new(),
            path: String::new(),
            kind: FileNodeKind::Directory,
            size: 0,
            children,
        })
    }

    async fn exists(&self, project_id: &ProjectId, path: &str) -> bool {
        self.get(project_id, path).is_some()
    }
}

/// Hash used by service tests; not cryptographic.
pub struct LengthHasher;

impl ContentHasher for LengthHasher {
    fn compute_hash(&self, content: &str) -> String {
        let sum: u64 = content.bytes().map(u64::from).sum();
        format!("{:x}-{:x}", content.len(), sum)
    }
}
