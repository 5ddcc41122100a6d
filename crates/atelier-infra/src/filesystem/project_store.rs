//! Project metadata stored as `project.json` files.

use std::io::ErrorKind;

use atelier_core::repository::ProjectRepository;
use atelier_types::error::RepositoryError;
use atelier_types::project::{Project, ProjectId};

use super::{DataLayout, write_atomic};

/// `ProjectRepository` backed by one pretty-printed JSON file per project.
#[derive(Debug, Clone)]
pub struct FsProjectRepository {
    layout: DataLayout,
}

impl FsProjectRepository {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    async fn save(&self, project: &Project) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(project)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        write_atomic(&self.layout.project_file(&project.id), &json)
            .await
            .map_err(|e| RepositoryError::Io(e.to_string()))
    }

    async fn load(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        let path = self.layout.project_file(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::Io(format!("{}: {e}", path.display()))),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RepositoryError::Serialization(format!("{}: {e}", path.display())))
    }
}

impl ProjectRepository for FsProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        let path = self.layout.project_file(&project.id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(RepositoryError::Conflict(format!(
                "project {} already exists",
                project.id
            )));
        }
        self.save(project).await?;
        Ok(project.clone())
    }

    async fn get(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        self.load(id).await
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let dir = self.layout.projects_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::Io(e.to_string())),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepositoryError::Io(e.to_string()))?
        {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|s| s.parse::<ProjectId>().ok()) else {
                continue;
            };
            match self.load(&id).await {
                Ok(Some(project)) => projects.push(project),
                Ok(None) => {}
                Err(e) => tracing::warn!(project_id = %id, error = %e, "skipping unreadable project"),
            }
        }

        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    async fn update(&self, project: &Project) -> Result<Project, RepositoryError> {
        if self.load(&project.id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.save(project).await?;
        Ok(project.clone())
    }

    async fn delete(&self, id: &ProjectId) -> Result<(), RepositoryError> {
        match tokio::fs::remove_dir_all(self.layout.project_dir(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RepositoryError::NotFound),
            Err(e) => Err(RepositoryError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn project(name: &str, age_secs: i64) -> Project {
        let at = Utc::now() - Duration::seconds(age_secs);
        Project {
            id: ProjectId::new(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            requirement: "A recipe box".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    fn repo(tmp: &TempDir) -> FsProjectRepository {
        FsProjectRepository::new(DataLayout::new(tmp.path()))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        let p = project("Recipes", 0);

        repo.create(&p).await.unwrap();
        let loaded = repo.get(&p.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Recipes");
        assert!(repo.get(&ProjectId::new()).await.unwrap().is_none());

        let err = repo.create(&p).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_skips_garbage() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        let old = project("Old", 60);
        let new = project("New", 0);
        repo.create(&old).await.unwrap();
        repo.create(&new).await.unwrap();

        // A corrupt project file and a stray directory are ignored.
        let broken = ProjectId::new();
        let broken_dir = tmp.path().join("projects").join(broken.to_string());
        tokio::fs::create_dir_all(&broken_dir).await.unwrap();
        tokio::fs::write(broken_dir.join("project.json"), "{ nope").await.unwrap();
        tokio::fs::create_dir_all(tmp.path().join("projects").join("notes")).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[tokio::test]
    async fn test_list_without_projects_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(repo(&tmp).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        let mut p = project("Recipes", 0);

        assert!(matches!(repo.update(&p).await, Err(RepositoryError::NotFound)));
        repo.create(&p).await.unwrap();

        p.requirement = "A recipe box with tags".to_string();
        repo.update(&p).await.unwrap();
        assert_eq!(
            repo.get(&p.id).await.unwrap().unwrap().requirement,
            "A recipe box with tags"
        );

        repo.delete(&p.id).await.unwrap();
        assert!(repo.get(&p.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(&p.id).await, Err(RepositoryError::NotFound)));
    }
}
