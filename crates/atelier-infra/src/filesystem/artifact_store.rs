//! Project workspace files on the local filesystem.
//!
//! Files live under `{data_dir}/projects/{id}/workspace/`. Every path is run
//! through `normalize_path` first, so nothing outside the workspace can be
//! reached.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use atelier_core::storage::ArtifactStore;
use atelier_types::error::FileError;
use atelier_types::file::{FileNode, FileNodeKind, MAX_FILE_SIZE_BYTES, normalize_path};
use atelier_types::project::ProjectId;

use super::{DataLayout, write_atomic};

/// Workspace-backed `ArtifactStore`.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    layout: DataLayout,
}

impl LocalArtifactStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    /// Absolute path for a workspace-relative path, plus its normalized form.
    fn resolve(&self, project_id: &ProjectId, path: &str) -> Result<(PathBuf, String), FileError> {
        let normalized = normalize_path(path)?;
        let full = self.layout.workspace_dir(project_id).join(&normalized);
        Ok((full, normalized))
    }

    async fn read_checked(&self, project_id: &ProjectId, path: &str) -> Result<(Vec<u8>, String), FileError> {
        let (full, normalized) = self.resolve(project_id, path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| io_error(e, &normalized))?;
        if !metadata.is_file() {
            return Err(FileError::NotFound(normalized));
        }
        if metadata.len() > MAX_FILE_SIZE_BYTES {
            return Err(FileError::TooLarge {
                size: metadata.len(),
                max: MAX_FILE_SIZE_BYTES,
            });
        }
        let bytes = tokio::fs::read(&full)
            .await
            .map_err(|e| io_error(e, &normalized))?;
        Ok((bytes, normalized))
    }
}

impl ArtifactStore for LocalArtifactStore {
    async fn init_workspace(&self, project_id: &ProjectId) -> Result<(), FileError> {
        tokio::fs::create_dir_all(self.layout.workspace_dir(project_id))
            .await
            .map_err(|e| FileError::Io(e.to_string()))
    }

    async fn write(&self, project_id: &ProjectId, path: &str, content: &str) -> Result<u64, FileError> {
        let (full, _) = self.resolve(project_id, path)?;
        let size = content.len() as u64;
        if size > MAX_FILE_SIZE_BYTES {
            return Err(FileError::TooLarge {
                size,
                max: MAX_FILE_SIZE_BYTES,
            });
        }
        write_atomic(&full, content.as_bytes())
            .await
            .map_err(|e| FileError::Io(e.to_string()))?;
        Ok(size)
    }

    async fn read(&self, project_id: &ProjectId, path: &str) -> Result<String, FileError> {
        let (bytes, normalized) = self.read_checked(project_id, path).await?;
        String::from_utf8(bytes).map_err(|_| FileError::NotText(normalized))
    }

    async fn read_bytes(&self, project_id: &ProjectId, path: &str) -> Result<Vec<u8>, FileError> {
        self.read_checked(project_id, path).await.map(|(bytes, _)| bytes)
    }

    async fn delete(&self, project_id: &ProjectId, path: &str) -> Result<(), FileError> {
        let (full, normalized) = self.resolve(project_id, path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| io_error(e, &normalized))
    }

    async fn tree(&self, project_id: &ProjectId) -> Result<FileNode, FileError> {
        let root = self.layout.workspace_dir(project_id);
        tokio::task::spawn_blocking(move || {
            let children = if root.is_dir() {
                walk(&root, "").map_err(|e| FileError::Io(e.to_string()))?
            } else {
                Vec::new()
            };
            Ok(FileNode {
                name: String::new(),
                path: String::new(),
                kind: FileNodeKind::Directory,
                size: 0,
                children,
            })
        })
        .await
        .map_err(|e| FileError::Io(e.to_string()))?
    }

    async fn exists(&self, project_id: &ProjectId, path: &str) -> bool {
        match self.resolve(project_id, path) {
            Ok((full, _)) => tokio::fs::metadata(&full)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Directories first, then files, each sorted by name. Hidden entries are skipped.
fn walk(dir: &Path, prefix: &str) -> std::io::Result<Vec<FileNode>> {
    let mut nodes = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let children = walk(&entry.path(), &path)?;
            nodes.push(FileNode {
                name,
                path,
                kind: FileNodeKind::Directory,
                size: 0,
                children,
            });
        } else if file_type.is_file() {
            nodes.push(FileNode {
                name,
                path,
                kind: FileNodeKind::File,
                size: entry.metadata()?.len(),
                children: Vec::new(),
            });
        }
    }
    nodes.sort_by(|a, b| {
        let rank = |n: &FileNode| matches!(n.kind, FileNodeKind::File);
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    Ok(nodes)
}

fn io_error(err: std::io::Error, path: &str) -> FileError {
    match err.kind() {
        ErrorKind::NotFound => FileError::NotFound(path.to_string()),
        _ => FileError::Io(format!("{path}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> LocalArtifactStore {
        LocalArtifactStore::new(DataLayout::new(tmp.path()))
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let id = ProjectId::new();
        store.init_workspace(&id).await.unwrap();

        let size = store.write(&id, "docs/plan.md", "# Plan\n").await.unwrap();
        assert_eq!(size, 7);
        assert_eq!(store.read(&id, "docs/plan.md").await.unwrap(), "# Plan\n");
        assert_eq!(store.read(&id, "docs\\plan.md").await.unwrap(), "# Plan\n");
        assert!(store.exists(&id, "docs/plan.md").await);
        assert!(!store.exists(&id, "docs").await);

        store.delete(&id, "docs/plan.md").await.unwrap();
        assert!(matches!(
            store.read(&id, "docs/plan.md").await,
            Err(FileError::NotFound(p)) if p == "docs/plan.md"
        ));
        assert!(matches!(
            store.delete(&id, "docs/plan.md").await,
            Err(FileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let id = ProjectId::new();

        for bad in ["../x", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(store.write(&id, bad, "x").await, Err(FileError::InvalidPath(_))),
                "{bad} accepted"
            );
        }
        assert!(!store.exists(&id, "../project.json").await);
    }

    #[tokio::test]
    async fn test_binary_and_oversized_files() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let id = ProjectId::new();
        let workspace = DataLayout::new(tmp.path()).workspace_dir(&id);
        tokio::fs::create_dir_all(&workspace).await.unwrap();
        tokio::fs::write(workspace.join("logo.png"), [0x89, 0x50, 0xff, 0xfe]).await.unwrap();

        assert!(matches!(store.read(&id, "logo.png").await, Err(FileError::NotText(_))));
        assert_eq!(store.read_bytes(&id, "logo.png").await.unwrap().len(), 4);

        let big = "x".repeat(MAX_FILE_SIZE_BYTES as usize + 1);
        assert!(matches!(
            store.write(&id, "big.txt", &big).await,
            Err(FileError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_tree_order_and_hidden_files() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let id = ProjectId::new();

        // Missing workspace reads as empty.
        assert!(store.tree(&id).await.unwrap().children.is_empty());

        for path in ["README.md", "src/app.js", "src/index.html", "docs/plan.md", ".hidden/x.md"] {
            store.write(&id, path, "x").await.unwrap();
        }

        let tree = store.tree(&id).await.unwrap();
        let names: Vec<&str> = tree.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "src", "README.md"]);
        assert_eq!(tree.file_count(), 4);

        let src = &tree.children[1];
        assert_eq!(src.kind, FileNodeKind::Directory);
        assert_eq!(src.children[0].path, "src/app.js");
        assert_eq!(src.children[1].size, 1);
    }
}
