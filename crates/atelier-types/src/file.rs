//! Workspace file types.
//!
//! Every project owns a workspace directory. Files are addressed by a
//! workspace-relative, `/`-separated path.

use serde::{Deserialize, Serialize};

use crate::error::FileError;

/// Maximum size of a single workspace file (2 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;

/// Whether a tree node is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNodeKind {
    File,
    Directory,
}

/// A node of the workspace file tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    /// Workspace-relative path.
    pub path: String,
    pub kind: FileNodeKind,
    /// File size in bytes; 0 for directories.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// Number of files below (and including) this node.
    pub fn file_count(&self) -> usize {
        match self.kind {
            FileNodeKind::File => 1,
            FileNodeKind::Directory => self.children.iter().map(FileNode::file_count).sum(),
        }
    }
}

/// The content of a workspace file as returned to the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub mime_type: String,
    pub size: u64,
    /// Lowercase hex SHA-256 of `content`.
    pub hash: String,
}

/// Editor save payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileRequest {
    pub content: String,
    /// Hash the editor last loaded. A mismatch means someone else changed
    /// the file in the meantime.
    #[serde(default)]
    pub expected_hash: Option<String>,
}

/// Validate a workspace-relative path and return its normalized form.
///
/// Backslashes are treated as separators. Empty, `.` and `..` components
/// and absolute paths are rejected.
pub fn normalize_path(path: &str) -> Result<String, FileError> {
    let unified = path.replace('\\', "/");
    if unified.is_empty() || unified.starts_with('/') {
        return Err(FileError::InvalidPath(path.to_string()));
    }

    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." | ".." => return Err(FileError::InvalidPath(path.to_string())),
            p if p.contains(':') || p.contains('\0') => {
                return Err(FileError::InvalidPath(path.to_string()));
            }
            p => parts.push(p),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_file_size() {
        assert_eq!(MAX_FILE_SIZE_BYTES, 2_097_152);
    }

    #[test]
    fn test_normalize_accepts_nested_paths() {
        assert_eq!(normalize_path("docs/prd.md").unwrap(), "docs/prd.md");
        assert_eq!(normalize_path("src\\app.js").unwrap(), "src/app.js");
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        for bad in ["", "/etc/passwd", "../secret", "docs/../../x", "docs//prd.md", "./a", "docs/"] {
            assert!(normalize_path(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_normalize_rejects_drive_prefix() {
        assert!(normalize_path("C:/windows").is_err());
    }

    #[test]
    fn test_file_count() {
        let tree = FileNode {
            name: String::new(),
            path: String::new(),
            kind: FileNodeKind::Directory,
            size: 0,
            children: vec![
                FileNode {
                    name: "README.md".to_string(),
                    path: "README.md".to_string(),
                    kind: FileNodeKind::File,
                    size: 10,
                    children: vec![],
                },
                FileNode {
                    name: "docs".to_string(),
                    path: "docs".to_string(),
                    kind: FileNodeKind::Directory,
                    size: 0,
                    children: vec![FileNode {
                        name: "plan.md".to_string(),
                        path: "docs/plan.md".to_string(),
                        kind: FileNodeKind::File,
                        size: 5,
                        children: vec![],
                    }],
                },
            ],
        };
        assert_eq!(tree.file_count(), 2);
    }

    #[test]
    fn test_write_request_hash_optional() {
        let req: WriteFileRequest = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert!(req.expected_hash.is_none());
    }
}
