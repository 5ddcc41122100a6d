//! Workspace file watching using `notify-debouncer-mini`.
//!
//! Edits made outside Atelier (an IDE, `git checkout`) are published as
//! `ArtifactChanged { origin: External }` so open previews reload. Changes
//! that Atelier itself made a moment earlier are already published with
//! their real origin and are not repeated.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
// Use notify types re-exported through notify-debouncer-mini so the watcher
// and the debouncer always agree on the notify version.
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};

use atelier_core::event::ConnectionRegistry;
use atelier_types::event::{ChangeOrigin, ProjectEvent};
use atelier_types::project::ProjectId;

use crate::filesystem::{DataLayout, WORKSPACE_DIR};

/// How long after an internal write the same path is ignored by the watcher.
const ECHO_WINDOW: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watcher creation failed: {0}")]
    WatcherCreation(String),

    #[error("failed to watch path '{path}': {reason}")]
    WatchPath { path: String, reason: String },
}

// ---------------------------------------------------------------------------
// Path mapping
// ---------------------------------------------------------------------------

/// Map an absolute path under `{data}/projects` to `(project, workspace path)`.
///
/// Returns `None` for paths outside any workspace (project.json, logs) and
/// for hidden files, which include in-flight atomic-write temp files.
pub fn workspace_path(projects_dir: &Path, path: &Path) -> Option<(ProjectId, String)> {
    let relative = path.strip_prefix(projects_dir).ok()?;
    let mut components = relative.components().map(|c| match c {
        Component::Normal(s) => s.to_str(),
        _ => None,
    });

    let project_id: ProjectId = components.next()??.parse().ok()?;
    if components.next()?? != WORKSPACE_DIR {
        return None;
    }

    let mut parts = Vec::new();
    for part in components {
        let part = part?;
        if part.starts_with('.') {
            return None;
        }
        parts.push(part);
    }
    if parts.is_empty() {
        return None;
    }
    Some((project_id, parts.join("/")))
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

type RecentWrites = Arc<DashMap<(ProjectId, String), Instant>>;

/// RAII handle for the workspace watcher. Dropping it stops watching.
pub struct WorkspaceWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    echo_task: tokio::task::JoinHandle<()>,
    root: PathBuf,
}

impl WorkspaceWatcher {
    /// Watch every project workspace under the data directory.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(
        layout: &DataLayout,
        registry: ConnectionRegistry,
        debounce: Duration,
    ) -> Result<Self, WatchError> {
        let root = layout.projects_dir();
        std::fs::create_dir_all(&root).map_err(|e| WatchError::WatchPath {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        let recent: RecentWrites = Arc::new(DashMap::new());
        let echo_task = tokio::spawn(track_internal_writes(registry.clone(), Arc::clone(&recent)));

        let projects_dir = root.clone();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    handle_path(&projects_dir, &event.path, &registry, &recent);
                }
            }
            Err(err) => tracing::warn!(error = %err, "workspace watcher error"),
        })
        .map_err(|e| WatchError::WatcherCreation(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::WatchPath {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %root.display(), "watching project workspaces");
        Ok(Self {
            _debouncer: debouncer,
            echo_task,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        self.echo_task.abort();
        tracing::debug!(path = %self.root.display(), "workspace watcher dropped");
    }
}

/// Remember paths written by agents and the editor.
async fn track_internal_writes(registry: ConnectionRegistry, recent: RecentWrites) {
    let mut rx = registry.bus().subscribe();
    loop {
        match rx.recv().await {
            Ok(ProjectEvent::ArtifactChanged {
                project_id,
                path,
                origin: ChangeOrigin::Agent | ChangeOrigin::Editor,
            })
            | Ok(ProjectEvent::ArtifactDeleted {
                project_id,
                path,
                origin: ChangeOrigin::Agent | ChangeOrigin::Editor,
            }) => {
                recent.insert((project_id, path), Instant::now());
                recent.retain(|_, at| at.elapsed() < ECHO_WINDOW);
            }
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!(skipped = n, "watcher echo tracker lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}

fn handle_path(projects_dir: &Path, path: &Path, registry: &ConnectionRegistry, recent: &RecentWrites) {
    let Some((project_id, relative)) = workspace_path(projects_dir, path) else {
        return;
    };

    let key = (project_id, relative);
    if recent
        .get(&key)
        .is_some_and(|at| at.elapsed() < ECHO_WINDOW)
    {
        return;
    }
    let (project_id, relative) = key;

    if path.is_file() {
        tracing::debug!(%project_id, path = %relative, "external workspace change");
        registry.publish(ProjectEvent::ArtifactChanged {
            project_id,
            path: relative,
            origin: ChangeOrigin::External,
        });
    } else if !path.exists() {
        tracing::debug!(%project_id, path = %relative, "external workspace delete");
        registry.publish(ProjectEvent::ArtifactDeleted {
            project_id,
            path: relative,
            origin: ChangeOrigin::External,
        });
    }
}
