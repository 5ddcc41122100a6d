//! Workflow log stored as JSON lines.
//!
//! One `LogEntry` per line, appended under a per-project async mutex so
//! concurrent writers (runner and editor saves) never interleave. Lines that
//! are not JSON come from older deployments that logged free text; they are
//! classified on read.

use std::io::ErrorKind;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use atelier_core::repository::WorkflowLog;
use atelier_core::workflow::state::classify_legacy_line;
use atelier_types::error::RepositoryError;
use atelier_types::project::ProjectId;
use atelier_types::workflow::LogEntry;

use super::DataLayout;

/// `WorkflowLog` writing `{data_dir}/projects/{id}/workflow.log`.
#[derive(Debug)]
pub struct JsonlWorkflowLog {
    layout: DataLayout,
    locks: DashMap<ProjectId, Arc<Mutex<()>>>,
}

impl JsonlWorkflowLog {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, project_id: &ProjectId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(*project_id).or_default().value())
    }
}

impl WorkflowLog for JsonlWorkflowLog {
    async fn append(&self, project_id: &ProjectId, entry: &LogEntry) -> Result<(), RepositoryError> {
        let mut line =
            serde_json::to_string(entry).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        line.push('\n');

        let lock = self.lock_for(project_id);
        let _guard = lock.lock().await;

        let path = self.layout.log_file(project_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Io(e.to_string()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RepositoryError::Io(format!("{}: {e}", path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| RepositoryError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| RepositoryError::Io(e.to_string()))
    }

    async fn entries(&self, project_id: &ProjectId) -> Result<Vec<LogEntry>, RepositoryError> {
        let path = self.layout.log_file(project_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::Io(format!("{}: {e}", path.display()))),
        };

        // Legacy lines carry no timestamp; the file's mtime is the best guess.
        let mut legacy_time: Option<DateTime<Utc>> = None;
        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(_) => {
                    let timestamp = match legacy_time {
                        Some(t) => t,
                        None => {
                            let t = modified_at(&path).await;
                            legacy_time = Some(t);
                            t
                        }
                    };
                    entries.push(classify_legacy_line(line, timestamp));
                }
            }
        }
        Ok(entries)
    }

    /// Removes the log file and forgets the project's append lock.
    async fn clear(&self, project_id: &ProjectId) -> Result<(), RepositoryError> {
        let lock = self.lock_for(project_id);
        let result = {
            let _guard = lock.lock().await;
            match tokio::fs::remove_file(self.layout.log_file(project_id)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(RepositoryError::Io(e.to_string())),
            }
        };
        self.locks.remove(project_id);
        result
    }
}

async fn modified_at(path: &std::path::Path) -> DateTime<Utc> {
    tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::workflow::state::derive_state;
    use atelier_types::agent::AgentRole;
    use atelier_types::workflow::{LogKind, ProjectStatus, RunMode};
    use tempfile::TempDir;

    fn log(tmp: &TempDir) -> JsonlWorkflowLog {
        JsonlWorkflowLog::new(DataLayout::new(tmp.path()))
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let log = log(&tmp);
        let id = ProjectId::new();

        assert!(log.entries(&id).await.unwrap().is_empty());

        log.append(
            &id,
            &LogEntry::info(None, LogKind::WorkflowStarted { mode: RunMode::Step }, "Workflow started (step)"),
        )
        .await
        .unwrap();
        log.append(
            &id,
            &LogEntry::info(Some(AgentRole::TeamLead), LogKind::StepStarted, "Mike started"),
        )
        .await
        .unwrap();

        let entries = log.entries(&id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].agent, Some(AgentRole::TeamLead));

        let raw = tokio::fs::read_to_string(tmp.path().join("projects").join(id.to_string()).join("workflow.log"))
            .await
            .unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_legacy_lines_are_classified() {
        let tmp = TempDir::new().unwrap();
        let log = log(&tmp);
        let id = ProjectId::new();
        let path = DataLayout::new(tmp.path()).log_file(&id);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(
            &path,
            "[10:00:01] Mike started\n[10:00:05] Mike completed\n\nsomething else\n",
        )
        .await
        .unwrap();

        let entries = log.entries(&id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[2].kind, LogKind::Note));

        let state = derive_state(&entries);
        assert_eq!(state.status, ProjectStatus::Waiting);
        assert_eq!(state.next_agent, Some(AgentRole::ProductManager));
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let tmp = TempDir::new().unwrap();
        let log = Arc::new(log(&tmp));
        let id = ProjectId::new();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let log = Arc::clone(&log);
            tasks.push(tokio::spawn(async move {
                log.append(&id, &LogEntry::info(None, LogKind::Note, format!("note {i}")))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let entries = log.entries(&id).await.unwrap();
        assert_eq!(entries.len(), 20);
        assert!(entries.iter().all(|e| matches!(e.kind, LogKind::Note)));
    }

    #[tokio::test]
    async fn test_clear() {
        let tmp = TempDir::new().unwrap();
        let log = log(&tmp);
        let id = ProjectId::new();
        log.clear(&id).await.unwrap();

        log.append(&id, &LogEntry::info(None, LogKind::Note, "hello")).await.unwrap();
        log.clear(&id).await.unwrap();
        assert!(log.entries(&id).await.unwrap().is_empty());
        assert!(log.locks.is_empty());
    }
}
