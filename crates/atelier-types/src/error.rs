use thiserror::Error;

use crate::agent::AgentRole;

/// Errors related to project operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project not found")]
    NotFound,

    #[error("invalid project name: {0}")]
    InvalidName(String),

    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),

    #[error("project has an active workflow run")]
    Busy,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Errors related to workspace file operations.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("file is not valid UTF-8 text: {0}")]
    NotText(String),

    #[error("file changed since it was loaded: expected hash '{expected}', got '{actual}'")]
    Conflict { expected: String, actual: String },

    #[error("filesystem error: {0}")]
    Io(String),
}

/// Errors related to workflow runs.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("project not found")]
    ProjectNotFound,

    #[error("a workflow run is already active for this project")]
    AlreadyRunning,

    #[error("workflow already completed; reset it to run again")]
    AlreadyCompleted,

    #[error("no active workflow run")]
    NotRunning,

    #[error("{agent} step timed out after {}", elapsed_label(.millis))]
    StepTimeout { agent: AgentRole, millis: u64 },

    #[error("{agent} step failed: {message}")]
    StepFailed { agent: AgentRole, message: String },

    #[error("storage error: {0}")]
    StorageError(String),
}

fn elapsed_label(millis: &u64) -> String {
    if *millis < 1_000 {
        format!("{millis}ms")
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{:.1}s", *millis as f64 / 1_000.0)
    }
}

/// Errors from repository operations (used by trait definitions in atelier-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ProjectError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ProjectError::NotFound,
            other => ProjectError::StorageError(other.to_string()),
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => WorkflowError::ProjectNotFound,
            other => WorkflowError::StorageError(other.to_string()),
        }
    }
}

impl From<FileError> for WorkflowError {
    fn from(err: FileError) -> Self {
        WorkflowError::StorageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let err = FileError::Conflict {
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("def"));
    }

    #[test]
    fn test_step_timeout_display() {
        let err = WorkflowError::StepTimeout {
            agent: AgentRole::Engineer,
            millis: 90_000,
        };
        assert_eq!(err.to_string(), "engineer step timed out after 90s");

        let err = WorkflowError::StepTimeout {
            agent: AgentRole::TeamLead,
            millis: 250,
        };
        assert_eq!(err.to_string(), "team_lead step timed out after 250ms");

        let err = WorkflowError::StepTimeout {
            agent: AgentRole::TeamLead,
            millis: 1_500,
        };
        assert_eq!(err.to_string(), "team_lead step timed out after 1.5s");
    }

    #[test]
    fn test_repository_not_found_maps_to_domain() {
        assert!(matches!(
            ProjectError::from(RepositoryError::NotFound),
            ProjectError::NotFound
        ));
        assert!(matches!(
            WorkflowError::from(RepositoryError::NotFound),
            WorkflowError::ProjectNotFound
        ));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Io("disk full".to_string());
        assert_eq!(err.to_string(), "io error: disk full");
    }
}
