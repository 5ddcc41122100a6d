//! Event types for the Atelier notification channel.
//!
//! `ProjectEvent` is broadcast to every subscriber of a project (WebSocket,
//! SSE, the in-process CLI runner). All variants carry the project id so the
//! connection registry can route them.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentRole, ContentSource};
use crate::project::ProjectId;
use crate::workflow::{LogEntry, ProjectState, RunMode};

/// Who changed an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// Written by an agent step.
    Agent,
    /// Saved through the editor API.
    Editor,
    /// Changed on disk by something outside the server.
    External,
}

/// Events emitted while projects are worked on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectEvent {
    WorkflowStarted {
        project_id: ProjectId,
        mode: RunMode,
    },

    AgentStarted {
        project_id: ProjectId,
        agent: AgentRole,
        name: String,
    },

    AgentCompleted {
        project_id: ProjectId,
        agent: AgentRole,
        artifacts: Vec<String>,
        source: ContentSource,
        duration_ms: u64,
    },

    AgentFailed {
        project_id: ProjectId,
        agent: AgentRole,
        error: String,
    },

    /// A workspace file was created or modified.
    ArtifactChanged {
        project_id: ProjectId,
        path: String,
        origin: ChangeOrigin,
    },

    ArtifactDeleted {
        project_id: ProjectId,
        path: String,
        origin: ChangeOrigin,
    },

    /// The derived project state changed.
    StateChanged {
        project_id: ProjectId,
        state: ProjectState,
    },

    LogAppended {
        project_id: ProjectId,
        entry: LogEntry,
    },

    WorkflowCompleted {
        project_id: ProjectId,
    },

    WorkflowFailed {
        project_id: ProjectId,
        error: String,
    },

    WorkflowCancelled {
        project_id: ProjectId,
    },
}

impl ProjectEvent {
    /// The project this event belongs to.
    pub fn project_id(&self) -> ProjectId {
        match self {
            ProjectEvent::WorkflowStarted { project_id, .. }
            | ProjectEvent::AgentStarted { project_id, .. }
            | ProjectEvent::AgentCompleted { project_id, .. }
            | ProjectEvent::AgentFailed { project_id, .. }
            | ProjectEvent::ArtifactChanged { project_id, .. }
            | ProjectEvent::ArtifactDeleted { project_id, .. }
            | ProjectEvent::StateChanged { project_id, .. }
            | ProjectEvent::LogAppended { project_id, .. }
            | ProjectEvent::WorkflowCompleted { project_id }
            | ProjectEvent::WorkflowFailed { project_id, .. }
            | ProjectEvent::WorkflowCancelled { project_id } => *project_id,
        }
    }

    /// Short event name, matching the serde `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ProjectEvent::WorkflowStarted { .. } => "workflow_started",
            ProjectEvent::AgentStarted { .. } => "agent_started",
            ProjectEvent::AgentCompleted { .. } => "agent_completed",
            ProjectEvent::AgentFailed { .. } => "agent_failed",
            ProjectEvent::ArtifactChanged { .. } => "artifact_changed",
            ProjectEvent::ArtifactDeleted { .. } => "artifact_deleted",
            ProjectEvent::StateChanged { .. } => "state_changed",
            ProjectEvent::LogAppended { .. } => "log_appended",
            ProjectEvent::WorkflowCompleted { .. } => "workflow_completed",
            ProjectEvent::WorkflowFailed { .. } => "workflow_failed",
            ProjectEvent::WorkflowCancelled { .. } => "workflow_cancelled",
        }
    }
}
