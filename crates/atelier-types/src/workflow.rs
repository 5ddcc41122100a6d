//! Workflow log and derived state types.
//!
//! The workflow log is the only record of what happened to a project. Every
//! other view (status, progress, next agent) is derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::agent::{AgentRole, ContentSource};

// ---------------------------------------------------------------------------
// Run mode
// ---------------------------------------------------------------------------

/// How far a workflow run goes once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run every remaining step.
    #[default]
    Auto,
    /// Run only the next pending step.
    Step,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Auto => write!(f, "auto"),
            RunMode::Step => write!(f, "step"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(RunMode::Auto),
            "step" => Ok(RunMode::Step),
            other => Err(format!("invalid run mode: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// What a log entry records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogKind {
    WorkflowStarted {
        mode: RunMode,
    },
    StepStarted,
    StepCompleted {
        artifacts: Vec<String>,
        source: ContentSource,
        duration_ms: u64,
    },
    StepFailed {
        error: String,
    },
    /// The text-generation API was skipped or failed; a template was used.
    FallbackUsed {
        reason: String,
    },
    ArtifactEdited {
        path: String,
    },
    WorkflowCompleted,
    WorkflowFailed {
        error: String,
    },
    WorkflowCancelled,
    /// Forget every step outcome recorded before this entry.
    WorkflowReset,
    Note,
}

/// A single line of the project workflow log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentRole>,
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    /// Build an entry stamped with the current time.
    pub fn new(level: LogLevel, agent: Option<AgentRole>, kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            agent,
            kind,
            message: message.into(),
        }
    }

    pub fn info(agent: Option<AgentRole>, kind: LogKind, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, agent, kind, message)
    }

    pub fn warn(agent: Option<AgentRole>, kind: LogKind, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, agent, kind, message)
    }

    pub fn error(agent: Option<AgentRole>, kind: LogKind, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, agent, kind, message)
    }
}

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

/// Overall project status derived from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// A step is executing.
    Running,
    /// Some steps are done and the rest are waiting to be started.
    Waiting,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Idle => write!(f, "idle"),
            ProjectStatus::Running => write!(f, "running"),
            ProjectStatus::Waiting => write!(f, "waiting"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::Failed => write!(f, "failed"),
            ProjectStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of a single agent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-agent view inside `ProjectState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub agent: AgentRole,
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ContentSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepState {
    pub fn pending(agent: AgentRole) -> Self {
        Self {
            agent,
            name: agent.persona().to_string(),
            status: StepStatus::Pending,
            artifacts: Vec::new(),
            source: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }
}

/// Project state derived from the workflow log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub status: ProjectStatus,
    /// One entry per agent, in workflow order.
    pub steps: Vec<StepState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<AgentRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<AgentRole>,
    /// Percentage of completed steps (0..=100).
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectState {
    /// State of a project whose log is empty.
    pub fn initial() -> Self {
        Self {
            status: ProjectStatus::Idle,
            steps: AgentRole::WORKFLOW.iter().map(|r| StepState::pending(*r)).collect(),
            current_agent: None,
            next_agent: Some(AgentRole::WORKFLOW[0]),
            progress: 0,
            last_error: None,
            updated_at: None,
        }
    }

    /// Roles whose step has completed, in workflow order.
    pub fn completed_agents(&self) -> Vec<AgentRole> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| s.agent)
            .collect()
    }

    pub fn step(&self, agent: AgentRole) -> Option<&StepState> {
        self.steps.iter().find(|s| s.agent == agent)
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::initial()
    }
}
