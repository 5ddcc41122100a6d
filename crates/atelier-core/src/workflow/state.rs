//! Project state derivation.
//!
//! A project's state is a pure fold over its workflow log. Nothing else is
//! persisted, so the log and the reported state can never disagree.

use chrono::{DateTime, Utc};

use atelier_types::agent::{AgentRole, ContentSource};
use atelier_types::workflow::{
    LogEntry, LogKind, LogLevel, ProjectState, ProjectStatus, StepState, StepStatus,
};

use super::sequence;

/// Fold log entries into the current project state.
pub fn derive_state(entries: &[LogEntry]) -> ProjectState {
    let start = entries
        .iter()
        .rposition(|e| matches!(e.kind, LogKind::WorkflowReset))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut state = ProjectState::initial();
    let mut terminal: Option<ProjectStatus> = None;

    if start > 0 {
        state.updated_at = Some(entries[start - 1].timestamp);
    }

    for entry in &entries[start..] {
        state.updated_at = Some(entry.timestamp);

        match (&entry.kind, entry.agent) {
            (LogKind::WorkflowStarted { .. }, _) => {
                terminal = None;
                state.last_error = None;
            }
            (LogKind::StepStarted, Some(agent)) => {
                if let Some(step) = step_mut(&mut state, agent) {
                    step.status = StepStatus::Running;
                    step.started_at = Some(entry.timestamp);
                    step.finished_at = None;
                    step.error = None;
                }
                terminal = None;
            }
            (
                LogKind::StepCompleted {
                    artifacts, source, ..
                },
                Some(agent),
            ) => {
                if let Some(step) = step_mut(&mut state, agent) {
                    step.status = StepStatus::Completed;
                    step.artifacts = artifacts.clone();
                    step.source = Some(*source);
                    step.finished_at = Some(entry.timestamp);
                    step.error = None;
                }
            }
            (LogKind::StepFailed { error }, Some(agent)) => {
                if let Some(step) = step_mut(&mut state, agent) {
                    step.status = StepStatus::Failed;
                    step.finished_at = Some(entry.timestamp);
                    step.error = Some(error.clone());
                }
                state.last_error = Some(error.clone());
            }
            (LogKind::WorkflowCompleted, _) => terminal = Some(ProjectStatus::Completed),
            (LogKind::WorkflowFailed { error }, _) => {
                terminal = Some(ProjectStatus::Failed);
                state.last_error = Some(error.clone());
            }
            (LogKind::WorkflowCancelled, _) => {
                for step in &mut state.steps {
                    if step.status == StepStatus::Running {
                        step.status = StepStatus::Pending;
                        step.started_at = None;
                    }
                }
                terminal = Some(ProjectStatus::Cancelled);
            }
            _ => {}
        }
    }

    let completed = state.completed_agents();
    state.progress = (completed.len() * 100 / sequence::WORKFLOW.len()) as u8;
    state.next_agent = sequence::next_agent(&completed);
    state.current_agent = state
        .steps
        .iter()
        .find(|s| s.status == StepStatus::Running)
        .map(|s| s.agent);

    let any_failed = state.steps.iter().any(|s| s.status == StepStatus::Failed);
    state.status = if state.current_agent.is_some() {
        ProjectStatus::Running
    } else if sequence::is_complete(&completed) {
        ProjectStatus::Completed
    } else if let Some(status @ (ProjectStatus::Failed | ProjectStatus::Cancelled)) = terminal {
        status
    } else if any_failed {
        ProjectStatus::Failed
    } else if !completed.is_empty() {
        ProjectStatus::Waiting
    } else {
        ProjectStatus::Idle
    };

    state
}

fn step_mut(state: &mut ProjectState, agent: AgentRole) -> Option<&mut StepState> {
    state.steps.iter_mut().find(|s| s.agent == agent)
}

/// Correct a derived state against the set of live runs.
///
/// A crash can leave a `StepStarted` with no matching outcome. When no run
/// is active for the project such a step is reported as pending again.
pub fn reconcile(mut state: ProjectState, is_active: bool) -> ProjectState {
    if is_active || state.status != ProjectStatus::Running {
        return state;
    }

    for step in &mut state.steps {
        if step.status == StepStatus::Running {
            step.status = StepStatus::Pending;
            step.started_at = None;
        }
    }
    state.current_agent = None;
    state.status = if state.steps.iter().any(|s| s.status == StepStatus::Failed) {
        ProjectStatus::Failed
    } else if state.steps.iter().any(|s| s.status == StepStatus::Completed) {
        ProjectStatus::Waiting
    } else {
        ProjectStatus::Idle
    };
    state
}

/// Classify a plain-text log line written by older deployments.
///
/// Those logs recorded progress as free text such as `"Emma started"`.
/// Markers are matched as substrings; anything unrecognized becomes a note.
pub fn classify_legacy_line(line: &str, timestamp: DateTime<Utc>) -> LogEntry {
    let text = line.trim();
    let make = |level, agent, kind| LogEntry {
        timestamp,
        level,
        agent,
        kind,
        message: text.to_string(),
    };

    if text.contains("Workflow completed") {
        return make(LogLevel::Info, None, LogKind::WorkflowCompleted);
    }
    if text.contains("Workflow cancelled") {
        return make(LogLevel::Warn, None, LogKind::WorkflowCancelled);
    }

    for role in sequence::WORKFLOW {
        let name = role.persona();
        if text.contains(&format!("{name} started")) {
            return make(LogLevel::Info, Some(role), LogKind::StepStarted);
        }
        if text.contains(&format!("{name} completed")) {
            return make(
                LogLevel::Info,
                Some(role),
                LogKind::StepCompleted {
                    artifacts: Vec::new(),
                    source: ContentSource::Template,
                    duration_ms: 0,
                },
            );
        }
        if text.contains(&format!("{name} failed")) {
            return make(
                LogLevel::Error,
                Some(role),
                LogKind::StepFailed {
                    error: text.to_string(),
                },
            );
        }
    }

    make(LogLevel::Info, None, LogKind::Note)
}
