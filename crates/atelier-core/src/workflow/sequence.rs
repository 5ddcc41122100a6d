//! The fixed agent ordering.

use atelier_types::agent::AgentRole;

/// Agents in the order they run.
pub const WORKFLOW: [AgentRole; 5] = AgentRole::WORKFLOW;

/// First agent in workflow order that has not completed yet.
///
/// `None` means every agent has completed.
pub fn next_agent(completed: &[AgentRole]) -> Option<AgentRole> {
    WORKFLOW.iter().copied().find(|role| !completed.contains(role))
}

/// Whether every agent has completed.
pub fn is_complete(completed: &[AgentRole]) -> bool {
    next_agent(completed).is_none()
}
