//! Agent roster handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use atelier_types::agent::{AgentProfile, AgentRole};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// The roster plus which provider (if any) backs generation.
#[derive(Debug, Serialize)]
pub struct AgentRoster {
    pub agents: Vec<AgentProfile>,
    /// `None` when every step uses its template.
    pub provider: Option<String>,
}

/// GET /api/v1/agents - Agents in workflow order.
pub async fn list_agents(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<AgentRoster>>, AppError> {
    let clock = RequestClock::start();

    let roster = AgentRoster {
        agents: AgentRole::WORKFLOW.iter().map(AgentRole::profile).collect(),
        provider: state.runner.generator().provider_name().map(str::to_string),
    };

    Ok(Json(clock.respond(roster).with_link("self", "/api/v1/agents")))
}
