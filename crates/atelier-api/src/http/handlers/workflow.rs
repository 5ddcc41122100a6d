//! Workflow control handlers: start, cancel, reset.
//!
//! Runs execute in the background; these endpoints return as soon as the
//! run is registered. Progress arrives over the WebSocket and SSE streams.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use atelier_types::project::ProjectId;
use atelier_types::workflow::ProjectState;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::StartWorkflowBody;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// POST /api/v1/projects/{id}/workflow/start - `{"mode":"auto"|"step"}`.
///
/// An empty body starts an `auto` run.
pub async fn start_workflow(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<ProjectState>>), AppError> {
    let clock = RequestClock::start();

    let body: StartWorkflowBody = if body.iter().all(u8::is_ascii_whitespace) {
        StartWorkflowBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?
    };

    let project_state = state.runner.start(id, body.mode).await?;
    let resp = clock
        .respond(project_state)
        .with_link("state", format!("/api/v1/projects/{id}/state"))
        .with_link("events", format!("/api/v1/projects/{id}/events"));

    Ok((StatusCode::ACCEPTED, Json(resp)))
}

/// POST /api/v1/projects/{id}/workflow/cancel
pub async fn cancel_workflow(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let clock = RequestClock::start();

    // Unknown projects report 404 rather than "not running".
    state.project_service.get(&id).await?;
    state.runner.cancel(&id)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(clock.respond(serde_json::json!({ "cancelling": true, "id": id }))),
    ))
}

/// POST /api/v1/projects/{id}/workflow/reset - Forget step outcomes; workspace files are kept.
pub async fn reset_workflow(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
) -> Result<Json<ApiResponse<ProjectState>>, AppError> {
    let clock = RequestClock::start();
    let project_state = state.runner.reset(&id).await?;
    Ok(Json(clock.respond(project_state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use atelier_types::error::WorkflowError;
    use atelier_types::project::CreateProjectRequest;
    use atelier_types::workflow::{ProjectStatus, StepStatus};

    async fn create(state: &AppState) -> ProjectId {
        state
            .project_service
            .create(CreateProjectRequest {
                name: "Weather Dashboard".to_string(),
                requirement: "Show a five day forecast".to_string(),
            })
            .await
            .unwrap()
            .project
            .id
    }

    #[tokio::test]
    async fn test_step_mode_runs_one_agent() {
        let (_tmp, state) = test_state().await;
        let id = create(&state).await;

        let (status, _) = start_workflow(
            State(state.clone()),
            Authenticated,
            Path(id),
            Bytes::from_static(br#"{"mode":"step"}"#),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);

        state.runner.wait(&id).await;
        let project_state = state.project_service.state(&id).await.unwrap();
        assert_eq!(project_state.steps[0].status, StepStatus::Completed);
        assert_eq!(project_state.steps[1].status, StepStatus::Pending);
        assert_eq!(project_state.status, ProjectStatus::Waiting);
    }

    #[tokio::test]
    async fn test_empty_body_runs_to_completion_then_reset() {
        let (_tmp, state) = test_state().await;
        let id = create(&state).await;

        start_workflow(State(state.clone()), Authenticated, Path(id), Bytes::new())
            .await
            .unwrap();
        state.runner.wait(&id).await;
        assert_eq!(
            state.project_service.state(&id).await.unwrap().status,
            ProjectStatus::Completed
        );

        let err = start_workflow(State(state.clone()), Authenticated, Path(id), Bytes::new())
            .await
            .err();
        assert!(matches!(err, Some(AppError::Workflow(WorkflowError::AlreadyCompleted))));

        let Json(reset) = reset_workflow(State(state.clone()), Authenticated, Path(id))
            .await
            .unwrap();
        assert_eq!(reset.data.unwrap().status, ProjectStatus::Idle);

        // Generated files survive a reset.
        let prd = state.project_service.read_file(&id, "docs/prd.md").await.unwrap();
        assert!(!prd.content.is_empty());
    }

    #[tokio::test]
    async fn test_bad_body_and_idle_cancel() {
        let (_tmp, state) = test_state().await;
        let id = create(&state).await;

        let err = start_workflow(
            State(state.clone()),
            Authenticated,
            Path(id),
            Bytes::from_static(br#"{"mode":"turbo"}"#),
        )
        .await
        .err();
        assert!(matches!(err, Some(AppError::Validation(_))));

        let err = cancel_workflow(State(state), Authenticated, Path(id)).await.err();
        assert!(matches!(err, Some(AppError::Workflow(WorkflowError::NotRunning))));
    }
}
