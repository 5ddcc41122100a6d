//! Project CRUD, state, and log handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use atelier_types::project::{CreateProjectRequest, ProjectId, ProjectSummary, UpdateProjectRequest};
use atelier_types::workflow::{LogEntry, ProjectState};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::LogQuery;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

fn project_href(id: &ProjectId) -> String {
    format!("/api/v1/projects/{id}")
}

fn with_project_links<T: serde::Serialize>(resp: ApiResponse<T>, id: &ProjectId) -> ApiResponse<T> {
    let base = project_href(id);
    resp.with_link("state", format!("{base}/state"))
        .with_link("log", format!("{base}/log"))
        .with_link("files", format!("{base}/files"))
        .with_link("preview", format!("/preview/{id}"))
        .with_link("self", base)
}

/// POST /api/v1/projects - Create a project.
pub async fn create_project(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProjectSummary>>), AppError> {
    let clock = RequestClock::start();

    let summary = state.project_service.create(body).await?;
    let id = summary.project.id;

    Ok((
        StatusCode::CREATED,
        Json(with_project_links(clock.respond(summary), &id)),
    ))
}

/// GET /api/v1/projects - All projects, newest first.
pub async fn list_projects(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<ProjectSummary>>>, AppError> {
    let clock = RequestClock::start();
    let projects = state.project_service.list().await?;
    Ok(Json(clock.respond(projects).with_link("self", "/api/v1/projects")))
}

/// GET /api/v1/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
) -> Result<Json<ApiResponse<ProjectSummary>>, AppError> {
    let clock = RequestClock::start();
    let summary = state.project_service.get(&id).await?;
    Ok(Json(with_project_links(clock.respond(summary), &id)))
}

/// PUT /api/v1/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<ApiResponse<ProjectSummary>>, AppError> {
    let clock = RequestClock::start();
    let summary = state.project_service.update(&id, body).await?;
    Ok(Json(with_project_links(clock.respond(summary), &id)))
}

/// DELETE /api/v1/projects/{id} - Refused while a run is active.
pub async fn delete_project(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let clock = RequestClock::start();
    state.project_service.delete(&id).await?;
    Ok(Json(clock.respond(serde_json::json!({ "deleted": true, "id": id }))))
}

/// GET /api/v1/projects/{id}/state
pub async fn get_state(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
) -> Result<Json<ApiResponse<ProjectState>>, AppError> {
    let clock = RequestClock::start();
    let project_state = state.project_service.state(&id).await?;
    Ok(Json(
        clock
            .respond(project_state)
            .with_link("self", format!("{}/state", project_href(&id))),
    ))
}

/// GET /api/v1/projects/{id}/log?limit=N
pub async fn get_log(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ApiResponse<Vec<LogEntry>>>, AppError> {
    let clock = RequestClock::start();
    let entries = state.project_service.log(&id, query.limit).await?;
    Ok(Json(
        clock
            .respond(entries)
            .with_link("self", format!("{}/log", project_href(&id))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use atelier_types::error::ProjectError;
    use atelier_types::workflow::ProjectStatus;

    fn request(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            requirement: "A todo list with due dates".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let (_tmp, state) = test_state().await;

        let (status, Json(created)) =
            create_project(State(state.clone()), Authenticated, Json(request("Todo App")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let summary = created.data.unwrap();
        let id = summary.project.id;
        assert_eq!(summary.project.slug, "todo-app");
        assert_eq!(summary.state.status, ProjectStatus::Idle);
        assert_eq!(created.links["files"], format!("/api/v1/projects/{id}/files"));

        let Json(fetched) = get_project(State(state.clone()), Authenticated, Path(id))
            .await
            .unwrap();
        assert_eq!(fetched.data.unwrap().project.name, "Todo App");

        let update = UpdateProjectRequest {
            name: Some("Task Board".to_string()),
            requirement: None,
        };
        let Json(updated) = update_project(State(state.clone()), Authenticated, Path(id), Json(update))
            .await
            .unwrap();
        assert_eq!(updated.data.unwrap().project.slug, "task-board");

        delete_project(State(state.clone()), Authenticated, Path(id))
            .await
            .unwrap();
        let err = get_project(State(state), Authenticated, Path(id)).await.err();
        assert!(matches!(err, Some(AppError::Project(ProjectError::NotFound))));
    }

    #[tokio::test]
    async fn test_invalid_name_is_validation_error() {
        let (_tmp, state) = test_state().await;
        let err = create_project(State(state), Authenticated, Json(request("   ")))
            .await
            .err();
        assert!(matches!(err, Some(AppError::Project(ProjectError::InvalidName(_)))));
    }

    #[tokio::test]
    async fn test_log_limit() {
        let (_tmp, state) = test_state().await;
        let (_, Json(created)) =
            create_project(State(state.clone()), Authenticated, Json(request("Notes")))
                .await
                .unwrap();
        let id = created.data.unwrap().project.id;

        let Json(log) = get_log(
            State(state),
            Authenticated,
            Path(id),
            Query(LogQuery { limit: Some(1) }),
        )
        .await
        .unwrap();
        let entries = log.data.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.starts_with("Project created"));
    }
}
