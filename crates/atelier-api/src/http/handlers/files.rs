//! Workspace file handlers backing the file browser and editor.

use axum::Json;
use axum::extract::{Path, State};

use atelier_types::file::{FileContent, FileNode, WriteFileRequest};
use atelier_types::project::ProjectId;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

fn file_href(id: &ProjectId, path: &str) -> String {
    format!("/api/v1/projects/{id}/files/{path}")
}

/// GET /api/v1/projects/{id}/files - Workspace tree.
pub async fn get_tree(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ProjectId>,
) -> Result<Json<ApiResponse<FileNode>>, AppError> {
    let clock = RequestClock::start();
    let tree = state.project_service.tree(&id).await?;
    Ok(Json(
        clock
            .respond(tree)
            .with_link("self", format!("/api/v1/projects/{id}/files")),
    ))
}

/// GET /api/v1/projects/{id}/files/{*path} - Text content plus hash.
pub async fn read_file(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((id, path)): Path<(ProjectId, String)>,
) -> Result<Json<ApiResponse<FileContent>>, AppError> {
    let clock = RequestClock::start();
    let file = state.project_service.read_file(&id, &path).await?;
    let preview = format!("/preview/{id}/{}", file.path);
    let href = file_href(&id, &file.path);
    Ok(Json(
        clock
            .respond(file)
            .with_link("self", href)
            .with_link("preview", preview),
    ))
}

/// PUT /api/v1/projects/{id}/files/{*path} - Save, optionally guarded by
/// `expected_hash`.
pub async fn write_file(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((id, path)): Path<(ProjectId, String)>,
    Json(body): Json<WriteFileRequest>,
) -> Result<Json<ApiResponse<FileContent>>, AppError> {
    let clock = RequestClock::start();
    let file = state.project_service.write_file(&id, &path, body).await?;
    let href = file_href(&id, &file.path);
    Ok(Json(clock.respond(file).with_link("self", href)))
}

/// DELETE /api/v1/projects/{id}/files/{*path}
pub async fn delete_file(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((id, path)): Path<(ProjectId, String)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let clock = RequestClock::start();
    state.project_service.delete_file(&id, &path).await?;
    Ok(Json(
        clock.respond(serde_json::json!({ "deleted": true, "path": path })),
    ))
}
