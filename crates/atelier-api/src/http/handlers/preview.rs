//! Live preview: serves raw workspace files so generated pages render in
//! an iframe with their relative links intact.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};

use atelier_types::error::FileError;
use atelier_types::project::ProjectId;

use crate::http::error::AppError;
use crate::state::AppState;

/// Generated pages run scripts in an opaque origin, away from the API.
const PREVIEW_POLICY: &str = "sandbox allow-scripts allow-forms allow-popups allow-modals";

/// GET /preview/{id} - Redirect to the first entry page that exists.
pub async fn preview_root(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> Result<Redirect, AppError> {
    match state.project_service.preview_entry(&id).await? {
        Some(entry) => Ok(Redirect::temporary(&format!("/preview/{id}/{entry}"))),
        None => Err(FileError::NotFound("no previewable page yet".to_string()).into()),
    }
}

/// GET /preview/{id}/{*path} - Raw file bytes with a detected content type.
pub async fn preview_file(
    State(state): State<AppState>,
    Path((id, path)): Path<(ProjectId, String)>,
) -> Result<Response, AppError> {
    let (bytes, content_type) = state.project_service.preview(&id, &path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-store"),
            (header::CONTENT_SECURITY_POLICY, PREVIEW_POLICY),
        ],
        bytes,
    )
        .into_response())
}
