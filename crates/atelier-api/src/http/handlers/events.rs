//! Server-Sent Events stream of a single project's events.
//!
//! The first event is a `snapshot` carrying the current derived state, so a
//! client that connects mid-run does not have to fetch it separately. Every
//! later event is a [`ProjectEvent`] whose SSE event name matches its `type`.
//! The stream ends when the server begins shutting down.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use tokio::sync::broadcast::error::RecvError;

use atelier_types::event::ProjectEvent;
use atelier_types::project::ProjectId;

use crate::http::error::AppError;
use crate::http::extractors::auth::StreamAuthenticated;
use crate::state::AppState;

/// GET /api/v1/projects/{id}/events
pub async fn project_events(
    State(state): State<AppState>,
    _auth: StreamAuthenticated,
    Path(id): Path<ProjectId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Subscribe before reading the snapshot so no event falls in between.
    let mut subscription = state.registry.subscribe(id);
    let snapshot = state.project_service.state(&id).await?;
    let shutdown = state.shutdown.clone();

    tracing::debug!(project_id = %id, "SSE client connected");

    let stream = async_stream::stream! {
        yield Ok(json_event("snapshot", &snapshot));

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = subscription.recv() => received,
            };
            match received {
                Ok(event) => yield Ok(sse_event(&event)),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(project_id = %id, skipped = n, "SSE subscriber lagged");
                    yield Ok(Event::default().event("lagged").data(n.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn sse_event(event: &ProjectEvent) -> Event {
    json_event(event.name(), event)
}

fn json_event<T: serde::Serialize>(name: &str, value: &T) -> Event {
    match serde_json::to_string(value) {
        Ok(json) => Event::default().event(name).data(json),
        Err(err) => {
            tracing::warn!(event = name, error = %err, "failed to serialize SSE payload");
            Event::default().event("error").data("serialization failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use atelier_types::error::ProjectError;

    #[tokio::test]
    async fn test_unknown_project_is_rejected() {
        let (_tmp, state) = test_state().await;
        let result = project_events(State(state.clone()), StreamAuthenticated, Path(ProjectId::new())).await;
        assert!(matches!(result.err(), Some(AppError::Project(ProjectError::NotFound))));
        // The failed request's subscription was released.
        assert!(state.registry.active_projects().is_empty());
    }

    #[tokio::test]
    async fn test_stream_ends_on_shutdown() {
        use axum::response::IntoResponse;
        use atelier_types::project::CreateProjectRequest;

        let (_tmp, state) = test_state().await;
        let id = state
            .project_service
            .create(CreateProjectRequest {
                name: "Blog".to_string(),
                requirement: "A static blog".to_string(),
            })
            .await
            .unwrap()
            .project
            .id;

        let sse = project_events(State(state.clone()), StreamAuthenticated, Path(id))
            .await
            .unwrap();
        state.shutdown.cancel();

        let body = sse.into_response().into_body();
        let bytes = tokio::time::timeout(Duration::from_secs(5), axum::body::to_bytes(body, usize::MAX))
            .await
            .expect("stream should end once shutdown starts")
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("event: snapshot\n"));
        assert_eq!(state.registry.connection_count(&id), 0);
    }

    #[test]
    fn test_event_name_matches_type_tag() {
        let event = ProjectEvent::WorkflowCompleted {
            project_id: ProjectId::new(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.name());
    }
}
