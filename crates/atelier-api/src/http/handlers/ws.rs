//! WebSocket handlers for real-time project events and workflow commands.
//!
//! - `/ws/projects/{id}` registers the connection with the
//!   [`ConnectionRegistry`] for that project, sends a `snapshot` of the
//!   current state, then forwards every project event. Clients may send
//!   `ping`, `start`, and `cancel` commands.
//! - `/ws/events` forwards every event of every project from the global bus.
//!
//! Lagged receivers (when the client is too slow to keep up) are handled
//! gracefully: the handler logs a warning and continues receiving.
//!
//! Both sockets close when the server begins shutting down.
//!
//! Disconnecting does **not** cancel a running workflow; the client must send
//! `cancel`. This allows reconnection without disrupting in-flight work.
//!
//! [`ConnectionRegistry`]: atelier_core::event::ConnectionRegistry

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use atelier_types::project::ProjectId;
use atelier_types::workflow::{ProjectState, RunMode};

use crate::http::error::AppError;
use crate::http::extractors::auth::StreamAuthenticated;
use crate::state::AppState;

/// Incoming command from a WebSocket client.
///
/// Unknown or malformed messages are answered with an `error` reply.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    /// Keep-alive ping. Server responds with `{"type":"pong"}`.
    Ping,
    Start {
        #[serde(default)]
        mode: RunMode,
    },
    Cancel,
}

/// Server messages that are not project events.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsReply {
    Snapshot { state: ProjectState },
    Pong,
    Ack { command: &'static str },
    Error { message: String },
}

/// GET /ws/projects/{id}
pub async fn project_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    _auth: StreamAuthenticated,
    Path(id): Path<ProjectId>,
) -> Result<Response, AppError> {
    state.project_service.get(&id).await?;
    Ok(ws.on_upgrade(move |socket| handle_project_socket(socket, state, id)))
}

/// GET /ws/events
pub async fn events_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    _auth: StreamAuthenticated,
) -> Response {
    ws.on_upgrade(move |socket| handle_firehose_socket(socket, state))
}

async fn handle_project_socket(socket: WebSocket, state: AppState, project_id: ProjectId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut subscription = state.registry.subscribe(project_id);

    tracing::debug!(
        %project_id,
        connections = state.registry.connection_count(&project_id),
        "WebSocket client connected"
    );

    match state.project_service.state(&project_id).await {
        Ok(snapshot) => {
            if send_json(&mut ws_sender, &WsReply::Snapshot { state: snapshot }).await.is_err() {
                return;
            }
        }
        Err(err) => {
            let _ = send_json(&mut ws_sender, &WsReply::Error { message: err.to_string() }).await;
            return;
        }
    }

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            event_result = subscription.recv() => {
                match event_result {
                    Ok(event) => {
                        if send_json(&mut ws_sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(%project_id, skipped = n, "WebSocket subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        let reply = process_command(&state, project_id, text.as_str()).await;
                        if send_json(&mut ws_sender, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%project_id, "WebSocket receive error: {err}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(%project_id, "WebSocket connection closed");
}

async fn handle_firehose_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut events = BroadcastStream::new(state.registry.bus().subscribe());

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            event_result = events.next() => {
                match event_result {
                    Some(Ok(event)) => {
                        if send_json(&mut ws_sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(n))) => {
                        tracing::warn!(skipped = n, "event firehose subscriber lagged");
                    }
                    None => break,
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        if matches!(parse_command(text.as_str()), Ok(WsCommand::Ping))
                            && send_json(&mut ws_sender, &WsReply::Pong).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("event firehose connection closed");
}

fn parse_command(text: &str) -> Result<WsCommand, serde_json::Error> {
    serde_json::from_str(text)
}

/// Execute one client command against the project's runner.
async fn process_command(state: &AppState, project_id: ProjectId, text: &str) -> WsReply {
    let cmd = match parse_command(text) {
        Ok(cmd) => cmd,
        Err(err) => {
            tracing::warn!(raw = %text, error = %err, "ignoring malformed WebSocket command");
            return WsReply::Error {
                message: format!("malformed command: {err}"),
            };
        }
    };

    let result = match cmd {
        WsCommand::Ping => return WsReply::Pong,
        WsCommand::Start { mode } => state.runner.start(project_id, mode).await.map(|_| "start"),
        WsCommand::Cancel => state.runner.cancel(&project_id).map(|_| "cancel"),
    };

    match result {
        Ok(command) => WsReply::Ack { command },
        Err(err) => WsReply::Error {
            message: err.to_string(),
        },
    }
}

async fn send_json<T: Serialize>(
    sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    value: &T,
) -> Result<(), axum::Error> {
    match serde_json::to_string(value) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(err) => {
            tracing::warn!("failed to serialize WebSocket message: {err}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use atelier_types::project::CreateProjectRequest;

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_command(r#"{"type":"ping"}"#), Ok(WsCommand::Ping)));
        assert!(matches!(
            parse_command(r#"{"type":"start"}"#),
            Ok(WsCommand::Start { mode: RunMode::Auto })
        ));
        assert!(matches!(
            parse_command(r#"{"type":"start","mode":"step"}"#),
            Ok(WsCommand::Start { mode: RunMode::Step })
        ));
        assert!(matches!(parse_command(r#"{"type":"cancel"}"#), Ok(WsCommand::Cancel)));
        assert!(parse_command(r#"{"type":"explode"}"#).is_err());
    }

    #[test]
    fn test_reply_shapes() {
        let pong = serde_json::to_value(WsReply::Pong).unwrap();
        assert_eq!(pong["type"], "pong");
        let ack = serde_json::to_value(WsReply::Ack { command: "start" }).unwrap();
        assert_eq!(ack["command"], "start");
    }

    #[tokio::test]
    async fn test_commands_drive_the_runner() {
        let (_tmp, state) = test_state().await;
        let id = state
            .project_service
            .create(CreateProjectRequest {
                name: "Quiz".to_string(),
                requirement: "A trivia quiz".to_string(),
            })
            .await
            .unwrap()
            .project
            .id;

        assert!(matches!(
            process_command(&state, id, r#"{"type":"cancel"}"#).await,
            WsReply::Error { .. }
        ));
        assert!(matches!(
            process_command(&state, id, r#"{"type":"start","mode":"step"}"#).await,
            WsReply::Ack { command: "start" }
        ));
        state.runner.wait(&id).await;
        assert!(matches!(
            process_command(&state, id, "not json").await,
            WsReply::Error { .. }
        ));
        assert!(matches!(
            process_command(&state, id, r#"{"type":"ping"}"#).await,
            WsReply::Pong
        ));
    }
}
