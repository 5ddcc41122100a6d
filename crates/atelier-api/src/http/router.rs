//! Axum router configuration with middleware.
//!
//! JSON routes live under `/api/v1/`; event streams under `/ws/` and the
//! per-project SSE endpoint; raw workspace files under `/preview/`.
//! Middleware: CORS, tracing, gzip compression.
//!
//! When `server.web_dir` (or `ATELIER_WEB_DIR`) points at a built web UI,
//! it is served as a SPA: API routes take priority and unknown paths fall
//! through to its `index.html` for client-side routing. If the directory
//! does not exist, only the API is served.

use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

const DEFAULT_WEB_DIR: &str = "web/dist";

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/agents", get(handlers::agents::list_agents))
        // Project CRUD
        .route(
            "/projects",
            post(handlers::project::create_project).get(handlers::project::list_projects),
        )
        .route(
            "/projects/{id}",
            get(handlers::project::get_project)
                .put(handlers::project::update_project)
                .delete(handlers::project::delete_project),
        )
        .route("/projects/{id}/state", get(handlers::project::get_state))
        .route("/projects/{id}/log", get(handlers::project::get_log))
        // Workflow control
        .route(
            "/projects/{id}/workflow/start",
            post(handlers::workflow::start_workflow),
        )
        .route(
            "/projects/{id}/workflow/cancel",
            post(handlers::workflow::cancel_workflow),
        )
        .route(
            "/projects/{id}/workflow/reset",
            post(handlers::workflow::reset_workflow),
        )
        // Workspace files
        .route("/projects/{id}/files", get(handlers::files::get_tree))
        .route(
            "/projects/{id}/files/{*path}",
            get(handlers::files::read_file)
                .put(handlers::files::write_file)
                .delete(handlers::files::delete_file),
        )
        // Event stream
        .route("/projects/{id}/events", get(handlers::events::project_events));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws/projects/{id}", get(handlers::ws::project_ws))
        .route("/ws/events", get(handlers::ws::events_ws))
        .route("/preview/{id}", get(handlers::preview::preview_root))
        .route("/preview/{id}/{*path}", get(handlers::preview::preview_file))
        .route("/health", get(health_check))
        .with_state(state.clone());

    let web_dir = state
        .config
        .server
        .web_dir
        .clone()
        .unwrap_or_else(|| DEFAULT_WEB_DIR.to_string());
    if std::path::Path::new(&web_dir).is_dir() {
        let index_path = std::path::Path::new(&web_dir).join("index.html");
        let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(index_path));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %web_dir, "web UI static file serving enabled");
    }

    router
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// GET /health - Liveness check (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
