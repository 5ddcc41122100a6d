//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and the
//! HTTP server. Services are generic over storage/hasher traits, but AppState
//! pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use atelier_core::event::{ConnectionRegistry, EventBus};
use atelier_core::service::ProjectService;
use atelier_core::workflow::{ActiveRuns, WorkflowRunner};
use atelier_infra::config::load_config;
use atelier_infra::crypto::hash::Sha256ContentHasher;
use atelier_infra::filesystem::{
    DataLayout, FsProjectRepository, JsonlWorkflowLog, LocalArtifactStore, resolve_data_dir,
};
use atelier_infra::llm::build_generator;
use atelier_types::config::AtelierConfig;
use tokio_util::sync::CancellationToken;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteProjectService =
    ProjectService<FsProjectRepository, JsonlWorkflowLog, LocalArtifactStore, Sha256ContentHasher>;

pub type ConcreteRunner = WorkflowRunner<FsProjectRepository, JsonlWorkflowLog, LocalArtifactStore>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub project_service: Arc<ConcreteProjectService>,
    pub runner: ConcreteRunner,
    pub registry: ConnectionRegistry,
    pub config: Arc<AtelierConfig>,
    pub layout: DataLayout,
    /// Cancelled when the server starts shutting down; long-lived streams
    /// end on it so connection draining can finish.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Initialize the application state from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;
        Self::with_config(data_dir, config).await
    }

    /// Wire the services for `data_dir` with an already-loaded config.
    pub async fn with_config(data_dir: PathBuf, config: AtelierConfig) -> anyhow::Result<Self> {
        let layout = DataLayout::new(data_dir);
        tokio::fs::create_dir_all(layout.projects_dir()).await?;

        let capacity = config.workflow.event_capacity.max(1);
        let registry = ConnectionRegistry::new(EventBus::new(capacity), capacity);
        let runs = ActiveRuns::new();

        let projects = Arc::new(FsProjectRepository::new(layout.clone()));
        let log = Arc::new(JsonlWorkflowLog::new(layout.clone()));
        let artifacts = Arc::new(LocalArtifactStore::new(layout.clone()));

        let project_service = ProjectService::new(
            Arc::clone(&projects),
            Arc::clone(&log),
            Arc::clone(&artifacts),
            Sha256ContentHasher::new(),
            registry.clone(),
            runs.clone(),
        );

        let runner = WorkflowRunner::new(
            projects,
            log,
            artifacts,
            build_generator(&config.llm),
            registry.clone(),
            runs,
            Duration::from_secs(config.workflow.step_timeout_secs),
        );

        tracing::debug!(data_dir = %layout.root().display(), "application state initialized");

        Ok(Self {
            project_service: Arc::new(project_service),
            runner,
            registry,
            config: Arc::new(config),
            layout,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn data_dir(&self) -> &std::path::Path {
        self.layout.root()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use atelier_types::config::LlmConfig;
    use tempfile::TempDir;

    /// State over a temp dir with text generation disabled.
    pub async fn test_state() -> (TempDir, AppState) {
        test_state_with(|_| {}).await
    }

    pub async fn test_state_with(adjust: impl FnOnce(&mut AtelierConfig)) -> (TempDir, AppState) {
        let tmp = TempDir::new().unwrap();
        let mut config = AtelierConfig {
            llm: LlmConfig {
                enabled: false,
                ..LlmConfig::default()
            },
            ..AtelierConfig::default()
        };
        adjust(&mut config);
        let state = AppState::with_config(tmp.path().to_path_buf(), config)
            .await
            .unwrap();
        (tmp, state)
    }
}
