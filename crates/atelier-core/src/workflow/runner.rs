//! Workflow runner: executes agent steps in order for one project at a time.
//!
//! # Execution flow
//!
//! 1. `start` reserves the project in [`ActiveRuns`], derives the current
//!    state from the log, logs `WorkflowStarted`, and spawns a task.
//! 2. The task runs the next pending agent, then the one after, until the
//!    workflow completes (`Auto`) or one step is done (`Step`).
//! 3. Each step: log start -> load inputs -> generate -> write artifacts ->
//!    log completion. Every log entry and state change is published.
//! 4. Failures log `StepFailed` + `WorkflowFailed`; cancellation logs
//!    `WorkflowCancelled`. A later `start` resumes at the first incomplete step.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use atelier_types::agent::AgentRole;
use atelier_types::error::WorkflowError;
use atelier_types::event::{ChangeOrigin, ProjectEvent};
use atelier_types::project::{Project, ProjectId};
use atelier_types::workflow::{LogEntry, LogKind, ProjectState, RunMode};

use crate::agent::{AgentContext, AgentScript, Generator, script_for};
use crate::event::ConnectionRegistry;
use crate::repository::{ProjectRepository, WorkflowLog};
use crate::storage::ArtifactStore;

use super::sequence;
use super::state::{derive_state, reconcile};

// ---------------------------------------------------------------------------
// Active runs
// ---------------------------------------------------------------------------

/// Public view of a live run.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub project_id: ProjectId,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
}

struct RunHandle {
    token: CancellationToken,
    done: watch::Receiver<bool>,
    mode: RunMode,
    started_at: DateTime<Utc>,
}

/// Exclusive per-project run slots.
///
/// Holding a slot is what makes a project "busy": runs, resets, and deletes
/// all reserve one, so they never overlap. Cheap to clone.
#[derive(Clone, Default)]
pub struct ActiveRuns {
    runs: Arc<DashMap<ProjectId, RunHandle>>,
}

/// Proof of a reserved slot. Signals waiters and frees the slot on drop.
pub struct RunSlot {
    project_id: ProjectId,
    token: CancellationToken,
    done: watch::Sender<bool>,
    runs: ActiveRuns,
}

impl RunSlot {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        self.runs.runs.remove(&self.project_id);
        let _ = self.done.send(true);
    }
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for a project; `None` if it is already taken.
    pub fn try_reserve(&self, project_id: ProjectId, mode: RunMode) -> Option<RunSlot> {
        match self.runs.entry(project_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let token = CancellationToken::new();
                let (done_tx, done_rx) = watch::channel(false);
                entry.insert(RunHandle {
                    token: token.clone(),
                    done: done_rx,
                    mode,
                    started_at: Utc::now(),
                });
                Some(RunSlot {
                    project_id,
                    token,
                    done: done_tx,
                    runs: self.clone(),
                })
            }
        }
    }

    pub fn is_active(&self, project_id: &ProjectId) -> bool {
        self.runs.contains_key(project_id)
    }

    /// Request cancellation. Returns false when nothing is running.
    pub fn cancel(&self, project_id: &ProjectId) -> bool {
        match self.runs.get(project_id) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live run. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        self.runs
            .iter()
            .map(|handle| handle.token.cancel())
            .count()
    }

    /// Wait until the project's current run (if any) has finished.
    pub async fn wait(&self, project_id: &ProjectId) {
        let receiver = self.runs.get(project_id).map(|h| h.done.clone());
        if let Some(mut receiver) = receiver {
            let _ = receiver.wait_for(|done| *done).await;
        }
    }

    pub fn list(&self) -> Vec<ActiveRun> {
        let mut runs: Vec<ActiveRun> = self
            .runs
            .iter()
            .map(|entry| ActiveRun {
                project_id: *entry.key(),
                mode: entry.mode,
                started_at: entry.started_at,
            })
            .collect();
        runs.sort_by_key(|r| r.started_at);
        runs
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

enum StepOutcome {
    Completed,
    Cancelled,
}

/// Drives agent steps and records every transition in the workflow log.
///
/// Generic over the storage ports; the runner itself holds no state besides
/// the active-run slots.
pub struct WorkflowRunner<P, L, A> {
    projects: Arc<P>,
    log: Arc<L>,
    artifacts: Arc<A>,
    generator: Generator,
    registry: ConnectionRegistry,
    runs: ActiveRuns,
    step_timeout: Duration,
}

impl<P, L, A> Clone for WorkflowRunner<P, L, A> {
    fn clone(&self) -> Self {
        Self {
            projects: Arc::clone(&self.projects),
            log: Arc::clone(&self.log),
            artifacts: Arc::clone(&self.artifacts),
            generator: self.generator.clone(),
            registry: self.registry.clone(),
            runs: self.runs.clone(),
            step_timeout: self.step_timeout,
        }
    }
}

impl<P, L, A> WorkflowRunner<P, L, A>
where
    P: ProjectRepository + 'static,
    L: WorkflowLog + 'static,
    A: ArtifactStore + 'static,
{
    pub fn new(
        projects: Arc<P>,
        log: Arc<L>,
        artifacts: Arc<A>,
        generator: Generator,
        registry: ConnectionRegistry,
        runs: ActiveRuns,
        step_timeout: Duration,
    ) -> Self {
        Self {
            projects,
            log,
            artifacts,
            generator,
            registry,
            runs,
            step_timeout,
        }
    }

    pub fn runs(&self) -> &ActiveRuns {
        &self.runs
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn is_active(&self, project_id: &ProjectId) -> bool {
        self.runs.is_active(project_id)
    }

    pub fn active_runs(&self) -> Vec<ActiveRun> {
        self.runs.list()
    }

    /// Current derived state of a project.
    pub async fn state(&self, project_id: &ProjectId) -> Result<ProjectState, WorkflowError> {
        self.projects
            .get(project_id)
            .await?
            .ok_or(WorkflowError::ProjectNotFound)?;
        self.derived_state(project_id).await
    }

    async fn derived_state(&self, project_id: &ProjectId) -> Result<ProjectState, WorkflowError> {
        let entries = self.log.entries(project_id).await?;
        Ok(reconcile(derive_state(&entries), self.runs.is_active(project_id)))
    }

    /// Start (or resume) the workflow in the background.
    ///
    /// Returns the state right after the run was registered.
    pub async fn start(&self, project_id: ProjectId, mode: RunMode) -> Result<ProjectState, WorkflowError> {
        let slot = self
            .runs
            .try_reserve(project_id, mode)
            .ok_or(WorkflowError::AlreadyRunning)?;

        let project = self
            .projects
            .get(&project_id)
            .await?
            .ok_or(WorkflowError::ProjectNotFound)?;
        let state = derive_state(&self.log.entries(&project_id).await?);
        if state.next_agent.is_none() {
            return Err(WorkflowError::AlreadyCompleted);
        }

        self.record(
            project_id,
            LogEntry::info(None, LogKind::WorkflowStarted { mode }, format!("Workflow started ({mode})")),
        )
        .await?;
        self.registry.publish(ProjectEvent::WorkflowStarted { project_id, mode });

        tracing::info!(%project_id, %mode, next = ?state.next_agent, "workflow run started");

        let completed = state.completed_agents();
        let runner = self.clone();
        let span = tracing::info_span!("workflow_run", project_id = %project_id, mode = %mode);
        tokio::spawn(
            async move {
                runner.run(&project, mode, completed, slot.token()).await;
                drop(slot);
                runner.publish_state(&project_id).await;
            }
            .instrument(span),
        );

        self.derived_state(&project_id).await
    }

    /// Ask the live run to stop at the next opportunity.
    pub fn cancel(&self, project_id: &ProjectId) -> Result<(), WorkflowError> {
        if self.runs.cancel(project_id) {
            tracing::info!(%project_id, "workflow cancellation requested");
            Ok(())
        } else {
            Err(WorkflowError::NotRunning)
        }
    }

    /// Forget all step outcomes so the next run starts from the first agent.
    ///
    /// Artifacts stay on disk and are overwritten by the next run.
    pub async fn reset(&self, project_id: &ProjectId) -> Result<ProjectState, WorkflowError> {
        let _slot = self
            .runs
            .try_reserve(*project_id, RunMode::Auto)
            .ok_or(WorkflowError::AlreadyRunning)?;

        self.projects
            .get(project_id)
            .await?
            .ok_or(WorkflowError::ProjectNotFound)?;

        self.record(
            *project_id,
            LogEntry::info(None, LogKind::WorkflowReset, "Workflow reset"),
        )
        .await?;

        let state = derive_state(&self.log.entries(project_id).await?);
        self.registry.publish(ProjectEvent::StateChanged {
            project_id: *project_id,
            state: state.clone(),
        });
        Ok(state)
    }

    /// Wait for the project's live run to finish.
    pub async fn wait(&self, project_id: &ProjectId) {
        self.runs.wait(project_id).await;
    }

    /// Cancel every live run (shutdown).
    pub fn cancel_all(&self) -> usize {
        self.runs.cancel_all()
    }

    async fn run(
        &self,
        project: &Project,
        mode: RunMode,
        mut completed: Vec<AgentRole>,
        token: &CancellationToken,
    ) {
        let project_id = project.id;
        loop {
            let Some(agent) = sequence::next_agent(&completed) else {
                self.record_quietly(
                    project_id,
                    LogEntry::info(None, LogKind::WorkflowCompleted, "Workflow completed"),
                )
                .await;
                self.registry.publish(ProjectEvent::WorkflowCompleted { project_id });
                tracing::info!(%project_id, "workflow completed");
                return;
            };

            if token.is_cancelled() {
                self.finish_cancelled(project_id).await;
                return;
            }

            match self.run_step(project, agent, token).await {
                Ok(StepOutcome::Completed) => {
                    completed.push(agent);
                    if mode == RunMode::Step && !sequence::is_complete(&completed) {
                        tracing::info!(%project_id, %agent, "step mode: pausing after one step");
                        return;
                    }
                }
                Ok(StepOutcome::Cancelled) => {
                    self.finish_cancelled(project_id).await;
                    return;
                }
                Err(e) => {
                    self.finish_failed(project_id, agent, &e).await;
                    return;
                }
            }
        }
    }

    async fn run_step(
        &self,
        project: &Project,
        agent: AgentRole,
        token: &CancellationToken,
    ) -> Result<StepOutcome, WorkflowError> {
        let project_id = project.id;
        let script = script_for(agent);
        let started = Instant::now();

        self.record(
            project_id,
            LogEntry::info(Some(agent), LogKind::StepStarted, format!("{} started", agent.persona())),
        )
        .await?;
        self.registry.publish(ProjectEvent::AgentStarted {
            project_id,
            agent,
            name: agent.persona().to_string(),
        });
        self.publish_state(&project_id).await;

        let ctx = self.load_context(project, script).await;

        let generation = tokio::select! {
            _ = token.cancelled() => return Ok(StepOutcome::Cancelled),
            result = tokio::time::timeout(self.step_timeout, self.generator.generate(script, &ctx)) => {
                result.map_err(|_| WorkflowError::StepTimeout {
                    agent,
                    millis: self.step_timeout.as_millis() as u64,
                })?
            }
        };

        let artifacts = script.assemble(&ctx, &generation.content);
        let mut paths = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            self.artifacts
                .write(&project_id, &artifact.path, &artifact.content)
                .await?;
            self.registry.publish(ProjectEvent::ArtifactChanged {
                project_id,
                path: artifact.path.clone(),
                origin: ChangeOrigin::Agent,
            });
            paths.push(artifact.path.clone());
        }

        if let Some(reason) = generation.fallback_reason {
            let message = format!("{} used the built-in template: {reason}", agent.persona());
            let kind = LogKind::FallbackUsed { reason };
            let entry = if self.generator.provider_name().is_some() {
                LogEntry::warn(Some(agent), kind, message)
            } else {
                LogEntry::info(Some(agent), kind, message)
            };
            self.record(project_id, entry).await?;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        self.record(
            project_id,
            LogEntry::info(
                Some(agent),
                LogKind::StepCompleted {
                    artifacts: paths.clone(),
                    source: generation.source,
                    duration_ms,
                },
                format!("{} completed", agent.persona()),
            ),
        )
        .await?;
        self.registry.publish(ProjectEvent::AgentCompleted {
            project_id,
            agent,
            artifacts: paths,
            source: generation.source,
            duration_ms,
        });
        self.publish_state(&project_id).await;

        tracing::info!(%project_id, %agent, source = %generation.source, duration_ms, "agent step completed");
        Ok(StepOutcome::Completed)
    }

    async fn load_context(&self, project: &Project, script: &dyn AgentScript) -> AgentContext {
        let mut ctx = AgentContext::new(project.clone());
        for path in script.inputs() {
            match self.artifacts.read(&project.id, path).await {
                Ok(content) => ctx = ctx.with_prior(*path, content),
                Err(e) => tracing::debug!(project_id = %project.id, path, error = %e, "input not available"),
            }
        }
        ctx
    }

    async fn finish_cancelled(&self, project_id: ProjectId) {
        self.record_quietly(
            project_id,
            LogEntry::warn(None, LogKind::WorkflowCancelled, "Workflow cancelled"),
        )
        .await;
        self.registry.publish(ProjectEvent::WorkflowCancelled { project_id });
        tracing::info!(%project_id, "workflow cancelled");
    }

    async fn finish_failed(&self, project_id: ProjectId, agent: AgentRole, error: &WorkflowError) {
        let error = error.to_string();
        self.record_quietly(
            project_id,
            LogEntry::error(
                Some(agent),
                LogKind::StepFailed { error: error.clone() },
                format!("{} failed: {error}", agent.persona()),
            ),
        )
        .await;
        self.registry.publish(ProjectEvent::AgentFailed {
            project_id,
            agent,
            error: error.clone(),
        });
        self.record_quietly(
            project_id,
            LogEntry::error(
                None,
                LogKind::WorkflowFailed { error: error.clone() },
                format!("Workflow failed: {error}"),
            ),
        )
        .await;
        self.registry.publish(ProjectEvent::WorkflowFailed { project_id, error: error.clone() });
        tracing::error!(%project_id, %agent, %error, "workflow failed");
    }

    /// Append to the log and publish the entry.
    async fn record(&self, project_id: ProjectId, entry: LogEntry) -> Result<(), WorkflowError> {
        self.log.append(&project_id, &entry).await?;
        self.registry.publish(ProjectEvent::LogAppended { project_id, entry });
        Ok(())
    }

    async fn record_quietly(&self, project_id: ProjectId, entry: LogEntry) {
        if let Err(e) = self.record(project_id, entry).await {
            tracing::error!(%project_id, error = %e, "failed to append workflow log entry");
        }
    }

    async fn publish_state(&self, project_id: &ProjectId) {
        match self.derived_state(project_id).await {
            Ok(state) => self.registry.publish(ProjectEvent::StateChanged {
                project_id: *project_id,
                state,
            }),
            Err(e) => tracing::warn!(%project_id, error = %e, "could not derive project state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::GenerationSettings;
    use crate::event::EventBus;
    use crate::llm::{BoxLlmProvider, LlmProvider};
    use crate::testing::{InMemoryArtifacts, InMemoryLog, InMemoryProjects};
    use atelier_types::agent::ContentSource;
    use atelier_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};
    use atelier_types::workflow::{ProjectStatus, StepStatus};
    use std::future::Future;

    /// Provider whose completions never return.
    struct StalledProvider {
        capabilities: ProviderCapabilities,
    }

    impl LlmProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            std::future::pending()
        }
    }

    fn stalled_generator(provider_timeout: Duration) -> Generator {
        let provider = StalledProvider {
            capabilities: ProviderCapabilities {
                max_context_tokens: 100_000,
                max_output_tokens: 2048,
            },
        };
        Generator::new(
            BoxLlmProvider::new(provider),
            GenerationSettings {
                timeout: provider_timeout,
                ..GenerationSettings::default()
            },
        )
    }

    struct Fixture {
        runner: WorkflowRunner<InMemoryProjects, InMemoryLog, InMemoryArtifacts>,
        artifacts: Arc<InMemoryArtifacts>,
        log: Arc<InMemoryLog>,
        registry: ConnectionRegistry,
        project: Project,
    }

    async fn fixture() -> Fixture {
        fixture_with(Generator::template_only(), Duration::from_secs(10)).await
    }

    async fn fixture_with(generator: Generator, step_timeout: Duration) -> Fixture {
        let projects = Arc::new(InMemoryProjects::default());
        let log = Arc::new(InMemoryLog::default());
        let artifacts = Arc::new(InMemoryArtifacts::default());
        let registry = ConnectionRegistry::new(EventBus::new(256), 256);
        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            name: "Budget Planner".to_string(),
            slug: "budget-planner".to_string(),
            requirement: "Track expenses. Show monthly totals".to_string(),
            created_at: now,
            updated_at: now,
        };
        projects.create(&project).await.unwrap();

        let runner = WorkflowRunner::new(
            projects,
            Arc::clone(&log),
            Arc::clone(&artifacts),
            generator,
            registry.clone(),
            ActiveRuns::new(),
            step_timeout,
        );
        Fixture {
            runner,
            artifacts,
            log,
            registry,
            project,
        }
    }

    #[tokio::test]
    async fn auto_run_completes_all_agents() {
        let f = fixture().await;
        let id = f.project.id;

        f.runner.start(id, RunMode::Auto).await.unwrap();
        f.runner.wait(&id).await;

        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Completed);
        assert_eq!(state.progress, 100);
        assert!(!f.runner.is_active(&id));

        for role in AgentRole::WORKFLOW {
            for path in role.outputs() {
                assert!(f.artifacts.get(&id, path).is_some(), "missing {path}");
            }
            assert_eq!(state.step(role).unwrap().source, Some(ContentSource::Template));
        }
        let slides = f.artifacts.get(&id, "slides/index.html").unwrap();
        assert!(slides.contains("<h2>Objective</h2>"));
    }

    #[tokio::test]
    async fn agents_run_in_workflow_order() {
        let f = fixture().await;
        let id = f.project.id;

        f.runner.start(id, RunMode::Auto).await.unwrap();
        f.runner.wait(&id).await;

        let started: Vec<AgentRole> = f
            .log
            .entries(&id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e.kind, LogKind::StepStarted))
            .filter_map(|e| e.agent)
            .collect();
        assert_eq!(started, AgentRole::WORKFLOW.to_vec());
    }

    #[tokio::test]
    async fn step_mode_runs_one_agent() {
        let f = fixture().await;
        let id = f.project.id;

        f.runner.start(id, RunMode::Step).await.unwrap();
        f.runner.wait(&id).await;

        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Waiting);
        assert_eq!(state.progress, 20);
        assert_eq!(state.next_agent, Some(AgentRole::ProductManager));
        assert_eq!(f.artifacts.paths(&id), vec!["docs/plan.md"]);

        f.runner.start(id, RunMode::Step).await.unwrap();
        f.runner.wait(&id).await;
        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.next_agent, Some(AgentRole::Architect));
        // Emma read Mike's plan.
        let prd = f.artifacts.get(&id, "docs/prd.md").unwrap();
        assert!(prd.contains("## Release Plan"));
    }

    #[tokio::test]
    async fn completed_workflow_cannot_start_again_until_reset() {
        let f = fixture().await;
        let id = f.project.id;
        f.runner.start(id, RunMode::Auto).await.unwrap();
        f.runner.wait(&id).await;

        let err = f.runner.start(id, RunMode::Auto).await.unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyCompleted));
        assert!(!f.runner.is_active(&id));

        let state = f.runner.reset(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Idle);
        assert_eq!(state.next_agent, Some(AgentRole::TeamLead));
        // Artifacts survive a reset.
        assert!(f.artifacts.get(&id, "docs/plan.md").is_some());

        f.runner.start(id, RunMode::Auto).await.unwrap();
        f.runner.wait(&id).await;
        assert_eq!(
            f.runner.state(&id).await.unwrap().status,
            ProjectStatus::Completed
        );
    }

    #[tokio::test]
    async fn unknown_project_is_rejected() {
        let f = fixture().await;
        let err = f.runner.start(ProjectId::new(), RunMode::Auto).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ProjectNotFound));
        assert!(f.runner.active_runs().is_empty());
    }

    #[tokio::test]
    async fn second_start_while_running_is_rejected() {
        let f = fixture().await;
        let id = f.project.id;
        let _slot = f.runner.runs().try_reserve(id, RunMode::Auto).unwrap();

        let err = f.runner.start(id, RunMode::Auto).await.unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyRunning));
        let err = f.runner.reset(&id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyRunning));
    }

    #[tokio::test]
    async fn write_failure_fails_the_step() {
        let f = fixture().await;
        let id = f.project.id;
        f.artifacts.fail_writes();

        f.runner.start(id, RunMode::Auto).await.unwrap();
        f.runner.wait(&id).await;

        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Failed);
        assert_eq!(state.step(AgentRole::TeamLead).unwrap().status, StepStatus::Failed);
        assert!(state.last_error.unwrap().contains("disk full"));
        assert_eq!(state.next_agent, Some(AgentRole::TeamLead));
    }

    #[tokio::test]
    async fn cancel_before_first_step_logs_cancellation() {
        let f = fixture().await;
        let id = f.project.id;
        assert!(matches!(f.runner.cancel(&id), Err(WorkflowError::NotRunning)));

        // Hold a subscription so events can be observed.
        let mut sub = f.registry.subscribe(id);

        let slot = f.runner.runs().try_reserve(id, RunMode::Auto).unwrap();
        slot.token().cancel();
        f.runner.run(&f.project, RunMode::Auto, Vec::new(), slot.token()).await;
        drop(slot);

        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Cancelled);
        assert!(f.artifacts.paths(&id).is_empty());

        let mut saw_cancel = false;
        while let Ok(event) = sub.recv().await {
            if matches!(event, ProjectEvent::WorkflowCancelled { .. }) {
                saw_cancel = true;
                break;
            }
        }
        assert!(saw_cancel);
    }

    #[tokio::test]
    async fn cancel_during_generation_stops_the_run() {
        let f = fixture_with(stalled_generator(Duration::from_secs(60)), Duration::from_secs(60)).await;
        let id = f.project.id;
        let mut sub = f.registry.subscribe(id);

        f.runner.start(id, RunMode::Auto).await.unwrap();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
                .await
                .unwrap()
                .unwrap();
            if matches!(event, ProjectEvent::AgentStarted { .. }) {
                break;
            }
        }
        f.runner.cancel(&id).unwrap();
        tokio::time::timeout(Duration::from_secs(5), f.runner.wait(&id))
            .await
            .unwrap();

        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Cancelled);
        assert_eq!(state.step(AgentRole::TeamLead).unwrap().status, StepStatus::Pending);
        assert_eq!(state.next_agent, Some(AgentRole::TeamLead));
        assert!(f.artifacts.paths(&id).is_empty());
        assert!(!f.runner.is_active(&id));
    }

    #[tokio::test]
    async fn step_exceeding_its_budget_fails_the_run() {
        let f = fixture_with(stalled_generator(Duration::from_secs(60)), Duration::from_millis(50)).await;
        let id = f.project.id;

        f.runner.start(id, RunMode::Auto).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), f.runner.wait(&id))
            .await
            .unwrap();

        let state = f.runner.state(&id).await.unwrap();
        assert_eq!(state.status, ProjectStatus::Failed);
        assert_eq!(state.step(AgentRole::TeamLead).unwrap().status, StepStatus::Failed);
        let error = state.last_error.unwrap();
        assert!(error.contains("timed out after 50ms"), "{error}");
        assert!(f.artifacts.paths(&id).is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_progress_events() {
        let f = fixture().await;
        let id = f.project.id;
        let mut sub = f.registry.subscribe(id);

        f.runner.start(id, RunMode::Step).await.unwrap();
        f.runner.wait(&id).await;

        let mut names = Vec::new();
        while let Ok(event) = tokio::time::timeout(Duration::from_millis(100), sub.recv()).await {
            match event {
                Ok(event) => names.push(event.name()),
                Err(_) => break,
            }
        }
        assert_eq!(names.first(), Some(&"log_appended"));
        assert!(names.contains(&"workflow_started"));
        assert!(names.contains(&"agent_started"));
        assert!(names.contains(&"artifact_changed"));
        assert!(names.contains(&"agent_completed"));
        assert!(names.contains(&"state_changed"));
    }
}
