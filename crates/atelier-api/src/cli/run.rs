//! Run and reset the agent workflow from the terminal.
//!
//! `atelier run` drives the workflow in this process and renders the
//! project's event stream as a progress bar. Ctrl+C cancels the run at the
//! next opportunity; everything already written stays on disk.

use anyhow::{Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;

use atelier_types::agent::AgentRole;
use atelier_types::event::ProjectEvent;
use atelier_types::workflow::{ProjectStatus, RunMode};

use super::{resolve_project, styled_status};
use crate::state::AppState;

/// Run the remaining agents (or just the next one with `--step`).
pub async fn run_workflow(state: &AppState, key: &str, step: bool, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;
    let project_id = summary.project.id;
    let mode = if step { RunMode::Step } else { RunMode::Auto };

    if !json && state.runner.generator().provider_name().is_none() {
        println!(
            "  {} No LLM provider configured; agents will use built-in templates.",
            style("i").blue().bold()
        );
    }

    // Subscribe first so the opening events are not lost.
    let mut subscription = state.registry.subscribe(project_id);
    let started = state.runner.start(project_id, mode).await?;

    let progress = progress_bar(json, started.progress);
    if !json {
        println!();
        println!(
            "  {} {} ({mode})",
            style("▶").cyan().bold(),
            style(&summary.project.name).bold()
        );
    }

    let wait = state.runner.wait(&project_id);
    tokio::pin!(wait);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Ok(event) => render_event(&progress, &event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(%project_id, skipped = n, "progress display lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut wait => break,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                progress.println(format!("  {} Cancelling...", style("!").yellow().bold()));
                if let Err(e) = state.runner.cancel(&project_id) {
                    tracing::debug!(%project_id, error = %e, "cancel after interrupt");
                }
            }
        }
    }

    while let Ok(event) = subscription.try_recv() {
        render_event(&progress, &event);
    }
    progress.finish_and_clear();

    let final_state = state.project_service.state(&project_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&final_state)?);
    } else {
        println!();
        println!(
            "  {} {} ({}%)",
            style("Status:").bold(),
            styled_status(final_state.status),
            final_state.progress
        );
        if let Some(next) = final_state.next_agent
            && final_state.status == ProjectStatus::Waiting
        {
            println!(
                "  Next up: {} ({}). Continue with: {}",
                style(next.persona()).cyan(),
                next.title(),
                style(format!("atelier run {}", summary.project.slug)).yellow()
            );
        }
        println!();
    }

    if final_state.status == ProjectStatus::Failed {
        bail!(
            "workflow failed: {}",
            final_state.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Forget step outcomes; artifacts stay in the workspace.
pub async fn reset_workflow(state: &AppState, key: &str, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;
    let reset = state.runner.reset(&summary.project.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reset)?);
    } else {
        println!(
            "  {} Workflow for '{}' reset. The next run starts with {}.",
            style("✓").green().bold(),
            summary.project.name,
            style(AgentRole::WORKFLOW[0].persona()).cyan()
        );
    }
    Ok(())
}

fn progress_bar(hidden: bool, percent: u8) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("  {bar:30.cyan/blue} {pos:>3}% {msg}")
        .map(|s| s.progress_chars("█▉▊▋▌▍▎▏ "))
    {
        bar.set_style(style);
    }
    bar.set_position(u64::from(percent));
    bar
}

/// Print one event above the progress bar and update its position.
fn render_event(bar: &ProgressBar, event: &ProjectEvent) {
    match event {
        ProjectEvent::AgentStarted { agent, .. } => {
            bar.set_message(format!("{} is working ({})", agent.persona(), agent.title()));
        }
        ProjectEvent::AgentCompleted {
            agent,
            artifacts,
            source,
            duration_ms,
            ..
        } => {
            bar.println(format!(
                "  {} {:<6} {} file{} [{source}] in {:.1}s",
                style("●").green(),
                agent.persona(),
                artifacts.len(),
                if artifacts.len() == 1 { "" } else { "s" },
                *duration_ms as f64 / 1000.0
            ));
        }
        ProjectEvent::AgentFailed { agent, error, .. } => {
            bar.println(format!(
                "  {} {:<6} {}",
                style("✗").red(),
                agent.persona(),
                style(error).red()
            ));
        }
        ProjectEvent::StateChanged { state, .. } => {
            bar.set_position(u64::from(state.progress));
        }
        ProjectEvent::WorkflowCompleted { .. } => {
            bar.set_position(100);
            bar.println(format!("  {} All agents finished", style("✓").green().bold()));
        }
        ProjectEvent::WorkflowCancelled { .. } => {
            bar.println(format!("  {} Workflow cancelled", style("!").yellow().bold()));
        }
        ProjectEvent::WorkflowFailed { error, .. } => {
            bar.println(format!("  {} {}", style("✗").red().bold(), style(error).red()));
        }
        ProjectEvent::WorkflowStarted { .. }
        | ProjectEvent::ArtifactChanged { .. }
        | ProjectEvent::ArtifactDeleted { .. }
        | ProjectEvent::LogAppended { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use atelier_types::project::CreateProjectRequest;

    async fn create(state: &AppState) -> String {
        state
            .project_service
            .create(CreateProjectRequest {
                name: "Habit Tracker".to_string(),
                requirement: "Track daily habits with streaks".to_string(),
            })
            .await
            .unwrap()
            .project
            .slug
    }

    #[tokio::test]
    async fn test_step_run_then_full_run() {
        let (_tmp, state) = test_state().await;
        let slug = create(&state).await;

        run_workflow(&state, &slug, true, true).await.unwrap();
        let after_step = resolve_project(&state, &slug).await.unwrap().state;
        assert_eq!(after_step.status, ProjectStatus::Waiting);
        assert_eq!(after_step.next_agent, Some(AgentRole::WORKFLOW[1]));

        run_workflow(&state, &slug, false, true).await.unwrap();
        let done = resolve_project(&state, &slug).await.unwrap().state;
        assert_eq!(done.status, ProjectStatus::Completed);
        assert_eq!(done.progress, 100);

        // A completed workflow cannot be started again until reset.
        assert!(run_workflow(&state, &slug, false, true).await.is_err());
        reset_workflow(&state, &slug, true).await.unwrap();
        let reset = resolve_project(&state, &slug).await.unwrap().state;
        assert_eq!(reset.status, ProjectStatus::Idle);
    }

    #[test]
    fn test_render_event_tracks_progress() {
        let bar = ProgressBar::hidden();
        bar.set_length(100);
        let mut project_state = atelier_types::workflow::ProjectState::initial();
        project_state.progress = 40;
        render_event(
            &bar,
            &ProjectEvent::StateChanged {
                project_id: atelier_types::project::ProjectId::new(),
                state: project_state,
            },
        );
        assert_eq!(bar.position(), 40);
    }
}
