//! CLI command definitions and shared helpers for the `atelier` binary.
//!
//! Uses clap derive macros for argument parsing. Commands that take a
//! project accept either its id or its slug.

pub mod project;
pub mod run;
pub mod status;

use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use comfy_table::{Cell, Color};
use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};

use atelier_types::project::{ProjectId, ProjectSummary};
use atelier_types::workflow::{ProjectStatus, StepStatus};

use crate::state::AppState;

/// Turn a requirement into docs, code, and slides with a team of scripted agents.
#[derive(Parser)]
#[command(name = "atelier", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve {
        /// Address to bind (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a new project.
    #[command(alias = "new")]
    Create {
        /// Project name.
        name: Option<String>,

        /// What to build. Prompted for when omitted.
        #[arg(short, long)]
        requirement: Option<String>,
    },

    /// List projects, newest first.
    #[command(alias = "ls")]
    List,

    /// Show a project's details and workflow progress.
    Show {
        /// Project id or slug.
        project: String,
    },

    /// Delete a project and its workspace.
    #[command(alias = "rm")]
    Delete {
        /// Project id or slug.
        project: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },

    /// Run the workflow in this process with live progress.
    Run {
        /// Project id or slug.
        project: String,

        /// Run only the next pending agent.
        #[arg(long)]
        step: bool,
    },

    /// Show the derived workflow state.
    Status {
        /// Project id or slug.
        project: String,
    },

    /// Print the workflow log.
    Log {
        /// Project id or slug.
        project: String,

        /// Show only the newest N entries.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// List the files in a project's workspace.
    Files {
        /// Project id or slug.
        project: String,
    },

    /// Show the agent roster in workflow order.
    Agents,

    /// Forget step outcomes so the next run starts from the first agent.
    Reset {
        /// Project id or slug.
        project: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Find a project by id, or by slug when the key is not an id.
pub async fn resolve_project(state: &AppState, key: &str) -> Result<ProjectSummary> {
    if let Ok(id) = key.parse::<ProjectId>() {
        return Ok(state.project_service.get(&id).await?);
    }

    let mut matches: Vec<ProjectSummary> = state
        .project_service
        .list()
        .await?
        .into_iter()
        .filter(|p| p.project.slug == key)
        .collect();

    match matches.len() {
        0 => bail!("no project with id or slug '{key}'"),
        1 => Ok(matches.remove(0)),
        n => bail!("{n} projects share the slug '{key}'; use the project id instead"),
    }
}

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn styled_status(status: ProjectStatus) -> StyledObject<String> {
    let text = status.to_string();
    match status {
        ProjectStatus::Idle => style(text).dim(),
        ProjectStatus::Running => style(text).cyan(),
        ProjectStatus::Waiting => style(text).yellow(),
        ProjectStatus::Completed => style(text).green(),
        ProjectStatus::Failed => style(text).red(),
        ProjectStatus::Cancelled => style(text).magenta(),
    }
}

pub fn status_cell(status: ProjectStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        ProjectStatus::Idle => cell.fg(Color::DarkGrey),
        ProjectStatus::Running => cell.fg(Color::Cyan),
        ProjectStatus::Waiting => cell.fg(Color::Yellow),
        ProjectStatus::Completed => cell.fg(Color::Green),
        ProjectStatus::Failed => cell.fg(Color::Red),
        ProjectStatus::Cancelled => cell.fg(Color::Magenta),
    }
}

pub fn step_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Pending => Cell::new("○ pending").fg(Color::DarkGrey),
        StepStatus::Running => Cell::new("◐ running").fg(Color::Cyan),
        StepStatus::Completed => Cell::new("● completed").fg(Color::Green),
        StepStatus::Failed => Cell::new("✗ failed").fg(Color::Red),
    }
}

/// Format a timestamp as a relative time string (e.g., "5m ago").
pub fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let secs = (chrono::Utc::now() - *dt).num_seconds().max(0);
    match secs {
        0..60 => "just now".to_string(),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use atelier_types::project::CreateProjectRequest;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from(["atelier", "run", "todo-app", "--step", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Run { step: true, .. }));
    }

    #[test]
    fn test_relative_time() {
        let now = chrono::Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - chrono::Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(now - chrono::Duration::days(3))), "3d ago");
    }

    #[tokio::test]
    async fn test_resolve_by_id_and_slug() {
        let (_tmp, state) = test_state().await;
        let created = state
            .project_service
            .create(CreateProjectRequest {
                name: "Recipe Box".to_string(),
                requirement: "Save and search recipes".to_string(),
            })
            .await
            .unwrap();
        let id = created.project.id;

        assert_eq!(resolve_project(&state, &id.to_string()).await.unwrap().project.id, id);
        assert_eq!(resolve_project(&state, "recipe-box").await.unwrap().project.id, id);
        assert!(resolve_project(&state, "missing").await.is_err());

        state
            .project_service
            .create(CreateProjectRequest {
                name: "Recipe Box".to_string(),
                requirement: "Another one".to_string(),
            })
            .await
            .unwrap();
        assert!(resolve_project(&state, "recipe-box").await.is_err());
    }
}
