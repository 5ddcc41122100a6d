//! Project lifecycle CLI commands: create, list, show, delete, log, files.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::{Confirm, Input};

use atelier_types::file::{FileNode, FileNodeKind};
use atelier_types::project::CreateProjectRequest;
use atelier_types::workflow::{LogLevel, StepStatus};

use super::{format_relative_time, resolve_project, spinner, status_cell, styled_status};
use crate::state::AppState;

/// Create a new project via prompts or one-shot arguments.
///
/// # Examples
///
/// ```bash
/// # Interactive
/// atelier create
///
/// # One-shot
/// atelier create "Todo App" --requirement "A todo list with due dates"
/// ```
pub async fn create_project(
    state: &AppState,
    name: Option<String>,
    requirement: Option<String>,
    json: bool,
) -> Result<()> {
    let name = match name {
        Some(n) => n,
        None => Input::<String>::new()
            .with_prompt("Project name")
            .interact_text()?,
    };

    let requirement = match requirement {
        Some(r) => r,
        None => Input::<String>::new()
            .with_prompt("What should the team build?")
            .interact_text()?,
    };

    let summary = state
        .project_service
        .create(CreateProjectRequest { name, requirement })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let project = &summary.project;
    println!();
    println!("  {} Project created!", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Name:").bold(), style(&project.name).cyan());
    println!("  {}  {}", style("Slug:").bold(), &project.slug);
    println!("  {}    {}", style("ID:").bold(), style(project.id.to_string()).dim());
    println!();
    println!(
        "  Start the team: {}",
        style(format!("atelier run {}", project.slug)).yellow()
    );
    println!();

    Ok(())
}

/// List all projects in a table.
pub async fn list_projects(state: &AppState, json: bool) -> Result<()> {
    let projects = state.project_service.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!();
        println!(
            "  {} No projects yet. Create one with: {}",
            style("i").blue().bold(),
            style("atelier create").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Slug").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Progress").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for summary in &projects {
        table.add_row(vec![
            Cell::new(&summary.project.name).fg(Color::Cyan),
            Cell::new(&summary.project.slug),
            status_cell(summary.state.status),
            Cell::new(format!("{}%", summary.state.progress)),
            Cell::new(format_relative_time(&summary.project.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} project{}",
        style(projects.len()).bold(),
        if projects.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Show a project's requirement and per-agent progress.
pub async fn show_project(state: &AppState, key: &str, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let project = &summary.project;
    let project_state = &summary.state;

    println!();
    println!("  {}", style(&project.name).cyan().bold());
    println!("  {}", style(&project.requirement).dim());
    println!();
    println!("  {}", style("── Details ──").dim());
    println!("  {}      {}", style("Slug:").bold(), project.slug);
    println!("  {}        {}", style("ID:").bold(), style(project.id.to_string()).dim());
    println!(
        "  {}    {} ({}%)",
        style("Status:").bold(),
        styled_status(project_state.status),
        project_state.progress
    );
    if let Some(error) = &project_state.last_error {
        println!("  {} {}", style("Last error:").bold(), style(error).red());
    }
    println!();

    println!("  {}", style("── Agents ──").dim());
    for step in &project_state.steps {
        let marker = match step.status {
            StepStatus::Completed => style("●").green(),
            StepStatus::Running => style("◐").cyan(),
            StepStatus::Failed => style("✗").red(),
            StepStatus::Pending => style("○").dim(),
        };
        let source = step
            .source
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        println!(
            "  {} {:<6} {}{}",
            marker,
            step.name,
            style(step.agent.title()).dim(),
            style(source).dim()
        );
    }
    println!();

    println!("  {}", style("── Timestamps ──").dim());
    println!(
        "  {}  {}",
        style("Created:").bold(),
        project.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "  {}  {}",
        style("Updated:").bold(),
        format_relative_time(&project.updated_at)
    );
    println!();

    Ok(())
}

/// Delete a project permanently with confirmation.
pub async fn delete_project(state: &AppState, key: &str, force: bool, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;
    let project = summary.project;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete project '{}' and its workspace?",
                style(&project.name).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let spinner = spinner(format!("Deleting {}...", project.name));
    let result = state.project_service.delete(&project.id).await;
    spinner.finish_and_clear();
    result?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": true, "id": project.id })
        );
    } else {
        println!("  {} Project '{}' deleted.", style("✓").red().bold(), project.name);
    }

    Ok(())
}

/// Print the workflow log, oldest first.
pub async fn show_log(state: &AppState, key: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;
    let entries = state.project_service.log(&summary.project.id, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!();
    for entry in &entries {
        let time = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
        let agent = entry
            .agent
            .map(|a| format!("[{}] ", a.persona()))
            .unwrap_or_default();
        let message = match entry.level {
            LogLevel::Error => style(entry.message.clone()).red(),
            LogLevel::Warn => style(entry.message.clone()).yellow(),
            _ => style(entry.message.clone()),
        };
        println!("  {} {}{}", style(time).dim(), style(agent).cyan(), message);
    }
    if entries.is_empty() {
        println!("  {}", style("(log is empty)").dim());
    }
    println!();

    Ok(())
}

/// Print the workspace tree.
pub async fn list_files(state: &AppState, key: &str, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;
    let tree = state.project_service.tree(&summary.project.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    println!();
    if tree.children.is_empty() {
        println!(
            "  {} Workspace is empty. Run the team with: {}",
            style("i").blue().bold(),
            style(format!("atelier run {}", summary.project.slug)).yellow()
        );
    } else {
        for line in render_tree(&tree) {
            println!("  {line}");
        }
        println!();
        println!("  {} files", style(tree.file_count()).bold());
    }
    println!();

    Ok(())
}

/// Render the children of `root` as indented lines.
fn render_tree(root: &FileNode) -> Vec<String> {
    fn walk(node: &FileNode, depth: usize, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match node.kind {
            FileNodeKind::Directory => {
                out.push(format!("{indent}{}/", node.name));
                for child in &node.children {
                    walk(child, depth + 1, out);
                }
            }
            FileNodeKind::File => out.push(format!("{indent}{} ({} B)", node.name, node.size)),
        }
    }

    let mut out = Vec::new();
    for child in &root.children {
        walk(child, 0, &mut out);
    }
    out
}
