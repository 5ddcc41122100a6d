//! Workflow status and agent roster commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use atelier_types::agent::AgentRole;
use atelier_types::workflow::StepState;

use super::{resolve_project, step_cell, styled_status};
use crate::state::AppState;

/// Show the derived workflow state as a per-agent table.
pub async fn status(state: &AppState, key: &str, json: bool) -> Result<()> {
    let summary = resolve_project(state, key).await?;
    let project_state = summary.state;

    if json {
        println!("{}", serde_json::to_string_pretty(&project_state)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Agent").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Files").fg(Color::White),
        Cell::new("Source").fg(Color::White),
        Cell::new("Took").fg(Color::White),
    ]);

    for (index, step) in project_state.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&step.name).fg(Color::Cyan),
            Cell::new(step.agent.title()),
            step_cell(step.status),
            Cell::new(step.artifacts.len()),
            Cell::new(step.source.map(|s| s.to_string()).unwrap_or_default()).fg(Color::DarkGrey),
            Cell::new(step_duration(step).unwrap_or_default()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!(
        "  {} {}  {} ({}%)",
        style(&summary.project.name).cyan().bold(),
        style(&summary.project.slug).dim(),
        styled_status(project_state.status),
        project_state.progress
    );
    println!();
    println!("{table}");

    if let Some(agent) = project_state.current_agent {
        println!("  {} {} is working", style("◐").cyan(), agent.persona());
    } else if let Some(agent) = project_state.next_agent {
        println!("  Next: {} ({})", style(agent.persona()).cyan(), agent.title());
    }
    if let Some(error) = &project_state.last_error {
        println!("  {} {}", style("Last error:").bold(), style(error).red());
    }
    println!();

    Ok(())
}

/// Show the five agents in workflow order.
pub async fn agents(state: &AppState, json: bool) -> Result<()> {
    let roster: Vec<_> = AgentRole::WORKFLOW.iter().map(|role| role.profile()).collect();

    if json {
        let body = serde_json::json!({
            "agents": roster,
            "provider": state.runner.generator().provider_name(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Agent").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Writes").fg(Color::White),
    ]);
    for profile in &roster {
        table.add_row(vec![
            Cell::new(&profile.name).fg(Color::Cyan),
            Cell::new(&profile.title),
            Cell::new(profile.outputs.join("\n")).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    match state.runner.generator().provider_name() {
        Some(provider) => println!("  Provider: {}", style(provider).green()),
        None => println!("  Provider: {}", style("templates only").dim()),
    }
    println!();

    Ok(())
}

fn step_duration(step: &StepState) -> Option<String> {
    let (Some(start), Some(end)) = (step.started_at, step.finished_at) else {
        return None;
    };
    let millis = (end - start).num_milliseconds().max(0);
    Some(if millis < 1_000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", millis as f64 / 1_000.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_step_duration() {
        let mut step = StepState::pending(AgentRole::Architect);
        assert_eq!(step_duration(&step), None);

        let start = Utc::now();
        step.started_at = Some(start);
        step.finished_at = Some(start + Duration::milliseconds(250));
        assert_eq!(step_duration(&step).as_deref(), Some("250ms"));

        step.finished_at = Some(start + Duration::milliseconds(2_500));
        assert_eq!(step_duration(&step).as_deref(), Some("2.5s"));
    }
}
