//! Prompt assembly for agent steps.
//!
//! The user prompt uses XML tags for section boundaries so the model can
//! tell the requirement, earlier documents, and the task apart:
//! ```text
//! <project name="...">{requirement}</project>
//! <document path="docs/plan.md">...</document>
//! <task>...</task>
//! ```

use atelier_types::agent::AgentRole;

use super::context::AgentContext;

/// System prompt establishing the agent's persona.
pub fn system_prompt(role: AgentRole) -> String {
    format!(
        "You are {name}, the {title} of a small software team. {description}. \
         Answer with the requested deliverable only, formatted as Markdown, \
         without preamble or closing remarks.",
        name = role.persona(),
        title = role.title(),
        description = role.description(),
    )
}

/// User prompt with the project, loaded documents, and the task.
pub fn user_prompt(ctx: &AgentContext, task: &str) -> String {
    let mut sections = Vec::with_capacity(ctx.prior.len() + 2);

    sections.push(format!(
        "<project name=\"{}\">\n{}\n</project>",
        ctx.project.name.replace('"', "'"),
        ctx.project.requirement.trim()
    ));

    for (path, content) in &ctx.prior {
        if content.trim().is_empty() {
            continue;
        }
        sections.push(format!(
            "<document path=\"{path}\">\n{}\n</document>",
            content.trim()
        ));
    }

    sections.push(format!("<task>\n{}\n</task>", task.trim()));
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_types::project::{Project, ProjectId};
    use chrono::Utc;

    fn ctx() -> AgentContext {
        AgentContext::new(Project {
            id: ProjectId::new(),
            name: "Weather \"Now\"".to_string(),
            slug: "weather-now".to_string(),
            requirement: "  Show the forecast  ".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn system_prompt_names_persona() {
        let prompt = system_prompt(AgentRole::Architect);
        assert!(prompt.starts_with("You are Bob, the Architect"));
    }

    #[test]
    fn user_prompt_wraps_sections() {
        let ctx = ctx()
            .with_prior("docs/plan.md", "# Plan")
            .with_prior("docs/empty.md", "   ");
        let prompt = user_prompt(&ctx, "Write the PRD.");
        assert!(prompt.starts_with("<project name=\"Weather 'Now'\">\nShow the forecast\n</project>"));
        assert!(prompt.contains("<document path=\"docs/plan.md\">\n# Plan\n</document>"));
        assert!(!prompt.contains("docs/empty.md"));
        assert!(prompt.ends_with("<task>\nWrite the PRD.\n</task>"));
    }
}
