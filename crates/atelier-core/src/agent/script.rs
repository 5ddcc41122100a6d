//! The `AgentScript` trait and the per-role scripts.
//!
//! A script is pure: given the context it produces a request, a template
//! fallback, and the final artifacts. All I/O happens in the runner.

use atelier_types::agent::{AgentRole, Artifact};
use atelier_types::llm::{CompletionRequest, Message};

use crate::templates::{code, documents, extract_code_block, markdown_sections, slides};

use super::context::AgentContext;
use super::prompt;

/// Default output budget for a step; the generator may override it.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// A scripted agent step.
pub trait AgentScript: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Workspace files loaded into the context before the step runs.
    fn inputs(&self) -> &'static [&'static str];

    /// Task instructions appended to the user prompt.
    fn task(&self) -> &'static str;

    /// Request for the primary document.
    fn build_request(&self, ctx: &AgentContext) -> CompletionRequest {
        CompletionRequest {
            model: String::new(),
            messages: vec![Message::user(prompt::user_prompt(ctx, self.task()))],
            system: Some(prompt::system_prompt(self.role())),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            stop_sequences: None,
        }
    }

    /// Template rendition of the primary document.
    fn fallback(&self, ctx: &AgentContext) -> String;

    /// Turn the primary document into the files this agent writes.
    fn assemble(&self, ctx: &AgentContext, primary: &str) -> Vec<Artifact>;
}

/// The script for a role.
pub fn script_for(role: AgentRole) -> &'static dyn AgentScript {
    match role {
        AgentRole::TeamLead => &TeamLead,
        AgentRole::ProductManager => &ProductManager,
        AgentRole::Architect => &Architect,
        AgentRole::Engineer => &Engineer,
        AgentRole::DataAnalyst => &DataAnalyst,
    }
}

/// Strip a single fence wrapping the whole reply (models like to add one).
fn document_body(primary: &str) -> String {
    let trimmed = primary.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") {
        if let Some(inner) = extract_code_block(trimmed, &["markdown", "md", ""]) {
            return format!("{}\n", inner.trim());
        }
    }
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Mike
// ---------------------------------------------------------------------------

pub struct TeamLead;

impl AgentScript for TeamLead {
    fn role(&self) -> AgentRole {
        AgentRole::TeamLead
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[]
    }

    fn task(&self) -> &'static str {
        "Write the project delivery plan. Start with a `# Project Plan` heading and use \
         `##` sections for Objective, Scope, Team Assignments (Emma: requirements, \
         Bob: architecture, Alex: implementation, David: report), Milestones, and Risks."
    }

    fn fallback(&self, ctx: &AgentContext) -> String {
        documents::plan(&ctx.project)
    }

    fn assemble(&self, _ctx: &AgentContext, primary: &str) -> Vec<Artifact> {
        vec![Artifact::document("docs/plan.md", document_body(primary))]
    }
}

// ---------------------------------------------------------------------------
// Emma
// ---------------------------------------------------------------------------

pub struct ProductManager;

impl AgentScript for ProductManager {
    fn role(&self) -> AgentRole {
        AgentRole::ProductManager
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["docs/plan.md"]
    }

    fn task(&self) -> &'static str {
        "Write the product requirements document. Start with a `# Product Requirements` \
         heading and use `##` sections for Overview, Goals, Features (one bullet per \
         feature), and Non-Functional Requirements."
    }

    fn fallback(&self, ctx: &AgentContext) -> String {
        documents::prd(&ctx.project, ctx.prior("docs/plan.md"))
    }

    fn assemble(&self, ctx: &AgentContext, primary: &str) -> Vec<Artifact> {
        let prd = document_body(primary);
        let stories = documents::user_stories(&ctx.project, &prd);
        vec![
            Artifact::document("docs/prd.md", prd),
            Artifact::document("docs/user_stories.md", stories),
        ]
    }
}

// ---------------------------------------------------------------------------
// Bob
// ---------------------------------------------------------------------------

pub struct Architect;

impl AgentScript for Architect {
    fn role(&self) -> AgentRole {
        AgentRole::Architect
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["docs/prd.md"]
    }

    fn task(&self) -> &'static str {
        "Design the architecture of a static single-page web application (index.html, \
         styles.css, app.js, no build step). Start with a `# Architecture` heading and use \
         `##` sections for Overview, Components, Data Flow, and Technology."
    }

    fn fallback(&self, ctx: &AgentContext) -> String {
        documents::architecture(&ctx.project, ctx.prior("docs/prd.md"))
    }

    fn assemble(&self, ctx: &AgentContext, primary: &str) -> Vec<Artifact> {
        vec![
            Artifact::document("docs/architecture.md", document_body(primary)),
            Artifact::document("docs/file_tree.md", documents::file_tree(&ctx.project)),
        ]
    }
}

// ---------------------------------------------------------------------------
// Alex
// ---------------------------------------------------------------------------

pub struct Engineer;

impl AgentScript for Engineer {
    fn role(&self) -> AgentRole {
        AgentRole::Engineer
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["docs/prd.md", "docs/architecture.md"]
    }

    fn task(&self) -> &'static str {
        "Implement app.js for the page. The HTML already contains a form `#item-form` with \
         an input `#item-input`, a list `#item-list`, and a paragraph `#empty-state`. Reply \
         with a few sentences of implementation notes followed by exactly one ```javascript \
         fenced block containing the complete app.js. Use plain browser JavaScript."
    }

    fn fallback(&self, ctx: &AgentContext) -> String {
        format!(
            "Template implementation: items are kept in memory and saved to localStorage.\n\n\
             ```javascript\n{}```\n",
            code::app_js(&ctx.project)
        )
    }

    fn assemble(&self, ctx: &AgentContext, primary: &str) -> Vec<Artifact> {
        let script = extract_code_block(primary, &["javascript", "js"])
            .or_else(|| extract_code_block(primary, &[]))
            .map(|s| format!("{}\n", s.trim_end()))
            .unwrap_or_else(|| code::app_js(&ctx.project));

        let notes = primary
            .split("```")
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        vec![
            Artifact::code("src/index.html", code::index_html(&ctx.project)),
            Artifact::code("src/styles.css", code::styles_css()),
            Artifact::code("src/app.js", script),
            Artifact::document("README.md", code::readme(&ctx.project, notes)),
        ]
    }
}

// ---------------------------------------------------------------------------
// David
// ---------------------------------------------------------------------------

pub struct DataAnalyst;

const REPORT_SOURCES: [&str; 4] = [
    "docs/plan.md",
    "docs/prd.md",
    "docs/user_stories.md",
    "docs/architecture.md",
];

impl AgentScript for DataAnalyst {
    fn role(&self) -> AgentRole {
        AgentRole::DataAnalyst
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[
            "docs/plan.md",
            "docs/prd.md",
            "docs/user_stories.md",
            "docs/architecture.md",
            "docs/file_tree.md",
            "README.md",
        ]
    }

    fn task(&self) -> &'static str {
        "Write the final project report for stakeholders. Start with a `# Project Report` \
         heading and use `##` sections for Summary, Deliverables, Metrics, and Next Steps. \
         Use short bullet points; each section becomes a presentation slide."
    }

    fn fallback(&self, ctx: &AgentContext) -> String {
        let docs: Vec<(&str, &str)> = REPORT_SOURCES
            .iter()
            .filter_map(|path| ctx.prior(path).map(|content| (*path, content)))
            .collect();
        documents::report(&ctx.project, &docs)
    }

    fn assemble(&self, ctx: &AgentContext, primary: &str) -> Vec<Artifact> {
        let report = document_body(primary);

        let mut sections = Vec::new();
        for path in ["docs/plan.md", "docs/prd.md", "docs/architecture.md"] {
            if let Some(content) = ctx.prior(path) {
                sections.extend(markdown_sections(content));
            }
        }
        sections.extend(markdown_sections(&report));

        let deck = slides::deck(&ctx.project, &sections);
        vec![
            Artifact::document("docs/report.md", report),
            Artifact::presentation("slides/index.html", deck),
        ]
    }
}
