//! Agent roster types for Atelier.
//!
//! Each `AgentRole` is a scripted step with a persona name. The roles run in
//! a fixed order (see `AgentRole::WORKFLOW`) and each one writes a fixed set
//! of artifacts into the project workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scripted agent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    TeamLead,
    ProductManager,
    Architect,
    Engineer,
    DataAnalyst,
}

impl AgentRole {
    /// The fixed linear workflow order.
    pub const WORKFLOW: [AgentRole; 5] = [
        AgentRole::TeamLead,
        AgentRole::ProductManager,
        AgentRole::Architect,
        AgentRole::Engineer,
        AgentRole::DataAnalyst,
    ];

    /// Persona name shown to users.
    pub fn persona(&self) -> &'static str {
        match self {
            AgentRole::TeamLead => "Mike",
            AgentRole::ProductManager => "Emma",
            AgentRole::Architect => "Bob",
            AgentRole::Engineer => "Alex",
            AgentRole::DataAnalyst => "David",
        }
    }

    /// Job title shown next to the persona.
    pub fn title(&self) -> &'static str {
        match self {
            AgentRole::TeamLead => "Team Leader",
            AgentRole::ProductManager => "Product Manager",
            AgentRole::Architect => "Architect",
            AgentRole::Engineer => "Engineer",
            AgentRole::DataAnalyst => "Data Analyst",
        }
    }

    /// One-line description of what the agent does.
    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::TeamLead => "Breaks the request into a delivery plan and assigns work",
            AgentRole::ProductManager => "Writes the product requirements and user stories",
            AgentRole::Architect => "Designs the system architecture and file layout",
            AgentRole::Engineer => "Implements the web application",
            AgentRole::DataAnalyst => "Summarizes the project and builds the presentation",
        }
    }

    /// Workspace-relative paths this agent writes.
    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            AgentRole::TeamLead => &["docs/plan.md"],
            AgentRole::ProductManager => &["docs/prd.md", "docs/user_stories.md"],
            AgentRole::Architect => &["docs/architecture.md", "docs/file_tree.md"],
            AgentRole::Engineer => &["src/index.html", "src/styles.css", "src/app.js", "README.md"],
            AgentRole::DataAnalyst => &["docs/report.md", "slides/index.html"],
        }
    }

    /// Zero-based position in the workflow.
    pub fn position(&self) -> usize {
        Self::WORKFLOW
            .iter()
            .position(|r| r == self)
            .unwrap_or_default()
    }

    /// The role that runs after this one, if any.
    pub fn next(&self) -> Option<AgentRole> {
        Self::WORKFLOW.get(self.position() + 1).copied()
    }

    /// Roster entry for this role.
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            role: *self,
            name: self.persona().to_string(),
            title: self.title().to_string(),
            description: self.description().to_string(),
            outputs: self.outputs().iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::TeamLead => write!(f, "team_lead"),
            AgentRole::ProductManager => write!(f, "product_manager"),
            AgentRole::Architect => write!(f, "architect"),
            AgentRole::Engineer => write!(f, "engineer"),
            AgentRole::DataAnalyst => write!(f, "data_analyst"),
        }
    }
}

impl FromStr for AgentRole {
    type Err = String;

    /// Accepts the snake_case role or the persona name, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "team_lead" | "mike" => Ok(AgentRole::TeamLead),
            "product_manager" | "emma" => Ok(AgentRole::ProductManager),
            "architect" | "bob" => Ok(AgentRole::Architect),
            "engineer" | "alex" => Ok(AgentRole::Engineer),
            "data_analyst" | "david" => Ok(AgentRole::DataAnalyst),
            other => Err(format!("unknown agent: '{other}'")),
        }
    }
}

/// Public description of an agent for the roster endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub role: AgentRole,
    pub name: String,
    pub title: String,
    pub description: String,
    pub outputs: Vec<String>,
}

/// Category of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Document,
    Code,
    Presentation,
}

/// A file produced by an agent step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Workspace-relative path, `/`-separated.
    pub path: String,
    pub content: String,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn document(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind: ArtifactKind::Document,
        }
    }

    pub fn code(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind: ArtifactKind::Code,
        }
    }

    pub fn presentation(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind: ArtifactKind::Presentation,
        }
    }
}

/// Where an agent's primary document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Llm,
    Template,
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Llm => write!(f, "llm"),
            ContentSource::Template => write!(f, "template"),
        }
    }
}
