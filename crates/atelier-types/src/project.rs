use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::workflow::ProjectState;

/// Maximum project name length in characters.
pub const MAX_NAME_CHARS: usize = 120;

/// Maximum requirement length in characters.
pub const MAX_REQUIREMENT_CHARS: usize = 20_000;

/// Unique identifier for a project, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Create a new ProjectId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A user-initiated unit of work.
///
/// Each project owns a workspace directory of generated files and a
/// workflow log from which its state is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// URL-safe label derived from the name. Not unique.
    pub slug: String,
    /// Free-text description of what the user wants built.
    pub requirement: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub requirement: String,
}

/// Request payload for updating an existing project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub requirement: Option<String>,
}

/// A project together with the state derived from its log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub state: ProjectState,
}

/// Validate and normalize a project name.
pub fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("name must be at most {MAX_NAME_CHARS} characters"));
    }
    if !name.chars().any(char::is_alphanumeric) {
        return Err("name must contain at least one alphanumeric character".to_string());
    }
    Ok(name.to_string())
}

/// Validate and normalize a project requirement.
pub fn validate_requirement(requirement: &str) -> Result<String, String> {
    let requirement = requirement.trim();
    if requirement.is_empty() {
        return Err("requirement cannot be empty".to_string());
    }
    if requirement.chars().count() > MAX_REQUIREMENT_CHARS {
        return Err(format!(
            "requirement must be at most {MAX_REQUIREMENT_CHARS} characters"
        ));
    }
    Ok(requirement.to_string())
}

/// Generate a URL-safe slug from a project name.
///
/// Lowercases, replaces non-alphanumeric chars with hyphens,
/// collapses consecutive hyphens, and trims leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    let mut result = String::with_capacity(slug.len());
    let mut prev_was_hyphen = true;
    for c in slug.chars() {
        if c == '-' {
            if !prev_was_hyphen {
                result.push('-');
            }
            prev_was_hyphen = true;
        } else {
            result.push(c);
            prev_was_hyphen = false;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Todo List App"), "todo-list-app");
    }

    #[test]
    fn test_slugify_special_chars() {
        assert_eq!(slugify("  Snake!!  Game  "), "snake-game");
    }

    #[test]
    fn test_slugify_numbers() {
        assert_eq!(slugify("Portfolio v2.0"), "portfolio-v2-0");
    }

    #[test]
    fn test_project_id_roundtrip_through_string() {
        let id = ProjectId::new();
        let parsed: ProjectId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_project_id_serializes_as_plain_uuid() {
        let id = ProjectId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Weather Dashboard ").unwrap(), "Weather Dashboard");
    }

    #[test]
    fn test_validate_name_rejects_blank_and_symbols() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("!!!").is_err());
    }

    #[test]
    fn test_validate_name_rejects_too_long() {
        let long = "a".repeat(MAX_NAME_CHARS + 1);
        assert!(validate_name(&long).is_err());
    }

    #[test]
    fn test_validate_requirement() {
        assert!(validate_requirement("").is_err());
        assert_eq!(
            validate_requirement(" A kanban board\n").unwrap(),
            "A kanban board"
        );
    }
}
