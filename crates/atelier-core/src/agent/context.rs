//! Input handed to an agent step.

use std::collections::BTreeMap;

use atelier_types::project::Project;

/// Everything an agent step may read.
///
/// `prior` maps workspace paths to the content earlier agents wrote. Only
/// the files the agent declares as inputs are loaded; missing files are
/// simply absent.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub project: Project,
    pub prior: BTreeMap<String, String>,
}

impl AgentContext {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            prior: BTreeMap::new(),
        }
    }

    /// Add an earlier artifact.
    pub fn with_prior(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.prior.insert(path.into(), content.into());
        self
    }

    /// Content of an earlier artifact, if it was loaded.
    pub fn prior(&self, path: &str) -> Option<&str> {
        self.prior.get(path).map(String::as_str)
    }
}
