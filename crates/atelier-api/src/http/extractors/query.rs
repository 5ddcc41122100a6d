//! Query and body extractors shared by the handlers.

use serde::Deserialize;

use atelier_types::workflow::RunMode;

/// Query parameters for the log endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct LogQuery {
    /// Keep only the newest `limit` entries.
    pub limit: Option<usize>,
}

/// Body of `POST /workflow/start`. An empty body means `auto`.
#[derive(Debug, Deserialize, Default)]
pub struct StartWorkflowBody {
    #[serde(default)]
    pub mode: RunMode,
}
