//! Configuration loader for Atelier.
//!
//! Reads `config.toml` from the data directory (`~/.atelier/` in production)
//! and deserializes it into [`AtelierConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed, then applies environment overrides.

use std::path::Path;

use atelier_types::config::AtelierConfig;

use crate::filesystem::DataLayout;

/// Load configuration from `{data_dir}/config.toml` plus environment overrides.
///
/// - If the file does not exist, starts from [`AtelierConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and uses the default.
/// - `ATELIER_*` environment variables win over the file.
pub async fn load_config(data_dir: &Path) -> AtelierConfig {
    let config = read_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(data_dir: &Path) -> AtelierConfig {
    let config_path = DataLayout::new(data_dir).config_file();

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AtelierConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AtelierConfig::default();
        }
    };

    match toml::from_str::<AtelierConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AtelierConfig::default()
        }
    }
}

/// Apply `ATELIER_HOST`, `ATELIER_PORT`, `ATELIER_API_TOKEN`,
/// `ATELIER_LLM_MODEL`, and `ATELIER_WEB_DIR`.
///
/// `lookup` returns the variable's value; empty values are ignored.
pub fn apply_env_overrides(
    mut config: AtelierConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AtelierConfig {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = get("ATELIER_HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("ATELIER_PORT") {
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid ATELIER_PORT"),
        }
    }
    if let Some(token) = get("ATELIER_API_TOKEN") {
        config.server.api_token = Some(token);
    }
    if let Some(dir) = get("ATELIER_WEB_DIR") {
        config.server.web_dir = Some(dir);
    }
    if let Some(model) = get("ATELIER_LLM_MODEL") {
        config.llm.model = model;
    }
    config
}
