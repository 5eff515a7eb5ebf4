//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use super::types::RunnerConfig;
use crate::error::{Error, Result};
use crate::sandbox::Language;

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (`.env` is loaded first)
pub fn load_config() -> Result<RunnerConfig> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        RunnerConfig::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<RunnerConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    parse_config(&content, path)
}

fn parse_config(content: &str, path: &Path) -> Result<RunnerConfig> {
    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => json5::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?,
        Some("toml") => toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?,
        _ => json5::from_str(content)
            .or_else(|_| toml::from_str(content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?,
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Env vars have the highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut RunnerConfig) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from<F>(config: &mut RunnerConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("DOCKER_HOST") {
        config.docker.host = Some(host);
    }

    // Confinement profile
    if let Some(memory) = var("RUNNER_MEMORY_LIMIT") {
        config.sandbox.memory_limit = memory;
    }
    if let Some(v) = var("RUNNER_CPU_LIMIT").and_then(|v| v.parse().ok()) {
        config.sandbox.cpu_limit = v;
    }
    if let Some(v) = var("RUNNER_PIDS_LIMIT").and_then(|v| v.parse().ok()) {
        config.sandbox.pids_limit = v;
    }

    // Execution
    if let Some(v) = var("RUNNER_DEFAULT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.execution.default_timeout_ms = v;
    }
    if let Some(v) = var("RUNNER_MAX_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.execution.max_timeout_ms = v;
    }
    if let Some(root) = var("RUNNER_WORKSPACE_ROOT") {
        config.execution.workspace_root = Some(std::path::PathBuf::from(root));
    }

    // Images
    for language in Language::ALL {
        let key = format!("RUNNER_IMAGE_{}", language.to_string().to_uppercase());
        if let Some(image) = var(&key) {
            *config.images.for_language_mut(language) = image;
        }
    }

    // Logging
    if let Some(filter) = var("RUNNER_LOG_FILTER") {
        config.logging.filter = filter;
    }
    if let Some(v) = var("RUNNER_LOG_JSON") {
        config.logging.json = v == "true" || v == "1";
    }
}

/// Save configuration to a file
pub fn save_config(config: &RunnerConfig, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = RunnerConfig::default();
        config.sandbox.memory_limit = "128m".to_string();
        config.execution.grace_period = Duration::from_millis(50);
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.sandbox.memory_limit, "128m");
        assert_eq!(loaded.execution.grace_period, Duration::from_millis(50));
    }

    #[test]
    fn test_load_json5_with_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // lenient JSON
                execution: { default_timeout_ms: 2000, grace_period: "20ms" },
                images: { c: "gcc-sandbox:13" },
            }"#,
        )
        .unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.execution.default_timeout_ms, 2000);
        assert_eq!(loaded.images.c, "gcc-sandbox:13");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "execution = [").unwrap();

        assert!(matches!(load_config_from_path(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DOCKER_HOST", "tcp://127.0.0.1:2375"),
            ("RUNNER_CPU_LIMIT", "1.5"),
            ("RUNNER_MAX_TIMEOUT_MS", "9000"),
            ("RUNNER_IMAGE_CPP", "my-gcc:latest"),
            ("RUNNER_LOG_JSON", "1"),
            ("RUNNER_PIDS_LIMIT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = RunnerConfig::default();
        apply_overrides_from(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.docker.host.as_deref(), Some("tcp://127.0.0.1:2375"));
        assert_eq!(config.sandbox.cpu_limit, 1.5);
        assert_eq!(config.execution.max_timeout_ms, 9000);
        assert_eq!(config.images.cpp, "my-gcc:latest");
        assert!(config.logging.json);
        // unparseable values leave the default in place
        assert_eq!(config.sandbox.pids_limit, 128);
    }
}
