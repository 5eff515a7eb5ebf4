//! Configuration types module

pub mod sandbox;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main runner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Container runtime connection
    #[serde(default)]
    pub docker: DockerConfig,

    /// Confinement profile
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// Per-language images
    #[serde(default)]
    pub images: sandbox::ImageConfig,

    /// Job execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunnerConfig {
    /// Load configuration from the config file (if present) and
    /// environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Docker daemon connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Daemon address (`unix:///var/run/docker.sock`, `tcp://host:2375`).
    /// Local defaults are used when unset.
    #[serde(default)]
    pub host: Option<String>,
    /// Client request timeout in seconds
    #[serde(default = "default_docker_timeout")]
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        DockerConfig {
            host: None,
            timeout_secs: default_docker_timeout(),
        }
    }
}

fn default_docker_timeout() -> u64 {
    120
}

/// Job execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Deadline applied when a request doesn't carry one
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Upper bound for any requested deadline
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
    /// Delay after completion/timeout before final state is inspected,
    /// letting buffered log frames arrive
    #[serde(with = "humantime_serde", default = "default_grace_period")]
    pub grace_period: Duration,
    /// Parent directory for job workspaces (system temp dir when unset)
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    /// Treat any stderr output as a failed run, even with exit code 0
    #[serde(default = "default_true")]
    pub stderr_is_failure: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            default_timeout_ms: default_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            grace_period: default_grace_period(),
            workspace_root: None,
            stderr_is_failure: true,
        }
    }
}

pub(crate) fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_timeout_ms() -> u64 {
    60_000
}

fn default_grace_period() -> Duration {
    Duration::from_millis(100)
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "runner_service=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.execution.default_timeout_ms, 5000);
        assert_eq!(config.execution.grace_period, Duration::from_millis(100));
        assert!(config.execution.stderr_is_failure);
        assert!(config.docker.host.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RunnerConfig = toml::from_str(
            r#"
            [execution]
            grace_period = "250ms"

            [images]
            python = "python:3.12-slim"
            "#,
        )
        .unwrap();

        assert_eq!(config.execution.grace_period, Duration::from_millis(250));
        assert_eq!(config.execution.max_timeout_ms, 60_000);
        assert_eq!(config.images.python, "python:3.12-slim");
        assert_eq!(config.images.java, "runner-java:latest");
    }
}
