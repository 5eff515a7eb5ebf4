//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::RunnerConfig;
use crate::sandbox::Language;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }

    /// Join all error messages into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &RunnerConfig) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_sandbox_config(config, result);
    result = validate_image_config(config, result);
    result = validate_execution_config(config, result);

    result
}

fn validate_sandbox_config(
    config: &RunnerConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    const LARGE_MEMORY: i64 = 2 * 1024 * 1024 * 1024;

    match config.sandbox.memory_bytes() {
        None => {
            result = result.with_error(
                ValidationIssue::new(
                    "sandbox.memory_limit",
                    format!("Unparseable memory limit: {}", config.sandbox.memory_limit),
                )
                .with_suggestion("Use a size such as \"256m\" or \"1g\""),
            );
        }
        Some(bytes) if bytes > LARGE_MEMORY => {
            result = result.with_warning(ValidationIssue::new(
                "sandbox.memory_limit",
                "Memory ceiling above 2g lets one job crowd out others on the host",
            ));
        }
        Some(_) => {}
    }

    if !(config.sandbox.cpu_limit > 0.0) {
        result = result.with_error(ValidationIssue::new(
            "sandbox.cpu_limit",
            "CPU quota must be positive",
        ));
    }

    if config.sandbox.pids_limit <= 0 {
        result = result.with_error(ValidationIssue::new(
            "sandbox.pids_limit",
            "Process limit must be positive",
        ));
    }

    if !config.sandbox.mount_path.starts_with('/') {
        result = result.with_error(
            ValidationIssue::new("sandbox.mount_path", "Mount path must be absolute")
                .with_suggestion("Use \"/workspace\""),
        );
    }

    if config.sandbox.shell.trim().is_empty() {
        result = result.with_error(ValidationIssue::new(
            "sandbox.shell",
            "Shell wrapper must not be empty",
        ));
    }

    result
}

fn validate_image_config(
    config: &RunnerConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    for language in Language::ALL {
        if config.images.for_language(language).trim().is_empty() {
            result = result.with_error(
                ValidationIssue::new(
                    format!("images.{}", language),
                    format!("No image specified for {}", language),
                )
                .with_suggestion(format!("Set images.{} to runner-{}:latest", language, language)),
            );
        }
    }

    result
}

fn validate_execution_config(
    config: &RunnerConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    let execution = &config.execution;

    if execution.default_timeout_ms == 0 || execution.max_timeout_ms == 0 {
        result = result.with_error(ValidationIssue::new(
            "execution",
            "Timeouts must be greater than zero",
        ));
    }

    if execution.default_timeout_ms > execution.max_timeout_ms {
        result = result.with_error(
            ValidationIssue::new(
                "execution.default_timeout_ms",
                "Default timeout exceeds max_timeout_ms",
            )
            .with_suggestion("Lower default_timeout_ms or raise max_timeout_ms"),
        );
    }

    if execution.grace_period > std::time::Duration::from_secs(1) {
        result = result.with_warning(ValidationIssue::new(
            "execution.grace_period",
            "Grace period above 1s delays every job",
        ));
    }

    if let Some(root) = &execution.workspace_root {
        if !root.exists() {
            result = result.with_warning(
                ValidationIssue::new(
                    "execution.workspace_root",
                    format!("Workspace root does not exist: {}", root.display()),
                )
                .with_suggestion("Create the directory or unset execution.workspace_root"),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = RunnerConfig::default();
        let result = validate_config(&config);

        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_limits_are_errors() {
        let mut config = RunnerConfig::default();
        config.sandbox.memory_limit = "plenty".to_string();
        config.sandbox.cpu_limit = 0.0;
        config.images.java = String::new();
        config.execution.default_timeout_ms = 90_000;

        let result = validate_config(&config);
        assert!(!result.valid);
        let paths: Vec<_> = result.errors.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"sandbox.memory_limit"));
        assert!(paths.contains(&"sandbox.cpu_limit"));
        assert!(paths.contains(&"images.java"));
        assert!(paths.contains(&"execution.default_timeout_ms"));
        assert!(result.error_summary().contains("images.java"));
    }

    #[test]
    fn test_large_memory_is_warning() {
        let mut config = RunnerConfig::default();
        config.sandbox.memory_limit = "4g".to_string();

        let result = validate_config(&config);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
