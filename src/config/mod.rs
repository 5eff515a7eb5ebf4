//! Configuration module
//!
//! - types/mod.rs: Core configuration types (RunnerConfig, ExecutionConfig, ...)
//! - types/sandbox.rs: Confinement profile and per-language images
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{DockerConfig, ExecutionConfig, LoggingConfig, RunnerConfig};

pub use types::sandbox::{parse_memory_limit, ImageConfig, SandboxConfig};

pub(crate) use types::default_timeout_ms;

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
