//! Sandbox configuration types
//!
//! Confinement profile applied to every container, and the per-language
//! image names.

use serde::{Deserialize, Serialize};

use crate::sandbox::Language;

/// Confinement profile for sandbox containers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Memory ceiling (e.g. "256m", "1g")
    #[serde(default = "default_memory")]
    pub memory_limit: String,
    /// CPU quota (fraction of one core)
    #[serde(default = "default_cpu")]
    pub cpu_limit: f64,
    /// Maximum number of processes inside the container
    #[serde(default = "default_pids")]
    pub pids_limit: i64,
    /// In-container path where the workspace is mounted read-only
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
    /// Shell used to wrap the run command
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Size of the writable tmpfs mounted at /tmp
    #[serde(default = "default_tmpfs_size")]
    pub tmpfs_size: String,
    /// Drop all Linux capabilities and forbid privilege escalation
    #[serde(default = "default_true")]
    pub drop_capabilities: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            memory_limit: default_memory(),
            cpu_limit: default_cpu(),
            pids_limit: default_pids(),
            mount_path: default_mount_path(),
            shell: default_shell(),
            tmpfs_size: default_tmpfs_size(),
            drop_capabilities: true,
        }
    }
}

impl SandboxConfig {
    /// Memory ceiling in bytes, if the configured limit parses
    pub fn memory_bytes(&self) -> Option<i64> {
        parse_memory_limit(&self.memory_limit)
    }

    /// CPU quota in the runtime's nano-CPU unit
    pub fn nano_cpus(&self) -> i64 {
        (self.cpu_limit * 1_000_000_000.0) as i64
    }
}

fn default_memory() -> String {
    "256m".to_string()
}

fn default_cpu() -> f64 {
    0.5
}

fn default_pids() -> i64 {
    128
}

fn default_mount_path() -> String {
    "/workspace".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_tmpfs_size() -> String {
    "64m".to_string()
}

fn default_true() -> bool {
    true
}

/// One pre-built image per supported language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_python_image")]
    pub python: String,
    #[serde(default = "default_javascript_image")]
    pub javascript: String,
    #[serde(default = "default_c_image")]
    pub c: String,
    #[serde(default = "default_cpp_image")]
    pub cpp: String,
    #[serde(default = "default_java_image")]
    pub java: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            python: default_python_image(),
            javascript: default_javascript_image(),
            c: default_c_image(),
            cpp: default_cpp_image(),
            java: default_java_image(),
        }
    }
}

impl ImageConfig {
    /// Image bound to a language
    pub fn for_language(&self, language: Language) -> &str {
        match language {
            Language::Python => &self.python,
            Language::JavaScript => &self.javascript,
            Language::C => &self.c,
            Language::Cpp => &self.cpp,
            Language::Java => &self.java,
        }
    }

    /// Mutable access, used by environment overrides
    pub fn for_language_mut(&mut self, language: Language) -> &mut String {
        match language {
            Language::Python => &mut self.python,
            Language::JavaScript => &mut self.javascript,
            Language::C => &mut self.c,
            Language::Cpp => &mut self.cpp,
            Language::Java => &mut self.java,
        }
    }
}

fn image_for(language: &str) -> String {
    format!("runner-{}:latest", language)
}

fn default_python_image() -> String {
    image_for("python")
}

fn default_javascript_image() -> String {
    image_for("javascript")
}

fn default_c_image() -> String {
    image_for("c")
}

fn default_cpp_image() -> String {
    image_for("cpp")
}

fn default_java_image() -> String {
    image_for("java")
}

/// Parse a memory limit string (e.g., "512m", "1g") to bytes
pub fn parse_memory_limit(limit: &str) -> Option<i64> {
    let limit = limit.trim().to_lowercase();
    let (num_str, multiplier) = if let Some(n) = strip_unit(&limit, 'g') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = strip_unit(&limit, 'm') {
        (n, 1024 * 1024)
    } else if let Some(n) = strip_unit(&limit, 'k') {
        (n, 1024)
    } else {
        (limit.trim_end_matches('b'), 1)
    };

    let num: i64 = num_str.trim().parse().ok()?;
    if num <= 0 {
        return None;
    }
    num.checked_mul(multiplier)
}

fn strip_unit(limit: &str, unit: char) -> Option<&str> {
    limit
        .strip_suffix('b')
        .unwrap_or(limit)
        .strip_suffix(unit)
}
