//! Request and outcome types shared by the execution pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    C,
    Cpp,
    Java,
}

impl Language {
    /// Every supported language
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::JavaScript,
        Language::C,
        Language::Cpp,
        Language::Java,
    ];

    /// Source file extensions recognized for this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[".py"],
            Language::JavaScript => &[".js"],
            Language::C => &[".c"],
            Language::Cpp => &[".cpp", ".cxx"],
            Language::Java => &[".java"],
        }
    }

    /// Whether `path` carries one of this language's extensions
    pub fn matches_extension(&self, path: &str) -> bool {
        self.extensions().iter().any(|ext| path.ends_with(ext))
    }
}

impl std::str::FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "c" => Ok(Language::C),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            _ => Err(Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::JavaScript => write!(f, "javascript"),
            Language::C => write!(f, "c"),
            Language::Cpp => write!(f, "cpp"),
            Language::Java => write!(f, "java"),
        }
    }
}

/// One file of the caller's program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: String,
    /// UTF-8 file content, written verbatim
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Request to execute a multi-file program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Programming language
    pub language: Language,
    /// Program files, in caller order
    pub files: Vec<SourceFile>,
    /// Wall-clock deadline in milliseconds
    #[serde(default = "crate::config::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ExecutionRequest {
    /// Create a new execution request with the default deadline
    pub fn new(language: Language, files: Vec<SourceFile>) -> Self {
        ExecutionRequest {
            language,
            files,
            timeout_ms: crate::config::default_timeout_ms(),
        }
    }

    /// Build a request from a free-form language identifier.
    ///
    /// Unknown languages are rejected here, before any workspace exists.
    pub fn parse(language: &str, files: Vec<SourceFile>, timeout_ms: Option<u64>) -> Result<Self> {
        let language = language.parse()?;
        let mut request = ExecutionRequest::new(language, files);
        if let Some(timeout_ms) = timeout_ms {
            request.timeout_ms = timeout_ms;
        }
        Ok(request)
    }

    /// Set timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Add a file
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(SourceFile::new(path, content));
        self
    }
}

/// Final record of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// True iff the program exited 0 and nothing went wrong around it
    pub success: bool,
    /// Captured standard output, trimmed
    pub stdout: String,
    /// Captured standard error (or the supervisory message), trimmed
    pub stderr: String,
    /// Process exit code, -1 when unknown
    pub exit_code: i64,
    /// Supervisory, setup, or synthesized non-zero-exit message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the deadline killed the program
    #[serde(default)]
    pub timed_out: bool,
    /// Wall-clock time spent on the job
    #[serde(with = "humantime_serde", default)]
    pub duration: Duration,
}

impl ExecutionOutcome {
    /// Outcome for a job that failed before its program could run
    pub fn setup_failure(error: &Error, duration: Duration) -> Self {
        let message = error.to_string();
        ExecutionOutcome {
            success: false,
            stdout: String::new(),
            stderr: message.clone(),
            exit_code: -1,
            error: Some(message),
            timed_out: false,
            duration,
        }
    }

    /// Get combined output
    pub fn combined_output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !output.is_empty() {
                output.push_str("\n--- stderr ---\n");
            }
            output.push_str(&self.stderr);
        }
        output
    }
}
