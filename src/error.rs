//! Error types for the runner service

use thiserror::Error;

/// Result type alias using the runner's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the runner service
#[derive(Error, Debug)]
pub enum Error {
    /// A supplied file path resolves outside the workspace root or is unusable
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Language identifier outside the supported set
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// No file matches the language's extension/entry-name policy
    #[error("Entry file not found: {0}")]
    EntryFileNotFound(String),

    /// Container runtime failure during create/attach/start
    #[error("Sandbox creation failed: {0}")]
    SandboxCreation(String),

    /// Deadline exceeded; the container was killed
    #[error("Execution timeout after {timeout_ms}ms")]
    ExecutionTimeout { timeout_ms: u64 },

    /// Docker/container error after the sandbox is running
    #[error("Container error: {0}")]
    Container(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if the error was raised while setting a job up, before the
    /// program got a chance to run. These are never worth retrying.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_)
                | Error::UnsupportedLanguage(_)
                | Error::EntryFileNotFound(_)
                | Error::SandboxCreation(_)
        )
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_)
                | Error::UnsupportedLanguage(_)
                | Error::EntryFileNotFound(_)
                | Error::InvalidInput(_)
        )
    }
}

impl From<bollard::errors::Error> for Error {
    fn from(err: bollard::errors::Error) -> Self {
        Error::Container(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let err = Error::ExecutionTimeout { timeout_ms: 1000 };
        assert_eq!(err.to_string(), "Execution timeout after 1000ms");
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidPath("../x".into()).is_setup_error());
        assert!(Error::SandboxCreation("no image".into()).is_setup_error());
        assert!(!Error::SandboxCreation("no image".into()).is_client_error());
        assert!(Error::UnsupportedLanguage("ruby".into()).is_client_error());
        assert!(!Error::Container("gone".into()).is_setup_error());
    }
}
