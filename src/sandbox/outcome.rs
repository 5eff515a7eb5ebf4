//! Result aggregation
//!
//! Folds exit code, captured streams, and any supervisory error into one
//! [`ExecutionOutcome`].

use std::time::Duration;

use crate::error::Error;
use crate::sandbox::types::ExecutionOutcome;

/// Raw material gathered for one finished job
#[derive(Debug)]
pub struct Finished {
    /// Exit code from inspecting the container
    pub inspected_exit_code: Option<i64>,
    /// Status code reported when the wait resolved
    pub reported_status: Option<i64>,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<Error>,
    pub timed_out: bool,
    pub duration: Duration,
}

/// Build the outcome.
///
/// With `stderr_is_failure`, a program that exits 0 but writes to stderr is
/// reported as failed.
pub fn aggregate(finished: Finished, stderr_is_failure: bool) -> ExecutionOutcome {
    let stdout = finished.stdout.trim().to_string();
    let mut stderr = finished.stderr.trim().to_string();

    // a killed container's code is meaningless to the caller
    let exit_code = if finished.timed_out {
        -1
    } else {
        finished
            .inspected_exit_code
            .or(finished.reported_status)
            .unwrap_or(-1)
    };

    let mut error = finished.error.map(|e| e.to_string());
    if let Some(message) = &error {
        stderr = message.clone();
    } else if exit_code != 0 {
        let message = format!("Process exited with code {}", exit_code);
        if stderr.is_empty() {
            stderr = message.clone();
        }
        error = Some(message);
    }

    let stderr_ok = !stderr_is_failure || stderr.is_empty();
    let success = exit_code == 0 && error.is_none() && stderr_ok;

    ExecutionOutcome {
        success,
        stdout,
        stderr,
        exit_code,
        error,
        timed_out: finished.timed_out,
        duration: finished.duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(exit: Option<i64>, stdout: &str, stderr: &str) -> Finished {
        Finished {
            inspected_exit_code: exit,
            reported_status: None,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            error: None,
            timed_out: false,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_clean_run() {
        let outcome = aggregate(finished(Some(0), "  hi\n", ""), true);

        assert!(outcome.success);
        assert_eq!(outcome.stdout, "hi");
        assert_eq!(outcome.stderr, "");
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_non_zero_exit_synthesizes_message() {
        let outcome = aggregate(finished(Some(2), "", ""), true);

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, 2);
        assert_eq!(outcome.error.as_deref(), Some("Process exited with code 2"));
        assert_eq!(outcome.stderr, "Process exited with code 2");
    }

    #[test]
    fn test_non_zero_exit_keeps_program_stderr() {
        let outcome = aggregate(finished(Some(1), "", "main.c:1: error: expected ';'\n"), true);

        assert_eq!(outcome.stderr, "main.c:1: error: expected ';'");
        assert_eq!(outcome.error.as_deref(), Some("Process exited with code 1"));
    }

    #[test]
    fn test_stderr_counts_as_failure_by_default() {
        let outcome = aggregate(finished(Some(0), "ok", "DeprecationWarning"), true);
        assert!(!outcome.success);
        assert!(outcome.error.is_none());

        let outcome = aggregate(finished(Some(0), "ok", "DeprecationWarning"), false);
        assert!(outcome.success);
    }

    #[test]
    fn test_missing_exit_code() {
        let outcome = aggregate(finished(None, "", ""), true);
        assert_eq!(outcome.exit_code, -1);
        assert!(!outcome.success);

        let mut fallback = finished(None, "", "");
        fallback.reported_status = Some(0);
        assert_eq!(aggregate(fallback, true).exit_code, 0);
    }

    #[test]
    fn test_timeout_overrides_output() {
        let mut timed_out = finished(Some(137), "partial", "noise");
        timed_out.error = Some(Error::ExecutionTimeout { timeout_ms: 1000 });
        timed_out.timed_out = true;

        let outcome = aggregate(timed_out, true);

        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, -1);
        assert_eq!(outcome.stdout, "partial");
        assert_eq!(outcome.stderr, "Execution timeout after 1000ms");
        assert!(outcome.error.unwrap().contains("timeout"));
    }

    #[test]
    fn test_supervisory_error_forces_failure() {
        let mut failed = finished(Some(0), "done", "");
        failed.error = Some(Error::Container("Wait failed".to_string()));

        let outcome = aggregate(failed, false);
        assert!(!outcome.success);
        assert_eq!(outcome.stderr, "Container error: Wait failed");
    }
}
