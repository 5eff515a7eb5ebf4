//! Deadline enforcement
//!
//! Races a sandbox's natural completion against a wall-clock deadline.

use std::time::Duration;
use tracing::warn;

use crate::error::Error;
use crate::sandbox::controller::SandboxHandle;

/// Which side of the race won
#[derive(Debug)]
pub enum Completion {
    /// The container stopped on its own with this status code
    Exited(i64),
    /// Waiting on the container failed
    Failed(Error),
    /// The deadline fired first and the container was killed
    TimedOut(Error),
}

impl Completion {
    /// Status code reported by the runtime, if the container exited
    pub fn status_code(&self) -> Option<i64> {
        match self {
            Completion::Exited(code) => Some(*code),
            _ => None,
        }
    }

    /// Supervisory error, if any
    pub fn into_error(self) -> Option<Error> {
        match self {
            Completion::Exited(_) => None,
            Completion::Failed(e) | Completion::TimedOut(e) => Some(e),
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Completion::TimedOut(_))
    }
}

/// Wait for `handle` to finish, killing it once `timeout` elapses.
///
/// The losing deadline timer is dropped with the race, so it can't fire
/// after the job is torn down. Either way, `grace` is then slept once so
/// buffered log frames arrive before anything is inspected.
pub async fn supervise(handle: &SandboxHandle, timeout: Duration, grace: Duration) -> Completion {
    let completion = tokio::select! {
        result = handle.wait() => match result {
            Ok(code) => Completion::Exited(code),
            Err(e) => Completion::Failed(e),
        },
        _ = tokio::time::sleep(timeout) => {
            warn!(container = %handle.id(), "Execution timed out after {:?}", timeout);
            handle.kill().await;
            Completion::TimedOut(Error::ExecutionTimeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    };

    tokio::time::sleep(grace).await;
    completion
}
