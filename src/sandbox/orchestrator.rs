//! Execution orchestration
//!
//! One job walks `Materializing → Resolving → Starting → Running →
//! Finalizing → CleaningUp → Done`. A failure in any early state skips
//! straight to `CleaningUp`; the workspace is always removed and the
//! caller always gets an [`ExecutionOutcome`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{validate_config, RunnerConfig};
use crate::error::{Error, Result};
use crate::sandbox::controller::SandboxController;
use crate::sandbox::docker::DockerRuntime;
use crate::sandbox::language;
use crate::sandbox::outcome::{aggregate, Finished};
use crate::sandbox::runtime::ContainerRuntime;
use crate::sandbox::supervisor::supervise;
use crate::sandbox::types::{ExecutionOutcome, ExecutionRequest, Language, SourceFile};
use crate::sandbox::workspace::Workspace;

/// Lifecycle states of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Materializing,
    Resolving,
    Starting,
    Running,
    Finalizing,
    CleaningUp,
    Done,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Materializing => "materializing",
            JobState::Resolving => "resolving",
            JobState::Starting => "starting",
            JobState::Running => "running",
            JobState::Finalizing => "finalizing",
            JobState::CleaningUp => "cleaning_up",
            JobState::Done => "done",
        };
        f.write_str(name)
    }
}

struct Job {
    id: String,
    language: Language,
    timeout: Duration,
    started: Instant,
}

impl Job {
    fn enter(&self, state: JobState) {
        debug!(job = %self.id, language = %self.language, state = %state, "Job state");
    }
}

/// Sandboxed execution engine.
///
/// Holds no per-job state; one runner serves any number of concurrent
/// `execute` calls.
pub struct Runner {
    runtime: Arc<dyn ContainerRuntime>,
    controller: SandboxController,
    config: RunnerConfig,
}

impl Runner {
    /// Create a runner over an injected container runtime
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: RunnerConfig) -> Result<Self> {
        let validation = validate_config(&config);
        if !validation.valid {
            return Err(Error::Config(validation.error_summary()));
        }
        for issue in &validation.warnings {
            warn!("Config warning at {}: {}", issue.path, issue.message);
        }

        let controller = SandboxController::new(runtime.clone(), config.sandbox.clone());
        Ok(Runner {
            runtime,
            controller,
            config,
        })
    }

    /// Create a runner backed by the Docker daemon named in the config
    pub fn connect(config: RunnerConfig) -> Result<Self> {
        let runtime = DockerRuntime::connect(&config.docker)?;
        Self::new(Arc::new(runtime), config)
    }

    /// Check the container runtime is reachable
    pub async fn ping(&self) -> Result<()> {
        self.runtime.ping().await
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute with a free-form language identifier. Unknown languages are
    /// reported as a failed outcome before any workspace is created.
    pub async fn execute_raw(
        &self,
        language: &str,
        files: Vec<SourceFile>,
        timeout_ms: Option<u64>,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let timeout_ms = timeout_ms.unwrap_or(self.config.execution.default_timeout_ms);
        match ExecutionRequest::parse(language, files, Some(timeout_ms)) {
            Ok(request) => self.execute(request).await,
            Err(e) => {
                warn!("Rejected job: {}", e);
                ExecutionOutcome::setup_failure(&e, started.elapsed())
            }
        }
    }

    /// Run one job to completion
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let job = Job {
            id: uuid::Uuid::new_v4().simple().to_string(),
            language: request.language,
            timeout: self.effective_timeout(request.timeout_ms),
            started: Instant::now(),
        };

        job.enter(JobState::Materializing);
        let root = self.config.execution.workspace_root.as_deref();
        let outcome = match Workspace::materialize(&request.files, root).await {
            Ok(workspace) => {
                let outcome = self.run(&job, &workspace).await;
                job.enter(JobState::CleaningUp);
                cleanup(workspace).await;
                outcome
            }
            Err(e) => {
                job.enter(JobState::CleaningUp);
                self.setup_failure(&job, e)
            }
        };
        job.enter(JobState::Done);

        info!(
            job = %job.id,
            language = %job.language,
            success = outcome.success,
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            "Job finished in {:?}",
            outcome.duration
        );
        outcome
    }

    async fn run(&self, job: &Job, workspace: &Workspace) -> ExecutionOutcome {
        job.enter(JobState::Resolving);
        let plan = match language::resolve(job.language, workspace.files(), &self.config.images) {
            Ok(plan) => plan,
            Err(e) => return self.setup_failure(job, e),
        };
        debug!(
            job = %job.id,
            entry = %plan.entry_file,
            command = %plan.run_command,
            "Resolved plan"
        );

        job.enter(JobState::Starting);
        let handle = match self
            .controller
            .launch(&job.id, &plan.image_name, &plan.run_command, workspace.path())
            .await
        {
            Ok(handle) => handle,
            Err(e) => return self.setup_failure(job, e),
        };

        job.enter(JobState::Running);
        let completion = supervise(&handle, job.timeout, self.config.execution.grace_period).await;

        job.enter(JobState::Finalizing);
        let timed_out = completion.timed_out();
        let inspected_exit_code = if timed_out {
            None
        } else {
            handle.inspect_exit_code().await
        };
        let (stdout, stderr) = handle.output();
        handle.teardown().await;

        aggregate(
            Finished {
                inspected_exit_code,
                reported_status: completion.status_code(),
                stdout,
                stderr,
                error: completion.into_error(),
                timed_out,
                duration: job.started.elapsed(),
            },
            self.config.execution.stderr_is_failure,
        )
    }

    fn setup_failure(&self, job: &Job, error: Error) -> ExecutionOutcome {
        warn!(job = %job.id, language = %job.language, "Job setup failed: {}", error);
        ExecutionOutcome::setup_failure(&error, job.started.elapsed())
    }

    fn effective_timeout(&self, requested_ms: u64) -> Duration {
        let execution = &self.config.execution;
        let ms = match requested_ms {
            0 => execution.default_timeout_ms,
            ms if ms > execution.max_timeout_ms => {
                warn!(
                    "Requested timeout {}ms clamped to {}ms",
                    ms, execution.max_timeout_ms
                );
                execution.max_timeout_ms
            }
            ms => ms,
        };
        Duration::from_millis(ms)
    }
}

async fn cleanup(workspace: Workspace) {
    if let Err(e) = tokio::task::spawn_blocking(move || workspace.cleanup()).await {
        warn!("Workspace cleanup task failed: {}", e);
    }
}
