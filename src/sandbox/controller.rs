//! Sandbox container lifecycle
//!
//! Creates one confined container per job, streams its output into a
//! [`Demultiplexer`], and hands back a [`SandboxHandle`] for waiting,
//! killing, and inspecting it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::error::{Error, Result};
use crate::sandbox::demux::Demultiplexer;
use crate::sandbox::language::BUILD_DIR;
use crate::sandbox::runtime::{BindMount, ContainerRuntime, ContainerSpec, ExitWatch};

/// Builds and launches confined containers
#[derive(Clone)]
pub struct SandboxController {
    runtime: Arc<dyn ContainerRuntime>,
    profile: SandboxConfig,
}

impl SandboxController {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, profile: SandboxConfig) -> Self {
        SandboxController { runtime, profile }
    }

    /// Describe the container for `command` over the workspace at `workspace`
    pub fn container_spec(
        &self,
        job_id: &str,
        image: &str,
        command: &str,
        workspace: &Path,
    ) -> Result<ContainerSpec> {
        let memory_bytes = self.profile.memory_bytes().ok_or_else(|| {
            Error::Config(format!("Invalid memory limit: {}", self.profile.memory_limit))
        })?;

        let mut labels = HashMap::new();
        labels.insert("runner-service.job".to_string(), job_id.to_string());

        let mut tmpfs = HashMap::new();
        tmpfs.insert(
            BUILD_DIR.to_string(),
            format!("rw,nosuid,size={}", self.profile.tmpfs_size),
        );

        Ok(ContainerSpec {
            name: format!("runner-{}", job_id),
            image: image.to_string(),
            cmd: vec![
                self.profile.shell.clone(),
                "-c".to_string(),
                command.to_string(),
            ],
            working_dir: self.profile.mount_path.clone(),
            mount: BindMount {
                host_path: workspace.to_string_lossy().into_owned(),
                container_path: self.profile.mount_path.clone(),
                read_only: true,
            },
            memory_bytes,
            nano_cpus: self.profile.nano_cpus(),
            pids_limit: self.profile.pids_limit,
            network_disabled: true,
            auto_remove: true,
            drop_capabilities: self.profile.drop_capabilities,
            tmpfs,
            labels,
        })
    }

    /// Create, attach to, and start a container. Any failure here is a
    /// [`Error::SandboxCreation`]; a container that was created but never
    /// started is removed before returning.
    pub async fn launch(
        &self,
        job_id: &str,
        image: &str,
        command: &str,
        workspace: &Path,
    ) -> Result<SandboxHandle> {
        let spec = self.container_spec(job_id, image, command, workspace)?;

        let id = self
            .runtime
            .create(&spec)
            .await
            .map_err(|e| Error::SandboxCreation(format!("create {}: {}", image, e)))?;
        debug!(container = %id, "Created container {}", spec.name);

        match self.attach_and_start(&id).await {
            Ok((output, exit)) => Ok(SandboxHandle {
                id,
                runtime: self.runtime.clone(),
                output,
                exit: Mutex::new(Some(exit)),
            }),
            Err(e) => {
                // auto-remove only fires for containers that ran
                if let Err(remove_err) = self.runtime.remove(&id).await {
                    warn!(container = %id, "Failed to remove unstarted container: {}", remove_err);
                }
                Err(Error::SandboxCreation(format!("start {}: {}", image, e)))
            }
        }
    }

    async fn attach_and_start(
        &self,
        id: &str,
    ) -> Result<(Arc<Mutex<Demultiplexer>>, ExitWatch)> {
        // attach before start so early output isn't lost
        let mut logs = self.runtime.attach(id).await?;
        let output = Arc::new(Mutex::new(Demultiplexer::new()));

        let sink = output.clone();
        let container = id.to_string();
        tokio::spawn(async move {
            while let Some(chunk) = logs.next().await {
                match chunk {
                    Ok(chunk) => lock(&sink).push(chunk),
                    Err(e) => {
                        debug!(container = %container, "Log stream error: {}", e);
                        break;
                    }
                }
            }
            debug!(container = %container, "Log stream closed");
        });

        // armed before start: an auto-removed container that exits quickly
        // is gone by the time a later wait reaches the runtime
        let exit = self.runtime.watch_exit(id).await?;
        self.runtime.start(id).await?;
        Ok((output, exit))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // guarded values are plain buffers and slots; a poisoned lock still has
    // consistent contents
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One running sandbox, exclusively owned by a single job
pub struct SandboxHandle {
    id: String,
    runtime: Arc<dyn ContainerRuntime>,
    output: Arc<Mutex<Demultiplexer>>,
    exit: Mutex<Option<ExitWatch>>,
}

impl SandboxHandle {
    /// Container id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolve once the container stops, with its reported status code.
    /// The exit can be awaited once; later calls fail.
    pub async fn wait(&self) -> Result<i64> {
        let exit = lock(&self.exit).take();
        match exit {
            Some(exit) => exit.await,
            None => Err(Error::Container(format!(
                "Exit of {} was already awaited",
                self.id
            ))),
        }
    }

    /// Best-effort kill. The container may already have exited (and been
    /// auto-removed), so the error is logged and discarded.
    pub async fn kill(&self) {
        if let Err(e) = self.runtime.kill(&self.id).await {
            debug!(container = %self.id, "Kill ignored: {}", e);
        }
    }

    /// Final exit code, `None` if it can't be read
    pub async fn inspect_exit_code(&self) -> Option<i64> {
        match self.runtime.inspect_exit_code(&self.id).await {
            Ok(code) => code,
            Err(e) => {
                debug!(container = %self.id, "Inspect failed: {}", e);
                None
            }
        }
    }

    /// Snapshot of captured (stdout, stderr)
    pub fn output(&self) -> (String, String) {
        let output = lock(&self.output);
        (output.stdout(), output.stderr())
    }

    /// Make sure the container is gone. Normally auto-removal already took
    /// care of it, so both steps are best-effort.
    pub async fn teardown(self) {
        self.kill().await;
        if let Err(e) = self.runtime.remove(&self.id).await {
            debug!(container = %self.id, "Remove ignored: {}", e);
        }
    }
}
