//! Docker-backed container runtime
//!
//! Thin mapping of [`ContainerRuntime`] onto the Docker Engine API.

use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, Config, CreateContainerOptions, InspectContainerOptions,
    KillContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::service::HostConfig;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::{FutureExt, StreamExt};
use tracing::{debug, info};

use crate::config::DockerConfig;
use crate::error::{Error, Result};
use crate::sandbox::runtime::{
    ContainerRuntime, ContainerSpec, ExitWatch, LogChunk, LogStream,
};

/// Docker runtime client
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the daemon named in the config, or local defaults
    pub fn connect(config: &DockerConfig) -> Result<Self> {
        let docker = match config.host.as_deref() {
            Some(host) if host.starts_with("unix://") => {
                Docker::connect_with_unix(host, config.timeout_secs, API_DEFAULT_VERSION)
            }
            Some(host) => Docker::connect_with_http(host, config.timeout_secs, API_DEFAULT_VERSION),
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| Error::Container(format!("Failed to connect to Docker: {}", e)))?;

        info!(
            "Container runtime client ready ({})",
            config.host.as_deref().unwrap_or("local defaults")
        );

        Ok(DockerRuntime { docker })
    }

    /// Wrap an existing client
    pub fn from_client(docker: Docker) -> Self {
        DockerRuntime { docker }
    }
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let (cap_drop, security_opt) = if spec.drop_capabilities {
        (
            Some(vec!["ALL".to_string()]),
            Some(vec!["no-new-privileges".to_string()]),
        )
    } else {
        (None, None)
    };

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.cmd.clone()),
        working_dir: Some(spec.working_dir.clone()),
        labels: Some(spec.labels.clone()),
        network_disabled: Some(spec.network_disabled),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        host_config: Some(HostConfig {
            memory: Some(spec.memory_bytes),
            // equal to memory: no swap on top of the ceiling
            memory_swap: Some(spec.memory_bytes),
            nano_cpus: Some(spec.nano_cpus),
            pids_limit: Some(spec.pids_limit),
            network_mode: spec.network_disabled.then(|| "none".to_string()),
            binds: Some(vec![spec.mount.to_bind_string()]),
            tmpfs: (!spec.tmpfs.is_empty()).then(|| spec.tmpfs.clone()),
            auto_remove: Some(spec.auto_remove),
            cap_drop,
            security_opt,
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl From<LogOutput> for LogChunk {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::StdErr { message } => LogChunk::Stderr(message.to_vec()),
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                LogChunk::Stdout(message.to_vec())
            }
            // nothing is ever written to stdin; keep the bytes on stdout like
            // any other untagged output
            LogOutput::StdIn { message } => LogChunk::Stdout(message.to_vec()),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| Error::Container(format!("Docker ping failed: {}", e)))?;
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await?;

        for warning in &response.warnings {
            debug!("Docker warning for {}: {}", spec.name, warning);
        }

        Ok(response.id)
    }

    async fn attach(&self, id: &str) -> Result<LogStream> {
        let options = AttachContainerOptions::<String> {
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(true),
            ..Default::default()
        };

        let attached = self.docker.attach_container(id, Some(options)).await?;

        Ok(attached
            .output
            .map(|item| item.map(LogChunk::from).map_err(Error::from))
            .boxed())
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn watch_exit(&self, id: &str) -> Result<ExitWatch> {
        let docker = self.docker.clone();
        let container = id.to_string();

        let pending = tokio::spawn(async move {
            let options = WaitContainerOptions {
                condition: "next-exit",
            };
            let mut stream = docker.wait_container(&container, Some(options));

            match stream.next().await {
                Some(Ok(response)) => Ok(response.status_code),
                // bollard reports a non-zero exit as an error carrying the code
                Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => {
                    Ok(code)
                }
                Some(Err(e)) => Err(Error::Container(format!("Wait failed: {}", e))),
                None => Err(Error::Container("Container wait stream ended".to_string())),
            }
        });
        // give the wait request a chance to reach the daemon before the
        // caller issues start
        tokio::task::yield_now().await;

        Ok(async move {
            pending
                .await
                .map_err(|e| Error::Container(format!("Wait task failed: {}", e)))?
        }
        .boxed())
    }

    async fn kill(&self, id: &str) -> Result<()> {
        self.docker
            .kill_container(id, None::<KillContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker.remove_container(id, Some(options)).await?;
        Ok(())
    }

    async fn inspect_exit_code(&self, id: &str) -> Result<Option<i64>> {
        match self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => Ok(details.state.and_then(|state| state.exit_code)),
            // already auto-removed
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::runtime::BindMount;
    use std::collections::HashMap;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "runner-test".to_string(),
            image: "runner-python:latest".to_string(),
            cmd: vec!["sh".to_string(), "-c".to_string(), "python main.py".to_string()],
            working_dir: "/workspace".to_string(),
            mount: BindMount {
                host_path: "/tmp/runner-x".to_string(),
                container_path: "/workspace".to_string(),
                read_only: true,
            },
            memory_bytes: 256 * 1024 * 1024,
            nano_cpus: 500_000_000,
            pids_limit: 128,
            network_disabled: true,
            auto_remove: true,
            drop_capabilities: true,
            tmpfs: HashMap::from([("/tmp".to_string(), "rw,size=64m".to_string())]),
            labels: HashMap::new(),
        }
    }

    #[test]
    fn test_confinement_profile_mapping() {
        let config = container_config(&spec());
        let host = config.host_config.unwrap();

        assert_eq!(config.network_disabled, Some(true));
        assert_eq!(config.working_dir.as_deref(), Some("/workspace"));
        assert_eq!(host.memory, Some(256 * 1024 * 1024));
        assert_eq!(host.memory_swap, host.memory);
        assert_eq!(host.nano_cpus, Some(500_000_000));
        assert_eq!(host.network_mode.as_deref(), Some("none"));
        assert_eq!(host.auto_remove, Some(true));
        assert_eq!(host.binds, Some(vec!["/tmp/runner-x:/workspace:ro".to_string()]));
        assert_eq!(host.cap_drop, Some(vec!["ALL".to_string()]));
    }

    #[test]
    fn test_capabilities_kept_when_disabled() {
        let mut spec = spec();
        spec.drop_capabilities = false;
        spec.tmpfs.clear();

        let host = container_config(&spec).host_config.unwrap();
        assert!(host.cap_drop.is_none());
        assert!(host.security_opt.is_none());
        assert!(host.tmpfs.is_none());
    }
}
