//! Container runtime capability
//!
//! The engine never talks to a daemon directly; it is handed a
//! [`ContainerRuntime`] at construction. Production uses
//! [`DockerRuntime`](super::docker::DockerRuntime), tests use a scripted
//! double.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::collections::HashMap;

use crate::error::Result;

/// One inbound piece of container output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChunk {
    /// A raw multiplexed frame: 8-byte header (stream tag first) + payload
    Frame(Vec<u8>),
    /// Payload already attributed to stdout by the runtime client
    Stdout(Vec<u8>),
    /// Payload already attributed to stderr by the runtime client
    Stderr(Vec<u8>),
}

/// Stream of container output, ending when the container's output closes
pub type LogStream = BoxStream<'static, Result<LogChunk>>;

/// Pending exit status of one container
pub type ExitWatch = BoxFuture<'static, Result<i64>>;

/// Host directory bound into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub host_path: String,
    pub container_path: String,
    pub read_only: bool,
}

impl BindMount {
    /// `host:container[:ro]` form understood by the Docker API
    pub fn to_bind_string(&self) -> String {
        let mut bind = format!("{}:{}", self.host_path, self.container_path);
        if self.read_only {
            bind.push_str(":ro");
        }
        bind
    }
}

/// Full description of a container to create: the command plus its
/// confinement profile
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    pub working_dir: String,
    pub mount: BindMount,
    pub memory_bytes: i64,
    pub nano_cpus: i64,
    pub pids_limit: i64,
    pub network_disabled: bool,
    pub auto_remove: bool,
    pub drop_capabilities: bool,
    pub tmpfs: HashMap<String, String>,
    pub labels: HashMap<String, String>,
}

/// Operations the engine needs from a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check the runtime is reachable
    async fn ping(&self) -> Result<()>;

    /// Create (but don't start) a container; returns its id
    async fn create(&self, spec: &ContainerSpec) -> Result<String>;

    /// Attach to the combined stdout/stderr stream
    async fn attach(&self, id: &str) -> Result<LogStream>;

    /// Start a created container
    async fn start(&self, id: &str) -> Result<()>;

    /// Register for the container's next exit. Must be called before
    /// `start`: an auto-removed container that exits first can no longer be
    /// waited on. The returned future resolves with the reported status code.
    async fn watch_exit(&self, id: &str) -> Result<ExitWatch>;

    /// Force-terminate a running container
    async fn kill(&self, id: &str) -> Result<()>;

    /// Force-remove a container
    async fn remove(&self, id: &str) -> Result<()>;

    /// Final exit code, `None` when the runtime no longer knows it
    async fn inspect_exit_code(&self, id: &str) -> Result<Option<i64>>;
}
