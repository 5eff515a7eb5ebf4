//! Scripted container runtime for tests

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sandbox::runtime::{
    ContainerRuntime, ContainerSpec, ExitWatch, LogChunk, LogStream,
};

/// How every container created by a [`FakeRuntime`] behaves
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub exit_code: i64,
    pub chunks: Vec<LogChunk>,
    pub run_for: Duration,
    pub fail_create: bool,
    pub fail_start: bool,
    pub fail_kill: bool,
    pub fail_wait: bool,
    /// Simulate a container already auto-removed at inspect time
    pub inspect_missing: bool,
}

impl Script {
    /// A program that exits the instant it starts
    fn exits_on_start(&self) -> bool {
        self.run_for.is_zero() && !self.fail_wait
    }
}

#[derive(Default)]
struct Calls {
    specs: Vec<ContainerSpec>,
    created: Vec<String>,
    started: Vec<String>,
    killed: HashSet<String>,
    /// Containers whose exit has been observed
    watched: HashSet<String>,
    /// Containers auto-removed after exiting
    gone: HashSet<String>,
    kill_attempts: usize,
    removed: Vec<String>,
}

pub struct FakeRuntime {
    script: Script,
    next_id: AtomicUsize,
    calls: Arc<Mutex<Calls>>,
}

impl FakeRuntime {
    pub fn new(script: Script) -> Self {
        FakeRuntime {
            script,
            next_id: AtomicUsize::new(0),
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.calls.lock().unwrap().specs.clone()
    }

    pub fn created_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().created.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.calls.lock().unwrap().started.clone()
    }

    pub fn kill_attempts(&self) -> usize {
        self.calls.lock().unwrap().kill_attempts
    }

    pub fn removed(&self) -> Vec<String> {
        self.calls.lock().unwrap().removed.clone()
    }

    /// Whether the container was auto-removed on exit
    pub fn is_gone(&self, id: &str) -> bool {
        self.calls.lock().unwrap().gone.contains(id)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        if self.script.fail_create {
            return Err(Error::Container(format!("No such image: {}", spec.image)));
        }
        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut calls = self.calls.lock().unwrap();
        calls.specs.push(spec.clone());
        calls.created.push(id.clone());
        Ok(id)
    }

    async fn attach(&self, _id: &str) -> Result<LogStream> {
        let chunks = self.script.chunks.clone();
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    async fn start(&self, id: &str) -> Result<()> {
        if self.script.fail_start {
            return Err(Error::Container("resource limits rejected".to_string()));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.started.push(id.to_string());
        // auto-removal: an instant exit leaves nothing to wait on, unless a
        // wait was already registered
        if self.script.exits_on_start() && !calls.watched.contains(id) {
            calls.gone.insert(id.to_string());
        }
        Ok(())
    }

    async fn watch_exit(&self, id: &str) -> Result<ExitWatch> {
        {
            let mut calls = self.calls.lock().unwrap();
            if calls.gone.contains(id) {
                return Err(Error::Container(format!(
                    "Wait failed: No such container: {}",
                    id
                )));
            }
            calls.watched.insert(id.to_string());
        }

        let script = self.script.clone();
        let calls = self.calls.clone();
        let id = id.to_string();
        Ok(async move {
            tokio::time::sleep(script.run_for).await;
            if script.fail_wait {
                return Err(Error::Container("Wait failed: connection reset".to_string()));
            }
            calls.lock().unwrap().gone.insert(id);
            Ok(script.exit_code)
        }
        .boxed())
    }

    async fn kill(&self, id: &str) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.kill_attempts += 1;
        if self.script.fail_kill {
            return Err(Error::Container(format!("container {} is not running", id)));
        }
        calls.killed.insert(id.to_string());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.calls.lock().unwrap().removed.push(id.to_string());
        Ok(())
    }

    async fn inspect_exit_code(&self, id: &str) -> Result<Option<i64>> {
        if self.script.inspect_missing {
            return Ok(None);
        }
        let calls = self.calls.lock().unwrap();
        if calls.killed.contains(id) {
            return Ok(Some(137));
        }
        if calls.gone.contains(id) && !calls.watched.contains(id) {
            return Ok(None);
        }
        Ok(Some(self.script.exit_code))
    }
}
