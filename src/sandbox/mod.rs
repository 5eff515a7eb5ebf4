//! Sandbox module - one-shot execution of untrusted programs in confined
//! containers
//!
//! - workspace: materializes the caller's files into a temporary directory
//! - language: picks image, entry file, and run command per language
//! - controller: container lifecycle under a fixed confinement profile
//! - demux: splits the combined output stream into stdout/stderr
//! - supervisor: deadline enforcement
//! - outcome: result aggregation
//! - orchestrator: composes the above into one job

mod controller;
mod demux;
mod docker;
mod language;
mod orchestrator;
mod outcome;
mod runtime;
mod supervisor;
mod types;
mod workspace;

#[cfg(test)]
mod fake;

pub use controller::{SandboxController, SandboxHandle};
pub use demux::Demultiplexer;
pub use docker::DockerRuntime;
pub use language::{resolve, select_entry, LanguagePlan};
pub use orchestrator::{JobState, Runner};
pub use outcome::{aggregate, Finished};
pub use runtime::{BindMount, ContainerRuntime, ContainerSpec, ExitWatch, LogChunk, LogStream};
pub use supervisor::{supervise, Completion};
pub use types::{ExecutionOutcome, ExecutionRequest, Language, SourceFile};
pub use workspace::{normalize_path, Workspace};
