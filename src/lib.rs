//! # runner-service
//!
//! Executes untrusted, multi-file programs (Python, JavaScript, C, C++,
//! Java) inside short-lived containers with capped memory and CPU, no
//! network, and a read-only view of the job's files, returning captured
//! stdout/stderr and an exit status.
//!
//! ```no_run
//! use runner_service::{Runner, RunnerConfig, SourceFile};
//!
//! # async fn demo() -> runner_service::Result<()> {
//! let runner = Runner::connect(RunnerConfig::from_env()?)?;
//! let outcome = runner
//!     .execute_raw("python", vec![SourceFile::new("main.py", "print('hi')")], None)
//!     .await;
//! assert_eq!(outcome.stdout, "hi");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod sandbox;

pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use sandbox::{ExecutionOutcome, ExecutionRequest, Language, Runner, SourceFile};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
