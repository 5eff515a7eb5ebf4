//! Per-job workspace materialization
//!
//! Turns the caller's logical file set into a fresh temporary directory
//! tree. Every path is normalized and checked before the directory is
//! created, so a traversal attempt never touches the disk.

use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sandbox::types::SourceFile;

const WORKSPACE_PREFIX: &str = "runner-";

/// Exclusively-owned temporary directory holding one job's files.
///
/// Dropping the workspace removes it as well; [`Workspace::cleanup`]
/// does the same but reports failures through the log.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    files: Vec<String>,
}

impl Workspace {
    /// Materialize `files` under a uniquely-named directory inside `parent`
    /// (the system temp dir when `None`).
    pub async fn materialize(files: &[SourceFile], parent: Option<&Path>) -> Result<Self> {
        let normalized = files
            .iter()
            .map(|file| normalize_path(&file.path))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        open_for_container(dir.path())?;

        let workspace = Workspace {
            dir,
            files: normalized,
        };

        for (relative, file) in workspace.files.iter().zip(files) {
            let target = workspace.dir.path().join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, file.content.as_bytes()).await?;
        }

        debug!(
            "Materialized {} file(s) in {}",
            workspace.files.len(),
            workspace.dir.path().display()
        );

        Ok(workspace)
    }

    /// Root directory on the host
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Normalized relative paths, in input order
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Remove the directory tree. Failures are logged, never returned:
    /// cleanup must not mask the job's real outcome.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }
}

/// Normalize a caller-supplied path to a forward-slash relative path that
/// stays under the workspace root.
pub fn normalize_path(raw: &str) -> Result<String> {
    let unified = raw.replace('\\', "/");

    if unified.starts_with('/') {
        return Err(Error::InvalidPath(format!("{} is absolute", raw)));
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in unified.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::InvalidPath(format!(
                        "{} escapes the workspace root",
                        raw
                    )));
                }
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!("{:?} does not name a file", raw)));
    }

    Ok(parts.join("/"))
}

#[cfg(unix)]
fn open_for_container(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // tempfile creates 0700. Image users other than the owner must reach the
    // files, but other host users shouldn't be able to list a job's sources.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o711))?;
    Ok(())
}

#[cfg(not(unix))]
fn open_for_container(_path: &Path) -> Result<()> {
    Ok(())
}
