//! Language strategy resolution
//!
//! Maps a language and the materialized file list to the image that runs
//! it, the entry file, and the shell command line executed in the sandbox.

use crate::config::ImageConfig;
use crate::error::{Error, Result};
use crate::sandbox::types::Language;

/// Writable scratch directory inside the sandbox
pub const BUILD_DIR: &str = "/tmp";

/// Everything needed to launch one program, derived deterministically from
/// the request and immutable once computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePlan {
    pub image_name: String,
    pub entry_file: String,
    pub run_command: String,
}

/// Resolve the plan for `language` over workspace-relative `files`
pub fn resolve(language: Language, files: &[String], images: &ImageConfig) -> Result<LanguagePlan> {
    let entry_file = select_entry(language, files)?;
    ensure_shell_safe(&entry_file)?;

    Ok(LanguagePlan {
        image_name: images.for_language(language).to_string(),
        run_command: run_command(language, &entry_file),
        entry_file,
    })
}

/// Pick the entry file: the language's canonical entry name first, then
/// the first file with a matching extension.
pub fn select_entry(language: Language, files: &[String]) -> Result<String> {
    let candidates: Vec<&String> = files
        .iter()
        .filter(|path| language.matches_extension(path))
        .collect();

    let canonical = candidates
        .iter()
        .find(|path| is_canonical_entry(language, path));

    canonical
        .or_else(|| candidates.first())
        .map(|path| path.to_string())
        .ok_or_else(|| {
            Error::EntryFileNotFound(format!(
                "no {} file (expected {}) among {} file(s)",
                language,
                language.extensions().join(" or "),
                files.len()
            ))
        })
}

/// Plain suffix match: `main.py`, `src/main.py` and `domain.py` all count
fn is_canonical_entry(language: Language, path: &str) -> bool {
    match language {
        Language::Python => path.ends_with("main.py"),
        Language::JavaScript => path.ends_with("main.js"),
        Language::C => path.ends_with("main.c"),
        Language::Cpp => path.contains("main."),
        Language::Java => path.ends_with("Main.java"),
    }
}

fn run_command(language: Language, entry: &str) -> String {
    match language {
        Language::Python => format!("python {}", entry),
        Language::JavaScript => format!("node {}", entry),
        Language::C => {
            let binary = binary_path(entry);
            format!("gcc {} -o {} && {}", entry, binary, binary)
        }
        Language::Cpp => {
            let binary = binary_path(entry);
            format!("g++ {} -o {} && {}", entry, binary, binary)
        }
        Language::Java => {
            // class files land relative to the working directory, so run
            // from the entry's own directory (the image points javac's
            // output and the classpath at the writable build dir)
            let (dir, file) = match entry.rsplit_once('/') {
                Some((dir, file)) => (Some(dir), file),
                None => (None, entry),
            };
            let class = strip_extension(file);
            match dir {
                Some(dir) => format!("cd {} && javac {} && java {}", dir, file, class),
                None => format!("javac {} && java {}", file, class),
            }
        }
    }
}

/// The workspace mount is read-only; compiled binaries go to the writable
/// tmpfs, named after the entry file
fn binary_path(entry: &str) -> String {
    let file = entry.rsplit('/').next().unwrap_or(entry);
    format!("{}/{}", BUILD_DIR, strip_extension(file))
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}

/// The entry path is spliced into a shell command line; only allow
/// characters that carry no shell meaning, and no option-like components.
fn ensure_shell_safe(path: &str) -> Result<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/');

    if let Some(bad) = path.chars().find(|c| !allowed(*c)) {
        return Err(Error::InvalidPath(format!(
            "{} contains unsupported character {:?}",
            path, bad
        )));
    }
    if path.split('/').any(|component| component.starts_with('-')) {
        return Err(Error::InvalidPath(format!(
            "{} has a component starting with '-'",
            path
        )));
    }
    Ok(())
}
