//! Shared probe toolkit reference.
//!
//! Probes source helper scripts (HTTP status probing, docker-exec
//! wrappers, Redis/Qdrant/Memgraph query helpers, output sanitization)
//! from a common directory exported to them as `CHECK_TOOLS`. The engine
//! never executes the helpers itself; it only resolves and validates the
//! directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Helper scripts every toolkit is expected to ship.
pub const EXPECTED_HELPERS: &[&str] = &["common.sh", "http.sh", "docker.sh"];

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("toolkit directory not found: {0}")]
    MissingDir(PathBuf),
}

/// Resolved location of the shared helper toolkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitRef {
    dir: PathBuf,
}

impl ToolkitRef {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fail if the toolkit directory does not exist. Probes that source
    /// helpers from a missing directory would all come back BROKEN with a
    /// confusing message, so this is checked up front.
    pub fn ensure_exists(&self) -> Result<(), ToolkitError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(ToolkitError::MissingDir(self.dir.clone()))
        }
    }

    /// Helper scripts present in the toolkit, sorted by name.
    pub fn helpers(&self) -> Vec<PathBuf> {
        let mut helpers = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("sh") && path.is_file() {
                    helpers.push(path);
                }
            }
        }
        helpers.sort();
        helpers
    }

    /// Expected helpers that are absent, for `stackcheck list` diagnostics.
    pub fn missing_helpers(&self) -> Vec<&'static str> {
        EXPECTED_HELPERS
            .iter()
            .copied()
            .filter(|name| !self.dir.join(name).is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dir_rejected() {
        let toolkit = ToolkitRef::new("/nonexistent/tools");
        assert!(toolkit.ensure_exists().is_err());
    }

    #[test]
    fn test_helpers_listed_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("http.sh"), "true\n").unwrap();
        std::fs::write(dir.path().join("common.sh"), "true\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "x\n").unwrap();

        let toolkit = ToolkitRef::new(dir.path());
        toolkit.ensure_exists().expect("dir exists");

        let names: Vec<String> = toolkit
            .helpers()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["common.sh", "http.sh"]);
        assert_eq!(toolkit.missing_helpers(), vec!["docker.sh"]);
    }
}
