//! Probe discovery.
//!
//! Scans the checks directory (non-recursive) for files matching the
//! `{category}-{service}-{test}.{ext}` naming convention. Files matching
//! the pattern but missing the execute bit never vanish silently; they are
//! surfaced so the report can flag them.

use crate::probe::{Probe, Runtime};
use crate::script::ScriptProbe;
use stackcheck_domain::Category;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Fatal discovery failures. Anything per-file is collected in the
/// [`Registry`] instead.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("checks directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("failed reading checks directory {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything found in one scan of the checks directory.
#[derive(Debug, Default)]
pub struct Registry {
    /// Runnable probes, sorted by filename (the report's discovery order).
    pub probes: Vec<ScriptProbe>,

    /// Probes matching the naming convention but missing the execute bit.
    /// Surfaced as BROKEN meta-results by the orchestrator.
    pub not_executable: Vec<ScriptProbe>,

    /// Files that do not match the convention (wrong extension, no hyphen,
    /// invalid category token). Listed by `stackcheck list`, otherwise
    /// ignored.
    pub unrecognized: Vec<PathBuf>,
}

/// Filter applied to the registry before execution.
#[derive(Debug, Clone, Default)]
pub struct ProbeFilter {
    pub category: Option<String>,
    pub service: Option<String>,
}

impl ProbeFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.service.is_none()
    }

    pub fn matches(&self, probe: &ScriptProbe) -> bool {
        if let Some(category) = &self.category {
            if probe.category().as_str() != category {
                return false;
            }
        }
        if let Some(service) = &self.service {
            if probe.service() != Some(service.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Scan `dir` for probes.
///
/// Never fails on an individual file: pattern misses and permission
/// problems land in the registry's side lists.
pub fn discover(dir: &Path) -> Result<Registry, DiscoveryError> {
    if !dir.is_dir() {
        return Err(DiscoveryError::MissingDir(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut registry = Registry::default();

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(parsed) = parse_probe_name(&path) else {
            debug!(file = %path.display(), "not a probe, skipping");
            registry.unrecognized.push(path);
            continue;
        };

        let probe = ScriptProbe::new(
            path,
            parsed.name,
            parsed.category,
            parsed.service,
            parsed.runtime,
        );

        if is_executable(probe.path()) {
            registry.probes.push(probe);
        } else {
            registry.not_executable.push(probe);
        }
    }

    // Filename order, so reports are deterministic across runs.
    registry
        .probes
        .sort_by(|a, b| a.path().file_name().cmp(&b.path().file_name()));
    registry
        .not_executable
        .sort_by(|a, b| a.path().file_name().cmp(&b.path().file_name()));
    registry.unrecognized.sort();

    Ok(registry)
}

struct ParsedName {
    name: String,
    category: Category,
    service: Option<String>,
    runtime: Runtime,
}

/// Apply the `{category}-{service}-{test}.{ext}` convention to a path.
fn parse_probe_name(path: &Path) -> Option<ParsedName> {
    let ext = path.extension()?.to_str()?;
    let runtime = Runtime::from_extension(ext)?;

    let stem = path.file_stem()?.to_str()?;
    let segments: Vec<&str> = stem.split('-').collect();
    if segments.len() < 2 {
        return None;
    }

    let category = Category::parse(segments[0]).ok()?;
    let service = if segments.len() >= 3 {
        Some(segments[1].to_string())
    } else {
        None
    };

    Some(ParsedName {
        name: stem.to_string(),
        category,
        service,
        runtime,
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, executable: bool) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/usr/bin/env bash\ntrue\n").expect("write file");
        #[cfg(unix)]
        if executable {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
        }
        let _ = executable;
        path
    }

    #[test]
    fn test_missing_dir_is_fatal() {
        let err = discover(Path::new("/nonexistent/checks")).expect_err("expected error");
        assert!(matches!(err, DiscoveryError::MissingDir(_)));
    }

    #[test]
    fn test_discovery_sorted_and_parsed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "storage-redis-keys.sh", true);
        touch(dir.path(), "security-redis-auth.sh", true);
        touch(dir.path(), "security-caddy-tls.sh", true);

        let registry = discover(dir.path()).expect("discover failed");
        let names: Vec<&str> = registry.probes.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "security-caddy-tls",
                "security-redis-auth",
                "storage-redis-keys"
            ]
        );

        let probe = &registry.probes[1];
        assert_eq!(probe.category().as_str(), "security");
        assert_eq!(probe.service(), Some("redis"));
        assert_eq!(probe.runtime(), Runtime::Posix);
    }

    #[test]
    fn test_two_segment_name_has_no_service() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "environment-versions.sh", true);

        let registry = discover(dir.path()).expect("discover failed");
        assert_eq!(registry.probes.len(), 1);
        assert_eq!(registry.probes[0].service(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "security-redis-auth.sh", false);

        let registry = discover(dir.path()).expect("discover failed");
        assert!(registry.probes.is_empty());
        assert_eq!(registry.not_executable.len(), 1);
    }

    #[test]
    fn test_unrecognized_files_listed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "README.md", true);
        touch(dir.path(), "nohyphen.sh", true);
        touch(dir.path(), "Bad-Category-name.sh", true);

        let registry = discover(dir.path()).expect("discover failed");
        assert!(registry.probes.is_empty());
        assert_eq!(registry.unrecognized.len(), 3);
    }

    #[test]
    fn test_subdirectories_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "security-redis-auth.sh", true);

        let registry = discover(dir.path()).expect("discover failed");
        assert!(registry.probes.is_empty());
    }

    #[test]
    fn test_filter_by_category_and_service() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "security-redis-auth.sh", true);
        touch(dir.path(), "security-qdrant-apikey.sh", true);
        touch(dir.path(), "storage-redis-keys.sh", true);

        let registry = discover(dir.path()).expect("discover failed");

        let filter = ProbeFilter {
            category: Some("security".to_string()),
            service: None,
        };
        assert_eq!(registry.probes.iter().filter(|p| filter.matches(p)).count(), 2);

        let filter = ProbeFilter {
            category: None,
            service: Some("redis".to_string()),
        };
        assert_eq!(registry.probes.iter().filter(|p| filter.matches(p)).count(), 2);

        let filter = ProbeFilter {
            category: Some("storage".to_string()),
            service: Some("redis".to_string()),
        };
        assert_eq!(registry.probes.iter().filter(|p| filter.matches(p)).count(), 1);
    }
}
