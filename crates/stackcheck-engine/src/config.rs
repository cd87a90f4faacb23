//! Orchestrator configuration.
//!
//! Built once at startup from `.env*` files plus the process environment,
//! then passed explicitly into each probe launch. Nothing in the engine
//! reads ambient environment after this point.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the domain the deployment is published under.
pub const PUBLISH_DOMAIN_VAR: &str = "PUBLISH_DOMAIN";

/// Environment variable pointing probes at the shared helper toolkit.
pub const CHECK_TOOLS_VAR: &str = "CHECK_TOOLS";

/// Default publish domain for local deployments.
pub const DEFAULT_PUBLISH_DOMAIN: &str = "dev.localhost";

/// Default toolkit location relative to the workspace root.
pub const DEFAULT_CHECK_TOOLS: &str = "tests/tools";

/// Resolved launch environment for probes.
///
/// Precedence, lowest to highest: built-in defaults, `.env*` files in
/// lexical order, the process environment. CI systems can therefore
/// override any file-sourced credential by exporting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Domain the stack is reachable under (`PUBLISH_DOMAIN`).
    pub publish_domain: String,

    /// Shared probe toolkit directory (`CHECK_TOOLS`).
    pub check_tools: PathBuf,

    /// Credential and service variables sourced from `.env*` files
    /// (`REDIS_PASSWORD`, `QDRANT_API_KEY`, `MEMGRAPH_USER`, ...).
    pub vars: BTreeMap<String, String>,
}

impl EnvConfig {
    /// Load configuration for a workspace root.
    ///
    /// Reads every `.env*` file directly inside `root` (sorted by name so
    /// `.env` loads before `.env.local`), then overlays the process
    /// environment for the well-known keys. Unreadable or malformed env
    /// files are logged and skipped; a missing `.env` is not an error.
    pub fn load(root: &Path) -> Self {
        let mut vars = BTreeMap::new();

        for path in env_files(root) {
            match dotenvy::from_path_iter(&path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                vars.insert(key, value);
                            }
                            Err(e) => {
                                warn!(file = %path.display(), error = %e, "skipping malformed env entry");
                            }
                        }
                    }
                    debug!(file = %path.display(), "loaded env file");
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to read env file");
                }
            }
        }

        let publish_domain = std::env::var(PUBLISH_DOMAIN_VAR)
            .ok()
            .or_else(|| vars.get(PUBLISH_DOMAIN_VAR).cloned())
            .unwrap_or_else(|| DEFAULT_PUBLISH_DOMAIN.to_string());

        let check_tools = std::env::var(CHECK_TOOLS_VAR)
            .ok()
            .or_else(|| vars.get(CHECK_TOOLS_VAR).cloned())
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join(DEFAULT_CHECK_TOOLS));

        // The resolved values win over whatever the files said.
        vars.remove(PUBLISH_DOMAIN_VAR);
        vars.remove(CHECK_TOOLS_VAR);

        Self {
            publish_domain,
            check_tools,
            vars,
        }
    }

    /// Override the publish domain (CLI flag beats everything else).
    pub fn with_publish_domain(mut self, domain: impl Into<String>) -> Self {
        self.publish_domain = domain.into();
        self
    }

    /// Override the toolkit directory.
    pub fn with_check_tools(mut self, dir: impl Into<PathBuf>) -> Self {
        self.check_tools = dir.into();
        self
    }

    /// The full set of variables injected into each probe launch, on top of
    /// the inherited process environment.
    pub fn probe_env(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.push((
            PUBLISH_DOMAIN_VAR.to_string(),
            self.publish_domain.clone(),
        ));
        env.push((
            CHECK_TOOLS_VAR.to_string(),
            self.check_tools.to_string_lossy().into_owned(),
        ));
        env
    }
}

/// `.env*` files directly inside `root`, sorted by filename.
fn env_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(".env") && entry.path().is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    files
}
