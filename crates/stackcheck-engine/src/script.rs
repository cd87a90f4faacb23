//! Shell-script probe adapter.
//!
//! Wraps one executable check script behind the [`Probe`] trait: spawns it
//! through its runtime interpreter in its own process group, enforces the
//! per-probe timeout, and converts the exit-code contract into data. A
//! script exiting non-zero gets a synthesized BROKEN verdict rather than
//! trusting every script to honor the exit-0 convention.

use crate::probe::{LaunchError, Malformed, Probe, ProbeOutput, RunContext, Runtime};
use async_trait::async_trait;
use stackcheck_domain::{parse_line, record::looks_like_result_line, Category, CheckResult, CheckStatus, ParseError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A probe backed by an executable script on disk.
#[derive(Debug, Clone)]
pub struct ScriptProbe {
    /// File stem, e.g. `security-redis-auth`.
    name: String,

    /// First hyphen-delimited filename segment.
    category: Category,

    /// Second segment when the filename has three or more, e.g. `redis`.
    service: Option<String>,

    runtime: Runtime,
    path: PathBuf,
}

impl ScriptProbe {
    pub fn new(
        path: PathBuf,
        name: String,
        category: Category,
        service: Option<String>,
        runtime: Runtime,
    ) -> Self {
        Self {
            name,
            category,
            service,
            runtime,
            path,
        }
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }
}

#[async_trait]
impl Probe for ScriptProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &Category {
        &self.category
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn run(&self, ctx: &RunContext) -> Result<ProbeOutput, LaunchError> {
        let interpreter = self.runtime.interpreter();

        let mut command = Command::new(interpreter);
        command
            .args(self.runtime.interpreter_args())
            .arg(&self.path)
            .envs(ctx.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Each probe leads its own process group so a timeout kill reaches
        // grandchildren (a curl spawned by the script, docker exec, ...).
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            interpreter: interpreter.to_string(),
            source,
        })?;

        let pgid = child.id().map(|pid| pid as i32);
        if let Some(pgid) = pgid {
            ctx.live_groups
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(pgid);
        }

        let waited = tokio::time::timeout(ctx.timeout, child.wait_with_output()).await;

        if let Some(pgid) = pgid {
            ctx.live_groups
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&pgid);
        }

        let output = match waited {
            Ok(result) => result?,
            Err(_) => {
                if let Some(pgid) = pgid {
                    kill_process_group(pgid);
                }
                return Err(LaunchError::Timeout {
                    timeout_secs: ctx.timeout.as_secs(),
                });
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let mut parsed = parse_stdout(&output.stdout);
        parsed.exit_code = exit_code;
        parsed.stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if exit_code != 0 {
            // The probe itself malfunctioned; its verdicts (if any) stand,
            // plus one synthesized result so the malfunction is visible.
            debug!(probe = %self.name, exit_code, "probe exited non-zero");
            parsed.results.push(CheckResult::new(
                CheckStatus::Broken,
                self.name.clone(),
                format!("probe exited with code {exit_code}"),
                self.path.display().to_string(),
            ));
        }

        Ok(parsed)
    }
}

/// Split captured stdout into parsed results, malformed attempts, and noise.
fn parse_stdout(stdout: &[u8]) -> ProbeOutput {
    let mut out = ProbeOutput::default();

    for line in stdout.split(|&b| b == b'\n') {
        match parse_line(line) {
            Ok(result) => out.results.push(result),
            Err(ParseError::Empty) => {}
            Err(error) => {
                let text = String::from_utf8_lossy(line).into_owned();
                if looks_like_result_line(&text) {
                    out.malformed.push(Malformed {
                        line: text,
                        error: Some(error),
                    });
                } else if !text.trim().is_empty() {
                    out.noise.push(text);
                }
            }
        }
    }

    out
}

/// Forcibly terminate a probe's process group.
#[cfg(unix)]
pub fn kill_process_group(pgid: i32) {
    // Negative pid addresses the whole group.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub fn kill_process_group(_pgid: i32) {
    // kill_on_drop covers the direct child on non-unix targets.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
        }
        path
    }

    fn probe_for(path: PathBuf) -> ScriptProbe {
        ScriptProbe::new(
            path,
            "security-redis-auth".to_string(),
            Category::parse("security").unwrap(),
            Some("redis".to_string()),
            Runtime::Posix,
        )
    }

    fn ctx() -> RunContext {
        RunContext::new(
            vec![("PUBLISH_DOMAIN".to_string(), "dev.localhost".to_string())],
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_run_parses_result_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "security-redis-auth.sh",
            "#!/usr/bin/env bash\necho 'PASS|redis_auth|ok|redis-cli ping'\necho 'INFO|redis_auth|version 7|redis-cli info'\n",
        );

        let output = probe_for(path).run(&ctx()).await.expect("run failed");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.results[0].status, CheckStatus::Pass);
        assert_eq!(output.results[1].status, CheckStatus::Info);
        assert!(output.malformed.is_empty());
    }

    #[tokio::test]
    async fn test_env_injected_into_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "environment-host-domain.sh",
            "#!/usr/bin/env bash\necho \"INFO|domain|$PUBLISH_DOMAIN|env\"\n",
        );

        let output = probe_for(path).run(&ctx()).await.expect("run failed");
        assert_eq!(output.results[0].message, "dev.localhost");
    }

    #[tokio::test]
    async fn test_nonzero_exit_synthesizes_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "security-redis-auth.sh",
            "#!/usr/bin/env bash\necho 'PASS|redis_auth|ok|cmd'\nexit 3\n",
        );

        let output = probe_for(path).run(&ctx()).await.expect("run failed");
        assert_eq!(output.exit_code, 3);
        // Emitted verdict kept, plus one synthesized BROKEN for the crash.
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.results[1].status, CheckStatus::Broken);
        assert!(output.results[1].message.contains("code 3"));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "performance-redis-latency.sh",
            "#!/usr/bin/env bash\nsleep 60\n",
        );

        let ctx = RunContext::new(Vec::new(), Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = probe_for(path).run(&ctx).await.expect_err("expected timeout");

        assert!(matches!(err, LaunchError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(ctx.live_groups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_noise_and_malformed_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "storage-qdrant-collections.sh",
            concat!(
                "#!/usr/bin/env bash\n",
                "echo 'Checking qdrant...'\n",
                "echo 'BROKEN|qdrant|too few'\n",
                "echo 'PASS|qdrant_http|reachable|curl localhost:6333'\n",
            ),
        );

        let output = probe_for(path).run(&ctx()).await.expect("run failed");
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.noise, vec!["Checking qdrant...".to_string()]);
        assert_eq!(output.malformed.len(), 1);
        assert_eq!(
            output.malformed[0].error,
            Some(ParseError::MissingFields { found: 3 })
        );
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "wsl2-host-probe.ps1", "Write-Output 'hi'\n");
        let probe = ScriptProbe::new(
            path,
            "wsl2-host-probe".to_string(),
            Category::parse("wsl2").unwrap(),
            Some("host".to_string()),
            Runtime::PowerShell,
        );

        // pwsh is not installed in the test environment.
        let err = probe.run(&ctx()).await.expect_err("expected spawn failure");
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
