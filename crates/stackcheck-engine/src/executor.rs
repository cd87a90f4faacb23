//! Orchestration: fan probes out over a bounded worker pool and fold their
//! output into one deterministic report.
//!
//! Probes are independent by contract, so completion order carries no
//! meaning; reports are assembled in discovery order regardless of which
//! probe finished first. Every per-probe failure mode (spawn error,
//! timeout, non-zero exit) is converted into data here; nothing an
//! individual probe does can abort the run.

use crate::config::EnvConfig;
use crate::discovery::{discover, DiscoveryError, ProbeFilter};
use crate::obs;
use crate::probe::{LaunchError, Malformed, Probe, RunContext};
use crate::script::{kill_process_group, ScriptProbe};
use crate::spec::RunSpec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use stackcheck_domain::{Category, CheckResult, CheckStatus, RunSummary};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{warn, Instrument};
use uuid::Uuid;

/// Tunables for one orchestration pass.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Probes in flight at once. Modest by default so simultaneous
    /// `docker exec`/`curl` calls do not overwhelm the daemon.
    pub pool_size: usize,

    /// Per-probe wall-clock budget in seconds.
    pub timeout_secs: u64,

    /// Category/service filter applied after discovery.
    pub filter: ProbeFilter,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pool_size: 6,
            timeout_secs: 30,
            filter: ProbeFilter::default(),
        }
    }
}

/// How a probe's execution ended, independent of what it reported.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The probe ran to completion (its verdicts stand, even BROKEN).
    Completed { exit_code: i32 },

    /// Forcibly terminated after the timeout; one BROKEN result was
    /// synthesized in its place.
    TimedOut { after_secs: u64 },

    /// Never ran: interpreter missing, permission denied, missing execute
    /// bit. One BROKEN result cites the reason.
    LaunchFailed { reason: String },
}

impl ProbeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Completed { .. } => "completed",
            ProbeOutcome::TimedOut { .. } => "timed_out",
            ProbeOutcome::LaunchFailed { .. } => "launch_failed",
        }
    }
}

/// One probe's contribution to the run.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub name: String,
    pub category: Category,
    pub path: PathBuf,
    pub outcome: ProbeOutcome,
    pub results: Vec<CheckResult>,
    pub malformed: Vec<Malformed>,
    pub noise: Vec<String>,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Re-export under the executor's vocabulary.
pub use crate::probe::Malformed as MalformedLine;

/// Aggregate of one orchestration pass. Discarded after rendering; runs
/// are stateless.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub spec: RunSpec,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub probes: Vec<ProbeReport>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Process exit code for CI: 0 iff no attention-needed results and no
    /// malformed output.
    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }
}

/// The only conditions that abort a run before aggregation.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("no probes found in {0}")]
    NoProbes(PathBuf),

    #[error("no probes match filter (category: {category:?}, service: {service:?})")]
    NoMatch {
        category: Option<String>,
        service: Option<String>,
    },

    #[error("probe task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle for orchestrator-level cancellation (SIGINT). Terminates the
/// process groups of all in-flight probes.
#[derive(Clone)]
pub struct Canceller {
    live_groups: Arc<Mutex<HashSet<i32>>>,
}

impl Canceller {
    /// Forcibly kill every in-flight probe and its descendants.
    pub fn kill_inflight(&self) {
        let groups: Vec<i32> = self
            .live_groups
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .copied()
            .collect();
        for pgid in groups {
            warn!(pgid, "killing in-flight probe group");
            kill_process_group(pgid);
        }
    }
}

/// Discovery plus bounded-parallel execution plus aggregation, one shot
/// per invocation.
pub struct Orchestrator {
    config: EnvConfig,
    options: RunOptions,
    live_groups: Arc<Mutex<HashSet<i32>>>,
}

impl Orchestrator {
    pub fn new(config: EnvConfig, options: RunOptions) -> Self {
        Self {
            config,
            options,
            live_groups: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Cancellation handle, safe to use from a signal handler task.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            live_groups: Arc::clone(&self.live_groups),
        }
    }

    /// Run every discovered probe under `checks_dir` and aggregate.
    pub async fn run(&self, checks_dir: &Path) -> Result<RunReport, OrchestratorError> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_with_id(checks_dir, run_id).instrument(span).await
    }

    async fn run_with_id(
        &self,
        checks_dir: &Path,
        run_id: String,
    ) -> Result<RunReport, OrchestratorError> {
        let started = Instant::now();
        let started_at = Utc::now();

        let registry = discover(checks_dir)?;
        if registry.probes.is_empty() && registry.not_executable.is_empty() {
            return Err(OrchestratorError::NoProbes(checks_dir.to_path_buf()));
        }

        let selected: Vec<ScriptProbe> = registry
            .probes
            .into_iter()
            .filter(|p| self.options.filter.matches(p))
            .collect();
        let skipped_not_executable: Vec<ScriptProbe> = registry
            .not_executable
            .into_iter()
            .filter(|p| self.options.filter.matches(p))
            .collect();

        if selected.is_empty() && skipped_not_executable.is_empty() {
            return Err(OrchestratorError::NoMatch {
                category: self.options.filter.category.clone(),
                service: self.options.filter.service.clone(),
            });
        }

        let names: Vec<&str> = selected.iter().map(|p| p.name()).collect();
        let spec = RunSpec::new(
            checks_dir.to_path_buf(),
            self.config.publish_domain.clone(),
            &names,
        );

        obs::emit_run_started(&run_id, &checks_dir.display().to_string(), selected.len());

        let ctx = Arc::new(RunContext {
            env: self.config.probe_env(),
            timeout: Duration::from_secs(self.options.timeout_secs),
            live_groups: Arc::clone(&self.live_groups),
        });

        let pool = Arc::new(tokio::sync::Semaphore::new(self.options.pool_size.max(1)));
        let mut handles = Vec::with_capacity(selected.len());

        for probe in selected {
            let ctx = Arc::clone(&ctx);
            let pool = Arc::clone(&pool);

            handles.push(tokio::spawn(async move {
                // Closed only when the orchestrator is dropped mid-run.
                let _permit = pool.acquire_owned().await.ok();
                execute_probe(&probe, &ctx).await
            }));
        }

        // Join in spawn order: the report is deterministic regardless of
        // completion order. Emitting here also keeps the events inside the
        // run span, which spawned tasks would escape.
        let joined = futures::future::join_all(handles).await;
        let mut probes = Vec::with_capacity(joined.len());
        for result in joined {
            let report = result?;
            obs::emit_probe_completed(
                &run_id,
                &report.name,
                report.outcome.label(),
                report.duration_ms,
            );
            probes.push(report);
        }

        // Pattern-matching files without the execute bit become BROKEN
        // meta-results rather than silently vanishing.
        for probe in skipped_not_executable {
            probes.push(not_executable_report(&probe));
        }

        let malformed = probes.iter().map(|r| r.malformed.len()).sum();
        let tagged = probes
            .iter()
            .flat_map(|r| r.results.iter().map(|res| (&r.category, res)));
        let summary = RunSummary::aggregate(tagged, malformed);

        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_run_finished(&run_id, duration_ms, summary.total, summary.gate_passed());

        Ok(RunReport {
            run_id,
            spec,
            started_at,
            duration_ms,
            probes,
            summary,
        })
    }
}

/// Run one probe, converting every failure mode into report data.
async fn execute_probe(probe: &ScriptProbe, ctx: &RunContext) -> ProbeReport {
    let started = Instant::now();

    let (outcome, output) = match probe.run(ctx).await {
        Ok(output) => (
            ProbeOutcome::Completed {
                exit_code: output.exit_code,
            },
            output,
        ),
        Err(LaunchError::Timeout { timeout_secs }) => {
            let mut output = crate::probe::ProbeOutput::default();
            output.results.push(synthesized(
                probe,
                format!("timed out after {timeout_secs}s"),
            ));
            (
                ProbeOutcome::TimedOut {
                    after_secs: timeout_secs,
                },
                output,
            )
        }
        Err(err) => {
            let reason = err.to_string();
            let mut output = crate::probe::ProbeOutput::default();
            output
                .results
                .push(synthesized(probe, format!("launch failed: {reason}")));
            (ProbeOutcome::LaunchFailed { reason }, output)
        }
    };

    ProbeReport {
        name: probe.name().to_string(),
        category: probe.category().clone(),
        path: probe.path().to_path_buf(),
        outcome,
        results: output.results,
        malformed: output.malformed,
        noise: output.noise,
        stderr: output.stderr,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

/// Meta-report for a probe file that is present but not executable.
fn not_executable_report(probe: &ScriptProbe) -> ProbeReport {
    let reason = "missing execute bit".to_string();
    ProbeReport {
        name: probe.name().to_string(),
        category: probe.category().clone(),
        path: probe.path().to_path_buf(),
        outcome: ProbeOutcome::LaunchFailed {
            reason: reason.clone(),
        },
        results: vec![synthesized(probe, format!("launch failed: {reason}"))],
        malformed: Vec::new(),
        noise: Vec::new(),
        stderr: String::new(),
        duration_ms: 0,
    }
}

/// One BROKEN verdict standing in for a probe that never reported.
fn synthesized(probe: &ScriptProbe, message: String) -> CheckResult {
    CheckResult::new(
        CheckStatus::Broken,
        probe.name().to_string(),
        message,
        probe.path().display().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RunOptions::default();
        assert_eq!(options.pool_size, 6);
        assert_eq!(options.timeout_secs, 30);
        assert!(options.filter.is_empty());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ProbeOutcome::Completed { exit_code: 0 }.label(), "completed");
        assert_eq!(ProbeOutcome::TimedOut { after_secs: 2 }.label(), "timed_out");
        assert_eq!(
            ProbeOutcome::LaunchFailed {
                reason: "x".to_string()
            }
            .label(),
            "launch_failed"
        );
    }
}
