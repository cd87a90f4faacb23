//! Structured observability hooks for the run lifecycle.
//!
//! Emission functions for key lifecycle events: run start, per-probe
//! completion, run finish. Events are emitted at `info!` level inside the
//! run span and respect the `RUST_LOG` filter installed by
//! [`crate::telemetry::init_tracing`].

use tracing::info;

/// Span covering one orchestration pass, tagged with the run id.
///
/// The orchestrator instruments its run future with this span so every
/// lifecycle event below fires inside it.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("stackcheck.run", run_id = %run_id)
}

/// Emit event: orchestration pass started.
pub fn emit_run_started(run_id: &str, checks_dir: &str, probes: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        checks_dir = %checks_dir,
        probes = probes,
    );
}

/// Emit event: one probe finished (or failed to launch).
pub fn emit_probe_completed(run_id: &str, probe: &str, outcome: &str, duration_ms: u64) {
    info!(
        event = "probe.completed",
        run_id = %run_id,
        probe = %probe,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

/// Emit event: run finished with gate verdict.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, total: usize, gate_passed: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total_checks = total,
        gate_passed = gate_passed,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-run-id");
        let _entered = span.enter();
    }
}
