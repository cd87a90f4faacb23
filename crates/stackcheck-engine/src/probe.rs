//! The probe abstraction.
//!
//! Any script that speaks the pipe-delimited protocol is a probe. The
//! orchestrator only depends on this trait; the shell-script adapter in
//! [`crate::script`] is one implementation, leaving room for native probes
//! without touching the execution engine.

use async_trait::async_trait;
use stackcheck_domain::{Category, CheckResult, ParseError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Script runtime, inferred from the file extension at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Runtime {
    /// `.sh`, POSIX shell via bash.
    Posix,

    /// `.ps1`, PowerShell via pwsh.
    PowerShell,

    /// `.cmd` / `.bat`, Windows command interpreter.
    WindowsCmd,
}

impl Runtime {
    /// Map a file extension to a runtime.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "sh" => Some(Runtime::Posix),
            "ps1" => Some(Runtime::PowerShell),
            "cmd" | "bat" => Some(Runtime::WindowsCmd),
            _ => None,
        }
    }

    /// Interpreter binary used to launch scripts of this runtime.
    pub fn interpreter(&self) -> &'static str {
        match self {
            Runtime::Posix => "bash",
            Runtime::PowerShell => "pwsh",
            Runtime::WindowsCmd => "cmd",
        }
    }

    /// Arguments placed before the script path.
    pub fn interpreter_args(&self) -> &'static [&'static str] {
        match self {
            Runtime::Posix | Runtime::PowerShell => &[],
            Runtime::WindowsCmd => &["/C"],
        }
    }
}

/// Shared launch context handed to every probe run.
pub struct RunContext {
    /// Variables injected on top of the inherited process environment.
    pub env: Vec<(String, String)>,

    /// Per-probe wall-clock budget.
    pub timeout: Duration,

    /// Process-group IDs of in-flight children, so orchestrator-level
    /// cancellation can terminate them (and their descendants).
    pub live_groups: Arc<Mutex<HashSet<i32>>>,
}

impl RunContext {
    pub fn new(env: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            env,
            timeout,
            live_groups: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

/// A stdout line that attempted the protocol and failed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Malformed {
    /// The offending line, lossily decoded for display.
    pub line: String,

    /// Why it failed to parse. Serialized as its display string so the
    /// JSON report carries the same reason the text renderer prints.
    #[serde(
        rename = "reason",
        serialize_with = "reason_as_string",
        skip_deserializing
    )]
    pub error: Option<ParseError>,
}

fn reason_as_string<S: serde::Serializer>(
    error: &Option<ParseError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Everything a probe produced in one execution.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutput {
    /// Parsed result lines, in emission order. Includes any verdicts the
    /// adapter synthesized (e.g. for a non-zero exit).
    pub results: Vec<CheckResult>,

    /// Protocol-attempt lines that failed to parse.
    pub malformed: Vec<Malformed>,

    /// Pipe-free stdout chatter, kept for verbose display.
    pub noise: Vec<String>,

    /// Stderr, never parsed, kept for verbose display.
    pub stderr: String,

    /// Child exit code (-1 when killed by signal).
    pub exit_code: i32,
}

/// Failure to run the probe at all, as opposed to a verdict it reported.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("failed to spawn {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("failed waiting for child: {0}")]
    Wait(#[from] std::io::Error),
}

/// An executable verification unit.
///
/// Probes are independent by contract: no probe may depend on another's
/// side effects within the same run, which is what makes the pool safe.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Display name, unique within a checks directory.
    fn name(&self) -> &str;

    /// Grouping used for report sections.
    fn category(&self) -> &Category;

    /// Path of the backing file, for display and reproduction.
    fn path(&self) -> &Path;

    /// Execute once and collect output.
    ///
    /// A `BROKEN`/`FAIL` verdict is a successful run; `Err` is reserved for
    /// the probe itself failing to execute (spawn failure, timeout).
    async fn run(&self, ctx: &RunContext) -> Result<ProbeOutput, LaunchError>;
}
