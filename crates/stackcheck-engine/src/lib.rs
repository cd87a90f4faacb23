//! Stackcheck engine - configuration verification orchestrator
//!
//! Provides the orchestrator that:
//! - Discovers probe scripts by naming convention in a checks directory
//! - Executes them in a bounded worker pool with per-probe timeouts
//! - Parses their pipe-delimited stdout into structured results
//! - Aggregates everything into a deterministic, CI-gateable report

pub mod config;
pub mod discovery;
pub mod executor;
pub mod obs;
pub mod probe;
pub mod report;
pub mod scaffold;
pub mod script;
pub mod spec;
pub mod telemetry;
pub mod toolkit;

// Re-export key types
pub use config::EnvConfig;
pub use discovery::{discover, DiscoveryError, ProbeFilter, Registry};
pub use executor::{
    Canceller, MalformedLine, Orchestrator, OrchestratorError, ProbeOutcome, ProbeReport,
    RunOptions, RunReport,
};
pub use probe::{LaunchError, Probe, ProbeOutput, Runtime};
pub use report::{JsonRenderer, Renderer, TextRenderer};
pub use scaffold::{ScaffoldRequest, Template};
pub use script::ScriptProbe;
pub use spec::RunSpec;
pub use telemetry::init_tracing;
pub use toolkit::ToolkitRef;
