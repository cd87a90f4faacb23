//! Stackcheck domain model
//!
//! Defines the vocabulary shared by the orchestrator and its probes:
//! - CheckStatus: the six recognized verdict tokens and their display buckets
//! - CheckResult: one parsed `STATUS|CHECK_NAME|MESSAGE|COMMAND` line
//! - Category: validated grouping derived from a probe's filename prefix
//! - RunSummary: per-run aggregation and the CI exit-code policy
//!
//! Everything here is pure and synchronous; process execution lives in
//! `stackcheck-engine`.

pub mod category;
pub mod error;
pub mod record;
pub mod status;
pub mod summary;

pub use category::Category;
pub use error::{InvalidCategory, ParseError};
pub use record::{parse_line, CheckResult};
pub use status::{Bucket, CheckStatus};
pub use summary::{CategoryCounts, RunSummary};

/// Stackcheck domain version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
