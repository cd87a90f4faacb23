//! Error types for domain operations.

use thiserror::Error;

/// Reason a stdout line failed to parse as a check result.
///
/// Parsing is total: any byte input maps to either a `CheckResult` or one
/// of these variants, never a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("empty line")]
    Empty,

    #[error("unrecognized status token: {token:?}")]
    UnknownStatus { token: String },

    #[error("expected 4 pipe-delimited fields, found {found}")]
    MissingFields { found: usize },

    #[error("check name field is empty")]
    EmptyCheckName,
}

/// A filename prefix that does not form a valid category token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid category {0:?}: expected a non-empty lowercase alphanumeric token")]
pub struct InvalidCategory(pub String);
