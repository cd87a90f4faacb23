//! Check status tokens and their display buckets.
//!
//! Two taxonomies coexist on the wire: the security-feature tri-state
//! (ENABLED / DISABLED / BROKEN) and the generic test pair (PASS / FAIL)
//! plus INFO for non-judgmental reporting. Both fold into the same three
//! display buckets so aggregation has a single code path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six recognized verdict tokens a probe may emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// Security feature is configured and working.
    Enabled,

    /// Feature is intentionally open or not configured. Not an error.
    Disabled,

    /// Feature is configured but failing.
    Broken,

    /// Generic test succeeded.
    Pass,

    /// Generic test failed.
    Fail,

    /// Informational data point, no judgment attached.
    Info,
}

/// Display bucket a status folds into for summary counting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// ENABLED or PASS.
    Success,

    /// DISABLED or INFO.
    Informational,

    /// BROKEN or FAIL. Any non-zero count fails the run gate.
    AttentionNeeded,
}

impl CheckStatus {
    /// Wire token for this status, as probes print it.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Enabled => "ENABLED",
            CheckStatus::Disabled => "DISABLED",
            CheckStatus::Broken => "BROKEN",
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Info => "INFO",
        }
    }

    /// Fold this status into its display bucket.
    pub fn bucket(&self) -> Bucket {
        match self {
            CheckStatus::Enabled | CheckStatus::Pass => Bucket::Success,
            CheckStatus::Disabled | CheckStatus::Info => Bucket::Informational,
            CheckStatus::Broken | CheckStatus::Fail => Bucket::AttentionNeeded,
        }
    }
}

impl FromStr for CheckStatus {
    type Err = ();

    /// Tokens are matched exactly; probes emit them uppercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENABLED" => Ok(CheckStatus::Enabled),
            "DISABLED" => Ok(CheckStatus::Disabled),
            "BROKEN" => Ok(CheckStatus::Broken),
            "PASS" => Ok(CheckStatus::Pass),
            "FAIL" => Ok(CheckStatus::Fail),
            "INFO" => Ok(CheckStatus::Info),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_tokens() {
        for status in [
            CheckStatus::Enabled,
            CheckStatus::Disabled,
            CheckStatus::Broken,
            CheckStatus::Pass,
            CheckStatus::Fail,
            CheckStatus::Info,
        ] {
            assert_eq!(status.as_str().parse::<CheckStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_token_rejected() {
        assert!("WARN".parse::<CheckStatus>().is_err());
        assert!("pass".parse::<CheckStatus>().is_err());
        assert!("".parse::<CheckStatus>().is_err());
    }

    #[test]
    fn test_bucket_mapping() {
        assert_eq!(CheckStatus::Enabled.bucket(), Bucket::Success);
        assert_eq!(CheckStatus::Pass.bucket(), Bucket::Success);
        assert_eq!(CheckStatus::Disabled.bucket(), Bucket::Informational);
        assert_eq!(CheckStatus::Info.bucket(), Bucket::Informational);
        assert_eq!(CheckStatus::Broken.bucket(), Bucket::AttentionNeeded);
        assert_eq!(CheckStatus::Fail.bucket(), Bucket::AttentionNeeded);
    }
}
