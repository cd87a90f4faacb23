//! Run specification and identity.
//!
//! A run's identity is the checks directory, the publish domain, and a
//! deterministic digest over the ordered probe names, so two reports can
//! be compared and an unchanged check suite hashes identically.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Identity of one orchestration pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSpec {
    /// Directory the probes were discovered in.
    pub checks_dir: PathBuf,

    /// Domain the deployment is published under.
    pub publish_domain: String,

    /// SHA-256 digest of ordered probe names (deterministic).
    pub probes_digest: String,
}

impl RunSpec {
    pub fn new(checks_dir: PathBuf, publish_domain: String, probe_names: &[&str]) -> Self {
        Self {
            checks_dir,
            publish_domain,
            probes_digest: compute_probes_digest(probe_names),
        }
    }

    /// Short digest prefix for display.
    pub fn short_digest(&self) -> &str {
        &self.probes_digest[..12.min(self.probes_digest.len())]
    }
}

/// Compute deterministic digest of ordered probe names.
fn compute_probes_digest(names: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let names = ["security-redis-auth", "storage-redis-keys"];
        let a = compute_probes_digest(&names);
        let b = compute_probes_digest(&names);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_order_sensitive() {
        let a = compute_probes_digest(&["a", "b"]);
        let b = compute_probes_digest(&["b", "a"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_separator_prevents_collisions() {
        let a = compute_probes_digest(&["ab", "c"]);
        let b = compute_probes_digest(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_digest() {
        let spec = RunSpec::new(
            PathBuf::from("tests/checks"),
            "dev.localhost".to_string(),
            &["security-redis-auth"],
        );
        assert_eq!(spec.short_digest().len(), 12);
    }
}
