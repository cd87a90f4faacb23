//! Run aggregation and the exit-code gate.

use crate::category::Category;
use crate::record::CheckResult;
use crate::status::Bucket;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category bucket counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCounts {
    pub total: usize,
    pub success: usize,
    pub informational: usize,
    pub attention_needed: usize,
}

impl CategoryCounts {
    fn count(&mut self, bucket: Bucket) {
        self.total += 1;
        match bucket {
            Bucket::Success => self.success += 1,
            Bucket::Informational => self.informational += 1,
            Bucket::AttentionNeeded => self.attention_needed += 1,
        }
    }
}

/// Aggregate of one orchestration pass.
///
/// Invariant: `total == success + informational + attention_needed`; every
/// parsed result lands in exactly one bucket. Malformed output lines are
/// tallied separately so a probe regressing its own output contract stays
/// visible, and they fail the gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub informational: usize,
    pub attention_needed: usize,

    /// Stdout lines that attempted the protocol but failed to parse.
    pub malformed: usize,

    /// Per-category sub-counts, keyed alphabetically for stable rendering.
    pub by_category: BTreeMap<Category, CategoryCounts>,
}

impl RunSummary {
    /// Single-pass aggregation over category-tagged results.
    ///
    /// The result line itself carries no category field; the caller tags
    /// each result with its originating probe's category.
    pub fn aggregate<'a, I>(results: I, malformed: usize) -> Self
    where
        I: IntoIterator<Item = (&'a Category, &'a CheckResult)>,
    {
        let mut summary = RunSummary {
            malformed,
            ..Default::default()
        };

        for (category, result) in results {
            let bucket = result.status.bucket();
            summary.total += 1;
            match bucket {
                Bucket::Success => summary.success += 1,
                Bucket::Informational => summary.informational += 1,
                Bucket::AttentionNeeded => summary.attention_needed += 1,
            }
            summary
                .by_category
                .entry(category.clone())
                .or_default()
                .count(bucket);
        }

        summary
    }

    /// Whether the run gate passed.
    ///
    /// Malformed output counts against the gate: a probe that stopped
    /// speaking the protocol needs attention just like a BROKEN verdict.
    pub fn gate_passed(&self) -> bool {
        self.attention_needed == 0 && self.malformed == 0
    }

    /// Process exit code for CI consumption: 0 iff the gate passed.
    pub fn exit_code(&self) -> i32 {
        if self.gate_passed() {
            0
        } else {
            1
        }
    }
}
