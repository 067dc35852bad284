use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hygiene status for canonicalization attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HygieneStatus {
    /// The input was already in normal form.
    Ok,
    /// Rewrites were applied (NFC, NaN collapse, map ordering); identity is unaffected.
    Normalized,
    /// The input was invalid and must be rejected.
    Invalid,
}

/// Stable warning codes emitted by canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HygieneWarning {
    /// A string was rewritten to NFC.
    NfcRewritten,
    /// A NaN with a non-canonical payload was collapsed.
    NanCanonicalized,
    /// A named map was supplied out of key order.
    MapReordered,
}

impl HygieneWarning {
    /// Metric key counting occurrences of this warning.
    pub fn metric(self) -> &'static str {
        match self {
            HygieneWarning::NfcRewritten => "nfc_rewrites",
            HygieneWarning::NanCanonicalized => "nan_canonicalizations",
            HygieneWarning::MapReordered => "map_reorders",
        }
    }
}

/// Report describing what canonicalization had to rewrite.
///
/// The report is diagnostic only; it never feeds into bytes or CIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HygieneReport {
    /// Overall hygiene status.
    pub status: HygieneStatus,
    /// Distinct warning codes, sorted.
    pub warnings: Vec<HygieneWarning>,
    /// Occurrence counters keyed by [`HygieneWarning::metric`], plus `nodes`.
    pub metrics: BTreeMap<String, u64>,
}

impl Default for HygieneReport {
    fn default() -> Self {
        Self {
            status: HygieneStatus::Ok,
            warnings: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }
}

impl HygieneReport {
    /// Records one occurrence of `warning`.
    pub fn warn(&mut self, warning: HygieneWarning) {
        if let Err(pos) = self.warnings.binary_search(&warning) {
            self.warnings.insert(pos, warning);
        }
        self.bump(warning.metric());
        if self.status == HygieneStatus::Ok {
            self.status = HygieneStatus::Normalized;
        }
    }

    /// Increments a named counter.
    pub fn bump(&mut self, metric: &str) {
        *self.metrics.entry(metric.to_string()).or_insert(0) += 1;
    }

    /// Marks the report as describing rejected input.
    pub fn invalidate(&mut self) {
        self.status = HygieneStatus::Invalid;
    }
}
