//! Run-level aggregate counters
//!
//! Owned by the orchestrator, mutated only as result messages arrive,
//! read once at finalization.

use std::fmt;

use crate::models::CaseReport;

/// Aggregate counters for one dispatch cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub num_files: usize,
    pub duration_ms: u64,
}

impl RunStats {
    pub fn new(num_files: usize) -> Self {
        Self {
            num_files,
            ..Self::default()
        }
    }

    /// Record one case result.
    pub fn record(&mut self, report: &CaseReport) {
        self.total += 1;
        if report.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.duration_ms += report.duration_ms;
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Reset counters for a fresh watch iteration.
    pub fn reset(&mut self) {
        let num_files = self.num_files;
        *self = Self::new(num_files);
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tests in {} files: {} passed, {} failed ({}ms)",
            self.total, self.num_files, self.passed, self.failed, self.duration_ms
        )
    }
}
