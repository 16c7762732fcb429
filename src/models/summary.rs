// file: src/models/summary.rs
// description: per-item bulk write outcomes and the run summary they accumulate into
// reference: bulk api per-item responses

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Written,
    Rejected { reason: String },
}

/// Result of writing one record inside a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: String,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn written(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Written,
        }
    }

    pub fn rejected(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Rejected {
                reason: reason.into(),
            },
        }
    }

    pub fn is_written(&self) -> bool {
        self.status == ItemStatus::Written
    }
}

/// Write counters for one reindex run. Only grows through `record_*`,
/// so `succeeded + failed == attempted` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    attempted: usize,
    succeeded: usize,
    failed: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    pub fn record(&mut self, outcome: &ItemOutcome) {
        if outcome.is_written() {
            self.record_success();
        } else {
            self.record_failure();
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_consistent(&self) -> bool {
        self.succeeded + self.failed == self.attempted
    }
}
