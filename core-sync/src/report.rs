use core_runtime::events::{RunKind, RunTotals};
use serde::{Deserialize, Serialize};

/// Warning attached to an add run that inserted nothing.
pub const NO_MEDIA_WARNING: &str = "No media updated, do you respect the patterns?";

/// Outcome of one add, verify or clean run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run: RunKind,
    pub totals: RunTotals,
    /// Non-fatal conditions the operator should see.
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn new(run: RunKind) -> Self {
        Self {
            run,
            totals: RunTotals::default(),
            warnings: Vec::new(),
        }
    }

    pub fn added(&self) -> u64 {
        self.totals.added
    }

    pub fn updated(&self) -> u64 {
        self.totals.updated
    }

    /// Records deleted because their remote file is gone.
    pub fn dead(&self) -> u64 {
        self.totals.removed
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
