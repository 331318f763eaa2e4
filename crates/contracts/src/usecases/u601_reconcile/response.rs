use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate counters for one full pipeline run. A non-zero `errors` count is
/// the caller's signal to alert and re-trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Source rows read across all passes.
    pub processed: usize,
    /// Ledger entries created.
    pub created: usize,
    /// Ledger entries updated (merges, delta refreshes and re-classifications
    /// are not counted separately).
    pub updated: usize,
    /// Rows or sub-batches skipped after a caught failure.
    pub errors: usize,
}

impl RunSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            processed: 0,
            created: 0,
            updated: 0,
            errors: 0,
        }
    }
}
