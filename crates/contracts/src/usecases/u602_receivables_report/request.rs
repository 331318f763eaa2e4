use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scope for the receivables report: inclusive date range plus a store set.
/// An empty store set means all stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivablesRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub store_ids: Vec<String>,
}
