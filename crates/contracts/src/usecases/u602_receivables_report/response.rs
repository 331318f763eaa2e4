use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger totals for a single payment tender within the requested scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderTotals {
    /// Tender name, or "unknown" for ledger entries with no POS tender.
    pub tender: String,
    pub sales_total: Decimal,
    pub commission_total: Decimal,
    pub pg_charge_total: Decimal,
    pub final_total: Decimal,
}

/// Bank receipts vs ledger totals for a date range and store set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivablesReport {
    /// Sum of receipt final amounts, one receipt per bank reference.
    pub total_receivable: Decimal,
    /// Sum of receipt deposit amounts, one receipt per bank reference.
    pub total_received: Decimal,
    /// Distinct bank references seen in scope.
    pub receipt_count: usize,
    /// Receipt rows dropped as duplicates of an already-counted reference.
    pub duplicate_rows: usize,
    pub tender_totals: Vec<TenderTotals>,
}
