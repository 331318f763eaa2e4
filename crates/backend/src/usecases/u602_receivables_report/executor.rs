use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use contracts::usecases::u602_receivables_report::request::ReceivablesRequest;
use contracts::usecases::u602_receivables_report::response::{ReceivablesReport, TenderTotals};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::domain::a103_bank_receipt::repository as bank_receipts;
use crate::projections::p910_recon_ledger::repository as ledger;
use crate::shared::context::ReconContext;

/// Receivables report over a date range and store set: bank receipts
/// de-duplicated by reference number, plus ledger totals grouped by the POS
/// payment tender.
pub async fn build_report(
    ctx: &ReconContext,
    request: &ReceivablesRequest,
) -> Result<ReceivablesReport> {
    let date_from = request.date_from.format("%Y-%m-%d").to_string();
    let date_to = request.date_to.format("%Y-%m-%d").to_string();

    let receipts =
        bank_receipts::list_in_scope(&ctx.db, &date_from, &date_to, &request.store_ids).await?;

    let mut seen_references: HashSet<String> = HashSet::new();
    let mut total_receivable = Decimal::ZERO;
    let mut total_received = Decimal::ZERO;
    let mut duplicate_rows = 0usize;
    for receipt in &receipts {
        if !seen_references.insert(receipt.reference_number.clone()) {
            duplicate_rows += 1;
            continue;
        }
        total_receivable += decimal_or_zero(receipt.final_amount);
        total_received += decimal_or_zero(receipt.deposit_amount);
    }

    let entries = ledger::list_in_scope(&ctx.db, &date_from, &date_to, &request.store_ids).await?;

    let mut by_tender: BTreeMap<String, TenderTotals> = BTreeMap::new();
    for entry in &entries {
        let tender = entry
            .payment_tender
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let totals = by_tender.entry(tender.clone()).or_insert(TenderTotals {
            tender,
            sales_total: Decimal::ZERO,
            commission_total: Decimal::ZERO,
            pg_charge_total: Decimal::ZERO,
            final_total: Decimal::ZERO,
        });
        totals.sales_total += decimal_or_zero(entry.pos_net_amount.unwrap_or_default());
        totals.commission_total += decimal_or_zero(entry.pos_commission_value.unwrap_or_default());
        totals.pg_charge_total += decimal_or_zero(entry.pos_pg_charge.unwrap_or_default());
        totals.final_total += decimal_or_zero(entry.pos_final_amount.unwrap_or_default());
    }

    tracing::info!(
        receipts = seen_references.len(),
        duplicates = duplicate_rows,
        ledger_entries = entries.len(),
        "receivables report built for {} .. {}",
        date_from,
        date_to
    );

    Ok(ReceivablesReport {
        total_receivable,
        total_received,
        receipt_count: seen_references.len(),
        duplicate_rows,
        tender_totals: by_tender.into_values().collect(),
    })
}

fn decimal_or_zero(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}
