use contracts::domain::recon_ledger::ReconStatus;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::projections::p910_recon_ledger::repository as ledger;
use crate::usecases::u601_reconcile::financial_model::to_money;

/// Outcome of classifying one ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: ReconStatus,
    pub reconciled_amount: Option<f64>,
    pub unreconciled_amount: Option<f64>,
}

/// Pure function of a row's current state; safe to re-run after new data
/// arrives.
pub fn classify(row: &ledger::Model, tolerance: Decimal) -> Classification {
    let has_pos = row.pos_order_id.is_some();
    let has_threepo = row.threepo_order_id.is_some();

    match (has_pos, has_threepo) {
        (true, true) => {
            let pos_final = decimal_or_zero(row.pos_final_amount);
            let threepo_final = decimal_or_zero(row.threepo_final_amount);
            let diff = (pos_final - threepo_final).abs();
            if diff <= tolerance {
                Classification {
                    status: ReconStatus::Reconciled,
                    reconciled_amount: row.pos_final_amount,
                    unreconciled_amount: None,
                }
            } else {
                Classification {
                    status: ReconStatus::Unreconciled,
                    reconciled_amount: None,
                    unreconciled_amount: Some(to_money(diff)),
                }
            }
        }
        (true, false) => Classification {
            status: ReconStatus::Unreconciled,
            reconciled_amount: None,
            unreconciled_amount: Some(present_side_amount(
                row.pos_final_amount,
                row.pos_net_amount,
            )),
        },
        (false, true) => Classification {
            status: ReconStatus::Unreconciled,
            reconciled_amount: None,
            unreconciled_amount: Some(present_side_amount(
                row.threepo_final_amount,
                row.threepo_net_amount,
            )),
        },
        // Should not occur: the upsert engine never writes an entry without
        // at least one side's order id.
        (false, false) => Classification {
            status: ReconStatus::Unreconciled,
            reconciled_amount: None,
            unreconciled_amount: Some(0.0),
        },
    }
}

/// The present side's final amount, falling back to its net amount when the
/// final is zero or absent.
fn present_side_amount(final_amount: Option<f64>, net_amount: Option<f64>) -> f64 {
    match final_amount {
        Some(v) if v != 0.0 => v,
        _ => net_amount.unwrap_or(0.0),
    }
}

fn decimal_or_zero(value: Option<f64>) -> Decimal {
    value.and_then(Decimal::from_f64).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOLERANCE: Decimal = dec!(0.01);

    fn both_sides(pos_final: f64, threepo_final: f64) -> ledger::Model {
        let mut row = ledger::Model::blank("RLE_C1");
        row.pos_order_id = Some("C1".to_string());
        row.threepo_order_id = Some("C1".to_string());
        row.pos_final_amount = Some(pos_final);
        row.threepo_final_amount = Some(threepo_final);
        row
    }

    #[test]
    fn test_within_tolerance_is_reconciled() {
        let result = classify(&both_sides(100.00, 100.01), TOLERANCE);
        assert_eq!(result.status, ReconStatus::Reconciled);
        assert_eq!(result.reconciled_amount, Some(100.00));
        assert_eq!(result.unreconciled_amount, None);
    }

    #[test]
    fn test_outside_tolerance_is_unreconciled() {
        let result = classify(&both_sides(100.00, 100.02), TOLERANCE);
        assert_eq!(result.status, ReconStatus::Unreconciled);
        assert_eq!(result.reconciled_amount, None);
        assert_eq!(result.unreconciled_amount, Some(0.02));
    }

    #[test]
    fn test_pos_only_uses_final_amount() {
        let mut row = ledger::Model::blank("RLE_C2");
        row.pos_order_id = Some("C2".to_string());
        row.pos_net_amount = Some(500.00);
        row.pos_final_amount = Some(417.21);

        let result = classify(&row, TOLERANCE);
        assert_eq!(result.status, ReconStatus::Unreconciled);
        assert_eq!(result.unreconciled_amount, Some(417.21));
    }

    #[test]
    fn test_pos_only_falls_back_to_net_when_final_is_zero() {
        let mut row = ledger::Model::blank("RLE_C3");
        row.pos_order_id = Some("C3".to_string());
        row.pos_net_amount = Some(500.00);
        row.pos_final_amount = Some(0.0);

        let result = classify(&row, TOLERANCE);
        assert_eq!(result.unreconciled_amount, Some(500.00));
    }

    #[test]
    fn test_threepo_only() {
        let mut row = ledger::Model::blank("RLE_C4");
        row.threepo_order_id = Some("C4".to_string());
        row.threepo_net_amount = Some(260.00);

        let result = classify(&row, TOLERANCE);
        assert_eq!(result.status, ReconStatus::Unreconciled);
        assert_eq!(result.unreconciled_amount, Some(260.00));
    }

    #[test]
    fn test_neither_side_present() {
        let row = ledger::Model::blank("RLE_C5");
        let result = classify(&row, TOLERANCE);
        assert_eq!(result.status, ReconStatus::Unreconciled);
        assert_eq!(result.unreconciled_amount, Some(0.0));
    }
}
