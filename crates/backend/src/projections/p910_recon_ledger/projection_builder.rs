use contracts::domain::recon_ledger::{FieldValue, LedgerAction, ThreepoAction};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::repository::{LedgerWrite, PosFigures, ThreepoFigures};
use crate::domain::a101_pos_order::repository as pos_orders;
use crate::domain::a102_threepo_order::repository as threepo_orders;
use crate::usecases::u601_reconcile::error::RowError;
use crate::usecases::u601_reconcile::financial_model::{calculate, to_money, CommissionSlab};

/// Synthetic ledger key. Refund entries get their own key so a refund never
/// merges into the sale/addition entry for the same order id.
pub fn ledger_id(order_id: &str, action: LedgerAction) -> String {
    match action {
        LedgerAction::Delivered => format!("RLE_{}", order_id),
        LedgerAction::Refund => format!("RLE_{}_REFUND", order_id),
    }
}

/// Project a POS order into its side of a ledger entry.
pub fn from_pos_order(
    slabs: &[CommissionSlab],
    row: &pos_orders::Model,
) -> Result<LedgerWrite, RowError> {
    if row.order_id.is_empty() {
        return Err(RowError::MissingOrderId);
    }
    let net = required_decimal("net_amount", row.net_amount)?;
    let figures = calculate(slabs, net, net);

    Ok(LedgerWrite {
        id: ledger_id(&row.order_id, LedgerAction::Delivered),
        pos_order_id: Some(row.order_id.clone()),
        threepo_order_id: None,
        store_id: row.store_id.clone(),
        order_date: row.order_date.clone(),
        order_action: LedgerAction::Delivered.as_str().to_string(),
        payment_tender: row.payment_tender.clone(),
        pos: Some(PosFigures {
            net_amount: to_money(figures.net_amount),
            tax_paid_by_customer: to_money(figures.tax_paid_by_customer),
            commission_value: to_money(figures.commission_value),
            pg_charge: to_money(figures.pg_charge),
            fee: to_money(figures.fee),
            tds_amount: to_money(figures.tds_amount),
            final_amount: to_money(figures.final_amount),
        }),
        threepo: None,
    })
}

/// Project a delivered (sale/addition) 3PO order into its side of a ledger
/// entry.
pub fn from_threepo_delivered(
    slabs: &[CommissionSlab],
    row: &threepo_orders::Model,
) -> Result<LedgerWrite, RowError> {
    match ThreepoAction::parse(&row.action) {
        Some(ThreepoAction::Sale) | Some(ThreepoAction::Addition) => {}
        _ => return Err(RowError::UnknownAction(row.action.clone())),
    }
    build_threepo(slabs, row, LedgerAction::Delivered)
}

/// Project a refund 3PO order into a separate refund ledger entry.
pub fn from_threepo_refund(
    slabs: &[CommissionSlab],
    row: &threepo_orders::Model,
) -> Result<LedgerWrite, RowError> {
    if ThreepoAction::parse(&row.action) != Some(ThreepoAction::Refund) {
        return Err(RowError::UnknownAction(row.action.clone()));
    }
    build_threepo(slabs, row, LedgerAction::Refund)
}

fn build_threepo(
    slabs: &[CommissionSlab],
    row: &threepo_orders::Model,
    action: LedgerAction,
) -> Result<LedgerWrite, RowError> {
    if row.order_id.is_empty() {
        return Err(RowError::MissingOrderId);
    }
    let bill = required_decimal("bill_subtotal", row.bill_subtotal)?;
    let violation = required_decimal(
        "merchant_violation_deduction",
        row.merchant_violation_deduction,
    )?;
    let packaging = required_decimal(
        "merchant_packaging_charge",
        row.merchant_packaging_charge,
    )?;

    // The 3PO net is itself derived from the same three components that seed
    // the TDS base.
    let net = bill - violation + packaging;
    let tds_base = bill + packaging - violation;
    let derived = calculate(slabs, net, tds_base);

    let tax = FieldValue::prefer(
        optional_decimal("tax_amount", row.tax_amount)?,
        derived.tax_paid_by_customer,
    );
    let commission = FieldValue::prefer(
        optional_decimal("commission_amount", row.commission_amount)?,
        derived.commission_value,
    );
    let pg_charge = FieldValue::prefer(
        optional_decimal("pg_charge_amount", row.pg_charge_amount)?,
        derived.pg_charge,
    );
    let final_amount = FieldValue::prefer(
        optional_decimal("final_amount", row.final_amount)?,
        derived.final_amount,
    );

    Ok(LedgerWrite {
        id: ledger_id(&row.order_id, action),
        pos_order_id: None,
        threepo_order_id: Some(row.order_id.clone()),
        store_id: row.store_id.clone(),
        order_date: row.order_date.clone(),
        order_action: action.as_str().to_string(),
        payment_tender: None,
        pos: None,
        threepo: Some(ThreepoFigures {
            net_amount: to_money(net),
            tax_paid_by_customer: to_money(tax.value()),
            commission_value: to_money(commission.value()),
            pg_charge: to_money(pg_charge.value()),
            fee: to_money(derived.fee),
            tds_amount: to_money(derived.tds_amount),
            final_amount: to_money(final_amount.value()),
            calc_tax_paid_by_customer: to_money(derived.tax_paid_by_customer),
            calc_commission_value: to_money(derived.commission_value),
            calc_pg_charge: to_money(derived.pg_charge),
            calc_final_amount: to_money(derived.final_amount),
            violation_deduction: to_money(violation),
            packaging_charge: to_money(packaging),
            credit_note_adjustment: row.credit_note_adjustment,
            promo_recovery_adjustment: row.promo_recovery_adjustment,
        }),
    })
}

fn required_decimal(field: &'static str, value: f64) -> Result<Decimal, RowError> {
    Decimal::from_f64(value).ok_or(RowError::InvalidAmount { field, value })
}

fn optional_decimal(field: &'static str, value: Option<f64>) -> Result<Option<Decimal>, RowError> {
    match value {
        Some(v) => Ok(Some(required_decimal(field, v)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u601_reconcile::financial_model::default_slab_table;

    fn pos_row(order_id: &str, net: f64) -> pos_orders::Model {
        pos_orders::Model {
            order_id: order_id.to_string(),
            store_id: "S1".to_string(),
            order_date: "2024-01-15".to_string(),
            gross_amount: net * 1.05,
            net_amount: net,
            tax_amount: None,
            discount_amount: None,
            payment_tender: Some("card".to_string()),
        }
    }

    fn threepo_row(order_id: &str, action: &str, bill: f64) -> threepo_orders::Model {
        threepo_orders::Model {
            id: format!("{}-{}", order_id, action),
            order_id: order_id.to_string(),
            store_id: "S1".to_string(),
            order_date: "2024-01-15".to_string(),
            action: action.to_string(),
            bill_subtotal: bill,
            merchant_violation_deduction: 0.0,
            merchant_packaging_charge: 0.0,
            tax_amount: None,
            commission_amount: None,
            pg_charge_amount: None,
            final_amount: None,
            credit_note_adjustment: None,
            promo_recovery_adjustment: None,
        }
    }

    #[test]
    fn test_refund_gets_a_distinct_ledger_id() {
        assert_eq!(ledger_id("X42", LedgerAction::Delivered), "RLE_X42");
        assert_eq!(ledger_id("X42", LedgerAction::Refund), "RLE_X42_REFUND");
    }

    #[test]
    fn test_pos_projection_worked_example() {
        let slabs = default_slab_table();
        let write = from_pos_order(&slabs, &pos_row("P100", 1000.0)).unwrap();
        assert_eq!(write.id, "RLE_P100");
        let pos = write.pos.unwrap();
        assert_eq!(pos.commission_value, 127.50);
        assert_eq!(pos.pg_charge, 11.55);
        assert_eq!(pos.final_amount, 834.92);
    }

    #[test]
    fn test_threepo_provided_values_win_but_calc_is_kept() {
        let slabs = default_slab_table();
        let mut row = threepo_row("T7", "sale", 500.0);
        row.merchant_packaging_charge = 20.0;
        row.merchant_violation_deduction = 10.0;
        row.commission_amount = Some(70.00);

        let write = from_threepo_delivered(&slabs, &row).unwrap();
        let tp = write.threepo.unwrap();
        // net = 500 - 10 + 20
        assert_eq!(tp.net_amount, 510.00);
        assert_eq!(tp.commission_value, 70.00);
        // 510 * 13.75% = 70.125, rounded to even
        assert_eq!(tp.calc_commission_value, 70.12);
        assert_ne!(tp.commission_value, tp.calc_commission_value);
    }

    #[test]
    fn test_refund_row_rejected_by_delivered_builder() {
        let slabs = default_slab_table();
        let row = threepo_row("T8", "refund", 100.0);
        assert!(matches!(
            from_threepo_delivered(&slabs, &row),
            Err(RowError::UnknownAction(_))
        ));
        assert!(from_threepo_refund(&slabs, &row).is_ok());
    }

    #[test]
    fn test_invalid_amount_is_a_row_error() {
        let slabs = default_slab_table();
        let row = pos_row("P9", f64::NAN);
        assert!(matches!(
            from_pos_order(&slabs, &row),
            Err(RowError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_empty_order_id_is_a_row_error() {
        let slabs = default_slab_table();
        assert!(matches!(
            from_pos_order(&slabs, &pos_row("", 100.0)),
            Err(RowError::MissingOrderId)
        ));
    }
}
