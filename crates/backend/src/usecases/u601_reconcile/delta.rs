use contracts::domain::recon_ledger::DeltaSet;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::projections::p910_recon_ledger::repository as ledger;
use crate::usecases::u601_reconcile::financial_model::to_money;

/// Pure delta computation over one ledger row. A null side counts as zero, so
/// a one-sided row still gets a delta equal to its only known value.
pub fn compute(row: &ledger::Model) -> DeltaSet {
    let net = diff(row.pos_net_amount, row.threepo_net_amount);
    let tax = diff(row.pos_tax_paid_by_customer, row.threepo_tax_paid_by_customer);
    let commission = diff(row.pos_commission_value, row.threepo_commission_value);
    let pg_charge = diff(row.pos_pg_charge, row.threepo_pg_charge);

    DeltaSet {
        pos_vs_threepo_net: net,
        pos_vs_threepo_tax: tax,
        pos_vs_threepo_commission: commission,
        pos_vs_threepo_pg_charge: pg_charge,
        threepo_vs_pos_net: -net,
        threepo_vs_pos_tax: -tax,
        threepo_vs_pos_commission: -commission,
        threepo_vs_pos_pg_charge: -pg_charge,
    }
}

fn diff(pos: Option<f64>, threepo: Option<f64>) -> f64 {
    let pos = pos.and_then(Decimal::from_f64).unwrap_or(Decimal::ZERO);
    let threepo = threepo.and_then(Decimal::from_f64).unwrap_or(Decimal::ZERO);
    to_money(pos - threepo)
}
