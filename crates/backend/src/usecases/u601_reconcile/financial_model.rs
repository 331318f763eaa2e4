use contracts::domain::recon_ledger::FinancialFigures;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// One commission bracket: the rate applies to net amounts strictly below
/// `upper_bound`; `None` is the open top bracket.
#[derive(Debug, Clone, Copy)]
pub struct CommissionSlab {
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

pub const TAX_RATE: Decimal = dec!(0.05);
pub const PG_CHARGE_RATE: Decimal = dec!(0.011);
pub const FEE_RATE: Decimal = dec!(0.18);
pub const TDS_RATE: Decimal = dec!(0.001);

/// The contractual slab table: lower amounts pay higher commission, each
/// tier's lower bound inclusive.
pub fn default_slab_table() -> Vec<CommissionSlab> {
    vec![
        CommissionSlab {
            upper_bound: Some(dec!(400)),
            rate: dec!(0.165),
        },
        CommissionSlab {
            upper_bound: Some(dec!(450)),
            rate: dec!(0.1525),
        },
        CommissionSlab {
            upper_bound: Some(dec!(500)),
            rate: dec!(0.145),
        },
        CommissionSlab {
            upper_bound: Some(dec!(550)),
            rate: dec!(0.1375),
        },
        CommissionSlab {
            upper_bound: Some(dec!(600)),
            rate: dec!(0.1325),
        },
        CommissionSlab {
            upper_bound: None,
            rate: dec!(0.1275),
        },
    ]
}

/// Commission rate for a net amount. Falls back to the last (open) bracket.
pub fn slab_rate(slabs: &[CommissionSlab], net_amount: Decimal) -> Decimal {
    for slab in slabs {
        match slab.upper_bound {
            Some(bound) if net_amount < bound => return slab.rate,
            Some(_) => continue,
            None => return slab.rate,
        }
    }
    Decimal::ZERO
}

/// Full financial block for one side. `tds_base` differs between sides: the
/// POS side uses the net amount itself, the 3PO side uses
/// bill_subtotal + packaging − violation (which is also how its net amount is
/// derived). No intermediate rounding happens here; figures are rounded to
/// 2 dp only at persistence.
pub fn calculate(
    slabs: &[CommissionSlab],
    net_amount: Decimal,
    tds_base: Decimal,
) -> FinancialFigures {
    let tax_paid_by_customer = net_amount * TAX_RATE;
    let commission_value = net_amount * slab_rate(slabs, net_amount);
    let pg_applied_on = net_amount + tax_paid_by_customer;
    let pg_charge = pg_applied_on * PG_CHARGE_RATE;
    let fee = (commission_value + pg_charge) * FEE_RATE;
    let tds_amount = tds_base * TDS_RATE;
    let final_amount = net_amount - commission_value - pg_charge - fee - tds_amount;

    FinancialFigures {
        net_amount,
        tax_paid_by_customer,
        commission_value,
        pg_charge,
        fee,
        tds_amount,
        final_amount,
    }
}

/// Round to the currency's minor unit for persistence.
pub fn to_money(value: Decimal) -> f64 {
    value.round_dp(2).to_f64().unwrap_or_default()
}
