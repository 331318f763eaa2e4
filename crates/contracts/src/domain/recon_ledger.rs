use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reconciliation state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconStatus {
    Pending,
    Reconciled,
    Unreconciled,
}

impl ReconStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconStatus::Pending => "PENDING",
            ReconStatus::Reconciled => "RECONCILED",
            ReconStatus::Unreconciled => "UNRECONCILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReconStatus::Pending),
            "RECONCILED" => Some(ReconStatus::Reconciled),
            "UNRECONCILED" => Some(ReconStatus::Unreconciled),
            _ => None,
        }
    }
}

/// Which kind of 3PO volume a ledger entry tracks. Refund rows never merge
/// into the delivered entry for the same order id; they get their own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    Delivered,
    Refund,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::Delivered => "delivered",
            LedgerAction::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "delivered" => Some(LedgerAction::Delivered),
            "refund" => Some(LedgerAction::Refund),
            _ => None,
        }
    }
}

/// Raw `action` values on the 3PO source feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreepoAction {
    Sale,
    Addition,
    Refund,
}

impl ThreepoAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(ThreepoAction::Sale),
            "addition" => Some(ThreepoAction::Addition),
            "refund" => Some(ThreepoAction::Refund),
            _ => None,
        }
    }
}

/// A financial figure that is either carried verbatim from the aggregator feed
/// or derived by the slab-rate model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Provided(Decimal),
    Derived(Decimal),
}

impl FieldValue {
    /// Prefer the feed's authoritative value when the source carries one.
    pub fn prefer(provided: Option<Decimal>, derived: Decimal) -> Self {
        match provided {
            Some(v) => FieldValue::Provided(v),
            None => FieldValue::Derived(derived),
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            FieldValue::Provided(v) | FieldValue::Derived(v) => *v,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, FieldValue::Provided(_))
    }
}

/// Signed per-field differences between the two sides of a ledger entry,
/// carried in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaSet {
    pub pos_vs_threepo_net: f64,
    pub pos_vs_threepo_tax: f64,
    pub pos_vs_threepo_commission: f64,
    pub pos_vs_threepo_pg_charge: f64,
    pub threepo_vs_pos_net: f64,
    pub threepo_vs_pos_tax: f64,
    pub threepo_vs_pos_commission: f64,
    pub threepo_vs_pos_pg_charge: f64,
}

/// One side's full financial block, kept in `Decimal` until persistence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinancialFigures {
    pub net_amount: Decimal,
    pub tax_paid_by_customer: Decimal,
    pub commission_value: Decimal,
    pub pg_charge: Decimal,
    pub fee: Decimal,
    pub tds_amount: Decimal,
    pub final_amount: Decimal,
}
