use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::Utc;
use contracts::domain::recon_ledger::DeltaSet;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};

/// Reconciliation ledger entry: the merged view of one order as seen by the
/// POS and the 3PO side. Keyed by a synthetic id derived from the order id;
/// refund entries get a distinct id so they never merge into the sale entry.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "p910_recon_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    // Identity: at least one side is always present.
    #[sea_orm(nullable)]
    pub pos_order_id: Option<String>,
    #[sea_orm(nullable)]
    pub threepo_order_id: Option<String>,
    pub store_id: String,
    pub order_date: String,
    pub order_action: String,
    #[sea_orm(nullable)]
    pub payment_tender: Option<String>,

    // POS financial block
    #[sea_orm(nullable)]
    pub pos_net_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_tax_paid_by_customer: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_commission_value: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_pg_charge: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_fee: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_tds_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_final_amount: Option<f64>,

    // 3PO actual block (feed values where provided, derived otherwise)
    #[sea_orm(nullable)]
    pub threepo_net_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_tax_paid_by_customer: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_commission_value: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_pg_charge: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_fee: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_tds_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_final_amount: Option<f64>,

    // 3PO calculated block, always populated for variance inspection
    #[sea_orm(nullable)]
    pub threepo_calc_tax_paid_by_customer: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_calc_commission_value: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_calc_pg_charge: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_calc_final_amount: Option<f64>,

    // Aggregator fixed adjustments
    #[sea_orm(nullable)]
    pub threepo_violation_deduction: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_packaging_charge: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_credit_note_adjustment: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_promo_recovery_adjustment: Option<f64>,

    // Per-field deltas, both directions
    #[sea_orm(nullable)]
    pub pos_vs_threepo_net_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_vs_threepo_tax_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_vs_threepo_commission_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub pos_vs_threepo_pg_charge_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_vs_pos_net_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_vs_pos_tax_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_vs_pos_commission_delta: Option<f64>,
    #[sea_orm(nullable)]
    pub threepo_vs_pos_pg_charge_delta: Option<f64>,

    // Reconciliation outcome
    pub status: String,
    #[sea_orm(nullable)]
    pub reconciled_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub unreconciled_amount: Option<f64>,

    // Technical
    pub loaded_at_utc: String,
    pub updated_at_utc: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// POS-side figures ready for persistence (already rounded to 2 dp).
#[derive(Debug, Clone)]
pub struct PosFigures {
    pub net_amount: f64,
    pub tax_paid_by_customer: f64,
    pub commission_value: f64,
    pub pg_charge: f64,
    pub fee: f64,
    pub tds_amount: f64,
    pub final_amount: f64,
}

/// 3PO-side figures ready for persistence: the actual block (feed values
/// where provided), the always-derived calculated block and the fixed
/// adjustments.
#[derive(Debug, Clone)]
pub struct ThreepoFigures {
    pub net_amount: f64,
    pub tax_paid_by_customer: f64,
    pub commission_value: f64,
    pub pg_charge: f64,
    pub fee: f64,
    pub tds_amount: f64,
    pub final_amount: f64,
    pub calc_tax_paid_by_customer: f64,
    pub calc_commission_value: f64,
    pub calc_pg_charge: f64,
    pub calc_final_amount: f64,
    pub violation_deduction: f64,
    pub packaging_charge: f64,
    pub credit_note_adjustment: Option<f64>,
    pub promo_recovery_adjustment: Option<f64>,
}

/// One side's write-set for a ledger entry. Exactly one of `pos`/`threepo` is
/// populated per write; on update, absent columns keep their existing values
/// so the two passes can run independently and in either order.
#[derive(Debug, Clone)]
pub struct LedgerWrite {
    pub id: String,
    pub pos_order_id: Option<String>,
    pub threepo_order_id: Option<String>,
    pub store_id: String,
    pub order_date: String,
    pub order_action: String,
    pub payment_tender: Option<String>,
    pub pos: Option<PosFigures>,
    pub threepo: Option<ThreepoFigures>,
}

/// Batched identity lookup: match a page's order ids against both the POS and
/// the 3PO order-id columns, so either side finds an entry first created by
/// its counterpart. With `refund_only` the match is restricted to refund
/// entries; without it refund entries are excluded, so a delivered row never
/// lands on the refund entry for the same order id. When several entries
/// match one order id, the lowest ledger id wins.
pub async fn find_ids_for_orders<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[String],
    refund_only: bool,
) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    if order_ids.is_empty() {
        return Ok(map);
    }

    let mut query = Entity::find().filter(
        Condition::any()
            .add(Column::PosOrderId.is_in(order_ids.to_vec()))
            .add(Column::ThreepoOrderId.is_in(order_ids.to_vec())),
    );
    if refund_only {
        query = query.filter(Column::OrderAction.eq("refund"));
    } else {
        query = query.filter(Column::OrderAction.ne("refund"));
    }

    let requested: HashSet<&str> = order_ids.iter().map(|s| s.as_str()).collect();
    let models = query.order_by_asc(Column::Id).all(conn).await?;
    for model in models {
        if let Some(pos_id) = &model.pos_order_id {
            if requested.contains(pos_id.as_str()) && !map.contains_key(pos_id) {
                map.insert(pos_id.clone(), model.id.clone());
            }
        }
        if let Some(tp_id) = &model.threepo_order_id {
            if requested.contains(tp_id.as_str()) && !map.contains_key(tp_id) {
                map.insert(tp_id.clone(), model.id.clone());
            }
        }
    }
    Ok(map)
}

/// Fallback lookup for a POS row whose id the batched query did not resolve:
/// check the 3PO column only (a late-arriving counterpart case). Refund
/// entries are excluded; POS rows only merge into delivered entries.
pub async fn find_by_threepo_order_id<C: ConnectionTrait>(
    conn: &C,
    order_id: &str,
) -> Result<Option<Model>> {
    let item = Entity::find()
        .filter(Column::ThreepoOrderId.eq(order_id))
        .filter(Column::OrderAction.ne("refund"))
        .order_by_asc(Column::Id)
        .one(conn)
        .await?;
    Ok(item)
}

/// Fallback lookup for a 3PO row: check the POS column only, scoped to the
/// calling pass's entry kind (refund entries for the refund pass, delivered
/// entries otherwise).
pub async fn find_by_pos_order_id<C: ConnectionTrait>(
    conn: &C,
    order_id: &str,
    refund_only: bool,
) -> Result<Option<Model>> {
    let mut query = Entity::find().filter(Column::PosOrderId.eq(order_id));
    if refund_only {
        query = query.filter(Column::OrderAction.eq("refund"));
    } else {
        query = query.filter(Column::OrderAction.ne("refund"));
    }
    let item = query.order_by_asc(Column::Id).one(conn).await?;
    Ok(item)
}

/// Insert a new ledger entry from one side's write-set. Status starts PENDING.
pub async fn insert_entry<C: ConnectionTrait>(conn: &C, write: &LedgerWrite) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let mut active = ActiveModel {
        id: Set(write.id.clone()),
        pos_order_id: Set(write.pos_order_id.clone()),
        threepo_order_id: Set(write.threepo_order_id.clone()),
        store_id: Set(write.store_id.clone()),
        order_date: Set(write.order_date.clone()),
        order_action: Set(write.order_action.clone()),
        payment_tender: Set(write.payment_tender.clone()),
        status: Set("PENDING".to_string()),
        loaded_at_utc: Set(now.clone()),
        updated_at_utc: Set(now),
        ..default_insert()
    };
    apply_side_columns(&mut active, write);
    active.insert(conn).await?;
    Ok(())
}

/// Update an existing entry with one side's write-set. Only the supplied
/// side's columns are overwritten; everything else keeps its existing value
/// (COALESCE(new, existing) semantics).
pub async fn update_entry<C: ConnectionTrait>(
    conn: &C,
    ledger_id: &str,
    write: &LedgerWrite,
) -> Result<()> {
    let mut active = ActiveModel {
        id: Set(ledger_id.to_string()),
        store_id: Set(write.store_id.clone()),
        order_date: Set(write.order_date.clone()),
        updated_at_utc: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    if write.pos_order_id.is_some() {
        active.pos_order_id = Set(write.pos_order_id.clone());
    }
    if write.threepo_order_id.is_some() {
        active.threepo_order_id = Set(write.threepo_order_id.clone());
    }
    if write.payment_tender.is_some() {
        active.payment_tender = Set(write.payment_tender.clone());
    }
    apply_side_columns(&mut active, write);
    active.update(conn).await?;
    Ok(())
}

/// All nullable columns explicitly NULL, for inserts. Delta and outcome
/// columns are filled by the later passes.
fn default_insert() -> ActiveModel {
    ActiveModel {
        pos_net_amount: Set(None),
        pos_tax_paid_by_customer: Set(None),
        pos_commission_value: Set(None),
        pos_pg_charge: Set(None),
        pos_fee: Set(None),
        pos_tds_amount: Set(None),
        pos_final_amount: Set(None),
        threepo_net_amount: Set(None),
        threepo_tax_paid_by_customer: Set(None),
        threepo_commission_value: Set(None),
        threepo_pg_charge: Set(None),
        threepo_fee: Set(None),
        threepo_tds_amount: Set(None),
        threepo_final_amount: Set(None),
        threepo_calc_tax_paid_by_customer: Set(None),
        threepo_calc_commission_value: Set(None),
        threepo_calc_pg_charge: Set(None),
        threepo_calc_final_amount: Set(None),
        threepo_violation_deduction: Set(None),
        threepo_packaging_charge: Set(None),
        threepo_credit_note_adjustment: Set(None),
        threepo_promo_recovery_adjustment: Set(None),
        pos_vs_threepo_net_delta: Set(None),
        pos_vs_threepo_tax_delta: Set(None),
        pos_vs_threepo_commission_delta: Set(None),
        pos_vs_threepo_pg_charge_delta: Set(None),
        threepo_vs_pos_net_delta: Set(None),
        threepo_vs_pos_tax_delta: Set(None),
        threepo_vs_pos_commission_delta: Set(None),
        threepo_vs_pos_pg_charge_delta: Set(None),
        reconciled_amount: Set(None),
        unreconciled_amount: Set(None),
        ..Default::default()
    }
}

fn apply_side_columns(active: &mut ActiveModel, write: &LedgerWrite) {
    if let Some(pos) = &write.pos {
        active.pos_net_amount = Set(Some(pos.net_amount));
        active.pos_tax_paid_by_customer = Set(Some(pos.tax_paid_by_customer));
        active.pos_commission_value = Set(Some(pos.commission_value));
        active.pos_pg_charge = Set(Some(pos.pg_charge));
        active.pos_fee = Set(Some(pos.fee));
        active.pos_tds_amount = Set(Some(pos.tds_amount));
        active.pos_final_amount = Set(Some(pos.final_amount));
    }
    if let Some(tp) = &write.threepo {
        active.threepo_net_amount = Set(Some(tp.net_amount));
        active.threepo_tax_paid_by_customer = Set(Some(tp.tax_paid_by_customer));
        active.threepo_commission_value = Set(Some(tp.commission_value));
        active.threepo_pg_charge = Set(Some(tp.pg_charge));
        active.threepo_fee = Set(Some(tp.fee));
        active.threepo_tds_amount = Set(Some(tp.tds_amount));
        active.threepo_final_amount = Set(Some(tp.final_amount));
        active.threepo_calc_tax_paid_by_customer = Set(Some(tp.calc_tax_paid_by_customer));
        active.threepo_calc_commission_value = Set(Some(tp.calc_commission_value));
        active.threepo_calc_pg_charge = Set(Some(tp.calc_pg_charge));
        active.threepo_calc_final_amount = Set(Some(tp.calc_final_amount));
        active.threepo_violation_deduction = Set(Some(tp.violation_deduction));
        active.threepo_packaging_charge = Set(Some(tp.packaging_charge));
        active.threepo_credit_note_adjustment = Set(tp.credit_note_adjustment);
        active.threepo_promo_recovery_adjustment = Set(tp.promo_recovery_adjustment);
    }
}

/// Full-ledger scan page, id ascending; used by the delta and classifier
/// passes.
pub async fn scan_page<C: ConnectionTrait>(
    conn: &C,
    page_size: u64,
    offset: u64,
) -> Result<Vec<Model>> {
    let items = Entity::find()
        .order_by_asc(Column::Id)
        .limit(page_size)
        .offset(offset)
        .all(conn)
        .await?;
    Ok(items)
}

/// Write the eight delta columns for one entry.
pub async fn update_deltas<C: ConnectionTrait>(
    conn: &C,
    ledger_id: &str,
    deltas: &DeltaSet,
) -> Result<()> {
    let active = ActiveModel {
        id: Set(ledger_id.to_string()),
        pos_vs_threepo_net_delta: Set(Some(deltas.pos_vs_threepo_net)),
        pos_vs_threepo_tax_delta: Set(Some(deltas.pos_vs_threepo_tax)),
        pos_vs_threepo_commission_delta: Set(Some(deltas.pos_vs_threepo_commission)),
        pos_vs_threepo_pg_charge_delta: Set(Some(deltas.pos_vs_threepo_pg_charge)),
        threepo_vs_pos_net_delta: Set(Some(deltas.threepo_vs_pos_net)),
        threepo_vs_pos_tax_delta: Set(Some(deltas.threepo_vs_pos_tax)),
        threepo_vs_pos_commission_delta: Set(Some(deltas.threepo_vs_pos_commission)),
        threepo_vs_pos_pg_charge_delta: Set(Some(deltas.threepo_vs_pos_pg_charge)),
        updated_at_utc: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    active.update(conn).await?;
    Ok(())
}

/// Write the classification outcome for one entry.
pub async fn update_status<C: ConnectionTrait>(
    conn: &C,
    ledger_id: &str,
    status: &str,
    reconciled_amount: Option<f64>,
    unreconciled_amount: Option<f64>,
) -> Result<()> {
    let active = ActiveModel {
        id: Set(ledger_id.to_string()),
        status: Set(status.to_string()),
        reconciled_amount: Set(reconciled_amount),
        unreconciled_amount: Set(unreconciled_amount),
        updated_at_utc: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    active.update(conn).await?;
    Ok(())
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, ledger_id: &str) -> Result<Option<Model>> {
    let item = Entity::find_by_id(ledger_id.to_string()).one(conn).await?;
    Ok(item)
}

#[cfg(test)]
impl Model {
    /// Blank row for pure-function tests; both sides empty, status PENDING.
    pub(crate) fn blank(id: &str) -> Self {
        Self {
            id: id.to_string(),
            pos_order_id: None,
            threepo_order_id: None,
            store_id: "S1".to_string(),
            order_date: "2024-01-01".to_string(),
            order_action: "delivered".to_string(),
            payment_tender: None,
            pos_net_amount: None,
            pos_tax_paid_by_customer: None,
            pos_commission_value: None,
            pos_pg_charge: None,
            pos_fee: None,
            pos_tds_amount: None,
            pos_final_amount: None,
            threepo_net_amount: None,
            threepo_tax_paid_by_customer: None,
            threepo_commission_value: None,
            threepo_pg_charge: None,
            threepo_fee: None,
            threepo_tds_amount: None,
            threepo_final_amount: None,
            threepo_calc_tax_paid_by_customer: None,
            threepo_calc_commission_value: None,
            threepo_calc_pg_charge: None,
            threepo_calc_final_amount: None,
            threepo_violation_deduction: None,
            threepo_packaging_charge: None,
            threepo_credit_note_adjustment: None,
            threepo_promo_recovery_adjustment: None,
            pos_vs_threepo_net_delta: None,
            pos_vs_threepo_tax_delta: None,
            pos_vs_threepo_commission_delta: None,
            pos_vs_threepo_pg_charge_delta: None,
            threepo_vs_pos_net_delta: None,
            threepo_vs_pos_tax_delta: None,
            threepo_vs_pos_commission_delta: None,
            threepo_vs_pos_pg_charge_delta: None,
            status: "PENDING".to_string(),
            reconciled_amount: None,
            unreconciled_amount: None,
            loaded_at_utc: String::new(),
            updated_at_utc: String::new(),
        }
    }
}

/// Ledger entries for a date range and store set, id ascending; used by the
/// receivables report.
pub async fn list_in_scope<C: ConnectionTrait>(
    conn: &C,
    date_from: &str,
    date_to: &str,
    store_ids: &[String],
) -> Result<Vec<Model>> {
    let mut query = Entity::find()
        .filter(Column::OrderDate.gte(date_from.to_string()))
        .filter(Column::OrderDate.lte(date_to.to_string()));

    if !store_ids.is_empty() {
        query = query.filter(Column::StoreId.is_in(store_ids.to_vec()));
    }

    let items = query.order_by_asc(Column::Id).all(conn).await?;
    Ok(items)
}
